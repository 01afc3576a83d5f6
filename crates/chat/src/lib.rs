#![deny(unsafe_code)]

/// Input composer: free text, one staged image, and dictation.
pub mod composer;
pub mod error;
/// Events emitted toward the presentation layer.
pub mod events;
pub mod ids;
/// Filtering of answer notifications arriving from outside the session.
pub mod inbound;
pub mod message;
pub mod pending;
/// Canned advice used when the remote service does not answer.
pub mod responder;
pub mod runtime;
pub mod session;
pub mod store;

pub use composer::{
    Composer, DictationError, Draft, MAX_IMAGE_BYTES, SpeechRecognizer, StagedImage, load_image,
};
pub use error::{ChatError, ChatResult};
pub use events::{ChatEvent, NoticeLevel};
pub use ids::{MessageId, SessionId};
pub use inbound::{InboundNotification, NotificationRejection, ResponseFilter};
pub use message::{GREETING_TEXT, IMAGE_ONLY_QUESTION, Message};
pub use pending::{PendingEntry, PendingSet, Resolution, SendOutcome, SubmissionState};
pub use responder::{
    CannedResponses, GENERIC_FAILURE_TEXT, IMAGE_TEMPLATES, ResponseTemplates, TEXT_TEMPLATES,
    delivered_text,
};
pub use runtime::{ChatRuntime, Command};
pub use session::{ChatSession, DEFAULT_RESPONSE_TIMEOUT, SessionConfig, Submission};
pub use store::MessageStore;
