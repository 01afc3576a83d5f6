use chrono::{DateTime, Utc};

use crate::ids::MessageId;

/// Assistant greeting every session starts with.
pub const GREETING_TEXT: &str = "Hello! 👋 I'm your Farm Helper AI. Ask me anything about farming, crops, diseases, or upload a photo of your plants for diagnosis!";

/// Question used when the user submits a photo without any text.
pub const IMAGE_ONLY_QUESTION: &str = "I uploaded an image of my crop. Can you help?";

/// One rendered chat record. Never edited after it reaches the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub text: String,
    pub is_user: bool,
    /// Attached photo as a `data:` URI.
    pub image: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    pub fn new(text: impl Into<String>, is_user: bool, image: Option<String>) -> Self {
        Self {
            id: MessageId::generate(),
            text: text.into(),
            is_user,
            image,
            timestamp: Utc::now(),
        }
    }

    pub fn user(text: impl Into<String>, image: Option<String>) -> Self {
        Self::new(text, true, image)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(text, false, None)
    }

    pub fn greeting() -> Self {
        Self::assistant(GREETING_TEXT)
    }

    pub fn has_image(&self) -> bool {
        self.image.is_some()
    }
}
