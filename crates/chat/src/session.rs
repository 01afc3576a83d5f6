use std::collections::HashMap;
use std::time::Duration;

use farm_helper_advice::AdviceRequest;

use crate::composer::{Composer, DictationError, StagedImage};
use crate::error::{ChatError, ChatResult};
use crate::events::ChatEvent;
use crate::ids::{MessageId, SessionId};
use crate::inbound::{InboundNotification, NotificationRejection, ResponseFilter};
use crate::message::Message;
use crate::pending::{PendingEntry, PendingSet, Resolution, SendOutcome, SubmissionState};
use crate::responder::{ResponseTemplates, delivered_text};
use crate::store::MessageStore;

/// How long an acknowledged question may wait before a canned answer is used.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Only notifications reporting this origin are accepted.
    pub origin: String,
    pub response_timeout: Duration,
}

impl SessionConfig {
    pub fn new(origin: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            response_timeout: DEFAULT_RESPONSE_TIMEOUT,
        }
    }

    pub fn with_response_timeout(mut self, response_timeout: Duration) -> Self {
        self.response_timeout = response_timeout;
        self
    }
}

/// A user message that was just appended and now awaits an answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub message_id: MessageId,
    pub request: AdviceRequest,
}

/// IO-free chat state: transcript, pending tracker, composer and outbox.
///
/// Every mutation goes through `&mut self`, so the owner decides the single
/// execution context. Events accumulate until [`ChatSession::drain_events`].
pub struct ChatSession {
    session_id: SessionId,
    store: MessageStore,
    pending: PendingSet,
    resolutions: HashMap<MessageId, Resolution>,
    composer: Composer,
    filter: ResponseFilter,
    templates: Box<dyn ResponseTemplates>,
    response_timeout: Duration,
    waiting: bool,
    warned_missing_origin: bool,
    outbox: Vec<ChatEvent>,
}

impl ChatSession {
    pub fn new(
        session_id: SessionId,
        config: SessionConfig,
        templates: Box<dyn ResponseTemplates>,
    ) -> Self {
        let mut session = Self {
            session_id,
            store: MessageStore::new(),
            pending: PendingSet::new(),
            resolutions: HashMap::new(),
            composer: Composer::new(),
            filter: ResponseFilter::new(config.origin, session_id),
            templates,
            response_timeout: config.response_timeout,
            waiting: false,
            warned_missing_origin: false,
            outbox: Vec::new(),
        };
        session.append(Message::greeting());
        session
    }

    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    pub fn messages(&self) -> &[Message] {
        self.store.all()
    }

    pub fn composer(&self) -> &Composer {
        &self.composer
    }

    pub fn response_timeout(&self) -> Duration {
        self.response_timeout
    }

    pub fn is_pending(&self, message_id: MessageId) -> bool {
        self.pending.is_pending(message_id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting
    }

    /// `None` for ids that were never submitted in this session.
    pub fn submission_state(&self, message_id: MessageId) -> Option<SubmissionState> {
        if self.pending.is_pending(message_id) {
            return Some(SubmissionState::Pending);
        }
        self.resolutions
            .get(&message_id)
            .map(|resolution| SubmissionState::Resolved(*resolution))
    }

    pub fn drain_events(&mut self) -> Vec<ChatEvent> {
        std::mem::take(&mut self.outbox)
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.composer.set_text(text);
    }

    /// Stages a loaded image, or surfaces the load failure and leaves the composer as is.
    pub fn stage_image(&mut self, loaded: ChatResult<StagedImage>) -> bool {
        match loaded {
            Ok(image) => {
                tracing::debug!(
                    mime_type = %image.mime_type(),
                    size_bytes = image.size_bytes(),
                    "image staged"
                );
                self.composer.stage_image(image);
                self.outbox
                    .push(ChatEvent::success("Image uploaded successfully!"));
                true
            }
            Err(error) => {
                tracing::info!(error = %error, "image not staged");
                self.notify_error(&error);
                false
            }
        }
    }

    pub fn clear_image(&mut self) {
        self.composer.clear_image();
    }

    /// Returns `true` when the caller should start a recognizer.
    pub fn begin_dictation(&mut self, available: bool) -> bool {
        if !available {
            self.notify_error(&ChatError::DictationUnavailable {
                stage: "begin-dictation",
            });
            return false;
        }
        if self.composer.is_listening() {
            return false;
        }

        self.set_listening(true);
        true
    }

    pub fn finish_dictation(&mut self, result: Result<String, DictationError>) {
        self.set_listening(false);
        match result {
            Ok(transcript) => self.composer.append_transcript(&transcript),
            Err(source) => {
                tracing::info!(error = %source, "dictation failed");
                self.notify_error(&ChatError::DictationFailed {
                    stage: "finish-dictation",
                    source,
                });
            }
        }
    }

    /// Submits the composer, surfacing a validation failure as a notice.
    pub fn submit(&mut self) -> Option<Submission> {
        match self.try_submit() {
            Ok(submission) => Some(submission),
            Err(error) => {
                self.notify_error(&error);
                None
            }
        }
    }

    /// Appends the user message and marks it pending. Nothing changes on error.
    pub fn try_submit(&mut self) -> ChatResult<Submission> {
        let draft = self.composer.take_draft()?;
        let question = draft.question();
        let photo = draft.image.map(StagedImage::into_data_uri);

        let message = Message::user(question.clone(), photo.clone());
        let message_id = message.id;
        self.append(message);
        self.pending
            .mark_pending(message_id, PendingEntry::new(photo.is_some()));
        self.outbox.push(ChatEvent::ComposerCleared);
        self.sync_waiting();

        tracing::info!(
            session_id = %self.session_id,
            message_id = %message_id,
            has_photo = photo.is_some(),
            "question submitted"
        );

        let request = AdviceRequest::new(
            question,
            self.session_id.to_string(),
            message_id.to_string(),
        )
        .with_photo(photo);
        Ok(Submission {
            message_id,
            request,
        })
    }

    /// Applies the send result.
    ///
    /// Returns the window after which [`ChatSession::expire`] must be called, or
    /// `None` when the submission was settled here.
    pub fn record_send_outcome(
        &mut self,
        message_id: MessageId,
        outcome: SendOutcome,
    ) -> Option<Duration> {
        let Some(resolution) = outcome.immediate_resolution() else {
            tracing::debug!(message_id = %message_id, "advice request acknowledged");
            return Some(self.response_timeout);
        };

        tracing::warn!(
            message_id = %message_id,
            outcome = ?outcome,
            "advice request failed; answering locally"
        );
        self.settle(message_id, resolution, None);
        None
    }

    /// Timeout check. A no-op when another path already settled the submission.
    pub fn expire(&mut self, message_id: MessageId) -> bool {
        let settled = self.settle(message_id, Resolution::TimedOut, None);
        if settled {
            tracing::info!(message_id = %message_id, "no answer in time; answering locally");
        } else {
            tracing::debug!(message_id = %message_id, "timeout fired after resolution");
        }
        settled
    }

    /// Accepts an answer notification if it passes the filter and is still pending.
    pub fn accept_notification(&mut self, notification: &InboundNotification) -> bool {
        let outcome = self.filter.check(notification).and_then(|message_id| {
            if self.settle(
                message_id,
                Resolution::Delivered,
                Some(notification.payload.text()),
            ) {
                Ok(message_id)
            } else {
                Err(NotificationRejection::NotPending { message_id })
            }
        });

        match outcome {
            Ok(message_id) => {
                tracing::info!(message_id = %message_id, "answer delivered");
                true
            }
            Err(rejection) => {
                if rejection.is_missing_origin() && !self.warned_missing_origin {
                    self.warned_missing_origin = true;
                    tracing::warn!(
                        expected_origin = %self.filter.origin(),
                        "answer notification without Origin header ignored; the poster must send the configured origin"
                    );
                } else {
                    tracing::debug!(rejection = ?rejection, "answer notification ignored");
                }
                false
            }
        }
    }

    /// First caller for an id wins; everyone after that gets `false`.
    fn settle(
        &mut self,
        message_id: MessageId,
        resolution: Resolution,
        delivered: Option<&str>,
    ) -> bool {
        let Some(entry) = self.pending.resolve(message_id) else {
            return false;
        };

        let text = match delivered {
            Some(raw) => delivered_text(raw),
            None => self.templates.pick(entry.has_image),
        };
        self.resolutions.insert(message_id, resolution);
        self.append(Message::assistant(text));
        self.sync_waiting();

        tracing::debug!(
            message_id = %message_id,
            resolution = resolution.as_str(),
            waited_ms = entry.waited().num_milliseconds(),
            "submission resolved"
        );
        true
    }

    fn append(&mut self, message: Message) {
        let appended = self.store.append(message).clone();
        self.outbox.push(ChatEvent::MessageAppended(appended));
        self.outbox.push(ChatEvent::ScrollToLatest);
    }

    fn sync_waiting(&mut self) {
        let waiting = !self.pending.is_empty();
        if waiting != self.waiting {
            self.waiting = waiting;
            self.outbox.push(ChatEvent::WaitingChanged(waiting));
        }
    }

    fn set_listening(&mut self, listening: bool) {
        if self.composer.set_listening(listening) {
            self.outbox.push(ChatEvent::ListeningChanged(listening));
        }
    }

    fn notify_error(&mut self, error: &ChatError) {
        self.outbox.push(ChatEvent::error(error));
    }
}
