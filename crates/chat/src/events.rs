use crate::error::ChatError;
use crate::message::Message;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NoticeLevel {
    Success,
    Error,
}

/// Presentation-facing signal produced by the chat session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    MessageAppended(Message),
    /// Follows every append.
    ScrollToLatest,
    /// "Waiting for an answer" indicator; emitted only when it flips.
    WaitingChanged(bool),
    ListeningChanged(bool),
    /// Text and staged image were reset after a submission.
    ComposerCleared,
    Notice {
        level: NoticeLevel,
        text: String,
    },
}

impl ChatEvent {
    pub fn success(text: impl Into<String>) -> Self {
        Self::Notice {
            level: NoticeLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(error: &ChatError) -> Self {
        Self::Notice {
            level: NoticeLevel::Error,
            text: error.to_string(),
        }
    }

    pub fn appended_message(&self) -> Option<&Message> {
        match self {
            Self::MessageAppended(message) => Some(message),
            _ => None,
        }
    }
}
