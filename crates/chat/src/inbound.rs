use farm_helper_advice::WebhookResponse;

use crate::ids::{MessageId, SessionId};

/// An answer notification as it arrives on the inbound channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundNotification {
    /// Origin reported by the transport, `None` when it sent none.
    pub origin: Option<String>,
    pub payload: WebhookResponse,
}

impl InboundNotification {
    pub fn new(origin: Option<String>, payload: WebhookResponse) -> Self {
        Self { origin, payload }
    }
}

/// Why a notification was dropped. None of these are surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationRejection {
    ForeignOrigin { origin: Option<String> },
    UnexpectedType { kind: String },
    SessionMismatch { session_id: String },
    MalformedMessageId { raw: String },
    NotPending { message_id: MessageId },
}

impl NotificationRejection {
    /// The poster sent no `Origin` header at all, which usually means it is misconfigured.
    pub fn is_missing_origin(&self) -> bool {
        matches!(self, Self::ForeignOrigin { origin: None })
    }
}

/// Origin and session checks applied before a notification may resolve anything.
///
/// Pending membership is checked by the caller through the pending set itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseFilter {
    origin: String,
    session_id: SessionId,
}

impl ResponseFilter {
    pub fn new(origin: impl Into<String>, session_id: SessionId) -> Self {
        Self {
            origin: normalize_origin(&origin.into()).to_string(),
            session_id,
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    pub fn check(
        &self,
        notification: &InboundNotification,
    ) -> Result<MessageId, NotificationRejection> {
        let same_origin = notification
            .origin
            .as_deref()
            .is_some_and(|origin| normalize_origin(origin) == self.origin);
        if !same_origin {
            return Err(NotificationRejection::ForeignOrigin {
                origin: notification.origin.clone(),
            });
        }

        let payload = &notification.payload;
        if !payload.is_webhook_response() {
            return Err(NotificationRejection::UnexpectedType {
                kind: payload.kind.clone(),
            });
        }

        let session_matches = SessionId::parse(&payload.session_id)
            .is_ok_and(|session_id| session_id == self.session_id);
        if !session_matches {
            return Err(NotificationRejection::SessionMismatch {
                session_id: payload.session_id.clone(),
            });
        }

        MessageId::parse(&payload.message_id).map_err(|_| {
            NotificationRejection::MalformedMessageId {
                raw: payload.message_id.clone(),
            }
        })
    }
}

fn normalize_origin(origin: &str) -> &str {
    origin.trim().trim_end_matches('/')
}
