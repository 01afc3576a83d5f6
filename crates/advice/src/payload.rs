use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// `type` tag carried by answer notifications coming back from the webhook.
pub const WEBHOOK_RESPONSE_TYPE: &str = "WEBHOOK_RESPONSE";

/// One question as handed to an [`AdviceClient`](crate::AdviceClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdviceRequest {
    pub question: String,
    pub photo: Option<String>,
    pub session_id: String,
    pub message_id: String,
}

impl AdviceRequest {
    pub fn new(
        question: impl Into<String>,
        session_id: impl Into<String>,
        message_id: impl Into<String>,
    ) -> Self {
        Self {
            question: question.into(),
            photo: None,
            session_id: session_id.into(),
            message_id: message_id.into(),
        }
    }

    pub fn with_photo(mut self, photo: Option<String>) -> Self {
        self.photo = photo;
        self
    }
}

/// JSON body POSTed to the advice webhook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookPayload {
    pub question: String,
    pub photo: Option<String>,
    pub session_id: String,
    pub message_id: String,
    pub timestamp: String,
    pub source: String,
}

impl WebhookPayload {
    pub fn from_request(
        request: AdviceRequest,
        source: impl Into<String>,
        sent_at: DateTime<Utc>,
    ) -> Self {
        Self {
            question: request.question,
            photo: request.photo,
            session_id: request.session_id,
            message_id: request.message_id,
            // Millisecond precision with a `Z` suffix, the shape browser clients emit.
            timestamp: sent_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            source: source.into(),
        }
    }
}

/// Answer notification delivered back to the chat once the webhook has an answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    #[serde(rename = "type")]
    pub kind: String,
    pub session_id: String,
    pub message_id: String,
    #[serde(default)]
    pub response: Option<String>,
}

impl WebhookResponse {
    pub fn new(
        session_id: impl Into<String>,
        message_id: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            kind: WEBHOOK_RESPONSE_TYPE.to_string(),
            session_id: session_id.into(),
            message_id: message_id.into(),
            response: Some(response.into()),
        }
    }

    pub fn is_webhook_response(&self) -> bool {
        self.kind == WEBHOOK_RESPONSE_TYPE
    }

    pub fn text(&self) -> &str {
        self.response.as_deref().unwrap_or_default()
    }
}
