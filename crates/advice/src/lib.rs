//! Remote advice client and the wire contracts shared with the advice webhook.
mod client;
mod error;
mod payload;

pub use client::{
    AdviceClient, DEFAULT_REQUEST_TIMEOUT, DEFAULT_SOURCE, WebhookClient, WebhookConfig,
};
pub use error::{AdviceError, AdviceResult};
pub use payload::{AdviceRequest, WEBHOOK_RESPONSE_TYPE, WebhookPayload, WebhookResponse};
