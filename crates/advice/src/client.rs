use std::time::Duration;

use chrono::Utc;
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::Client;
use snafu::{ResultExt, ensure};

use super::error::{
    AdviceResult, BuildClientSnafu, InvalidEndpointSnafu, RejectedSnafu, TransportSnafu,
};
use super::payload::{AdviceRequest, WebhookPayload};

pub const DEFAULT_SOURCE: &str = "farm-helper-chat";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Delivers one question to the remote advice service.
///
/// `Ok(())` only means the service accepted the request for asynchronous processing.
/// The answer itself arrives later through the inbound notification channel.
pub trait AdviceClient: Send + Sync {
    fn send(&self, request: AdviceRequest) -> BoxFuture<'_, AdviceResult<()>>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookConfig {
    pub endpoint: String,
    pub source: String,
    pub request_timeout: Duration,
}

impl WebhookConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim().to_string(),
            source: DEFAULT_SOURCE.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        self.request_timeout = request_timeout;
        self
    }
}

/// Single-attempt JSON POST client for the advice webhook.
pub struct WebhookClient {
    config: WebhookConfig,
    http: Client,
}

impl WebhookClient {
    pub fn new(config: WebhookConfig) -> AdviceResult<Self> {
        ensure!(
            config.endpoint.starts_with("http://") || config.endpoint.starts_with("https://"),
            InvalidEndpointSnafu {
                stage: "webhook-client-new",
                endpoint: config.endpoint.clone(),
            }
        );

        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .context(BuildClientSnafu {
                stage: "build-http-client",
            })?;

        Ok(Self { config, http })
    }

    pub fn endpoint(&self) -> &str {
        &self.config.endpoint
    }

    async fn post(&self, request: AdviceRequest) -> AdviceResult<()> {
        let message_id = request.message_id.clone();
        let has_photo = request.photo.is_some();
        let payload = WebhookPayload::from_request(request, &self.config.source, Utc::now());

        tracing::debug!(
            message_id = %message_id,
            has_photo,
            endpoint = %self.config.endpoint,
            "posting advice request"
        );

        let response = self
            .http
            .post(&self.config.endpoint)
            .json(&payload)
            .send()
            .await
            .context(TransportSnafu {
                stage: "send-advice-request",
            })?;

        let status = response.status();
        if !status.is_success() {
            // The body is only diagnostic; an unreadable one must not mask the status.
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                message_id = %message_id,
                status = status.as_u16(),
                "advice endpoint rejected request"
            );
            return RejectedSnafu {
                stage: "advice-http-status",
                status: status.as_u16(),
                body,
            }
            .fail();
        }

        tracing::debug!(
            message_id = %message_id,
            status = status.as_u16(),
            "advice request acknowledged"
        );
        Ok(())
    }
}

impl AdviceClient for WebhookClient {
    fn send(&self, request: AdviceRequest) -> BoxFuture<'_, AdviceResult<()>> {
        self.post(request).boxed()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::task::JoinHandle;

    use super::*;
    use crate::AdviceError;

    /// Serves exactly one HTTP exchange and hands back the received JSON body.
    async fn one_shot_server(status_line: &'static str) -> (String, JoinHandle<Value>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buffer = Vec::new();
            let mut chunk = [0_u8; 4096];

            let body = loop {
                let read = socket.read(&mut chunk).await.unwrap();
                assert!(read > 0, "client closed before sending a full request");
                buffer.extend_from_slice(&chunk[..read]);

                let text = String::from_utf8_lossy(&buffer).to_string();
                let Some(header_end) = text.find("\r\n\r\n") else {
                    continue;
                };
                let content_length = text[..header_end]
                    .lines()
                    .find_map(|line| {
                        let (name, value) = line.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                let body_start = header_end + 4;
                if buffer.len() >= body_start + content_length {
                    break buffer[body_start..body_start + content_length].to_vec();
                }
            };

            let response = format!("{status_line}\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok");
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();

            serde_json::from_slice::<Value>(&body).unwrap()
        });

        (format!("http://{address}/webhook"), handle)
    }

    #[test]
    fn rejects_non_http_endpoint() {
        let result = WebhookClient::new(WebhookConfig::new("ftp://example.com/hook"));
        assert!(matches!(result, Err(AdviceError::InvalidEndpoint { .. })));

        let result = WebhookClient::new(WebhookConfig::new("   "));
        assert!(matches!(result, Err(AdviceError::InvalidEndpoint { .. })));
    }

    #[tokio::test]
    async fn success_status_is_acknowledged_and_body_matches_contract() {
        let (endpoint, server) = one_shot_server("HTTP/1.1 200 OK").await;
        let client =
            WebhookClient::new(WebhookConfig::new(endpoint).with_source("unit-test")).unwrap();

        let request = AdviceRequest::new("My wheat leaves are turning yellow", "s-1", "m-1");
        client.send(request).await.unwrap();

        let body = server.await.unwrap();
        assert_eq!(body["question"], "My wheat leaves are turning yellow");
        assert_eq!(body["photo"], Value::Null);
        assert_eq!(body["sessionId"], "s-1");
        assert_eq!(body["messageId"], "m-1");
        assert_eq!(body["source"], "unit-test");
        assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn non_success_status_is_rejected() {
        let (endpoint, server) = one_shot_server("HTTP/1.1 500 Internal Server Error").await;
        let client = WebhookClient::new(WebhookConfig::new(endpoint)).unwrap();

        let error = client
            .send(AdviceRequest::new("hello", "s-1", "m-1"))
            .await
            .unwrap_err();
        server.await.unwrap();

        assert_eq!(error.rejected_status(), Some(500));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_a_transport_error() {
        // Bind then drop so the port is known to be closed.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();
        drop(listener);

        let client = WebhookClient::new(WebhookConfig::new(format!("http://{address}/webhook")))
            .unwrap();
        let error = client
            .send(AdviceRequest::new("hello", "s-1", "m-1"))
            .await
            .unwrap_err();

        assert!(matches!(error, AdviceError::Transport { .. }));
        assert_eq!(error.rejected_status(), None);
    }
}
