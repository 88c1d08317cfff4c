use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};
use zeroize::Zeroize;

use super::normalize::{NormalizedResponse, normalize_body};
use super::{OrchestrationError, Orchestrator, OrchestratorResult};

/// Upstream error bodies are cut to this many characters
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Configuration for [`WebhookOrchestrator`]
#[derive(Clone, Default)]
pub struct WebhookConfig {
    /// Webhook URL; requests fail with a configuration error while unset
    pub url: Option<String>,
    /// Sent as `X-Internal-Token` when set
    pub internal_token: Option<String>,
}

impl std::fmt::Debug for WebhookConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookConfig")
            .field("url", &self.url)
            .field(
                "internal_token",
                &self.internal_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

impl Drop for WebhookConfig {
    fn drop(&mut self) {
        if let Some(token) = self.internal_token.as_mut() {
            token.zeroize();
        }
    }
}

/// Orchestrator that posts transcripts to a workflow webhook.
pub struct WebhookOrchestrator {
    config: WebhookConfig,
    http_client: reqwest::Client,
}

impl WebhookOrchestrator {
    pub fn new(config: WebhookConfig, http_client: reqwest::Client) -> Self {
        Self {
            config,
            http_client,
        }
    }
}

#[async_trait]
impl Orchestrator for WebhookOrchestrator {
    async fn forward(&self, session_id: &str, text: &str) -> OrchestratorResult<NormalizedResponse> {
        let url = self
            .config
            .url
            .as_deref()
            .filter(|u| !u.trim().is_empty())
            .ok_or(OrchestrationError::MissingEndpoint)?;

        let mut request = self
            .http_client
            .post(url)
            .json(&json!({ "session_id": session_id, "text": text }));
        if let Some(token) = self.config.internal_token.as_deref().filter(|t| !t.is_empty()) {
            request = request.header("X-Internal-Token", token);
        }

        info!(%session_id, text_chars = text.chars().count(), "Forwarding transcript to orchestration");
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Orchestration webhook returned an error");
            return Err(OrchestrationError::UpstreamStatus {
                status: status.as_u16(),
                message: body.chars().take(MAX_ERROR_BODY_CHARS).collect(),
            });
        }

        let normalized = normalize_body(&body);
        debug!(payload = %normalized.payload, "Orchestration response normalized");
        Ok(normalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn orchestrator(url: Option<String>, token: Option<&str>) -> WebhookOrchestrator {
        WebhookOrchestrator::new(
            WebhookConfig {
                url,
                internal_token: token.map(str::to_string),
            },
            reqwest::Client::new(),
        )
    }

    #[tokio::test]
    async fn test_forward_posts_session_and_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/webhook/chat"))
            .and(header("X-Internal-Token", "secret-token"))
            .and(body_json(json!({"session_id": "abc", "text": "halo"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"json": {"type": "neutral", "text": "Hai!"}}
            ])))
            .expect(1)
            .mount(&server)
            .await;

        let orch = orchestrator(
            Some(format!("{}/webhook/chat", server.uri())),
            Some("secret-token"),
        );
        let response = orch.forward("abc", "halo").await.unwrap();
        assert_eq!(response.result.response_type.as_deref(), Some("neutral"));
        assert_eq!(response.result.text.as_deref(), Some("Hai!"));
    }

    #[tokio::test]
    async fn test_forward_non_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("Workflow was started"))
            .mount(&server)
            .await;

        let orch = orchestrator(Some(server.uri()), None);
        let response = orch.forward("abc", "halo").await.unwrap();
        assert_eq!(response.payload, json!({"raw": "Workflow was started"}));
        assert_eq!(response.result.text, None);
    }

    #[tokio::test]
    async fn test_forward_upstream_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("down"))
            .mount(&server)
            .await;

        let orch = orchestrator(Some(server.uri()), None);
        match orch.forward("abc", "halo").await {
            Err(OrchestrationError::UpstreamStatus { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "down");
            }
            other => panic!("Expected UpstreamStatus, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_forward_without_endpoint() {
        let orch = orchestrator(None, None);
        assert!(matches!(
            orch.forward("abc", "halo").await,
            Err(OrchestrationError::MissingEndpoint)
        ));
    }

    #[test]
    fn test_debug_redacts_token() {
        let config = WebhookConfig {
            url: None,
            internal_token: Some("secret-token".to_string()),
        };
        assert!(!format!("{config:?}").contains("secret-token"));
    }
}
