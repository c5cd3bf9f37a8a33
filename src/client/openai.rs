use reqwest::Client;
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ProviderConfig;
use crate::error::{Result, RouterError};
use crate::models::openai::{ChatCompletion, UpstreamCompletion};
use crate::provider::{CompletionFuture, Upstream};
use crate::streaming::parser::chunk_stream;

/// HTTP client for OpenAI-compatible chat-completion endpoints
pub struct OpenAIClient {
    client: Client,
}

impl OpenAIClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(600))
            .build()
            .map_err(|e| {
                RouterError::InternalError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { client })
    }

    async fn complete_impl(
        client: Client,
        provider: String,
        url: String,
        api_key: String,
        body: Value,
    ) -> Result<UpstreamCompletion> {
        let stream = body.get("stream").and_then(Value::as_bool).unwrap_or(false);
        let model = body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or_default();
        info!(
            "{}: Sending request to {} (model: {}, stream: {})",
            provider, url, model, stream
        );

        let mut request = client.post(&url).json(&body);
        if !api_key.is_empty() {
            request = request.bearer_auth(&api_key);
        }

        let response = request.send().await.map_err(|e| {
            RouterError::UpstreamError(format!("{} request failed: {}", provider, e))
        })?;

        let status = response.status();
        info!("{} responded with status: {}", provider, status);

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(RouterError::UpstreamError(format!(
                "{} API error {}: {}",
                provider, status, error_body
            )));
        }

        if !stream {
            let completion: ChatCompletion = response.json().await.map_err(|e| {
                RouterError::InvalidUpstreamResponse(format!(
                    "{} returned an unreadable completion: {}",
                    provider, e
                ))
            })?;
            debug!(choices = completion.choices.len(), "Received completion");
            return Ok(UpstreamCompletion::Single(completion));
        }

        Ok(UpstreamCompletion::Stream(chunk_stream(response.bytes_stream())))
    }
}

impl Upstream for OpenAIClient {
    fn complete(&self, provider: &ProviderConfig, body: Value) -> CompletionFuture {
        let client = self.client.clone();
        let name = provider.name.clone();
        let url = provider.api_base_url.clone();
        let api_key = provider.api_key.clone();

        Box::pin(async move { Self::complete_impl(client, name, url, api_key, body).await })
    }

    fn name(&self) -> &str {
        "openai"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_unreachable_upstream_is_upstream_error() {
        let provider = ProviderConfig {
            name: "local".to_string(),
            api_base_url: "http://127.0.0.1:9/v1/chat/completions".to_string(),
            api_key: "sk-test".to_string(),
            models: vec![],
        };
        let client = OpenAIClient::new().unwrap();

        let result = client
            .complete(
                &provider,
                json!({"model": "deepseek-chat", "messages": [], "stream": true}),
            )
            .await;

        match result {
            Err(RouterError::UpstreamError(message)) => assert!(message.starts_with("local")),
            other => panic!("Expected upstream error, got {:?}", other),
        }
    }
}
