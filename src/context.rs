use serde_json::Value;

/// Per-request state shared by the hook pipeline and the translator
///
/// `body` starts as the client's JSON request and is replaced by the upstream
/// chat-completion request once transformed. Request hooks rewrite it in place.
#[derive(Debug, Clone)]
pub struct RequestContext {
    /// Provider chosen by the router; `None` until routing has run
    pub provider: Option<String>,
    /// Model name as the client sent it
    pub model: String,
    /// Whether the client asked for a streamed response
    pub stream: bool,
    pub body: Value,
}

impl RequestContext {
    pub fn new(body: Value) -> Self {
        let model = body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let stream = body.get("stream").and_then(Value::as_bool).unwrap_or(false);

        Self {
            provider: None,
            model,
            stream,
            body,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    /// Model currently named in the body, which router hooks may have rewritten
    pub fn requested_model(&self) -> &str {
        self.body
            .get("model")
            .and_then(Value::as_str)
            .unwrap_or(&self.model)
    }
}
