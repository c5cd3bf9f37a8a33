use serde_json::Value;
use std::future::Future;
use std::pin::Pin;

use crate::config::ProviderConfig;
use crate::error::Result;
use crate::models::openai::UpstreamCompletion;

/// Type alias for the future returned by [`Upstream::complete`]
pub type CompletionFuture = Pin<Box<dyn Future<Output = Result<UpstreamCompletion>> + Send>>;

/// Trait for chat-completion backends
pub trait Upstream: Send + Sync {
    /// Send a translated request body to `provider`
    ///
    /// # Returns
    /// `UpstreamCompletion::Stream` when the body asked for streaming, otherwise
    /// the aggregate response
    fn complete(&self, provider: &ProviderConfig, body: Value) -> CompletionFuture;

    /// Get the backend name for logging
    fn name(&self) -> &str;
}
