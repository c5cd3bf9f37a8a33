//! Plugin hooks invoked at fixed points of the request lifecycle.
//!
//! Request hooks (`before_router` through `after_transform_request`) mutate the
//! shared [`RequestContext`] in place. Response hooks are transforms: they see
//! the data read-only and may return a replacement.

pub mod builtin;
pub mod loader;
pub mod registry;

use async_trait::async_trait;
use std::fmt;

use crate::context::RequestContext;
use crate::models::claude::{ContentBlock, MessageResponse};
use crate::models::openai::{ChatCompletion, ChatCompletionChunk};

pub use builtin::BuiltinPlugins;
pub use loader::PluginLoader;
pub use registry::PluginRegistry;

/// The six hook points, in lifecycle order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPoint {
    BeforeRouter,
    AfterRouter,
    BeforeTransformRequest,
    AfterTransformRequest,
    BeforeTransformResponse,
    AfterTransformResponse,
}

impl HookPoint {
    pub const ALL: [HookPoint; 6] = [
        HookPoint::BeforeRouter,
        HookPoint::AfterRouter,
        HookPoint::BeforeTransformRequest,
        HookPoint::AfterTransformRequest,
        HookPoint::BeforeTransformResponse,
        HookPoint::AfterTransformResponse,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HookPoint::BeforeRouter => "beforeRouter",
            HookPoint::AfterRouter => "afterRouter",
            HookPoint::BeforeTransformRequest => "beforeTransformRequest",
            HookPoint::AfterTransformRequest => "afterTransformRequest",
            HookPoint::BeforeTransformResponse => "beforeTransformResponse",
            HookPoint::AfterTransformResponse => "afterTransformResponse",
        }
    }

    /// Response hooks return replacements instead of mutating the context
    pub fn is_transform(&self) -> bool {
        matches!(
            self,
            HookPoint::BeforeTransformResponse | HookPoint::AfterTransformResponse
        )
    }
}

impl fmt::Display for HookPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Upstream data seen by `before_transform_response`
#[derive(Debug, Clone)]
pub enum UpstreamPayload {
    /// The aggregate response on the non-streaming path
    Completion(ChatCompletion),
    /// One chunk on the streaming path
    Chunk(ChatCompletionChunk),
}

/// Translated output seen by `after_transform_response`
#[derive(Debug, Clone, PartialEq)]
pub enum Transformed {
    /// The complete non-streaming message
    Message(MessageResponse),
    /// Accumulated blocks about to be sent in `message_delta`
    Content(Vec<ContentBlock>),
    /// One serialized SSE frame
    Event(String),
}

impl Transformed {
    pub fn kind(&self) -> &'static str {
        match self {
            Transformed::Message(_) => "message",
            Transformed::Content(_) => "content",
            Transformed::Event(_) => "event",
        }
    }

    pub fn into_message(self) -> Option<MessageResponse> {
        match self {
            Transformed::Message(message) => Some(message),
            _ => None,
        }
    }

    pub fn into_content(self) -> Option<Vec<ContentBlock>> {
        match self {
            Transformed::Content(blocks) => Some(blocks),
            _ => None,
        }
    }

    pub fn into_event(self) -> Option<String> {
        match self {
            Transformed::Event(frame) => Some(frame),
            _ => None,
        }
    }
}

/// A user-supplied unit implementing any subset of the hooks
///
/// `implements` declares which hooks the plugin provides; the registry only
/// dispatches those. Errors are logged by the registry and never reach the client.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn implements(&self, hook: HookPoint) -> bool;

    async fn before_router(&self, _ctx: &mut RequestContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn after_router(&self, _ctx: &mut RequestContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn before_transform_request(&self, _ctx: &mut RequestContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn after_transform_request(&self, _ctx: &mut RequestContext) -> anyhow::Result<()> {
        Ok(())
    }

    async fn before_transform_response(
        &self,
        _ctx: &RequestContext,
        _completion: &UpstreamPayload,
    ) -> anyhow::Result<Option<UpstreamPayload>> {
        Ok(None)
    }

    /// Rewrite translated output.
    ///
    /// `completion` is the upstream data the output was translated from: the
    /// whole response for a [`Transformed::Message`], and the latest chunk for
    /// streamed frames and the final [`Transformed::Content`]. It is `None` only
    /// for frames written before the first chunk arrives, such as `message_start`.
    async fn after_transform_response(
        &self,
        _ctx: &RequestContext,
        _completion: Option<&UpstreamPayload>,
        _transformed: &Transformed,
    ) -> anyhow::Result<Option<Transformed>> {
        Ok(None)
    }
}
