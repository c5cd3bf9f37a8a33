use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{HookPoint, Plugin, PluginLoader, Transformed, UpstreamPayload};
use crate::context::RequestContext;
use crate::error::{Result, RouterError};
use crate::models::claude::{ContentBlock, MessageResponse};

/// Split `"<provider>,<plugin>"` into its scope and base name
pub fn parse_plugin_name(name: &str) -> (Option<&str>, &str) {
    match name.split_once(',') {
        Some((provider, base)) => (Some(provider), base),
        None => (None, name),
    }
}

struct RegisteredPlugin {
    name: String,
    scope: Option<String>,
    plugin: Arc<dyn Plugin>,
}

impl RegisteredPlugin {
    fn applies_to(&self, provider: Option<&str>) -> bool {
        match &self.scope {
            None => true,
            Some(scope) => provider == Some(scope.as_str()),
        }
    }
}

/// Ordered set of plugins; registration order is invocation order
///
/// Built once at startup and shared read-only (`Arc<PluginRegistry>`) by every
/// request afterwards.
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<RegisteredPlugin>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve each configured name through the loader and register it
    pub fn load(names: &[String], loader: &dyn PluginLoader) -> Result<Self> {
        info!("Loading plugins: {:?}", names);
        let mut registry = Self::new();
        for name in names {
            let (_, base) = parse_plugin_name(name);
            let plugin = loader.load(base)?;
            registry.register(name.clone(), plugin)?;
            info!("Plugin {} loaded successfully", name);
        }
        Ok(registry)
    }

    /// Register a plugin under `name`, which may carry a provider scope
    pub fn register(&mut self, name: impl Into<String>, plugin: Arc<dyn Plugin>) -> Result<()> {
        let name = name.into();
        if self.plugins.iter().any(|p| p.name == name) {
            return Err(RouterError::PluginError(format!(
                "Plugin {} is already registered",
                name
            )));
        }
        if !HookPoint::ALL.iter().any(|hook| plugin.implements(*hook)) {
            return Err(RouterError::PluginError(format!(
                "Plugin {} does not implement any hook",
                name
            )));
        }

        let scope = parse_plugin_name(&name).0.map(str::to_string);
        self.plugins.push(RegisteredPlugin {
            name,
            scope,
            plugin,
        });
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.plugins.iter().map(|p| p.name.as_str())
    }

    fn active<'a>(
        &'a self,
        ctx: &'a RequestContext,
        hook: HookPoint,
    ) -> impl Iterator<Item = &'a RegisteredPlugin> + 'a {
        let provider = ctx.provider.as_deref();
        self.plugins
            .iter()
            .filter(move |p| p.applies_to(provider) && p.plugin.implements(hook))
    }

    /// Run a mutating request hook across all applicable plugins.
    ///
    /// A failing plugin is logged and skipped; later plugins still run.
    pub async fn run_hook(&self, hook: HookPoint, ctx: &mut RequestContext) {
        if hook.is_transform() {
            warn!(hook = %hook, "Response hooks are dispatched through the transform methods");
            return;
        }

        let provider = ctx.provider.clone();
        for entry in self
            .plugins
            .iter()
            .filter(|p| p.applies_to(provider.as_deref()) && p.plugin.implements(hook))
        {
            let result = match hook {
                HookPoint::BeforeRouter => entry.plugin.before_router(ctx).await,
                HookPoint::AfterRouter => entry.plugin.after_router(ctx).await,
                HookPoint::BeforeTransformRequest => {
                    entry.plugin.before_transform_request(ctx).await
                }
                HookPoint::AfterTransformRequest => {
                    entry.plugin.after_transform_request(ctx).await
                }
                HookPoint::BeforeTransformResponse | HookPoint::AfterTransformResponse => Ok(()),
            };

            match result {
                Ok(()) => debug!("Plugin {} executed hook: {}", entry.name, hook),
                Err(e) => warn!(
                    plugin = %entry.name,
                    hook = %hook,
                    error = %e,
                    "Plugin hook failed"
                ),
            }
        }
    }

    /// Pass upstream data through every `before_transform_response` hook
    pub async fn transform_completion(
        &self,
        ctx: &RequestContext,
        mut completion: UpstreamPayload,
    ) -> UpstreamPayload {
        let hook = HookPoint::BeforeTransformResponse;
        for entry in self.active(ctx, hook) {
            match entry
                .plugin
                .before_transform_response(ctx, &completion)
                .await
            {
                Ok(Some(replacement)) => {
                    if std::mem::discriminant(&replacement) == std::mem::discriminant(&completion) {
                        completion = replacement;
                    } else {
                        warn!(plugin = %entry.name, hook = %hook, "Ignoring replacement of a different kind");
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(
                    plugin = %entry.name,
                    hook = %hook,
                    error = %e,
                    "Plugin hook failed"
                ),
            }
        }
        completion
    }

    /// Pass translated output through every `after_transform_response` hook.
    ///
    /// A replacement is honored only if `unwrap` accepts it, i.e. it is the
    /// same kind as the input; anything else is ignored with a warning.
    async fn transform_response<T: Clone>(
        &self,
        ctx: &RequestContext,
        completion: Option<&UpstreamPayload>,
        mut value: T,
        wrap: fn(T) -> Transformed,
        unwrap: fn(Transformed) -> Option<T>,
    ) -> T {
        let hook = HookPoint::AfterTransformResponse;
        for entry in self.active(ctx, hook) {
            let transformed = wrap(value.clone());
            match entry
                .plugin
                .after_transform_response(ctx, completion, &transformed)
                .await
            {
                Ok(Some(replacement)) => {
                    let got = replacement.kind();
                    match unwrap(replacement) {
                        Some(replaced) => value = replaced,
                        None => warn!(
                            plugin = %entry.name,
                            expected = transformed.kind(),
                            got,
                            "Ignoring replacement of a different kind"
                        ),
                    }
                }
                Ok(None) => {}
                Err(e) => warn!(
                    plugin = %entry.name,
                    hook = %hook,
                    error = %e,
                    "Plugin hook failed"
                ),
            }
        }
        value
    }

    /// Rewrite one serialized SSE frame; an empty result suppresses the frame
    pub async fn transform_event(
        &self,
        ctx: &RequestContext,
        completion: Option<&UpstreamPayload>,
        frame: String,
    ) -> String {
        self.transform_response(
            ctx,
            completion,
            frame,
            Transformed::Event,
            Transformed::into_event,
        )
        .await
    }

    /// Rewrite the block list carried by the final `message_delta`
    pub async fn transform_content(
        &self,
        ctx: &RequestContext,
        completion: Option<&UpstreamPayload>,
        blocks: Vec<ContentBlock>,
    ) -> Vec<ContentBlock> {
        self.transform_response(
            ctx,
            completion,
            blocks,
            Transformed::Content,
            Transformed::into_content,
        )
        .await
    }

    /// Rewrite the complete non-streaming message
    pub async fn transform_message(
        &self,
        ctx: &RequestContext,
        completion: &UpstreamPayload,
        message: MessageResponse,
    ) -> MessageResponse {
        self.transform_response(
            ctx,
            Some(completion),
            message,
            Transformed::Message,
            Transformed::into_message,
        )
        .await
    }
}
