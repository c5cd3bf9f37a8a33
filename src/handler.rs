use axum::{
    Json,
    body::Body,
    extract::State,
    http::{Response, StatusCode, header},
    response::IntoResponse,
};
use futures::StreamExt;
use futures::channel::mpsc;
use serde_json::Value;
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::config::RouterConfig;
use crate::context::RequestContext;
use crate::error::{Result, RouterError};
use crate::models::openai::UpstreamCompletion;
use crate::plugin::{HookPoint, PluginRegistry};
use crate::provider::Upstream;
use crate::router::select_route;
use crate::streaming::{send_message, stream_events};
use crate::transform::transform_body;

/// Frames buffered between the translator task and the response body
const STREAM_BUFFER: usize = 32;

pub struct AppState {
    pub config: RouterConfig,
    pub plugins: Arc<PluginRegistry>,
    pub upstream: Arc<dyn Upstream>,
}

pub async fn handle_messages(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    let mut ctx = RequestContext::new(body);
    info!("Request for model: {} (stream: {})", ctx.model, ctx.stream);

    let completion = match prepare_and_send(&state, &mut ctx).await {
        Ok(completion) => completion,
        Err(e) => {
            error!("Request failed before translation: {}", e);
            return e.into_response();
        }
    };

    match completion {
        UpstreamCompletion::Single(completion) => {
            match send_message(&ctx, &state.plugins, completion).await {
                Ok(message) => Json(message).into_response(),
                Err(e) => {
                    error!("Translation failed: {}", e);
                    e.into_response()
                }
            }
        }
        UpstreamCompletion::Stream(chunks) => {
            let (tx, rx) = mpsc::channel(STREAM_BUFFER);
            let plugins = state.plugins.clone();

            tokio::spawn(async move {
                match stream_events(&ctx, &plugins, chunks, tx).await {
                    Ok(()) => {}
                    Err(RouterError::ClientDisconnected) => {
                        warn!("Client disconnected, stream abandoned")
                    }
                    Err(e) => error!("Stream translation failed: {}", e),
                }
            });

            Response::builder()
                .status(StatusCode::OK)
                .header(header::CONTENT_TYPE, "text/event-stream")
                .header(header::CACHE_CONTROL, "no-cache")
                .header(header::CONNECTION, "keep-alive")
                .body(Body::from_stream(rx.map(Ok::<_, Infallible>)))
                .map(IntoResponse::into_response)
                .unwrap_or_else(|e| {
                    error!("Failed to build stream response: {}", e);
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                })
        }
    }
}

/// Run the request hooks, route, transform and call the upstream
async fn prepare_and_send(state: &AppState, ctx: &mut RequestContext) -> Result<UpstreamCompletion> {
    state.plugins.run_hook(HookPoint::BeforeRouter, ctx).await;

    let route = select_route(&state.config, ctx.requested_model())?;
    info!("Routing {} -> {},{}", ctx.model, route.provider, route.model);
    ctx.provider = Some(route.provider.clone());
    state.plugins.run_hook(HookPoint::AfterRouter, ctx).await;

    state
        .plugins
        .run_hook(HookPoint::BeforeTransformRequest, ctx)
        .await;
    ctx.body = transform_body(&ctx.body, &route.model)?;
    state
        .plugins
        .run_hook(HookPoint::AfterTransformRequest, ctx)
        .await;

    let provider = state.config.provider(&route.provider).ok_or_else(|| {
        RouterError::RoutingError(format!("Unknown provider: {}", route.provider))
    })?;
    state.upstream.complete(provider, ctx.body.clone()).await
}
