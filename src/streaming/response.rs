use bytes::Bytes;
use futures::channel::mpsc::Sender;
use futures::{SinkExt, StreamExt};
use tracing::{debug, info, warn};

use super::sse::format_event;
use super::translator::{StreamTranslator, new_message_id, translate_completion};
use crate::context::RequestContext;
use crate::error::{Result, RouterError};
use crate::models::claude::{MessageEvent, MessageResponse};
use crate::models::openai::{ChatCompletion, ChunkStream};
use crate::plugin::{PluginRegistry, UpstreamPayload};

/// Translate a complete upstream response into one client message
pub async fn send_message(
    ctx: &RequestContext,
    plugins: &PluginRegistry,
    completion: ChatCompletion,
) -> Result<MessageResponse> {
    let payload = plugins
        .transform_completion(ctx, UpstreamPayload::Completion(completion))
        .await;
    let UpstreamPayload::Completion(completion) = &payload else {
        return Err(RouterError::InternalError(
            "Completion payload changed kind".to_string(),
        ));
    };

    let message = translate_completion(completion, &new_message_id(), &ctx.model)?;
    Ok(plugins.transform_message(ctx, &payload, message).await)
}

/// Drive a streaming upstream response, writing Claude SSE frames to `tx`.
///
/// Upstream failures are folded into the content as a final text block so the
/// client always sees a well-formed stream ending in `message_stop`. Returns
/// `ClientDisconnected` once the receiving side is gone.
pub async fn stream_events(
    ctx: &RequestContext,
    plugins: &PluginRegistry,
    mut chunks: ChunkStream,
    mut tx: Sender<Bytes>,
) -> Result<()> {
    let mut translator = StreamTranslator::new(new_message_id(), &ctx.model);
    info!(message_id = %translator.message_id(), model = %ctx.model, "Starting stream");

    write_event(ctx, plugins, None, &mut tx, &translator.message_start()).await?;

    // Latest chunk after `before_transform_response`, handed to response hooks
    let mut latest: Option<UpstreamPayload> = None;
    while let Some(item) = chunks.next().await {
        let events = match item {
            Ok(chunk) => {
                let payload = plugins
                    .transform_completion(ctx, UpstreamPayload::Chunk(chunk))
                    .await;
                let events = match &payload {
                    UpstreamPayload::Chunk(chunk) => translator.process_chunk(chunk),
                    UpstreamPayload::Completion(_) => Vec::new(),
                };
                latest = Some(payload);
                events
            }
            Err(e) => {
                warn!(error = %e, "Upstream stream failed");
                let events = translator.fail(&e);
                write_events(ctx, plugins, latest.as_ref(), &mut tx, &events).await?;
                break;
            }
        };
        write_events(ctx, plugins, latest.as_ref(), &mut tx, &events).await?;
    }

    let completion = latest.as_ref();
    if let Some(event) = translator.close_block() {
        write_event(ctx, plugins, completion, &mut tx, &event).await?;
    }

    let blocks = plugins
        .transform_content(ctx, completion, translator.blocks().to_vec())
        .await;
    let delta = translator.message_delta(blocks);
    write_event(ctx, plugins, completion, &mut tx, &delta).await?;
    write_event(ctx, plugins, completion, &mut tx, &MessageEvent::MessageStop).await?;

    info!(
        message_id = %translator.message_id(),
        stop_reason = ?translator.stop_reason(),
        blocks = translator.blocks().len(),
        "Stream complete"
    );
    Ok(())
}

async fn write_events(
    ctx: &RequestContext,
    plugins: &PluginRegistry,
    completion: Option<&UpstreamPayload>,
    tx: &mut Sender<Bytes>,
    events: &[MessageEvent],
) -> Result<()> {
    for event in events {
        write_event(ctx, plugins, completion, tx, event).await?;
    }
    Ok(())
}

async fn write_event(
    ctx: &RequestContext,
    plugins: &PluginRegistry,
    completion: Option<&UpstreamPayload>,
    tx: &mut Sender<Bytes>,
    event: &MessageEvent,
) -> Result<()> {
    let frame = plugins
        .transform_event(ctx, completion, format_event(event)?)
        .await;
    if frame.is_empty() {
        debug!(event = event.event_type(), "Frame suppressed by plugin");
        return Ok(());
    }

    tx.send(Bytes::from(frame))
        .await
        .map_err(|_| RouterError::ClientDisconnected)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::openai::ChatCompletionChunk;
    use futures::channel::mpsc;
    use futures::stream;
    use serde_json::json;

    #[tokio::test]
    async fn test_stream_frames_in_order() {
        let ctx = RequestContext::new(json!({"model": "m", "stream": true}));
        let plugins = PluginRegistry::new();
        let chunks: ChunkStream = stream::iter(vec![
            Ok(ChatCompletionChunk::text("Hi")),
            Ok(ChatCompletionChunk::finish("stop")),
        ])
        .boxed();
        let (tx, rx) = mpsc::channel(4);

        let (result, frames) = futures::join!(
            stream_events(&ctx, &plugins, chunks, tx),
            rx.collect::<Vec<Bytes>>()
        );
        result.unwrap();

        let names: Vec<_> = frames
            .iter()
            .map(|f| {
                let text = std::str::from_utf8(f).unwrap();
                text.lines().next().unwrap().trim_start_matches("event: ").to_string()
            })
            .collect();
        assert_eq!(
            names,
            vec![
                "message_start",
                "content_block_start",
                "content_block_delta",
                "content_block_stop",
                "message_delta",
                "message_stop",
            ]
        );
    }

    #[tokio::test]
    async fn test_dropped_receiver_reports_disconnect() {
        let ctx = RequestContext::new(json!({"model": "m", "stream": true}));
        let plugins = PluginRegistry::new();
        let chunks: ChunkStream = stream::iter(vec![Ok(ChatCompletionChunk::text("Hi"))]).boxed();
        let (tx, rx) = mpsc::channel(1);
        drop(rx);

        assert!(matches!(
            stream_events(&ctx, &plugins, chunks, tx).await,
            Err(RouterError::ClientDisconnected)
        ));
    }
}
