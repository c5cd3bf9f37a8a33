use tracing::{debug, warn};

use super::content::{ContentBlockAccumulator, OpenBlock};
use crate::error::{Result, RouterError};
use crate::models::claude::{
    BlockDelta, ContentBlock, MessageDeltaData, MessageEvent, MessageResponse, StopReason, Usage,
};
use crate::models::openai::{
    ChatCompletion, ChatCompletionChunk, CompletionUsage, FINISH_TOOL_CALLS, ToolCallDelta,
};

/// Fresh client-facing message id
pub fn new_message_id() -> String {
    format!("msg_{}", uuid::Uuid::new_v4().simple())
}

/// Map an upstream finish reason to a client stop reason
pub fn map_finish_reason(finish_reason: Option<&str>) -> StopReason {
    match finish_reason {
        Some(FINISH_TOOL_CALLS) => StopReason::ToolUse,
        _ => StopReason::EndTurn,
    }
}

fn to_usage(usage: CompletionUsage) -> Usage {
    Usage {
        input_tokens: usage.prompt_tokens,
        output_tokens: usage.completion_tokens,
    }
}

/// Converts upstream completion chunks into Claude message events
///
/// Owns all per-session state: the content blocks announced so far, the open
/// block cursor, and the tool argument buffers. Every block that is started is
/// stopped exactly once, and block indices advance by one per transition.
pub struct StreamTranslator {
    message_id: String,
    model: String,
    content: ContentBlockAccumulator,
    finish_reason: Option<String>,
    usage: Usage,
}

impl StreamTranslator {
    pub fn new(message_id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            model: model.into(),
            content: ContentBlockAccumulator::new(),
            finish_reason: None,
            usage: Usage::default(),
        }
    }

    /// The `message_start` event opening the stream
    pub fn message_start(&self) -> MessageEvent {
        MessageEvent::MessageStart {
            message: MessageResponse::new(&self.message_id, &self.model),
        }
    }

    /// Apply one upstream chunk, returning the events it produces in order
    pub fn process_chunk(&mut self, chunk: &ChatCompletionChunk) -> Vec<MessageEvent> {
        let mut events = Vec::new();

        if let Some(usage) = chunk.usage {
            self.usage = to_usage(usage);
        }
        if self.is_finished() {
            // Only trailing usage matters once the upstream declared the end
            return events;
        }
        let Some(choice) = chunk.choices.first() else {
            return events;
        };
        // Some providers send `""` on every chunk; only a non-empty reason ends the turn
        let finish_reason = choice.finish_reason.as_deref().filter(|r| !r.is_empty());
        if let Some(reason) = finish_reason {
            debug!(finish_reason = %reason, "Upstream finished");
            self.finish_reason = Some(reason.to_string());
        }

        let delta = &choice.delta;
        match delta.tool_calls.as_deref() {
            Some(calls) if !calls.is_empty() => {
                for (offset, call) in calls.iter().enumerate() {
                    let position = call.index.unwrap_or(offset as u32);
                    self.apply_tool_call(position, call, &mut events);
                }
            }
            _ => {
                let text = delta.content.as_deref().filter(|t| !t.is_empty());
                let ends_tool_calls = finish_reason == Some(FINISH_TOOL_CALLS);
                let tool_open = matches!(self.content.open_block(), OpenBlock::Tool(_));

                if tool_open && (text.is_some() || ends_tool_calls) {
                    self.close_block_into(&mut events);
                }
                if let Some(text) = text {
                    self.push_text(text, &mut events);
                }
            }
        }

        events
    }

    /// Fold an upstream failure into the content as a final text delta
    pub fn fail(&mut self, error: &RouterError) -> Vec<MessageEvent> {
        let mut events = Vec::new();
        if matches!(self.content.open_block(), OpenBlock::Tool(_)) {
            self.close_block_into(&mut events);
        }

        let text = serde_json::json!({ "error": error.to_string() }).to_string();
        self.push_text(&text, &mut events);
        events
    }

    /// Close whatever block is open (final `content_block_stop`)
    pub fn close_block(&mut self) -> Option<MessageEvent> {
        self.content
            .close()
            .map(|index| MessageEvent::ContentBlockStop { index })
    }

    /// The terminal `message_delta` carrying the given block list
    pub fn message_delta(&self, content: Vec<ContentBlock>) -> MessageEvent {
        MessageEvent::MessageDelta {
            delta: MessageDeltaData {
                stop_reason: self.stop_reason(),
                stop_sequence: None,
                content,
            },
            usage: self.usage,
        }
    }

    /// `tool_use` if the upstream asked for tool calls or any tool block was opened
    pub fn stop_reason(&self) -> StopReason {
        if self.content.has_tool_use() {
            StopReason::ToolUse
        } else {
            map_finish_reason(self.finish_reason.as_deref())
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finish_reason.is_some()
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        self.content.blocks()
    }

    /// Current client-visible block index
    pub fn block_index(&self) -> usize {
        self.content.index()
    }

    /// Raw argument text accumulated for a tool-call position
    pub fn tool_arguments(&self, position: u32) -> Option<&str> {
        self.content.tool_arguments(position)
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    fn apply_tool_call(
        &mut self,
        position: u32,
        call: &ToolCallDelta,
        events: &mut Vec<MessageEvent>,
    ) {
        let function = call.function.as_ref();

        if !self.content.has_position(position) {
            self.close_block_into(events);

            let id = call
                .id
                .clone()
                .unwrap_or_else(|| format!("tool_{}", position));
            let name = function.and_then(|f| f.name.clone()).unwrap_or_default();
            debug!(position, tool_id = %id, tool_name = %name, "Opening tool block");

            if let Some((index, content_block)) = self.content.open_tool(position, id, name) {
                events.push(MessageEvent::ContentBlockStart {
                    index,
                    content_block,
                });
            }
        } else if self.content.open_block() != OpenBlock::Tool(position) {
            warn!(
                position,
                "Ignoring delta for a tool call position that was already closed"
            );
            return;
        }

        let Some(fragment) = function
            .and_then(|f| f.arguments.as_deref())
            .filter(|a| !a.is_empty())
        else {
            return;
        };

        if let Some(index) = self.content.append_tool_argument(position, fragment) {
            events.push(MessageEvent::ContentBlockDelta {
                index,
                delta: BlockDelta::InputJsonDelta {
                    partial_json: fragment.to_string(),
                },
            });
        }
    }

    fn push_text(&mut self, text: &str, events: &mut Vec<MessageEvent>) {
        if let Some((index, content_block)) = self.content.open_text() {
            events.push(MessageEvent::ContentBlockStart {
                index,
                content_block,
            });
        }

        if let Some(index) = self.content.append_text(text) {
            events.push(MessageEvent::ContentBlockDelta {
                index,
                delta: BlockDelta::TextDelta {
                    text: text.to_string(),
                },
            });
        }
    }

    fn close_block_into(&mut self, events: &mut Vec<MessageEvent>) {
        if let Some(event) = self.close_block() {
            events.push(event);
        }
    }
}

/// Build the single-shot message for a non-streaming completion.
///
/// Content text wins over tool calls; tool arguments must be valid JSON.
pub fn translate_completion(
    completion: &ChatCompletion,
    message_id: &str,
    model: &str,
) -> Result<MessageResponse> {
    let mut message = MessageResponse::new(message_id, model);
    message.usage = completion.usage.map(to_usage).unwrap_or_default();

    let Some(choice) = completion.choices.first() else {
        warn!("Upstream completion has no choices");
        message.stop_reason = Some(StopReason::EndTurn);
        return Ok(message);
    };

    let content = choice.message.content.as_deref().filter(|c| !c.is_empty());
    if let Some(text) = content {
        message.content.push(ContentBlock::Text {
            text: text.to_string(),
        });
    } else if let Some(calls) = &choice.message.tool_calls {
        for (position, call) in calls.iter().enumerate() {
            let input = match call.function.arguments.as_deref() {
                Some(arguments) if !arguments.trim().is_empty() => {
                    serde_json::from_str(arguments).map_err(|e| {
                        RouterError::TransformationError(format!(
                            "Invalid arguments for tool call {}: {} - JSON was: {}",
                            position, e, arguments
                        ))
                    })?
                }
                _ => serde_json::json!({}),
            };

            message.content.push(ContentBlock::ToolUse {
                id: call
                    .id
                    .clone()
                    .unwrap_or_else(|| format!("tool_{}", position)),
                name: call.function.name.clone().unwrap_or_default(),
                input,
            });
        }
    }

    message.stop_reason = Some(map_finish_reason(choice.finish_reason.as_deref()));
    Ok(message)
}
