use serde_json::Value;

use crate::error::{Result, RouterError};
use crate::models::claude::{
    ClaudeMessage, ClaudeRequest, ClaudeTool, MessageContent, RequestBlock, SystemPrompt,
};
use crate::models::openai::{
    FunctionCall, FunctionDefinition, OpenAIMessage, OpenAIRequest, OpenAITool, ToolCall,
};

/// Convert Claude system prompt to a leading system message
pub fn convert_system_prompt(system: Option<SystemPrompt>) -> Option<OpenAIMessage> {
    let text = match system? {
        SystemPrompt::Text(text) => text,
        SystemPrompt::Blocks(blocks) => blocks
            .into_iter()
            .map(|b| b.text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join("\n"),
    };
    (!text.is_empty()).then(|| OpenAIMessage::new("system", text))
}

/// Render a tool_result payload as the plain string chat-completion tools expect
fn tool_result_text(content: Option<Value>) -> String {
    match content {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(Value::Array(parts)) => parts
            .iter()
            .map(|part| match part.get("text").and_then(Value::as_str) {
                Some(text) => text.to_string(),
                None => part.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Some(other) => other.to_string(),
    }
}

/// Convert one Claude message into one or more chat messages
///
/// Assistant `tool_use` blocks become `tool_calls`; user `tool_result` blocks
/// become separate `tool` messages placed before any remaining user text.
pub fn convert_message(message: ClaudeMessage) -> Result<Vec<OpenAIMessage>> {
    let role = match message.role.as_str() {
        "user" | "assistant" => message.role.clone(),
        _ => {
            return Err(RouterError::InvalidRequest(format!(
                "Invalid role: {}",
                message.role
            )));
        }
    };

    let blocks = match message.content {
        MessageContent::Text(text) => return Ok(vec![OpenAIMessage::new(&role, text)]),
        MessageContent::Blocks(blocks) => blocks,
    };

    let mut texts = Vec::new();
    let mut tool_calls = Vec::new();
    let mut tool_results = Vec::new();
    for block in blocks {
        match block {
            RequestBlock::Text { text } => texts.push(text),
            RequestBlock::ToolUse { id, name, input } => tool_calls.push(ToolCall {
                id: Some(id),
                call_type: Some("function".to_string()),
                function: FunctionCall {
                    name: Some(name),
                    arguments: Some(input.to_string()),
                },
            }),
            RequestBlock::ToolResult {
                tool_use_id,
                content,
                is_error,
            } => {
                let mut text = tool_result_text(content);
                if is_error.unwrap_or(false) {
                    text = format!("Error: {}", text);
                }
                tool_results.push(OpenAIMessage {
                    role: "tool".to_string(),
                    content: Some(text),
                    tool_calls: None,
                    tool_call_id: Some(tool_use_id),
                });
            }
            RequestBlock::Unsupported => {
                tracing::debug!(role = %role, "Skipping unsupported content block");
            }
        }
    }

    let mut messages = tool_results;
    let text = (!texts.is_empty()).then(|| texts.join("\n"));
    if !tool_calls.is_empty() && role == "assistant" {
        messages.push(OpenAIMessage {
            role,
            content: text,
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        });
    } else if let Some(text) = text {
        messages.push(OpenAIMessage::new(&role, text));
    }

    Ok(messages)
}

/// Convert Claude tools to function definitions
pub fn convert_tools(tools: Vec<ClaudeTool>) -> Vec<OpenAITool> {
    tools
        .into_iter()
        .map(|tool| OpenAITool {
            tool_type: "function".to_string(),
            function: FunctionDefinition {
                name: tool.name,
                description: tool.description,
                parameters: tool.input_schema,
            },
        })
        .collect()
}

/// Transform Claude request to a chat-completion request for `model`
pub fn transform_request(claude_req: ClaudeRequest, model: &str) -> Result<OpenAIRequest> {
    tracing::info!(
        "Processing {} messages from Claude",
        claude_req.messages.len()
    );

    let mut messages: Vec<OpenAIMessage> = convert_system_prompt(claude_req.system)
        .into_iter()
        .collect();
    for message in claude_req.messages {
        messages.extend(convert_message(message)?);
    }

    let tools = claude_req
        .tools
        .filter(|tools| !tools.is_empty())
        .map(convert_tools);

    Ok(OpenAIRequest {
        model: model.to_string(),
        messages,
        tools,
        max_tokens: claude_req.max_tokens,
        temperature: claude_req.temperature,
        top_p: claude_req.top_p,
        stop: claude_req.stop_sequences,
        stream: claude_req.stream,
    })
}

/// Transform a dynamic request body (as rewritten by request hooks)
pub fn transform_body(body: &Value, model: &str) -> Result<Value> {
    let claude_req: ClaudeRequest = serde_json::from_value(body.clone())
        .map_err(|e| RouterError::InvalidRequest(format!("Invalid Claude request: {}", e)))?;
    let request = transform_request(claude_req, model)?;
    Ok(serde_json::to_value(request)?)
}
