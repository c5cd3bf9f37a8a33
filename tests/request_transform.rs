use claude_code_router::error::RouterError;
use claude_code_router::models::claude::ClaudeRequest;
use claude_code_router::transform::*;
use serde_json::{Value, json};
use std::fs;

fn fixture() -> Value {
    let json = fs::read_to_string("tests/fixtures/claude_request_tools.json").unwrap();
    serde_json::from_str(&json).unwrap()
}

#[test]
fn test_transform_request_with_tools() {
    let claude_req: ClaudeRequest = serde_json::from_value(fixture()).unwrap();
    let req = transform_request(claude_req, "google/gemini-2.5-pro").unwrap();

    assert_eq!(req.model, "google/gemini-2.5-pro");
    assert!(req.stream);
    assert_eq!(req.max_tokens, Some(1024));
    assert_eq!(req.stop, Some(vec!["</answer>".to_string()]));

    let roles: Vec<_> = req.messages.iter().map(|m| m.role.as_str()).collect();
    assert_eq!(roles, vec!["system", "user", "assistant", "tool", "user"]);
    assert_eq!(
        req.messages[0].content.as_deref(),
        Some("You are Claude Code.\nAnswer briefly.")
    );

    // Assistant tool_use becomes a function tool call with JSON-string arguments
    let assistant = &req.messages[2];
    assert_eq!(assistant.content.as_deref(), Some("Let me look."));
    let call = &assistant.tool_calls.as_ref().unwrap()[0];
    assert_eq!(call.id.as_deref(), Some("toolu_01"));
    assert_eq!(call.function.name.as_deref(), Some("Read"));
    let arguments: Value =
        serde_json::from_str(call.function.arguments.as_deref().unwrap()).unwrap();
    assert_eq!(arguments, json!({"file_path": "src/main.rs"}));

    // Tool results precede the remaining user text
    assert_eq!(req.messages[3].tool_call_id.as_deref(), Some("toolu_01"));
    assert_eq!(req.messages[3].content.as_deref(), Some("fn main() {}"));
    assert_eq!(req.messages[4].content.as_deref(), Some("Summarize it."));

    let tools = req.tools.unwrap();
    assert_eq!(tools[0].tool_type, "function");
    assert_eq!(tools[0].function.name, "Read");
    assert_eq!(tools[0].function.parameters["required"], json!(["file_path"]));
}

#[test]
fn test_transform_body_serializes_for_upstream() {
    let body = transform_body(&fixture(), "deepseek-chat").unwrap();

    assert_eq!(body["model"], "deepseek-chat");
    assert_eq!(body["stream"], true);
    assert_eq!(body["tools"][0]["type"], "function");
    assert!(body.get("system").is_none());
    assert!(body.get("stop_sequences").is_none());
}

#[test]
fn test_tool_only_assistant_turn_has_null_content() {
    let body = transform_body(
        &json!({
            "model": "m",
            "messages": [{
                "role": "assistant",
                "content": [{"type": "tool_use", "id": "t1", "name": "LS", "input": {}}]
            }]
        }),
        "m",
    )
    .unwrap();

    let message = &body["messages"][0];
    assert!(message["content"].is_null());
    assert_eq!(message["tool_calls"][0]["function"]["arguments"], "{}");
}

#[test]
fn test_error_tool_result_is_prefixed() {
    let body = transform_body(
        &json!({
            "model": "m",
            "messages": [{
                "role": "user",
                "content": [{"type": "tool_result", "tool_use_id": "t1", "content": "not found", "is_error": true}]
            }]
        }),
        "m",
    )
    .unwrap();

    assert_eq!(body["messages"][0]["role"], "tool");
    assert_eq!(body["messages"][0]["content"], "Error: not found");
}

#[test]
fn test_invalid_body_rejected() {
    assert!(matches!(
        transform_body(&json!({"model": "m"}), "m"),
        Err(RouterError::InvalidRequest(_))
    ));
}
