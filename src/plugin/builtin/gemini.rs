use async_trait::async_trait;
use serde_json::Value;

use crate::context::RequestContext;
use crate::plugin::{HookPoint, Plugin};

/// String `format` values Gemini accepts in function schemas
const SUPPORTED_STRING_FORMATS: [&str; 2] = ["enum", "date-time"];

/// Rewrites an upstream chat-completion request into a shape Gemini accepts
///
/// - strips unsupported `format` annotations from string properties
/// - gives `BatchTool`'s free-form `input` a concrete type, since Gemini rejects
///   objects with empty properties
/// - replaces `null` assistant content with the JSON of its tool calls
pub struct GeminiCompat;

impl GeminiCompat {
    fn rewrite_tool(tool: &mut Value) {
        let Some(function) = tool.get_mut("function") else {
            return;
        };

        if function.get("name").and_then(Value::as_str) == Some("BatchTool") {
            if let Some(input_type) = function
                .pointer_mut("/parameters/properties/invocations/items/properties/input/type")
            {
                *input_type = Value::String("number".to_string());
            }
            return;
        }

        let Some(properties) = function
            .pointer_mut("/parameters/properties")
            .and_then(Value::as_object_mut)
        else {
            return;
        };
        for property in properties.values_mut() {
            let Some(property) = property.as_object_mut() else {
                continue;
            };
            let is_string = property.get("type").and_then(Value::as_str) == Some("string");
            let supported = property
                .get("format")
                .and_then(Value::as_str)
                .is_some_and(|format| SUPPORTED_STRING_FORMATS.contains(&format));
            if is_string && !supported {
                property.remove("format");
            }
        }
    }

    fn fill_null_content(message: &mut Value) {
        if !message.get("content").is_some_and(Value::is_null) {
            return;
        }
        if let Some(tool_calls) = message.get("tool_calls").filter(|calls| !calls.is_null()) {
            let encoded = tool_calls.to_string();
            message["content"] = Value::String(encoded);
        }
    }
}

#[async_trait]
impl Plugin for GeminiCompat {
    fn implements(&self, hook: HookPoint) -> bool {
        hook == HookPoint::AfterTransformRequest
    }

    async fn after_transform_request(&self, ctx: &mut RequestContext) -> anyhow::Result<()> {
        if let Some(tools) = ctx.body.get_mut("tools").and_then(Value::as_array_mut) {
            tools.iter_mut().for_each(Self::rewrite_tool);
        }
        if let Some(messages) = ctx.body.get_mut("messages").and_then(Value::as_array_mut) {
            messages.iter_mut().for_each(Self::fill_null_content);
        }
        Ok(())
    }
}
