use async_trait::async_trait;
use serde_json::{Value, json};

use crate::context::RequestContext;
use crate::plugin::{HookPoint, Plugin};

const TOOL_USE_INSTRUCTION: &str = "## **Important Instruction:**  \n\
You must use tools as frequently and accurately as possible to help the user solve their problem.\n\
Prioritize tool usage whenever it can enhance accuracy, efficiency, or the quality of the response.  ";

/// Nudges the upstream model towards calling the tools it was given
pub struct ToolcallImprovement;

#[async_trait]
impl Plugin for ToolcallImprovement {
    fn implements(&self, hook: HookPoint) -> bool {
        hook == HookPoint::AfterTransformRequest
    }

    async fn after_transform_request(&self, ctx: &mut RequestContext) -> anyhow::Result<()> {
        let has_tools = ctx
            .body
            .get("tools")
            .and_then(Value::as_array)
            .is_some_and(|tools| !tools.is_empty());
        if !has_tools {
            return Ok(());
        }

        let messages = ctx
            .body
            .get_mut("messages")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| anyhow::anyhow!("request has tools but no messages array"))?;
        messages.push(json!({
            "role": "system",
            "content": TOOL_USE_INSTRUCTION,
        }));
        Ok(())
    }
}
