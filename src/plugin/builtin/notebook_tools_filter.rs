use async_trait::async_trait;
use serde_json::Value;

use crate::context::RequestContext;
use crate::plugin::{HookPoint, Plugin};

/// Drops client tools the upstream model cannot use
pub struct NotebookToolsFilter {
    blocked: Vec<String>,
}

impl NotebookToolsFilter {
    pub fn new(blocked: Vec<String>) -> Self {
        Self { blocked }
    }
}

impl Default for NotebookToolsFilter {
    fn default() -> Self {
        Self::new(
            ["NotebookRead", "NotebookEdit", "mcp__ide__executeCode"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        )
    }
}

#[async_trait]
impl Plugin for NotebookToolsFilter {
    fn implements(&self, hook: HookPoint) -> bool {
        hook == HookPoint::BeforeRouter
    }

    async fn before_router(&self, ctx: &mut RequestContext) -> anyhow::Result<()> {
        if let Some(tools) = ctx.body.get_mut("tools").and_then(Value::as_array_mut) {
            tools.retain(|tool| {
                let name = tool.get("name").and_then(Value::as_str).unwrap_or_default();
                !self.blocked.iter().any(|blocked| blocked == name)
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_filters_blocked_tools() {
        let mut ctx = RequestContext::new(json!({
            "model": "m",
            "tools": [
                {"name": "Read", "input_schema": {}},
                {"name": "NotebookEdit", "input_schema": {}},
                {"name": "mcp__ide__executeCode", "input_schema": {}}
            ]
        }));

        NotebookToolsFilter::default()
            .before_router(&mut ctx)
            .await
            .unwrap();

        assert_eq!(ctx.body["tools"], json!([{"name": "Read", "input_schema": {}}]));
    }

    #[tokio::test]
    async fn test_no_tools_is_untouched() {
        let mut ctx = RequestContext::new(json!({"model": "m"}));
        NotebookToolsFilter::default()
            .before_router(&mut ctx)
            .await
            .unwrap();
        assert!(ctx.body.get("tools").is_none());
    }
}
