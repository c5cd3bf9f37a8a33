use std::collections::BTreeMap;

use serde_json::Value;
use tracing::debug;

use super::json_balance::is_balanced;
use crate::models::claude::ContentBlock;

/// Which kind of block is currently receiving deltas
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenBlock {
    None,
    Text,
    /// Tool block for the given upstream tool-call position
    Tool(u32),
}

/// Raw argument text accumulated for one upstream tool-call position
#[derive(Debug, Clone)]
struct ToolArguments {
    /// Position of the owning block in `blocks`
    block: usize,
    json: String,
}

/// Content blocks built incrementally during one streaming session
///
/// At most one block is open at a time. `index` is the client-visible index of
/// the open block (or of the next one to open) and moves forward by one each
/// time a block closes, so it always equals the block's position in `blocks`.
#[derive(Debug)]
pub struct ContentBlockAccumulator {
    blocks: Vec<ContentBlock>,
    open: OpenBlock,
    index: usize,
    tool_arguments: BTreeMap<u32, ToolArguments>,
}

impl ContentBlockAccumulator {
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            open: OpenBlock::None,
            index: 0,
            tool_arguments: BTreeMap::new(),
        }
    }

    /// Open an empty text block. Returns its index and initial state, or `None`
    /// if a block is already open.
    pub fn open_text(&mut self) -> Option<(usize, ContentBlock)> {
        if self.open != OpenBlock::None {
            return None;
        }

        let block = ContentBlock::empty_text();
        self.blocks.push(block.clone());
        self.open = OpenBlock::Text;
        Some((self.index, block))
    }

    /// Open a tool block for a position not seen before in this session.
    pub fn open_tool(
        &mut self,
        position: u32,
        id: String,
        name: String,
    ) -> Option<(usize, ContentBlock)> {
        if self.open != OpenBlock::None || self.has_position(position) {
            return None;
        }

        let block = ContentBlock::tool_use(id, name);
        self.blocks.push(block.clone());
        self.tool_arguments.insert(
            position,
            ToolArguments {
                block: self.blocks.len() - 1,
                json: String::new(),
            },
        );
        self.open = OpenBlock::Tool(position);
        Some((self.index, block))
    }

    /// Append to the open text block, returning its index
    pub fn append_text(&mut self, delta: &str) -> Option<usize> {
        if self.open != OpenBlock::Text {
            return None;
        }

        if let Some(ContentBlock::Text { text }) = self.blocks.last_mut() {
            text.push_str(delta);
        }
        Some(self.index)
    }

    /// Append an argument fragment for the open tool position, returning its index.
    ///
    /// Once the buffer is balanced and parses, the block's `input` is replaced
    /// with the parsed value. A failed parse keeps the previous input.
    pub fn append_tool_argument(&mut self, position: u32, delta: &str) -> Option<usize> {
        if self.open != OpenBlock::Tool(position) {
            return None;
        }
        let arguments = self.tool_arguments.get_mut(&position)?;
        arguments.json.push_str(delta);

        if is_balanced(&arguments.json) {
            match serde_json::from_str::<Value>(&arguments.json) {
                Ok(parsed) => {
                    if let Some(ContentBlock::ToolUse { input, .. }) =
                        self.blocks.get_mut(arguments.block)
                    {
                        *input = parsed;
                    }
                }
                Err(e) => {
                    debug!(position, error = %e, "Tool arguments not parseable yet, continuing to accumulate");
                }
            }
        }

        Some(self.index)
    }

    /// Close the open block, returning the index it had. No-op when nothing is open.
    pub fn close(&mut self) -> Option<usize> {
        if self.open == OpenBlock::None {
            return None;
        }

        let closed = self.index;
        self.open = OpenBlock::None;
        self.index += 1;
        Some(closed)
    }

    pub fn open_block(&self) -> OpenBlock {
        self.open
    }

    /// Whether this tool-call position has been opened before in this session
    pub fn has_position(&self, position: u32) -> bool {
        self.tool_arguments.contains_key(&position)
    }

    /// Raw argument text received so far for a position
    pub fn tool_arguments(&self, position: u32) -> Option<&str> {
        self.tool_arguments
            .get(&position)
            .map(|arguments| arguments.json.as_str())
    }

    pub fn has_tool_use(&self) -> bool {
        !self.tool_arguments.is_empty()
    }

    /// Index of the open block, or of the next block to open
    pub fn index(&self) -> usize {
        self.index
    }

    pub fn blocks(&self) -> &[ContentBlock] {
        &self.blocks
    }
}

impl Default for ContentBlockAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_single_text_block() {
        let mut content = ContentBlockAccumulator::new();
        let (idx, block) = content.open_text().unwrap();
        assert_eq!(idx, 0);
        assert_eq!(block, ContentBlock::empty_text());

        assert_eq!(content.append_text("Hello"), Some(0));
        assert_eq!(content.append_text(" World"), Some(0));
        assert!(content.open_text().is_none());

        assert_eq!(
            content.blocks(),
            &[ContentBlock::Text {
                text: "Hello World".to_string()
            }]
        );
        assert!(!content.has_tool_use());
    }

    #[test]
    fn test_tool_arguments_parsed_when_complete() {
        let mut content = ContentBlockAccumulator::new();
        content.open_tool(0, "call_1".to_string(), "Read".to_string());

        content.append_tool_argument(0, "{\"path\":");
        assert_eq!(content.blocks()[0], ContentBlock::tool_use("call_1", "Read"));

        content.append_tool_argument(0, " \"/tmp\"}");
        assert_eq!(
            content.blocks()[0],
            ContentBlock::ToolUse {
                id: "call_1".to_string(),
                name: "Read".to_string(),
                input: json!({"path": "/tmp"}),
            }
        );
        assert_eq!(content.tool_arguments(0), Some("{\"path\": \"/tmp\"}"));
    }

    #[test]
    fn test_balanced_but_invalid_keeps_previous_input() {
        let mut content = ContentBlockAccumulator::new();
        content.open_tool(3, "call_x".to_string(), "Bash".to_string());

        content.append_tool_argument(3, "{\"cmd\": ls}");
        assert_eq!(content.blocks()[0], ContentBlock::tool_use("call_x", "Bash"));
    }

    #[test]
    fn test_close_advances_index_once() {
        let mut content = ContentBlockAccumulator::new();
        assert_eq!(content.close(), None);

        content.open_text();
        assert_eq!(content.close(), Some(0));
        assert_eq!(content.close(), None);
        assert_eq!(content.index(), 1);

        let (idx, _) = content
            .open_tool(0, "call_1".to_string(), "Tool1".to_string())
            .unwrap();
        assert_eq!(idx, 1);
        assert_eq!(content.open_block(), OpenBlock::Tool(0));
        assert_eq!(content.close(), Some(1));
    }

    #[test]
    fn test_appends_require_matching_open_block() {
        let mut content = ContentBlockAccumulator::new();
        assert_eq!(content.append_text("lost"), None);

        content.open_tool(0, "call_1".to_string(), "Tool1".to_string());
        assert_eq!(content.append_text("lost"), None);
        assert_eq!(content.append_tool_argument(1, "{}"), None);
        assert!(content.open_text().is_none());

        content.close();
        assert_eq!(content.append_tool_argument(0, "{}"), None);
        assert!(
            content
                .open_tool(0, "call_again".to_string(), "Tool1".to_string())
                .is_none()
        );
    }
}
