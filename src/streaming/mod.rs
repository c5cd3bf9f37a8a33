pub mod content;
pub mod json_balance;
pub mod parser;
pub mod response;
pub mod sse;
pub mod translator;

pub use content::{ContentBlockAccumulator, OpenBlock};
pub use json_balance::is_balanced;
pub use parser::{SseChunkParser, chunk_stream};
pub use response::{send_message, stream_events};
pub use sse::format_event;
pub use translator::{StreamTranslator, map_finish_reason, new_message_id, translate_completion};
