use crate::error::Result;
use crate::models::claude::MessageEvent;

/// Frame an event as `event: <type>\ndata: <json>\n\n`
pub fn format_event(event: &MessageEvent) -> Result<String> {
    let data = serde_json::to_string(event)?;
    Ok(format!("event: {}\ndata: {}\n\n", event.event_type(), data))
}
