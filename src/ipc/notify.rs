use std::io::Write;

use serde_json::json;

use crate::store::Broadcast;

/// Writes notification lines to stdout alongside the regular responses.
/// Notification lines carry an `event` key and no `id`, so clients can tell
/// them apart from replies.
pub struct StdoutBroadcaster;

impl Broadcast for StdoutBroadcaster {
    fn publish(&self, room: &str, event: &str, payload: &serde_json::Value) -> anyhow::Result<()> {
        let line = json!({
            "event": event,
            "room": room,
            "payload": payload,
        });
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", line)?;
        stdout.flush()?;
        Ok(())
    }
}
