//! UI bridge that emits every event as one JSON line through `tracing`.

use panelgate_core::{Message, UiBridge};
use tracing::{info, warn};

/// Serializes events with `serde_json` and logs them under the
/// `panelgate::ui` target, one line per event.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonLineBridge;

impl JsonLineBridge {
    pub fn new() -> Self {
        Self
    }

    /// The line emitted for `message`.
    pub fn render(message: &Message) -> Result<String, serde_json::Error> {
        serde_json::to_string(message)
    }
}

impl UiBridge for JsonLineBridge {
    fn deliver(&self, message: Message) {
        match Self::render(&message) {
            Ok(line) => info!(target: "panelgate::ui", mc = message.code(), "{line}"),
            Err(e) => warn!(mc = message.code(), "cannot serialize UI event: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use panelgate_core::TransferNotice;
    use panelgate_core::message::{Address, Text};

    #[test]
    fn renders_tagged_json() {
        let line = JsonLineBridge::render(&Message::Text {
            mc: 0x000c,
            text: Text::new(Address::new(10001, 1, 1), "PAGE-Main"),
            continued: false,
        })
        .unwrap();
        let value: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(value["kind"], "text");
        assert_eq!(value["content"], "PAGE-Main");
        assert_eq!(value["encoding"], "narrow");
        assert_eq!(value["device"], 10001);
    }

    #[test]
    fn renders_transfer_progress() {
        let line = JsonLineBridge::render(&Message::Transfer(TransferNotice::Finished)).unwrap();
        assert_eq!(line, r#"{"kind":"transfer","stage":"finished"}"#);
    }

    #[test]
    fn deliver_does_not_panic_without_subscriber() {
        JsonLineBridge::new().deliver(Message::Transfer(TransferNotice::Syncing { files: 3 }));
    }
}
