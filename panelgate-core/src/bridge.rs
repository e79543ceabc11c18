//! Delivery of engine events to the front end.

use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use crate::message::Message;

/// Fire-and-forget sink for UI events.
///
/// Called from inside the engine's session loop, so implementations must
/// not block.
pub trait UiBridge: Send + Sync {
    fn deliver(&self, message: Message);
}

impl UiBridge for mpsc::UnboundedSender<Message> {
    fn deliver(&self, message: Message) {
        if self.send(message).is_err() {
            debug!("UI receiver dropped; event discarded");
        }
    }
}

impl<T: UiBridge + ?Sized> UiBridge for Arc<T> {
    fn deliver(&self, message: Message) {
        (**self).deliver(message)
    }
}

/// Collects events in memory. Useful for tests and tooling.
#[derive(Debug, Default)]
pub struct RecordingBridge {
    events: Mutex<Vec<Message>>,
}

impl RecordingBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove and return everything delivered so far.
    pub fn take(&self) -> Vec<Message> {
        match self.events.lock() {
            Ok(mut events) => std::mem::take(&mut *events),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl UiBridge for RecordingBridge {
    fn deliver(&self, message: Message) {
        match self.events.lock() {
            Ok(mut events) => events.push(message),
            Err(poisoned) => poisoned.into_inner().push(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::TransferNotice;

    #[test]
    fn channel_bridge_forwards() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        tx.deliver(Message::Transfer(TransferNotice::Finished));
        assert_eq!(
            rx.try_recv().unwrap(),
            Message::Transfer(TransferNotice::Finished)
        );
    }

    #[test]
    fn closed_channel_is_silent() {
        let (tx, rx) = mpsc::unbounded_channel::<Message>();
        drop(rx);
        tx.deliver(Message::Transfer(TransferNotice::Finished));
    }

    #[test]
    fn recording_bridge_drains() {
        let bridge = RecordingBridge::new();
        bridge.deliver(Message::Transfer(TransferNotice::Finished));
        assert_eq!(bridge.take().len(), 1);
        assert!(bridge.take().is_empty());
    }
}
