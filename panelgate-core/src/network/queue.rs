//! FIFO of outbound commands.
//!
//! Any number of producers push; the session's writer is the only
//! consumer, so send order is push order.

use tokio::sync::mpsc;

use crate::error::GateError;
use crate::message::Command;

/// Producer side. Cheap to clone.
#[derive(Debug, Clone)]
pub struct OutboundQueue {
    tx: mpsc::UnboundedSender<Command>,
}

/// Consumer side, owned by the writer.
#[derive(Debug)]
pub struct OutboundReceiver {
    rx: mpsc::UnboundedReceiver<Command>,
}

/// Create a connected producer/consumer pair.
pub fn outbound_queue() -> (OutboundQueue, OutboundReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (OutboundQueue { tx }, OutboundReceiver { rx })
}

impl OutboundQueue {
    pub fn push(&self, command: Command) -> Result<(), GateError> {
        self.tx.send(command)?;
        Ok(())
    }
}

impl OutboundReceiver {
    /// Wait for the next command. `None` once every producer is gone.
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }

    /// Next command if one is already queued.
    pub fn try_recv(&mut self) -> Option<Command> {
        self.rx.try_recv().ok()
    }

    /// Drop everything queued. Returns how many commands were discarded.
    pub fn discard_pending(&mut self) -> usize {
        let mut n = 0;
        while self.rx.try_recv().is_ok() {
            n += 1;
        }
        n
    }
}
