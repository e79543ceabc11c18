//! Events delivered to the UI bridge.

use serde::Serialize;

use crate::message::body::{Blink, ChannelRef, Level, Text};
use crate::message::code::{MessageCode, TRANSFER_NOTICE};

/// Something the front end needs to know about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Message {
    Channel {
        mc: u16,
        on: bool,
        #[serde(flatten)]
        channel: ChannelRef,
    },
    Level {
        mc: u16,
        #[serde(flatten)]
        level: Level,
    },
    Text {
        mc: u16,
        #[serde(flatten)]
        text: Text,
        /// The content was reassembled from more than one frame.
        continued: bool,
    },
    Blink(Blink),
    Transfer(TransferNotice),
}

impl Message {
    /// Message code the event is reported under.
    pub fn code(&self) -> u16 {
        match self {
            Self::Channel { mc, .. } | Self::Level { mc, .. } | Self::Text { mc, .. } => *mc,
            Self::Blink(_) => MessageCode::Blink.value(),
            Self::Transfer(_) => TRANSFER_NOTICE,
        }
    }
}

/// File-transfer progress for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum TransferNotice {
    /// A directory listing was requested; `files` entries follow.
    Syncing { files: usize },
    /// A file is being received.
    Receiving {
        file: String,
        /// 1-based position of this file in the session.
        index: usize,
        /// Files expected in the session, when known.
        total: usize,
        percent: u8,
    },
    /// Files are being deleted.
    Deleting { percent: u8 },
    /// The controller ended the transfer session.
    Finished,
}
