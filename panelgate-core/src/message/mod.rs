//! Message model: codes, typed bodies, and the commands built from them.

pub mod body;
pub mod code;
pub(crate) mod cursor;
pub mod ui;

use bytes::BytesMut;

use crate::error::GateError;
use crate::frame::Frame;
use crate::header::Header;

pub use body::{
    Address, Blink, Body, ChannelRef, FileTransfer, LEVEL_TYPES, Level, LevelValue, Pong, Text,
    TextEncoding,
};
pub use code::{MessageCode, TRANSFER_NOTICE};
pub use ui::{Message, TransferNotice};

/// A typed header and body pair.
///
/// Inbound frames are lifted into commands before dispatch; outbound
/// replies are built as commands and lowered to frames by the writer.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub header: Header,
    pub body: Body,
}

impl Command {
    pub fn new(header: Header, body: Body) -> Self {
        Self { header, body }
    }

    /// The message code carried by the header.
    pub fn code(&self) -> Result<MessageCode, GateError> {
        MessageCode::try_from(self.header.mc)
    }

    /// Lift a decoded frame.
    ///
    /// Returns `Ok(None)` for message codes the engine does not know;
    /// those frames are skipped.
    pub fn from_frame(frame: &Frame) -> Result<Option<Self>, GateError> {
        let Ok(code) = MessageCode::try_from(frame.mc()) else {
            return Ok(None);
        };
        let body = Body::decode(code, frame.body())?;
        Ok(Some(Self::new(*frame.header(), body)))
    }

    /// Lower to a frame, filling in length and checksum.
    pub fn to_frame(&self) -> Result<Frame, GateError> {
        let code = self.code()?;
        let mut buf = BytesMut::new();
        self.body.encode(code, &mut buf)?;
        Frame::new(self.header, buf.freeze())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::Origin;

    const ORIGIN: Origin = Origin {
        system: 1,
        device: 10001,
    };

    #[test]
    fn command_frame_roundtrip() {
        let cmd = Command::new(
            ORIGIN.header(MessageCode::Release.value(), 2),
            Body::Channel(ChannelRef {
                address: Address::new(10001, 2, 1),
                channel: 12,
            }),
        );
        let frame = cmd.to_frame().unwrap();
        assert_eq!(frame.header().length, 0x13 + 8);
        let back = Command::from_frame(&frame).unwrap().unwrap();
        assert_eq!(back, Command::new(*frame.header(), cmd.body));
    }

    #[test]
    fn unknown_code_is_skipped() {
        let frame = Frame::new(ORIGIN.header(0x0777, 1), bytes::Bytes::new()).unwrap();
        assert!(Command::from_frame(&frame).unwrap().is_none());
    }

    #[test]
    fn unsupported_code_yields_no_frame() {
        let cmd = Command::new(ORIGIN.header(0x0777, 1), Body::Empty);
        assert!(matches!(
            cmd.to_frame(),
            Err(GateError::UnsupportedMessage(0x0777))
        ));
    }
}
