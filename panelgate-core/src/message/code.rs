//! Message codes (MC).
//!
//! Uses a `#[repr(u16)]` enum with `TryFrom`, so unknown codes surface as
//! [`GateError::UnsupportedMessage`] instead of panicking.

use crate::error::GateError;
use std::fmt;

/// Internal code of transfer notifications sent to the UI. Never on the wire.
pub const TRANSFER_NOTICE: u16 = 0x1000;

/// Every message code the engine can decode or encode.
///
/// Organized by range:
/// - `0x0001..0x001f`: controller to panel (acks, channel, level, text, queries)
/// - `0x0084..0x0098`: panel to controller (input, replies, device info)
/// - `0x0204`: file-transfer envelope, both directions
/// - `0x0501..0x0581`: keep-alive and clock
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageCode {
    // ── Controller → panel ───────────────────────────────────────
    Ack = 0x0001,
    Nak = 0x0002,
    /// Output channel on.
    OutputOn = 0x0006,
    /// Output channel off.
    OutputOff = 0x0007,
    LevelValue = 0x000a,
    String = 0x000b,
    Command = 0x000c,
    RequestPortCount = 0x0010,
    RequestChannelCount = 0x0011,
    RequestLevelCount = 0x0012,
    RequestStringSize = 0x0013,
    RequestCommandSize = 0x0014,
    RequestLevelSize = 0x0015,
    RequestStatus = 0x0016,
    RequestDeviceInfo = 0x0017,
    /// Channel on status.
    StatusOn = 0x0018,
    /// Channel off status.
    StatusOff = 0x0019,

    // ── Panel → controller ───────────────────────────────────────
    /// Input channel push (button pressed).
    Push = 0x0084,
    /// Input channel release.
    Release = 0x0085,
    ChannelOn = 0x0086,
    ChannelOff = 0x0087,
    ChannelStatusOn = 0x0088,
    ChannelStatusOff = 0x0089,
    PanelLevel = 0x008a,
    PanelString = 0x008b,
    PanelCommand = 0x008c,
    PortCount = 0x0090,
    ChannelCount = 0x0091,
    LevelCount = 0x0092,
    StringSize = 0x0093,
    CommandSize = 0x0094,
    LevelSize = 0x0095,
    StatusCode = 0x0096,
    /// Device info, sent by both sides.
    DeviceInfo = 0x0097,
    DeviceInfoEnd = 0x0098,

    // ── Both ways ────────────────────────────────────────────────
    FileTransfer = 0x0204,

    // ── Keep-alive ───────────────────────────────────────────────
    Ping = 0x0501,
    /// Clock and status broadcast.
    Blink = 0x0502,
    Pong = 0x0581,
}

impl TryFrom<u16> for MessageCode {
    type Error = GateError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        use MessageCode::*;
        let code = match value {
            0x0001 => Ack,
            0x0002 => Nak,
            0x0006 => OutputOn,
            0x0007 => OutputOff,
            0x000a => LevelValue,
            0x000b => String,
            0x000c => Command,
            0x0010 => RequestPortCount,
            0x0011 => RequestChannelCount,
            0x0012 => RequestLevelCount,
            0x0013 => RequestStringSize,
            0x0014 => RequestCommandSize,
            0x0015 => RequestLevelSize,
            0x0016 => RequestStatus,
            0x0017 => RequestDeviceInfo,
            0x0018 => StatusOn,
            0x0019 => StatusOff,

            0x0084 => Push,
            0x0085 => Release,
            0x0086 => ChannelOn,
            0x0087 => ChannelOff,
            0x0088 => ChannelStatusOn,
            0x0089 => ChannelStatusOff,
            0x008a => PanelLevel,
            0x008b => PanelString,
            0x008c => PanelCommand,
            0x0090 => PortCount,
            0x0091 => ChannelCount,
            0x0092 => LevelCount,
            0x0093 => StringSize,
            0x0094 => CommandSize,
            0x0095 => LevelSize,
            0x0096 => StatusCode,
            0x0097 => DeviceInfo,
            0x0098 => DeviceInfoEnd,

            0x0204 => FileTransfer,

            0x0501 => Ping,
            0x0502 => Blink,
            0x0581 => Pong,

            other => return Err(GateError::UnsupportedMessage(other)),
        };
        Ok(code)
    }
}

impl fmt::Display for MessageCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:#06x})", self, *self as u16)
    }
}

impl MessageCode {
    pub fn value(self) -> u16 {
        self as u16
    }

    /// Channel family, both directions.
    pub fn is_channel(self) -> bool {
        use MessageCode::*;
        matches!(
            self,
            OutputOn
                | OutputOff
                | StatusOn
                | StatusOff
                | Push
                | Release
                | ChannelOn
                | ChannelOff
                | ChannelStatusOn
                | ChannelStatusOff
        )
    }

    /// `true` for the "on" polarity of a channel code.
    pub fn is_channel_on(self) -> bool {
        use MessageCode::*;
        matches!(self, OutputOn | StatusOn | Push | ChannelOn | ChannelStatusOn)
    }

    /// Codes answered with exactly one fixed reply.
    pub fn is_system_query(self) -> bool {
        (0x0010..=0x0016).contains(&(self as u16))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_roundtrip() {
        let codes = [
            MessageCode::Ack,
            MessageCode::OutputOn,
            MessageCode::LevelValue,
            MessageCode::Command,
            MessageCode::RequestDeviceInfo,
            MessageCode::StatusOff,
            MessageCode::Push,
            MessageCode::ChannelStatusOff,
            MessageCode::PanelCommand,
            MessageCode::LevelSize,
            MessageCode::DeviceInfoEnd,
            MessageCode::FileTransfer,
            MessageCode::Blink,
            MessageCode::Pong,
        ];
        for code in codes {
            assert_eq!(MessageCode::try_from(code as u16).unwrap(), code);
        }
    }

    #[test]
    fn unknown_code_is_unsupported() {
        assert!(matches!(
            MessageCode::try_from(0xdead),
            Err(GateError::UnsupportedMessage(0xdead))
        ));
        assert!(MessageCode::try_from(TRANSFER_NOTICE).is_err());
    }

    #[test]
    fn channel_polarity() {
        assert!(MessageCode::Push.is_channel_on());
        assert!(!MessageCode::Release.is_channel_on());
        assert!(MessageCode::ChannelStatusOff.is_channel());
        assert!(!MessageCode::LevelValue.is_channel());
    }

    #[test]
    fn system_query_range() {
        assert!(MessageCode::RequestPortCount.is_system_query());
        assert!(MessageCode::RequestStatus.is_system_query());
        assert!(!MessageCode::RequestDeviceInfo.is_system_query());
    }

    #[test]
    fn display_includes_hex() {
        assert_eq!(MessageCode::Ping.to_string(), "Ping(0x0501)");
    }
}
