//! Fixed 22-byte frame header.
//!
//! ```text
//! sync       u8   0x02
//! length     u16  0x13 + body length
//! separator  u8   0x02 (0x12 opens a device-info burst)
//! kind       u8
//! reserved   u16
//! device1    u16
//! port1      u16
//! system     u16
//! device2    u16
//! port2      u16
//! separator2 u8   0x0f
//! sequence   u16
//! mc         u16
//! ```
//!
//! All multi-byte fields are big-endian.

use crate::error::GateError;

/// Size of the fixed header on the wire.
pub const HEADER_LEN: usize = 22;

/// First byte of every frame.
pub const SYNC: u8 = 0x02;

/// Regular value of the first separator.
pub const SEPARATOR: u8 = 0x02;

/// First separator of the opening frame of a device-info reply burst.
pub const SEPARATOR_BURST: u8 = 0x12;

/// Second separator, between the routing words and the sequence counter.
pub const SEPARATOR2: u8 = 0x0f;

/// Value of the length field for an empty body.
pub const LENGTH_BASE: u16 = 0x13;

/// Decoded frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// `LENGTH_BASE + body length`; filled in by [`crate::Frame::new`].
    pub length: u16,
    pub separator: u8,
    pub kind: u8,
    pub reserved: u16,
    pub device1: u16,
    pub port1: u16,
    pub system: u16,
    pub device2: u16,
    pub port2: u16,
    pub sequence: u16,
    pub mc: u16,
}

impl Header {
    /// Serialize to the fixed wire layout.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let mut buf = [0u8; HEADER_LEN];
        buf[0] = SYNC;
        buf[1..3].copy_from_slice(&self.length.to_be_bytes());
        buf[3] = self.separator;
        buf[4] = self.kind;
        buf[5..7].copy_from_slice(&self.reserved.to_be_bytes());
        buf[7..9].copy_from_slice(&self.device1.to_be_bytes());
        buf[9..11].copy_from_slice(&self.port1.to_be_bytes());
        buf[11..13].copy_from_slice(&self.system.to_be_bytes());
        buf[13..15].copy_from_slice(&self.device2.to_be_bytes());
        buf[15..17].copy_from_slice(&self.port2.to_be_bytes());
        buf[17] = SEPARATOR2;
        buf[18..20].copy_from_slice(&self.sequence.to_be_bytes());
        buf[20..22].copy_from_slice(&self.mc.to_be_bytes());
        buf
    }

    /// Parse and validate the fixed header.
    ///
    /// Fails with [`GateError::Protocol`] on any sync/separator mismatch or
    /// a length field smaller than an empty body.
    pub fn decode(data: &[u8]) -> Result<Self, GateError> {
        if data.len() < HEADER_LEN {
            return Err(GateError::Protocol(format!(
                "header too short: {} < {HEADER_LEN}",
                data.len()
            )));
        }
        if data[0] != SYNC {
            return Err(GateError::Protocol(format!(
                "bad sync byte {:#04x}",
                data[0]
            )));
        }
        if data[3] != SEPARATOR && data[3] != SEPARATOR_BURST {
            return Err(GateError::Protocol(format!(
                "bad separator {:#04x}",
                data[3]
            )));
        }
        if data[17] != SEPARATOR2 {
            return Err(GateError::Protocol(format!(
                "bad second separator {:#04x}",
                data[17]
            )));
        }
        let word = |at: usize| u16::from_be_bytes([data[at], data[at + 1]]);
        let length = word(1);
        if length < LENGTH_BASE {
            return Err(GateError::Protocol(format!(
                "header length {length:#06x} below minimum"
            )));
        }
        Ok(Self {
            length,
            separator: data[3],
            kind: data[4],
            reserved: word(5),
            device1: word(7),
            port1: word(9),
            system: word(11),
            device2: word(13),
            port2: word(15),
            sequence: word(18),
            mc: word(20),
        })
    }

    /// Body length declared by the length field.
    pub fn body_len(&self) -> usize {
        self.length.saturating_sub(LENGTH_BASE) as usize
    }

    /// Total frame size on the wire: header, body and checksum.
    pub fn frame_len(&self) -> usize {
        HEADER_LEN + self.body_len() + 1
    }
}

// ── Origin ───────────────────────────────────────────────────────

/// Routing of frames this panel originates.
///
/// Outbound frames are addressed from the controller's device 0 port 1
/// on the configured system, with the panel's device number as the
/// second device word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Origin {
    /// Controller system number.
    pub system: u16,
    /// Panel device number.
    pub device: u16,
}

impl Origin {
    /// Build an outbound header for `mc` on `port`.
    ///
    /// The sequence counter is stamped by the writer at send time.
    pub fn header(&self, mc: u16, port: u16) -> Header {
        Header {
            length: LENGTH_BASE,
            separator: SEPARATOR,
            kind: 0,
            reserved: 1,
            device1: 0,
            port1: 1,
            system: self.system,
            device2: self.device,
            port2: port,
            sequence: 0,
            mc,
        }
    }
}
