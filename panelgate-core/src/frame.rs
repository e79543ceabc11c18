use bytes::{BufMut, Bytes, BytesMut};

use crate::error::GateError;
use crate::header::{HEADER_LEN, Header, LENGTH_BASE};

/// Largest body the length field can describe.
pub const MAX_BODY_LEN: usize = (u16::MAX - LENGTH_BASE) as usize;

/// Default body budget enforced by the codec.
pub const DEFAULT_MAX_BODY: usize = 4096;

/// A complete frame: fixed header, MC-specific body and trailing checksum.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    header: Header,
    body: Bytes,
    checksum: u8,
}

impl Frame {
    /// Build an outbound frame, filling in the length field and checksum.
    pub fn new(mut header: Header, body: Bytes) -> Result<Self, GateError> {
        if body.len() > MAX_BODY_LEN {
            return Err(GateError::FrameTooLarge {
                size: body.len(),
                max: MAX_BODY_LEN,
            });
        }
        header.length = LENGTH_BASE + body.len() as u16;
        let checksum = checksum_of(&header, &body);
        Ok(Self {
            header,
            body,
            checksum,
        })
    }

    /// Reassemble a frame exactly as received, checksum included.
    pub(crate) fn from_parts(header: Header, body: Bytes, checksum: u8) -> Self {
        Self {
            header,
            body,
            checksum,
        }
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    pub fn header_mut(&mut self) -> &mut Header {
        &mut self.header
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn mc(&self) -> u16 {
        self.header.mc
    }

    /// The checksum byte carried by the frame.
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// The checksum the carried bytes should have.
    pub fn expected_checksum(&self) -> u8 {
        checksum_of(&self.header, &self.body)
    }

    pub fn checksum_valid(&self) -> bool {
        self.checksum == self.expected_checksum()
    }

    /// Size on the wire.
    pub fn wire_len(&self) -> usize {
        HEADER_LEN + self.body.len() + 1
    }

    /// Append the wire representation to `dst`.
    ///
    /// The checksum is recomputed over what is written, so a header edited
    /// after construction (sequence stamping) still goes out consistent.
    pub fn write_to(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_len());
        let mut header = self.header;
        header.length = LENGTH_BASE + self.body.len() as u16;
        dst.put_slice(&header.encode());
        dst.put_slice(&self.body);
        dst.put_u8(checksum_of(&header, &self.body));
    }

    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_len());
        self.write_to(&mut buf);
        buf.freeze()
    }
}

/// Sum of all bytes, truncated to eight bits.
pub fn checksum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

fn checksum_of(header: &Header, body: &[u8]) -> u8 {
    checksum(&header.encode()).wrapping_add(checksum(body))
}
