//! `tokio_util` codec for panel frames.

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::warn;

use crate::error::GateError;
use crate::frame::{DEFAULT_MAX_BODY, Frame};
use crate::header::{HEADER_LEN, Header, LENGTH_BASE, SYNC};

/// Bytes needed before the length field can be read.
const PREFIX_LEN: usize = 3;

/// Framed codec: one [`Frame`] per item in both directions.
#[derive(Debug, Clone)]
pub struct AnetCodec {
    max_body: usize,
}

impl AnetCodec {
    pub fn new(max_body: usize) -> Self {
        Self { max_body }
    }

    pub fn max_body(&self) -> usize {
        self.max_body
    }
}

impl Default for AnetCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_BODY)
    }
}

impl Decoder for AnetCodec {
    type Item = Frame;
    type Error = GateError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.is_empty() {
            return Ok(None);
        }
        // Nothing is consumed on a bad sync byte; the connection is dropped.
        if src[0] != SYNC {
            return Err(GateError::Protocol(format!("bad sync byte {:#04x}", src[0])));
        }
        if src.len() < PREFIX_LEN {
            return Ok(None);
        }

        let length = u16::from_be_bytes([src[1], src[2]]);
        let body_len = (length as usize).checked_sub(LENGTH_BASE as usize).ok_or_else(|| {
            GateError::Protocol(format!("header length {length:#06x} below minimum"))
        })?;
        if body_len > self.max_body {
            return Err(GateError::FrameTooLarge {
                size: body_len,
                max: self.max_body,
            });
        }

        let total = HEADER_LEN + body_len + 1;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let header = Header::decode(&src[..HEADER_LEN])?;
        src.advance(HEADER_LEN);
        let body = src.split_to(body_len).freeze();
        let checksum = src.get_u8();

        let frame = Frame::from_parts(header, body, checksum);
        if !frame.checksum_valid() {
            warn!(
                mc = frame.mc(),
                got = frame.checksum(),
                expected = frame.expected_checksum(),
                "checksum mismatch; dispatching anyway"
            );
        }
        Ok(Some(frame))
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(buf)? {
            Some(frame) => Ok(Some(frame)),
            None if buf.is_empty() => Ok(None),
            None => Err(GateError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("connection closed with {} bytes of a partial frame", buf.len()),
            ))),
        }
    }
}

impl Encoder<Frame> for AnetCodec {
    type Error = GateError;

    fn encode(&mut self, item: Frame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.body().len() > self.max_body {
            return Err(GateError::FrameTooLarge {
                size: item.body().len(),
                max: self.max_body,
            });
        }
        item.write_to(dst);
        Ok(())
    }
}
