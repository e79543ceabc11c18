//! Bounds-checked big-endian reader over a frame body.

use std::net::Ipv4Addr;

use crate::error::GateError;

/// Reads fixed-width fields front to back, failing with
/// [`GateError::Malformed`] instead of panicking on a short body.
pub(crate) struct BodyReader<'a> {
    mc: u16,
    data: &'a [u8],
    pos: usize,
}

impl<'a> BodyReader<'a> {
    pub fn new(mc: u16, data: &'a [u8]) -> Self {
        Self { mc, data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take(&mut self, n: usize, what: &str) -> Result<&'a [u8], GateError> {
        if self.remaining() < n {
            return Err(GateError::malformed(
                self.mc,
                format!(
                    "{what}: need {n} bytes at offset {}, have {}",
                    self.pos,
                    self.remaining()
                ),
            ));
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    pub fn u8(&mut self, what: &str) -> Result<u8, GateError> {
        Ok(self.take(1, what)?[0])
    }

    pub fn u16(&mut self, what: &str) -> Result<u16, GateError> {
        let b = self.take(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self, what: &str) -> Result<u32, GateError> {
        let b = self.take(4, what)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn array<const N: usize>(&mut self, what: &str) -> Result<[u8; N], GateError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N, what)?);
        Ok(out)
    }

    /// NUL-terminated string. A missing terminator consumes the rest.
    pub fn cstr(&mut self) -> String {
        let rest = &self.data[self.pos..];
        let end = rest.iter().position(|b| *b == 0).unwrap_or(rest.len());
        let text = latin1(&rest[..end]);
        self.pos += (end + 1).min(rest.len());
        text
    }

    /// Everything not read yet.
    pub fn rest(&mut self) -> &'a [u8] {
        let rest = &self.data[self.pos..];
        self.pos = self.data.len();
        rest
    }

    /// Extended address block: type 0x02, length 0x04, four octets.
    ///
    /// Missing or foreign address types read as `0.0.0.0`.
    pub fn ipv4_block(&mut self) -> Ipv4Addr {
        if self.remaining() < 6 {
            self.pos = self.data.len();
            return Ipv4Addr::UNSPECIFIED;
        }
        let kind = self.data[self.pos];
        let len = self.data[self.pos + 1];
        if kind != 0x02 || len != 0x04 {
            self.pos = self.data.len();
            return Ipv4Addr::UNSPECIFIED;
        }
        let o = &self.data[self.pos + 2..self.pos + 6];
        self.pos += 6;
        Ipv4Addr::new(o[0], o[1], o[2], o[3])
    }
}

/// Decode bytes as ISO-8859-1, which maps every byte to one char.
pub(crate) fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|b| *b as char).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_fields_in_order() {
        let data = [0x00, 0x01, 0xab, 0xcd, 0xef, 0x01, 0x7f, b'h', b'i', 0, b'x'];
        let mut r = BodyReader::new(0x000c, &data);
        assert_eq!(r.u16("a").unwrap(), 1);
        assert_eq!(r.u32("b").unwrap(), 0xabcdef01);
        assert_eq!(r.u8("c").unwrap(), 0x7f);
        assert_eq!(r.cstr(), "hi");
        assert_eq!(r.rest(), b"x");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn short_read_is_malformed() {
        let mut r = BodyReader::new(0x000a, &[0x01]);
        let err = r.u16("level").unwrap_err();
        assert!(matches!(err, GateError::Malformed { mc: 0x000a, .. }));
    }

    #[test]
    fn unterminated_string_takes_rest() {
        let mut r = BodyReader::new(0x0097, b"abc");
        assert_eq!(r.cstr(), "abc");
        assert_eq!(r.remaining(), 0);
    }

    #[test]
    fn ipv4_block_tolerates_absence() {
        let mut r = BodyReader::new(0x0097, &[0x02, 0x04, 192, 168, 1, 20]);
        assert_eq!(r.ipv4_block(), Ipv4Addr::new(192, 168, 1, 20));
        let mut r = BodyReader::new(0x0097, &[]);
        assert_eq!(r.ipv4_block(), Ipv4Addr::UNSPECIFIED);
    }
}
