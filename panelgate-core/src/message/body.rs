//! Typed message bodies and their wire layouts.
//!
//! ```text
//! address      device u16, port u16, system u16
//! channel      address, channel u16
//! level        address, level u16, type u8, value (1/2/4/8 bytes by type)
//! text         address, encoding u8, length u16, content
//! device-info  object u16, parent u16, manufacturer u16, device u16,
//!              serial [16], firmware u16, version\0 name\0 manufacturer\0,
//!              0x02 0x04 ipv4[4]
//! pong         device u16, system u16, manufacturer u16, device id u16,
//!              0x02 0x04 ipv4[4]
//! transfer     ftype u16, function u16, data
//! ```

use std::net::Ipv4Addr;

use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::device::DeviceInfo;
use crate::error::GateError;
use crate::message::code::MessageCode;
use crate::message::cursor::{BodyReader, latin1};

/// Largest data block carried by one file-transfer envelope.
pub const MAX_TRANSFER_DATA: usize = 2048;

// ── Address / Channel ────────────────────────────────────────────

/// Device, port and system triple addressing a panel port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Address {
    pub device: u16,
    pub port: u16,
    pub system: u16,
}

impl Address {
    pub fn new(device: u16, port: u16, system: u16) -> Self {
        Self {
            device,
            port,
            system,
        }
    }

    fn read(r: &mut BodyReader<'_>) -> Result<Self, GateError> {
        Ok(Self {
            device: r.u16("device")?,
            port: r.u16("port")?,
            system: r.u16("system")?,
        })
    }

    fn write(&self, buf: &mut BytesMut) {
        buf.put_u16(self.device);
        buf.put_u16(self.port);
        buf.put_u16(self.system);
    }
}

/// One channel on an addressed port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ChannelRef {
    #[serde(flatten)]
    pub address: Address,
    pub channel: u16,
}

// ── Level ────────────────────────────────────────────────────────

/// A level value tagged with its wire content type.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LevelValue {
    Byte(u8),
    Char(i8),
    Word(u16),
    SignedWord(i16),
    DWord(u32),
    SignedDWord(i32),
    Float(f32),
    Double(f64),
}

/// Every level content type, in the order advertised to the controller.
pub const LEVEL_TYPES: [u8; 8] = [0x10, 0x11, 0x20, 0x21, 0x40, 0x41, 0x4f, 0x8f];

impl LevelValue {
    /// Wire content-type byte.
    pub fn type_code(&self) -> u8 {
        match self {
            Self::Byte(_) => 0x10,
            Self::Char(_) => 0x11,
            Self::Word(_) => 0x20,
            Self::SignedWord(_) => 0x21,
            Self::DWord(_) => 0x40,
            Self::SignedDWord(_) => 0x41,
            Self::Float(_) => 0x4f,
            Self::Double(_) => 0x8f,
        }
    }

    fn read(r: &mut BodyReader<'_>, mc: u16) -> Result<Self, GateError> {
        let kind = r.u8("level type")?;
        let value = match kind {
            0x10 => Self::Byte(r.u8("level value")?),
            0x11 => Self::Char(r.u8("level value")? as i8),
            0x20 => Self::Word(r.u16("level value")?),
            0x21 => Self::SignedWord(r.u16("level value")? as i16),
            0x40 => Self::DWord(r.u32("level value")?),
            0x41 => Self::SignedDWord(r.u32("level value")? as i32),
            0x4f => Self::Float(f32::from_be_bytes(r.array::<4>("level value")?)),
            0x8f => Self::Double(f64::from_be_bytes(r.array::<8>("level value")?)),
            other => {
                return Err(GateError::malformed(
                    mc,
                    format!("unknown level type {other:#04x}"),
                ));
            }
        };
        Ok(value)
    }

    fn write(&self, buf: &mut BytesMut) {
        buf.put_u8(self.type_code());
        match *self {
            Self::Byte(v) => buf.put_u8(v),
            Self::Char(v) => buf.put_i8(v),
            Self::Word(v) => buf.put_u16(v),
            Self::SignedWord(v) => buf.put_i16(v),
            Self::DWord(v) => buf.put_u32(v),
            Self::SignedDWord(v) => buf.put_i32(v),
            Self::Float(v) => buf.put_f32(v),
            Self::Double(v) => buf.put_f64(v),
        }
    }
}

/// A level on an addressed port.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Level {
    #[serde(flatten)]
    pub address: Address,
    pub level: u16,
    pub value: LevelValue,
}

// ── Text ─────────────────────────────────────────────────────────

/// Character width of string/command content.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TextEncoding {
    /// One byte per character (ISO-8859-1).
    Narrow = 0x01,
    /// Two bytes per character (UTF-16BE).
    Wide = 0x02,
}

/// String or command content on an addressed port.
///
/// The length field counts characters, so wide content carries twice as
/// many bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Text {
    #[serde(flatten)]
    pub address: Address,
    pub encoding: TextEncoding,
    pub content: String,
}

impl Text {
    /// Build text content, picking the narrow encoding when every
    /// character fits in one byte.
    pub fn new(address: Address, content: impl Into<String>) -> Self {
        let content = content.into();
        let encoding = if content.chars().all(|c| (c as u32) <= 0xff) {
            TextEncoding::Narrow
        } else {
            TextEncoding::Wide
        };
        Self {
            address,
            encoding,
            content,
        }
    }

    fn read(r: &mut BodyReader<'_>, mc: u16) -> Result<Self, GateError> {
        let address = Address::read(r)?;
        let encoding = r.u8("encoding")?;
        let length = r.u16("length")? as usize;
        let (encoding, content) = match encoding {
            0x02 => {
                let raw = r.take(length * 2, "content")?;
                let units = raw.chunks_exact(2).map(|c| u16::from_be_bytes([c[0], c[1]]));
                let text = char::decode_utf16(units)
                    .map(|c| c.unwrap_or(char::REPLACEMENT_CHARACTER))
                    .collect();
                (TextEncoding::Wide, text)
            }
            0x01 | 0x00 => (TextEncoding::Narrow, latin1(r.take(length, "content")?)),
            other => {
                return Err(GateError::malformed(
                    mc,
                    format!("unknown text encoding {other:#04x}"),
                ));
            }
        };
        Ok(Self {
            address,
            encoding,
            content,
        })
    }

    fn write(&self, buf: &mut BytesMut, mc: u16) -> Result<(), GateError> {
        self.address.write(buf);
        buf.put_u8(self.encoding as u8);
        match self.encoding {
            TextEncoding::Narrow => {
                let bytes: Vec<u8> = self
                    .content
                    .chars()
                    .map(|c| u8::try_from(c as u32))
                    .collect::<Result<_, _>>()
                    .map_err(|_| GateError::malformed(mc, "wide character in narrow text"))?;
                buf.put_u16(wire_len(bytes.len(), mc)?);
                buf.put_slice(&bytes);
            }
            TextEncoding::Wide => {
                let units: Vec<u16> = self.content.encode_utf16().collect();
                buf.put_u16(wire_len(units.len(), mc)?);
                for unit in units {
                    buf.put_u16(unit);
                }
            }
        }
        Ok(())
    }
}

fn wire_len(len: usize, mc: u16) -> Result<u16, GateError> {
    u16::try_from(len).map_err(|_| GateError::malformed(mc, format!("{len} does not fit a u16")))
}

// ── Keep-alive ───────────────────────────────────────────────────

/// Pong record answering a controller ping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pong {
    pub device: u16,
    pub system: u16,
    pub manufacturer_id: u16,
    pub device_id: u16,
    pub address: Ipv4Addr,
}

/// Clock and status broadcast from the controller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Blink {
    pub heartbeat: u8,
    pub led: u8,
    pub month: u8,
    pub day: u8,
    pub year: u16,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
    pub weekday: u8,
    pub outside_temperature: i16,
    pub date_text: String,
}

impl Blink {
    fn read(r: &mut BodyReader<'_>) -> Result<Self, GateError> {
        Ok(Self {
            heartbeat: r.u8("heartbeat")?,
            led: r.u8("led")?,
            month: r.u8("month")?,
            day: r.u8("day")?,
            year: r.u16("year")?,
            hour: r.u8("hour")?,
            minute: r.u8("minute")?,
            second: r.u8("second")?,
            weekday: r.u8("weekday")?,
            outside_temperature: r.u16("temperature")? as i16,
            date_text: r.cstr(),
        })
    }
}

// ── File transfer ────────────────────────────────────────────────

/// File-transfer envelope: `(ftype, function)` selects the meaning of `data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTransfer {
    pub ftype: u16,
    pub function: u16,
    pub data: Bytes,
}

impl FileTransfer {
    pub fn new(ftype: u16, function: u16, data: impl Into<Bytes>) -> Self {
        Self {
            ftype,
            function,
            data: data.into(),
        }
    }
}

// ── Body ─────────────────────────────────────────────────────────

/// Every body layout, selected by the message code.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// Ack / nak.
    Empty,
    Channel(ChannelRef),
    Level(Level),
    Text(Text),
    /// Device and system only: port-count and device-info requests,
    /// device-info end, ping.
    Target { device: u16, system: u16 },
    /// Address only: the remaining system queries.
    Query(Address),
    LevelQuery { address: Address, level: u16 },
    PortCount { device: u16, system: u16, count: u16 },
    Count { address: Address, count: u16 },
    Size { address: Address, kind: u8, size: u16 },
    LevelSize { address: Address, level: u16, types: Vec<u8> },
    Status { address: Address, code: u16, text: String },
    DeviceInfo(DeviceInfo),
    Pong(Pong),
    Blink(Blink),
    FileTransfer(FileTransfer),
}

impl Body {
    /// Parse the body of a frame carrying `code`.
    pub fn decode(code: MessageCode, data: &[u8]) -> Result<Self, GateError> {
        use MessageCode as M;
        let mc = code.value();
        let mut r = BodyReader::new(mc, data);
        let body = match code {
            M::Ack | M::Nak => Body::Empty,
            c if c.is_channel() => Body::Channel(ChannelRef {
                address: Address::read(&mut r)?,
                channel: r.u16("channel")?,
            }),
            M::LevelValue | M::PanelLevel => Body::Level(Level {
                address: Address::read(&mut r)?,
                level: r.u16("level")?,
                value: LevelValue::read(&mut r, mc)?,
            }),
            M::String | M::Command | M::PanelString | M::PanelCommand => {
                Body::Text(Text::read(&mut r, mc)?)
            }
            M::RequestPortCount | M::RequestDeviceInfo | M::DeviceInfoEnd | M::Ping => {
                Body::Target {
                    device: r.u16("device")?,
                    system: r.u16("system")?,
                }
            }
            M::RequestChannelCount
            | M::RequestLevelCount
            | M::RequestStringSize
            | M::RequestCommandSize
            | M::RequestStatus => Body::Query(Address::read(&mut r)?),
            M::RequestLevelSize => Body::LevelQuery {
                address: Address::read(&mut r)?,
                level: r.u16("level")?,
            },
            M::PortCount => Body::PortCount {
                device: r.u16("device")?,
                system: r.u16("system")?,
                count: r.u16("count")?,
            },
            M::ChannelCount | M::LevelCount => Body::Count {
                address: Address::read(&mut r)?,
                count: r.u16("count")?,
            },
            M::StringSize | M::CommandSize => Body::Size {
                address: Address::read(&mut r)?,
                kind: r.u8("type")?,
                size: r.u16("size")?,
            },
            M::LevelSize => {
                let address = Address::read(&mut r)?;
                let level = r.u16("level")?;
                let count = r.u8("type count")? as usize;
                Body::LevelSize {
                    address,
                    level,
                    types: r.take(count, "types")?.to_vec(),
                }
            }
            M::StatusCode => {
                let address = Address::read(&mut r)?;
                let code = r.u16("status code")?;
                let _encoding = r.u8("encoding")?;
                let len = r.u16("length")? as usize;
                Body::Status {
                    address,
                    code,
                    text: latin1(r.take(len, "status text")?),
                }
            }
            M::DeviceInfo => Body::DeviceInfo(DeviceInfo::read(&mut r)?),
            M::Pong => Body::Pong(Pong {
                device: r.u16("device")?,
                system: r.u16("system")?,
                manufacturer_id: r.u16("manufacturer")?,
                device_id: r.u16("device id")?,
                address: r.ipv4_block(),
            }),
            M::Blink => Body::Blink(Blink::read(&mut r)?),
            M::FileTransfer => {
                let ftype = r.u16("ftype")?;
                let function = r.u16("function")?;
                let data = r.rest();
                if data.len() > MAX_TRANSFER_DATA {
                    return Err(GateError::malformed(
                        mc,
                        format!("{} bytes of transfer data", data.len()),
                    ));
                }
                Body::FileTransfer(FileTransfer::new(
                    ftype,
                    function,
                    Bytes::copy_from_slice(data),
                ))
            }
            _ => return Err(GateError::UnsupportedMessage(mc)),
        };
        Ok(body)
    }

    /// Serialize for a frame carrying `code`.
    ///
    /// A body variant that does not belong to `code` is
    /// [`GateError::UnsupportedMessage`].
    pub fn encode(&self, code: MessageCode, buf: &mut BytesMut) -> Result<(), GateError> {
        use MessageCode as M;
        let mc = code.value();
        match (code, self) {
            (M::Ack | M::Nak, Body::Empty) => {}
            (c, Body::Channel(ch)) if c.is_channel() => {
                ch.address.write(buf);
                buf.put_u16(ch.channel);
            }
            (M::LevelValue | M::PanelLevel, Body::Level(level)) => {
                level.address.write(buf);
                buf.put_u16(level.level);
                level.value.write(buf);
            }
            (M::String | M::Command | M::PanelString | M::PanelCommand, Body::Text(text)) => {
                text.write(buf, mc)?;
            }
            (
                M::RequestPortCount | M::RequestDeviceInfo | M::DeviceInfoEnd | M::Ping,
                Body::Target { device, system },
            ) => {
                buf.put_u16(*device);
                buf.put_u16(*system);
            }
            (
                M::RequestChannelCount
                | M::RequestLevelCount
                | M::RequestStringSize
                | M::RequestCommandSize
                | M::RequestStatus,
                Body::Query(address),
            ) => address.write(buf),
            (M::RequestLevelSize, Body::LevelQuery { address, level }) => {
                address.write(buf);
                buf.put_u16(*level);
            }
            (
                M::PortCount,
                Body::PortCount {
                    device,
                    system,
                    count,
                },
            ) => {
                buf.put_u16(*device);
                buf.put_u16(*system);
                buf.put_u16(*count);
            }
            (M::ChannelCount | M::LevelCount, Body::Count { address, count }) => {
                address.write(buf);
                buf.put_u16(*count);
            }
            (
                M::StringSize | M::CommandSize,
                Body::Size {
                    address,
                    kind,
                    size,
                },
            ) => {
                address.write(buf);
                buf.put_u8(*kind);
                buf.put_u16(*size);
            }
            (
                M::LevelSize,
                Body::LevelSize {
                    address,
                    level,
                    types,
                },
            ) => {
                address.write(buf);
                buf.put_u16(*level);
                buf.put_u8(
                    u8::try_from(types.len())
                        .map_err(|_| GateError::malformed(mc, "too many level types"))?,
                );
                buf.put_slice(types);
            }
            (
                M::StatusCode,
                Body::Status {
                    address,
                    code,
                    text,
                },
            ) => {
                address.write(buf);
                buf.put_u16(*code);
                buf.put_u8(TextEncoding::Narrow as u8);
                buf.put_u16(wire_len(text.len(), mc)?);
                buf.put_slice(text.as_bytes());
            }
            (M::DeviceInfo, Body::DeviceInfo(info)) => info.write(buf),
            (M::Pong, Body::Pong(pong)) => {
                buf.put_u16(pong.device);
                buf.put_u16(pong.system);
                buf.put_u16(pong.manufacturer_id);
                buf.put_u16(pong.device_id);
                put_ipv4_block(buf, pong.address);
            }
            (M::FileTransfer, Body::FileTransfer(ft)) => {
                if ft.data.len() > MAX_TRANSFER_DATA {
                    return Err(GateError::malformed(
                        mc,
                        format!("{} bytes of transfer data", ft.data.len()),
                    ));
                }
                buf.put_u16(ft.ftype);
                buf.put_u16(ft.function);
                buf.put_slice(&ft.data);
            }
            _ => return Err(GateError::UnsupportedMessage(mc)),
        }
        Ok(())
    }
}

/// Extended address block: type 0x02, length 0x04, four octets.
pub(crate) fn put_ipv4_block(buf: &mut BytesMut, address: Ipv4Addr) {
    buf.put_u8(0x02);
    buf.put_u8(0x04);
    buf.put_slice(&address.octets());
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encode(code: MessageCode, body: &Body) -> BytesMut {
        let mut buf = BytesMut::new();
        body.encode(code, &mut buf).unwrap();
        buf
    }

    #[test]
    fn channel_layout() {
        let body = Body::Channel(ChannelRef {
            address: Address::new(10001, 1, 1),
            channel: 5,
        });
        let buf = encode(MessageCode::Push, &body);
        assert_eq!(&buf[..], &[0x27, 0x11, 0x00, 0x01, 0x00, 0x01, 0x00, 0x05]);
        assert_eq!(Body::decode(MessageCode::Push, &buf).unwrap(), body);
    }

    #[test]
    fn level_value_widths() {
        let cases = [
            (LevelValue::Byte(7), 1),
            (LevelValue::Char(-3), 1),
            (LevelValue::Word(0x1234), 2),
            (LevelValue::SignedWord(-2), 2),
            (LevelValue::DWord(0xdeadbeef), 4),
            (LevelValue::SignedDWord(-70000), 4),
            (LevelValue::Float(1.5), 4),
            (LevelValue::Double(-0.25), 8),
        ];
        for (value, width) in cases {
            let body = Body::Level(Level {
                address: Address::new(10001, 1, 1),
                level: 3,
                value,
            });
            let buf = encode(MessageCode::PanelLevel, &body);
            assert_eq!(buf.len(), 8 + 1 + width, "{value:?}");
            assert_eq!(buf[8], value.type_code());
            assert_eq!(Body::decode(MessageCode::LevelValue, &buf).unwrap(), body);
        }
    }

    #[test]
    fn unknown_level_type_is_malformed() {
        let data = [0, 1, 0, 1, 0, 1, 0, 1, 0x33, 0];
        assert!(matches!(
            Body::decode(MessageCode::LevelValue, &data),
            Err(GateError::Malformed { .. })
        ));
    }

    #[test]
    fn narrow_text_layout() {
        let text = Text::new(Address::new(10001, 1, 1), "PAGE-Main");
        assert_eq!(text.encoding, TextEncoding::Narrow);
        let buf = encode(MessageCode::PanelCommand, &Body::Text(text.clone()));
        assert_eq!(buf[6], 0x01);
        assert_eq!(&buf[7..9], &[0x00, 0x09]);
        assert_eq!(&buf[9..], b"PAGE-Main");
        assert_eq!(
            Body::decode(MessageCode::Command, &buf).unwrap(),
            Body::Text(text)
        );
    }

    #[test]
    fn wide_text_counts_characters() {
        let text = Text::new(Address::new(1, 1, 1), "Ω€");
        assert_eq!(text.encoding, TextEncoding::Wide);
        let buf = encode(MessageCode::PanelString, &Body::Text(text.clone()));
        assert_eq!(&buf[7..9], &[0x00, 0x02]);
        assert_eq!(buf.len(), 9 + 4);
        assert_eq!(
            Body::decode(MessageCode::String, &buf).unwrap(),
            Body::Text(text)
        );
    }

    #[test]
    fn latin1_text_survives() {
        let data = [0, 1, 0, 1, 0, 1, 0x01, 0, 2, 0xe9, b'!'];
        match Body::decode(MessageCode::String, &data).unwrap() {
            Body::Text(t) => assert_eq!(t.content, "é!"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn truncated_text_is_malformed() {
        let data = [0, 1, 0, 1, 0, 1, 0x01, 0, 20, b'a'];
        assert!(matches!(
            Body::decode(MessageCode::Command, &data),
            Err(GateError::Malformed { mc: 0x000c, .. })
        ));
    }

    #[test]
    fn query_reply_layouts() {
        let addr = Address::new(10001, 1, 1);
        let buf = encode(
            MessageCode::PortCount,
            &Body::PortCount {
                device: 10001,
                system: 1,
                count: 1,
            },
        );
        assert_eq!(buf.len(), 6);

        let buf = encode(
            MessageCode::StringSize,
            &Body::Size {
                address: addr,
                kind: 0x02,
                size: 0x00c7,
            },
        );
        assert_eq!(&buf[6..], &[0x02, 0x00, 0xc7]);

        let body = Body::LevelSize {
            address: addr,
            level: 1,
            types: LEVEL_TYPES.to_vec(),
        };
        let buf = encode(MessageCode::LevelSize, &body);
        assert_eq!(buf[8], 8);
        assert_eq!(Body::decode(MessageCode::LevelSize, &buf).unwrap(), body);

        let body = Body::Status {
            address: addr,
            code: 0,
            text: "Normal".into(),
        };
        let buf = encode(MessageCode::StatusCode, &body);
        assert_eq!(Body::decode(MessageCode::StatusCode, &buf).unwrap(), body);
    }

    #[test]
    fn pong_layout() {
        let body = Body::Pong(Pong {
            device: 10001,
            system: 1,
            manufacturer_id: 1,
            device_id: 0x0149,
            address: Ipv4Addr::new(10, 0, 0, 7),
        });
        let buf = encode(MessageCode::Pong, &body);
        assert_eq!(&buf[8..], &[0x02, 0x04, 10, 0, 0, 7]);
        assert_eq!(Body::decode(MessageCode::Pong, &buf).unwrap(), body);
    }

    #[test]
    fn blink_decodes() {
        let mut data = vec![0x05, 0x00, 10, 19, 0x07, 0xea, 14, 30, 5, 1];
        data.extend_from_slice(&(-5i16).to_be_bytes());
        data.extend_from_slice(b"10/19/2026\0");
        match Body::decode(MessageCode::Blink, &data).unwrap() {
            Body::Blink(b) => {
                assert_eq!(b.year, 2026);
                assert_eq!(b.outside_temperature, -5);
                assert_eq!(b.date_text, "10/19/2026");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn file_transfer_layout() {
        let body = Body::FileTransfer(FileTransfer::new(4, 0x0103, vec![0x07, 0xd0]));
        let buf = encode(MessageCode::FileTransfer, &body);
        assert_eq!(&buf[..], &[0x00, 0x04, 0x01, 0x03, 0x07, 0xd0]);
        assert_eq!(Body::decode(MessageCode::FileTransfer, &buf).unwrap(), body);
    }

    #[test]
    fn mismatched_body_is_unsupported() {
        let mut buf = BytesMut::new();
        let err = Body::Empty.encode(MessageCode::Push, &mut buf).unwrap_err();
        assert!(matches!(err, GateError::UnsupportedMessage(0x0084)));
    }
}
