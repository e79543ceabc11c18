//! Device descriptors answered during the handshake.

use std::net::Ipv4Addr;

use bytes::{BufMut, BytesMut};

use crate::error::GateError;
use crate::message::body::put_ipv4_block;
use crate::message::cursor::BodyReader;

/// Width of the serial number field.
pub const SERIAL_LEN: usize = 16;

/// Serial used until one is configured or learned.
pub const PLACEHOLDER_SERIAL: [u8; SERIAL_LEN] = *b"0000000000000000";

/// Manufacturer ID advertised for both built-in devices.
pub const MANUFACTURER_ID: u16 = 0x0001;

/// Static descriptor of one virtual device object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub object_id: u16,
    pub parent_id: u16,
    pub manufacturer_id: u16,
    pub device_id: u16,
    pub serial: [u8; SERIAL_LEN],
    pub firmware_id: u16,
    pub version: String,
    pub name: String,
    pub manufacturer: String,
    pub address: Ipv4Addr,
}

impl DeviceInfo {
    pub(crate) fn read(r: &mut BodyReader<'_>) -> Result<Self, GateError> {
        Ok(Self {
            object_id: r.u16("object id")?,
            parent_id: r.u16("parent id")?,
            manufacturer_id: r.u16("manufacturer id")?,
            device_id: r.u16("device id")?,
            serial: r.array::<SERIAL_LEN>("serial")?,
            firmware_id: r.u16("firmware id")?,
            version: r.cstr(),
            name: r.cstr(),
            manufacturer: r.cstr(),
            address: r.ipv4_block(),
        })
    }

    pub(crate) fn write(&self, buf: &mut BytesMut) {
        buf.put_u16(self.object_id);
        buf.put_u16(self.parent_id);
        buf.put_u16(self.manufacturer_id);
        buf.put_u16(self.device_id);
        buf.put_slice(&self.serial);
        buf.put_u16(self.firmware_id);
        for text in [&self.version, &self.name, &self.manufacturer] {
            buf.put_slice(text.as_bytes());
            buf.put_u8(0);
        }
        put_ipv4_block(buf, self.address);
    }

    /// Serial as text, trailing padding removed.
    pub fn serial_text(&self) -> String {
        String::from_utf8_lossy(&self.serial)
            .trim_end_matches(['\0', ' '])
            .to_string()
    }

    /// `true` when the serial carries no information.
    pub fn serial_is_blank(&self) -> bool {
        is_blank(&self.serial)
    }
}

fn is_blank(serial: &[u8]) -> bool {
    serial.iter().all(|b| matches!(b, 0 | b' ' | b'0'))
}

/// Pad or truncate `text` into the fixed serial field.
pub fn serial_from(text: &str) -> [u8; SERIAL_LEN] {
    let mut serial = [0u8; SERIAL_LEN];
    let bytes = text.as_bytes();
    let n = bytes.len().min(SERIAL_LEN);
    serial[..n].copy_from_slice(&bytes[..n]);
    serial
}

// ── Identity ─────────────────────────────────────────────────────

/// What the panel reports about itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelIdentity {
    /// Product ID of the emulated panel model.
    pub device_id: u16,
    pub model: String,
    pub version: String,
    pub firmware_id: u16,
    /// `None` keeps the placeholder until the controller supplies one.
    pub serial: Option<String>,
}

impl Default for PanelIdentity {
    fn default() -> Self {
        Self {
            device_id: 0x0149,
            model: "TPANEL".into(),
            version: "v2.0.0".into(),
            firmware_id: 0x0310,
            serial: None,
        }
    }
}

// ── DeviceRegistry ───────────────────────────────────────────────

/// Ordered device list: the panel first, then the kernel/info device.
#[derive(Debug, Clone)]
pub struct DeviceRegistry {
    entries: Vec<DeviceInfo>,
    serial_learned: bool,
}

impl DeviceRegistry {
    pub fn new(identity: &PanelIdentity) -> Self {
        let (serial, serial_learned) = match identity.serial.as_deref() {
            Some(text) if !text.trim().is_empty() => (serial_from(text), true),
            _ => (PLACEHOLDER_SERIAL, false),
        };
        let panel = DeviceInfo {
            object_id: 0,
            parent_id: 0,
            manufacturer_id: MANUFACTURER_ID,
            device_id: identity.device_id,
            serial,
            firmware_id: identity.firmware_id,
            version: identity.version.clone(),
            name: identity.model.clone(),
            manufacturer: "AMX LLC".into(),
            address: Ipv4Addr::UNSPECIFIED,
        };
        let kernel = DeviceInfo {
            object_id: 1,
            parent_id: 0,
            manufacturer_id: MANUFACTURER_ID,
            device_id: 0x0104,
            serial,
            firmware_id: 0x0311,
            version: "4.2.4".into(),
            name: "Kernel".into(),
            manufacturer: "AMX LLC".into(),
            address: Ipv4Addr::UNSPECIFIED,
        };
        Self {
            entries: vec![panel, kernel],
            serial_learned,
        }
    }

    pub fn entries(&self) -> &[DeviceInfo] {
        &self.entries
    }

    pub fn panel(&self) -> &DeviceInfo {
        &self.entries[0]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Adopt the serial carried by a peer's device info, at most once and
    /// only while ours is still the placeholder.
    ///
    /// Returns `true` when the serial was rewritten.
    pub fn learn_serial(&mut self, peer: &DeviceInfo) -> bool {
        if self.serial_learned || peer.serial_is_blank() {
            return false;
        }
        for entry in &mut self.entries {
            entry.serial = peer.serial;
        }
        self.serial_learned = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn peer(serial: &str) -> DeviceInfo {
        let mut info = DeviceRegistry::new(&PanelIdentity::default()).panel().clone();
        info.serial = serial_from(serial);
        info
    }

    #[test]
    fn registry_has_panel_and_kernel() {
        let reg = DeviceRegistry::new(&PanelIdentity::default());
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.entries()[0].object_id, 0);
        assert_eq!(reg.entries()[1].object_id, 1);
        assert_eq!(reg.panel().name, "TPANEL");
    }

    #[test]
    fn device_info_roundtrip_through_reader() {
        let mut info = DeviceRegistry::new(&PanelIdentity::default()).panel().clone();
        info.address = Ipv4Addr::new(192, 168, 0, 5);
        let mut buf = BytesMut::new();
        info.write(&mut buf);
        assert_eq!(buf.len(), 8 + SERIAL_LEN + 2 + 7 + 7 + 8 + 6);

        let mut r = BodyReader::new(0x0097, &buf);
        assert_eq!(DeviceInfo::read(&mut r).unwrap(), info);
    }

    #[test]
    fn serial_learned_once() {
        let mut reg = DeviceRegistry::new(&PanelIdentity::default());
        assert!(reg.panel().serial_is_blank());

        assert!(!reg.learn_serial(&peer("")));
        assert!(reg.learn_serial(&peer("ABC123")));
        assert_eq!(reg.panel().serial_text(), "ABC123");
        assert_eq!(reg.entries()[1].serial_text(), "ABC123");

        assert!(!reg.learn_serial(&peer("XYZ")));
        assert_eq!(reg.panel().serial_text(), "ABC123");
    }

    #[test]
    fn configured_serial_is_kept() {
        let identity = PanelIdentity {
            serial: Some("CONFIGURED".into()),
            ..Default::default()
        };
        let mut reg = DeviceRegistry::new(&identity);
        assert!(!reg.learn_serial(&peer("PEER")));
        assert_eq!(reg.panel().serial_text(), "CONFIGURED");
    }
}
