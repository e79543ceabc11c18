//! Message dispatcher: maps inbound commands to replies and UI events.
//!
//! - **Handshake**: device-info exchange, then the count burst.
//! - **System queries**: one fixed reply each, addressed like the request.
//! - **Channel traffic**: plain notifications go to the UI; input-range
//!   codes are acknowledged on the wire instead.
//! - **Commands**: fragments are reassembled before delivery.
//! - **File transfer**: envelopes go to the [`TransferEngine`].

pub mod commands;
pub mod handshake;
pub mod queries;

use std::net::Ipv4Addr;
use std::sync::Arc;

use tracing::{debug, info, trace};

use crate::bridge::UiBridge;
use crate::device::{DeviceInfo, DeviceRegistry};
use crate::error::GateError;
use crate::header::{Origin, SEPARATOR, SEPARATOR_BURST};
use crate::message::{Address, Body, Command, Message, MessageCode, Pong, Text};
use crate::network::queue::OutboundQueue;
use crate::transfer::TransferEngine;

pub use commands::CommandAssembler;
pub use handshake::{HandshakePhase, PeerInfoStep};

/// Channel codes at or above this value are acknowledged, not delivered.
pub const CHANNEL_ACK_THRESHOLD: u16 = 0x0020;

/// Port used for system traffic.
pub const SYSTEM_PORT: u16 = 1;

/// Per-engine dispatcher. Reset at the start of every connection.
pub struct Dispatcher {
    origin: Origin,
    devices: DeviceRegistry,
    handshake: HandshakePhase,
    commands: CommandAssembler,
    transfer: TransferEngine,
    ui: Arc<dyn UiBridge>,
    queue: OutboundQueue,
    local_ip: Ipv4Addr,
}

impl Dispatcher {
    pub fn new(
        origin: Origin,
        devices: DeviceRegistry,
        transfer: TransferEngine,
        ui: Arc<dyn UiBridge>,
        queue: OutboundQueue,
    ) -> Self {
        Self {
            origin,
            devices,
            handshake: HandshakePhase::default(),
            commands: CommandAssembler::new(),
            transfer,
            ui,
            queue,
            local_ip: Ipv4Addr::UNSPECIFIED,
        }
    }

    /// Start over for a new connection whose local address is `local_ip`.
    ///
    /// Device descriptors, including a learned serial, are kept.
    pub fn reset(&mut self, local_ip: Ipv4Addr) {
        self.handshake.reset();
        self.commands.reset();
        self.transfer.reset();
        self.local_ip = local_ip;
    }

    pub fn handshake(&self) -> HandshakePhase {
        self.handshake
    }

    pub fn devices(&self) -> &DeviceRegistry {
        &self.devices
    }

    pub fn transfer(&self) -> &TransferEngine {
        &self.transfer
    }

    /// Handle one inbound command.
    pub fn dispatch(&mut self, command: Command) -> Result<(), GateError> {
        use MessageCode as M;
        let code = command.code()?;
        let mc = code.value();

        match (code, command.body) {
            (M::Ack | M::Nak, _) => {
                trace!(code = %code, seq = command.header.sequence, "controller acknowledgement");
            }
            (code, Body::Channel(channel)) if code.is_channel() => {
                if mc < CHANNEL_ACK_THRESHOLD {
                    self.ui.deliver(Message::Channel {
                        mc,
                        on: code.is_channel_on(),
                        channel,
                    });
                } else {
                    let reply = if code.is_channel_on() {
                        M::ChannelStatusOn
                    } else {
                        M::ChannelStatusOff
                    };
                    self.send(reply, channel.address.port, Body::Channel(channel))?;
                }
            }
            (M::LevelValue | M::PanelLevel, Body::Level(level)) => {
                self.ui.deliver(Message::Level { mc, level });
            }
            (M::Command, Body::Text(text)) => {
                let assembled = self.commands.accept(&text.content);
                self.ui.deliver(Message::Text {
                    mc,
                    text: Text {
                        content: assembled.content,
                        ..text
                    },
                    continued: assembled.continued,
                });
            }
            (M::String | M::PanelString | M::PanelCommand, Body::Text(text)) => {
                self.ui.deliver(Message::Text {
                    mc,
                    text,
                    continued: false,
                });
            }
            (M::RequestDeviceInfo, _) => self.send_device_info()?,
            (M::DeviceInfo, Body::DeviceInfo(peer)) => self.on_peer_device_info(&peer)?,
            (M::Ping, Body::Target { device, system }) => {
                let panel = self.devices.panel();
                let pong = Pong {
                    device,
                    system,
                    manufacturer_id: panel.manufacturer_id,
                    device_id: panel.device_id,
                    address: self.local_ip,
                };
                self.send(M::Pong, SYSTEM_PORT, Body::Pong(pong))?;
            }
            (M::Blink, Body::Blink(blink)) => self.ui.deliver(Message::Blink(blink)),
            (M::FileTransfer, Body::FileTransfer(request)) => {
                for reply in self.transfer.handle(&request) {
                    self.send(M::FileTransfer, SYSTEM_PORT, Body::FileTransfer(reply))?;
                }
            }
            (code, body) if code.is_system_query() => match queries::answer(code, &body) {
                Some((reply, body)) => {
                    let port = match &body {
                        Body::PortCount { .. } => SYSTEM_PORT,
                        Body::Count { address, .. }
                        | Body::Size { address, .. }
                        | Body::LevelSize { address, .. }
                        | Body::Status { address, .. } => address.port,
                        _ => SYSTEM_PORT,
                    };
                    self.send(reply, port, body)?;
                }
                None => debug!(code = %code, "query with unexpected body"),
            },
            (code, _) => debug!(code = %code, "no handler for inbound message"),
        }
        Ok(())
    }

    // ── Handshake ────────────────────────────────────────────────

    fn send_device_info(&self) -> Result<(), GateError> {
        for (i, entry) in self.devices.entries().iter().enumerate() {
            let info = DeviceInfo {
                address: self.local_ip,
                ..entry.clone()
            };
            let mut header = self.origin.header(MessageCode::DeviceInfo.value(), SYSTEM_PORT);
            header.separator = if i == 0 { SEPARATOR_BURST } else { SEPARATOR };
            self.queue
                .push(Command::new(header, Body::DeviceInfo(info)))?;
        }
        debug!(devices = self.devices.len(), "device info sent");
        Ok(())
    }

    fn on_peer_device_info(&mut self, peer: &DeviceInfo) -> Result<(), GateError> {
        if self.devices.learn_serial(peer) {
            info!(serial = %self.devices.panel().serial_text(), "serial number learned from controller");
        }
        match self.handshake.on_peer_device_info() {
            PeerInfoStep::Noted => {
                debug!(peer = %peer.name, "controller device info received");
            }
            PeerInfoStep::SendCounts => {
                let panel = Address::new(self.origin.device, SYSTEM_PORT, self.origin.system);
                for (code, body) in queries::count_burst(panel) {
                    self.send(code, SYSTEM_PORT, body)?;
                }
                self.handshake.mark_counts_sent()?;
                self.send(
                    MessageCode::DeviceInfoEnd,
                    SYSTEM_PORT,
                    Body::Target {
                        device: self.origin.device,
                        system: self.origin.system,
                    },
                )?;
                self.handshake.mark_ready()?;
                info!(system = self.origin.system, device = self.origin.device, "handshake complete");
            }
            PeerInfoStep::Ignore => trace!("device info after handshake ignored"),
        }
        Ok(())
    }

    fn send(&self, code: MessageCode, port: u16, body: Body) -> Result<(), GateError> {
        let header = self.origin.header(code.value(), port);
        self.queue.push(Command::new(header, body))
    }
}
