//! # panelgate-core
//!
//! Protocol engine that lets a software panel talk to a NetLinx-style
//! controller over TCP.
//!
//! This crate contains:
//! - **Framing**: `Header`, `Frame` and the `AnetCodec` for `tokio_util` framed I/O
//! - **Messages**: `MessageCode`, the typed `Body` variants and `Command`
//! - **Dispatch**: handshake, system queries, channel acks and command reassembly
//! - **Transfer**: the file-transfer sub-protocol that syncs panel assets
//! - **Network**: connector, outbound queue and the single-task session loop
//! - **Engine**: `Engine` with reconnects, plus the cloneable `EngineHandle`
//! - **Error**: `GateError`, a `thiserror`-based error hierarchy

pub mod bridge;
pub mod codec;
pub mod device;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod flags;
pub mod frame;
pub mod header;
pub mod message;
pub mod network;
pub mod state;
pub mod transfer;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use bridge::{RecordingBridge, UiBridge};
pub use codec::AnetCodec;
pub use device::{DeviceInfo, DeviceRegistry, PanelIdentity};
pub use dispatch::{Dispatcher, HandshakePhase};
pub use engine::{Engine, EngineConfig, EngineHandle};
pub use error::GateError;
pub use flags::EntryFlags;
pub use frame::{DEFAULT_MAX_BODY, Frame};
pub use header::{HEADER_LEN, Header, Origin};
pub use message::{Body, Command, Message, MessageCode, TransferNotice};
pub use network::{Connector, OutboundQueue, OutboundReceiver, Session, outbound_queue};
pub use state::{LinkPhase, RetryDecision, RetryPolicy};
pub use transfer::{
    Decompressor, DirEntry, Directory, FsDirectory, GzipDecompressor, TransferConfig,
    TransferEngine,
};
