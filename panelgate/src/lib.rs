//! # panelgate: panel gateway daemon
//!
//! Connects to a NetLinx-style controller as a touch panel and relays
//! panel events to the front end.
//!
//! - **Config**: TOML file with `[controller]`, `[panel]`, `[assets]`,
//!   `[network]` and `[logging]` sections.
//! - **Bridge**: `JsonLineBridge` emits every UI event as a JSON line.

pub mod bridge;
pub mod config;
