//! Link state machine for the controller connection.
//!
//! Transitions are validated and return `Result` instead of panicking.

use std::time::Instant;

use tokio::sync::watch;

use crate::error::GateError;

// ── LinkPhase ────────────────────────────────────────────────────

/// The current phase of the controller link.
///
/// ```text
///  Disconnected ──► Connecting ──► Connected ◄──► Reading
///       ▲                │             ▲  │
///       │                │             │  ▼
///       └────────────────┴───────── Writing
/// ```
///
/// Any phase may fall back to `Disconnected`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkPhase {
    /// No socket. Initial and terminal state.
    #[default]
    Disconnected,

    /// Resolving the endpoint or waiting for the TCP connect.
    Connecting,

    /// Socket open and idle.
    Connected {
        /// When the socket was established.
        since: Instant,
    },

    /// A received frame is being dispatched.
    Reading { since: Instant },

    /// Queued commands are being flushed.
    Writing { since: Instant },
}

impl std::fmt::Display for LinkPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "Disconnected"),
            Self::Connecting => write!(f, "Connecting"),
            Self::Connected { .. } => write!(f, "Connected"),
            Self::Reading { .. } => write!(f, "Reading"),
            Self::Writing { .. } => write!(f, "Writing"),
        }
    }
}

impl LinkPhase {
    /// Returns `true` while a socket is open.
    pub fn is_connected(&self) -> bool {
        self.since().is_some()
    }

    pub fn is_disconnected(&self) -> bool {
        matches!(self, Self::Disconnected)
    }

    fn since(&self) -> Option<Instant> {
        match *self {
            Self::Connected { since } | Self::Reading { since } | Self::Writing { since } => {
                Some(since)
            }
            Self::Disconnected | Self::Connecting => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Disconnected`.
    pub fn begin_connect(&mut self) -> Result<(), GateError> {
        match self {
            Self::Disconnected => {
                *self = Self::Connecting;
                Ok(())
            }
            _ => Err(self.invalid("connect")),
        }
    }

    /// Valid from: `Connecting`.
    pub fn connected(&mut self) -> Result<(), GateError> {
        match self {
            Self::Connecting => {
                *self = Self::Connected {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(self.invalid("complete connect")),
        }
    }

    /// Valid from: `Connected`, `Writing`.
    pub fn begin_read(&mut self) -> Result<(), GateError> {
        match *self {
            Self::Connected { since } | Self::Writing { since } => {
                *self = Self::Reading { since };
                Ok(())
            }
            _ => Err(self.invalid("read")),
        }
    }

    /// Valid from: `Connected`, `Reading`.
    pub fn begin_write(&mut self) -> Result<(), GateError> {
        match *self {
            Self::Connected { since } | Self::Reading { since } => {
                *self = Self::Writing { since };
                Ok(())
            }
            _ => Err(self.invalid("write")),
        }
    }

    /// Back to idle after a read or write.
    ///
    /// Valid from: `Connected`, `Reading`, `Writing`.
    pub fn idle(&mut self) -> Result<(), GateError> {
        match self.since() {
            Some(since) => {
                *self = Self::Connected { since };
                Ok(())
            }
            None => Err(self.invalid("go idle")),
        }
    }

    /// Force-reset to `Disconnected` regardless of current state.
    pub fn disconnect(&mut self) {
        *self = Self::Disconnected;
    }

    fn invalid(&self, action: &str) -> GateError {
        GateError::Protocol(format!("cannot {action} while {self}"))
    }
}

/// Apply a validated transition to a published phase.
///
/// Watchers are only woken when the transition succeeds.
pub fn publish(
    phase: &watch::Sender<LinkPhase>,
    step: impl FnOnce(&mut LinkPhase) -> Result<(), GateError>,
) -> Result<(), GateError> {
    let mut result = Ok(());
    phase.send_if_modified(|current| {
        result = step(current);
        result.is_ok()
    });
    result
}

// ── Tests ────────────────────────────────────────────────────────
