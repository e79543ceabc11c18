//! Handshake state machine.
//!
//! ```text
//!  Handshaking { device_info_sent: false }
//!        │ peer 0x0097
//!        ▼
//!  Handshaking { device_info_sent: true }
//!        │ peer 0x0097 → 0x0090..0x0094
//!        ▼
//!  CountsSent ── 0x0098 ──► Ready
//! ```

use crate::error::GateError;

/// Progress of the opening exchange on one connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakePhase {
    Handshaking { device_info_sent: bool },
    CountsSent,
    Ready,
}

impl Default for HandshakePhase {
    fn default() -> Self {
        Self::Handshaking {
            device_info_sent: false,
        }
    }
}

impl std::fmt::Display for HandshakePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Handshaking {
                device_info_sent: false,
            } => write!(f, "Handshaking"),
            Self::Handshaking {
                device_info_sent: true,
            } => write!(f, "Handshaking(info sent)"),
            Self::CountsSent => write!(f, "CountsSent"),
            Self::Ready => write!(f, "Ready"),
        }
    }
}

/// What a peer device-info reply asks of the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PeerInfoStep {
    /// First reply: remember it and wait for the second.
    Noted,
    /// Second reply: send the count burst and finish.
    SendCounts,
    /// Already past the handshake.
    Ignore,
}

impl HandshakePhase {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }

    /// Account for one device-info reply from the peer.
    pub fn on_peer_device_info(&mut self) -> PeerInfoStep {
        match self {
            Self::Handshaking {
                device_info_sent: false,
            } => {
                *self = Self::Handshaking {
                    device_info_sent: true,
                };
                PeerInfoStep::Noted
            }
            Self::Handshaking {
                device_info_sent: true,
            } => PeerInfoStep::SendCounts,
            Self::CountsSent | Self::Ready => PeerInfoStep::Ignore,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Valid from: `Handshaking { device_info_sent: true }`.
    pub fn mark_counts_sent(&mut self) -> Result<(), GateError> {
        match self {
            Self::Handshaking {
                device_info_sent: true,
            } => {
                *self = Self::CountsSent;
                Ok(())
            }
            _ => Err(GateError::Protocol(format!(
                "cannot send counts from {self}"
            ))),
        }
    }

    /// Valid from: `CountsSent`.
    pub fn mark_ready(&mut self) -> Result<(), GateError> {
        match self {
            Self::CountsSent => {
                *self = Self::Ready;
                Ok(())
            }
            _ => Err(GateError::Protocol(format!("cannot become ready from {self}"))),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
