//! Error types for the panel protocol engine.
//!
//! All fallible operations return `Result<T, GateError>`. Invalid input
//! from the wire never panics; it surfaces as a typed error that tells the
//! caller whether to skip the frame or drop the connection.

use std::time::Duration;
use thiserror::Error;

/// The canonical error type for the gateway.
#[derive(Debug, Error)]
pub enum GateError {
    // ── Framing Errors ───────────────────────────────────────────
    /// A sync or separator byte did not match, or the declared length
    /// is impossible. The connection cannot be resynchronised.
    #[error("protocol violation: {0}")]
    Protocol(String),

    /// The declared body exceeds the codec budget.
    #[error("frame too large: {size} bytes (max {max})")]
    FrameTooLarge { size: usize, max: usize },

    // ── Message Errors ───────────────────────────────────────────
    /// A command cannot be encoded: unknown MC, or a body that does not
    /// belong to it.
    #[error("unsupported message code {0:#06x}")]
    UnsupportedMessage(u16),

    /// A body is shorter than the layout its MC requires.
    #[error("malformed body for MC {mc:#06x}: {reason}")]
    Malformed { mc: u16, reason: String },

    // ── Connection Errors ────────────────────────────────────────
    /// The socket reported an error, or the peer closed mid-frame.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// Every endpoint failed for the configured number of cycles.
    #[error("connection attempts exhausted after {attempts} cycles")]
    ConnectionExhausted { attempts: u32 },

    /// A connect or inactivity deadline expired.
    #[error("timeout after {0:?}")]
    Timeout(Duration),

    /// The outbound queue or UI channel was closed unexpectedly.
    #[error("channel closed")]
    ChannelClosed,

    /// Shutdown was requested while an operation was in flight.
    #[error("cancelled")]
    Cancelled,

    // ── Application Errors ───────────────────────────────────────
    /// The engine configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Catch-all for errors that do not fit another variant.
    #[error("{0}")]
    Other(String),
}

impl GateError {
    /// Shorthand for a [`GateError::Malformed`] with a formatted reason.
    pub fn malformed(mc: u16, reason: impl Into<String>) -> Self {
        GateError::Malformed {
            mc,
            reason: reason.into(),
        }
    }

    /// `true` when the connection must be torn down after this error.
    ///
    /// Malformed bodies and unsupported encodes only cost the frame.
    pub fn is_fatal(&self) -> bool {
        !matches!(
            self,
            GateError::Malformed { .. } | GateError::UnsupportedMessage(_)
        )
    }
}

// ── Convenient From implementations ──────────────────────────────

impl From<String> for GateError {
    fn from(s: String) -> Self {
        GateError::Other(s)
    }
}

impl From<&str> for GateError {
    fn from(s: &str) -> Self {
        GateError::Other(s.to_string())
    }
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for GateError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        GateError::ChannelClosed
    }
}

impl From<tokio::time::error::Elapsed> for GateError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        GateError::Timeout(Duration::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let e = GateError::FrameTooLarge {
            size: 5000,
            max: 4096,
        };
        assert!(e.to_string().contains("5000"));
        assert!(e.to_string().contains("4096"));

        let e = GateError::UnsupportedMessage(0x0123);
        assert_eq!(e.to_string(), "unsupported message code 0x0123");

        let e = GateError::malformed(0x000a, "level value truncated");
        assert!(e.to_string().contains("0x000a"));
        assert!(e.to_string().contains("truncated"));
    }

    #[test]
    fn from_string() {
        let e: GateError = "something broke".into();
        assert!(matches!(e, GateError::Other(_)));
    }

    #[test]
    fn from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe broke");
        let e: GateError = io_err.into();
        assert!(matches!(e, GateError::Io(_)));
        assert!(e.is_fatal());
    }

    #[test]
    fn frame_level_errors_are_not_fatal() {
        assert!(!GateError::malformed(1, "x").is_fatal());
        assert!(!GateError::UnsupportedMessage(0xffff).is_fatal());
        assert!(GateError::Protocol("bad sync".into()).is_fatal());
    }
}
