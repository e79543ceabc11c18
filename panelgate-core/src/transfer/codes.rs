//! `(ftype, function)` pairs of the file-transfer envelope.
//!
//! ```text
//! Controller                                   Panel
//!   ── (0,0105) dir exists? path ────────────►
//!   ◄──────────────────── (0,0105) 00 01 ─────
//!   ── (0,0100) list path ───────────────────►
//!   ◄──────── (0,0100) entry × N, (4,0006) ───
//!   ── (4,0102) incoming len name ───────────►
//!   ◄──────────────── (4,0103) max chunk ─────
//!   ── (4,0003) chunk ───────────────────────►   (repeated)
//!   ◄──────────────────────── (4,0002) ───────
//!   ── (4,0004) end of file ─────────────────►
//!   ◄──────────────────────── (4,0005) ───────
//!   ── (4,0007) end of session ──────────────►
//! ```
//!
//! The reverse direction starts with `(4,0104)` and runs through
//! `(4,0106)`, `(4,0003)`/`(4,0002)` pairs, `(4,0004)` and `(4,0005)`.

/// Directory-level operations.
pub const FTYPE_DIR: u16 = 0x0000;
/// File content operations.
pub const FTYPE_FILE: u16 = 0x0004;

// ── FTYPE_DIR functions ──────────────────────────────────────────
pub const DIR_LIST: u16 = 0x0100;
pub const DIR_DELETE: u16 = 0x0104;
pub const DIR_EXISTS: u16 = 0x0105;

// ── FTYPE_FILE functions ─────────────────────────────────────────
/// Next chunk please (panel asks after a chunk, controller asks when pulling).
pub const FILE_NEXT: u16 = 0x0002;
pub const FILE_CHUNK: u16 = 0x0003;
pub const FILE_EOF: u16 = 0x0004;
pub const FILE_EOF_ACK: u16 = 0x0005;
pub const FILE_LIST_END: u16 = 0x0006;
pub const FILE_SESSION_END: u16 = 0x0007;
pub const FILE_PENDING: u16 = 0x0100;
pub const FILE_INCOMING: u16 = 0x0102;
pub const FILE_ACCEPT: u16 = 0x0103;
pub const FILE_REQUEST: u16 = 0x0104;
pub const FILE_PEER_READY: u16 = 0x0106;

/// Status word acknowledging a probe or delete.
pub const STATUS_OK: &[u8] = &[0x00, 0x01];
/// Status word for a refused probe.
pub const STATUS_REFUSED: &[u8] = &[0x00, 0x00];

/// Largest content chunk in either direction.
pub const MAX_CHUNK: usize = 2000;
