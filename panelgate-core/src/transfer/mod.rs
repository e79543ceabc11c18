//! File-transfer sub-protocol (MC 0x0204).
//!
//! The engine is synchronous: each inbound envelope is handled to
//! completion with `std::fs` and yields the envelopes to send back, in
//! order. Progress goes to the UI bridge as [`TransferNotice`]s.
//!
//! At most one receive and one send are open at a time; starting a new
//! one closes the previous handle in that direction.

pub mod codes;
pub mod decompress;
pub mod directory;
pub mod paths;
pub mod state;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::{debug, info, warn};

use crate::bridge::UiBridge;
use crate::message::{FileTransfer, Message, TransferNotice};

use codes::*;
pub use decompress::{Decompressor, GzipDecompressor};
pub use directory::{DirEntry, Directory, FsDirectory};
pub use paths::AssetRoot;
use state::{FileTransferState, Incoming, Outgoing, Source};

/// Reserved name answered with [`VERSION_XMA`] instead of a real file.
pub const VERSION_FILE: &str = "__system/graphics/version.xma";

/// Content served for [`VERSION_FILE`].
pub const VERSION_XMA: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
<version>\n  <major>2</major>\n  <minor>0</minor>\n  <build>0</build>\n</version>\n";

/// Where the engine keeps its assets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferConfig {
    pub asset_root: PathBuf,
    /// Manifest file, relative to the asset root; one line per expected file.
    pub manifest: PathBuf,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            asset_root: PathBuf::from("assets"),
            manifest: PathBuf::from("manifest.xma"),
        }
    }
}

/// Handles file-transfer envelopes for one engine.
pub struct TransferEngine {
    root: AssetRoot,
    manifest: PathBuf,
    directory: Box<dyn Directory>,
    decompressor: Box<dyn Decompressor>,
    ui: Arc<dyn UiBridge>,
    state: FileTransferState,
}

impl TransferEngine {
    pub fn new(
        config: &TransferConfig,
        directory: Box<dyn Directory>,
        decompressor: Box<dyn Decompressor>,
        ui: Arc<dyn UiBridge>,
    ) -> Self {
        Self {
            root: AssetRoot::new(&config.asset_root),
            manifest: config.asset_root.join(&config.manifest),
            directory,
            decompressor,
            ui,
            state: FileTransferState::default(),
        }
    }

    pub fn state(&self) -> &FileTransferState {
        &self.state
    }

    /// Forget everything about the previous connection.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Handle one inbound envelope and return the replies.
    ///
    /// Unknown `(ftype, function)` pairs are ignored without reply.
    pub fn handle(&mut self, request: &FileTransfer) -> Vec<FileTransfer> {
        let data = &request.data[..];
        match (request.ftype, request.function) {
            (FTYPE_DIR, DIR_EXISTS) => self.probe_directory(&cstr(data)),
            (FTYPE_DIR, DIR_LIST) => self.list_directory(&cstr(data)),
            (FTYPE_DIR, DIR_DELETE) => self.delete_file(&cstr(data)),
            (FTYPE_FILE, FILE_PENDING) => {
                let announced = be_u16(data, 0) as usize;
                if announced > self.state.total_files {
                    self.state.total_files = announced;
                }
                debug!(announced, total = self.state.total_files, "files pending");
                Vec::new()
            }
            (FTYPE_FILE, FILE_INCOMING) => {
                let length = be_u32(data, 0) as u64;
                let name = cstr(data.get(4..).unwrap_or_default());
                self.begin_receive(name, length)
            }
            (FTYPE_FILE, FILE_CHUNK) => self.receive_chunk(data),
            (FTYPE_FILE, FILE_EOF) => {
                if let Some(mut rx) = self.state.receive.take() {
                    if !rx.is_complete() {
                        warn!(
                            file = %rx.name,
                            received = rx.position,
                            announced = rx.length,
                            "end of file before announced length"
                        );
                    }
                    rx.close();
                }
                vec![reply(FTYPE_FILE, FILE_EOF_ACK, Bytes::new())]
            }
            (FTYPE_FILE, FILE_SESSION_END) => {
                info!(
                    files = self.state.active_files,
                    deletes = self.state.active_deletes,
                    "transfer session finished"
                );
                self.state.reset();
                self.ui.deliver(Message::Transfer(TransferNotice::Finished));
                Vec::new()
            }
            (FTYPE_FILE, FILE_REQUEST) => self.begin_send(&cstr(data)),
            (FTYPE_FILE, FILE_PEER_READY) => {
                let peer_max = be_u16(data, 0) as usize;
                if let Some(tx) = self.state.send.as_mut() {
                    tx.chunk = if peer_max == 0 {
                        MAX_CHUNK
                    } else {
                        peer_max.min(MAX_CHUNK)
                    };
                }
                vec![self.next_outgoing()]
            }
            (FTYPE_FILE, FILE_NEXT) => vec![self.next_outgoing()],
            (FTYPE_FILE, FILE_EOF_ACK) => {
                if let Some(tx) = self.state.send.take() {
                    debug!(file = %tx.name, sent = tx.position, "send acknowledged");
                }
                Vec::new()
            }
            (ftype, function) => {
                debug!(ftype, function, "ignoring unknown transfer function");
                Vec::new()
            }
        }
    }

    // ── Directory operations ─────────────────────────────────────

    fn probe_directory(&mut self, logical: &str) -> Vec<FileTransfer> {
        if !self.state.manifest_counted {
            self.state.manifest_counted = true;
            self.state.total_files = count_lines(&self.manifest);
            debug!(total = self.state.total_files, "manifest counted");
        }

        let Some(path) = self.root.resolve(logical) else {
            warn!(path = logical, "refusing directory outside the asset tree");
            return vec![reply(FTYPE_DIR, DIR_EXISTS, STATUS_REFUSED)];
        };
        if !self.directory.exists(&path) {
            if let Err(e) = std::fs::create_dir_all(&path) {
                warn!(path = %path.display(), "cannot create directory: {e}");
                return vec![reply(FTYPE_DIR, DIR_EXISTS, STATUS_REFUSED)];
            }
            debug!(path = %path.display(), "created directory");
        }
        vec![reply(FTYPE_DIR, DIR_EXISTS, STATUS_OK)]
    }

    fn list_directory(&mut self, logical: &str) -> Vec<FileTransfer> {
        let entries = match self.root.resolve(logical) {
            Some(path) => self.directory.list(&path).unwrap_or_else(|e| {
                debug!(path = %path.display(), "listing failed: {e}");
                Vec::new()
            }),
            None => {
                warn!(path = logical, "refusing listing outside the asset tree");
                Vec::new()
            }
        };
        self.ui.deliver(Message::Transfer(TransferNotice::Syncing {
            files: entries.len(),
        }));

        let count = entries.len().min(u16::MAX as usize) as u16;
        let mut replies: Vec<FileTransfer> = entries
            .iter()
            .take(count as usize)
            .enumerate()
            .map(|(i, entry)| reply(FTYPE_DIR, DIR_LIST, list_entry(i as u16 + 1, count, entry)))
            .collect();
        replies.push(reply(FTYPE_FILE, FILE_LIST_END, Bytes::new()));
        replies
    }

    fn delete_file(&mut self, logical: &str) -> Vec<FileTransfer> {
        match self.root.resolve(logical) {
            Some(path) if self.directory.is_file(&path) => match std::fs::remove_file(&path) {
                Ok(()) => debug!(path = %path.display(), "deleted"),
                Err(e) => warn!(path = %path.display(), "delete failed: {e}"),
            },
            Some(path) => debug!(path = %path.display(), "delete of missing file"),
            None => warn!(path = logical, "refusing delete outside the asset tree"),
        }

        self.state.active_deletes += 1;
        let pct = state::percent(
            self.state.active_deletes as u64,
            self.state.total_files as u64,
        );
        if self.state.delete_percent != Some(pct) {
            self.state.delete_percent = Some(pct);
            self.ui
                .deliver(Message::Transfer(TransferNotice::Deleting { percent: pct }));
        }
        // Acknowledged as present whether or not the file existed.
        vec![reply(FTYPE_DIR, DIR_DELETE, STATUS_OK)]
    }

    // ── Receive (controller → panel) ─────────────────────────────

    fn begin_receive(&mut self, name: String, length: u64) -> Vec<FileTransfer> {
        if let Some(mut previous) = self.state.receive.take() {
            warn!(file = %previous.name, "new file announced; abandoning previous receive");
            previous.close();
        }

        let path = self.root.resolve(&name);
        let file = match &path {
            Some(path) => open_for_write(path),
            None => {
                warn!(file = %name, "refusing file outside the asset tree");
                None
            }
        };
        self.state.active_files += 1;
        info!(file = %name, length, index = self.state.active_files, "receiving file");

        let mut rx = Incoming {
            name,
            path: path.unwrap_or_default(),
            file,
            position: 0,
            length,
            last_percent: None,
        };
        self.report_receive(&mut rx);
        self.state.receive = Some(rx);

        let mut data = BytesMut::with_capacity(2);
        data.put_u16(MAX_CHUNK as u16);
        vec![reply(FTYPE_FILE, FILE_ACCEPT, data.freeze())]
    }

    fn receive_chunk(&mut self, data: &[u8]) -> Vec<FileTransfer> {
        let declared = be_u16(data, 0) as usize;
        let payload = data.get(2..).unwrap_or_default();
        let chunk = if declared > payload.len() {
            warn!(declared, carried = payload.len(), "short transfer chunk");
            payload
        } else {
            &payload[..declared]
        };

        let Some(mut rx) = self.state.receive.take() else {
            debug!(len = chunk.len(), "chunk without an announced file");
            return vec![reply(FTYPE_FILE, FILE_NEXT, Bytes::new())];
        };
        rx.append(chunk);
        self.report_receive(&mut rx);

        if rx.is_complete() {
            self.finish_receive(rx);
        } else {
            self.state.receive = Some(rx);
        }
        vec![reply(FTYPE_FILE, FILE_NEXT, Bytes::new())]
    }

    fn finish_receive(&mut self, mut rx: Incoming) {
        if !rx.close() {
            return;
        }
        if decompress::is_gzip(&rx.path) {
            match self.decompressor.decompress_in_place(&rx.path) {
                Ok(()) => debug!(file = %rx.name, "decompressed"),
                Err(e) => warn!(file = %rx.name, "decompression failed: {e}"),
            }
        }
        debug!(file = %rx.name, bytes = rx.position, "file received");
    }

    fn report_receive(&self, rx: &mut Incoming) {
        let pct = rx.percent();
        if rx.last_percent == Some(pct) {
            return;
        }
        rx.last_percent = Some(pct);
        self.ui.deliver(Message::Transfer(TransferNotice::Receiving {
            file: rx.name.clone(),
            index: self.state.active_files,
            total: self.state.total_files,
            percent: pct,
        }));
    }

    // ── Send (panel → controller) ────────────────────────────────

    fn begin_send(&mut self, name: &str) -> Vec<FileTransfer> {
        let name = paths::normalize(name).to_string();
        let (source, length) = if name == VERSION_FILE {
            let data = Bytes::from_static(VERSION_XMA.as_bytes());
            let len = data.len() as u64;
            (Some(Source::Memory(data)), len)
        } else {
            match self.root.resolve(&name).map(|p| open_for_read(&p)) {
                Some(Some((file, len))) => (Some(Source::File(file)), len),
                _ => (None, 0),
            }
        };
        info!(file = %name, length, "controller requested file");

        self.state.send = Some(Outgoing {
            name,
            source,
            position: 0,
            length,
            chunk: MAX_CHUNK,
        });

        let mut data = BytesMut::with_capacity(4);
        data.put_u32(length.min(u32::MAX as u64) as u32);
        vec![reply(FTYPE_FILE, FILE_REQUEST, data.freeze())]
    }

    fn next_outgoing(&mut self) -> FileTransfer {
        let chunk = self.state.send.as_mut().and_then(Outgoing::next_chunk);
        match chunk {
            Some(chunk) => {
                let mut data = BytesMut::with_capacity(2 + chunk.len());
                data.put_u16(chunk.len() as u16);
                data.put_slice(&chunk);
                reply(FTYPE_FILE, FILE_CHUNK, data.freeze())
            }
            None => reply(FTYPE_FILE, FILE_EOF, Bytes::new()),
        }
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn reply(ftype: u16, function: u16, data: impl Into<Bytes>) -> FileTransfer {
    FileTransfer::new(ftype, function, data)
}

fn list_entry(index: u16, count: u16, entry: &DirEntry) -> Bytes {
    let mut data = BytesMut::with_capacity(13 + entry.name.len() + 1);
    data.put_u16(index);
    data.put_u16(count);
    data.put_u8(entry.flags.bits());
    data.put_u32(entry.size.min(u32::MAX as u64) as u32);
    data.put_u32(entry.modified);
    data.put_slice(entry.name.as_bytes());
    data.put_u8(0);
    data.freeze()
}

fn open_for_write(path: &Path) -> Option<File> {
    if let Some(parent) = path.parent()
        && let Err(e) = std::fs::create_dir_all(parent)
    {
        warn!(path = %parent.display(), "cannot create directory: {e}");
        return None;
    }
    File::create(path)
        .inspect_err(|e| warn!(path = %path.display(), "cannot open for writing: {e}"))
        .ok()
}

fn open_for_read(path: &Path) -> Option<(File, u64)> {
    let file = File::open(path)
        .inspect_err(|e| warn!(path = %path.display(), "cannot open for reading: {e}"))
        .ok()?;
    let len = file.metadata().ok()?.len();
    Some((file, len))
}

fn count_lines(path: &Path) -> usize {
    match std::fs::read_to_string(path) {
        Ok(text) => text.lines().filter(|l| !l.trim().is_empty()).count(),
        Err(e) => {
            debug!(path = %path.display(), "no manifest: {e}");
            0
        }
    }
}

fn cstr(data: &[u8]) -> String {
    let end = data.iter().position(|b| *b == 0).unwrap_or(data.len());
    String::from_utf8_lossy(&data[..end]).into_owned()
}

fn be_u16(data: &[u8], at: usize) -> u16 {
    match data.get(at..at + 2) {
        Some(b) => u16::from_be_bytes([b[0], b[1]]),
        None => 0,
    }
}

fn be_u32(data: &[u8], at: usize) -> u32 {
    match data.get(at..at + 4) {
        Some(b) => u32::from_be_bytes([b[0], b[1], b[2], b[3]]),
        None => 0,
    }
}
