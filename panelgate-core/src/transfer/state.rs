//! Per-connection bookkeeping of the file-transfer sub-protocol.

use std::fs::File;
use std::io::{Read, Write};
use std::path::PathBuf;

use bytes::Bytes;
use tracing::warn;

/// Integer percentage of `done` out of `total`, rounded toward zero.
///
/// An empty total counts as complete.
pub fn percent(done: u64, total: u64) -> u8 {
    if total == 0 {
        return 100;
    }
    (done.min(total) * 100 / total) as u8
}

/// File being written from controller chunks.
#[derive(Debug)]
pub struct Incoming {
    pub name: String,
    pub path: PathBuf,
    /// `None` once the file is closed or could not be opened.
    pub file: Option<File>,
    pub position: u64,
    pub length: u64,
    pub last_percent: Option<u8>,
}

impl Incoming {
    /// Append a chunk, never writing past the announced length.
    ///
    /// Returns the number of bytes accounted.
    pub fn append(&mut self, chunk: &[u8]) -> usize {
        let room = self.length.saturating_sub(self.position) as usize;
        let take = if chunk.len() > room {
            warn!(
                file = %self.name,
                extra = chunk.len() - room,
                "chunk overruns announced length; truncating"
            );
            room
        } else {
            chunk.len()
        };
        if let Some(file) = self.file.as_mut()
            && let Err(e) = file.write_all(&chunk[..take])
        {
            warn!(file = %self.name, "write failed: {e}; continuing without data");
            self.file = None;
        }
        self.position += take as u64;
        take
    }

    pub fn is_complete(&self) -> bool {
        self.position >= self.length
    }

    pub fn percent(&self) -> u8 {
        percent(self.position, self.length)
    }

    /// Flush and close the handle. Returns `true` when data was written
    /// through an open handle.
    pub fn close(&mut self) -> bool {
        match self.file.take() {
            Some(file) => {
                if let Err(e) = file.sync_all() {
                    warn!(file = %self.name, "sync failed: {e}");
                }
                true
            }
            None => false,
        }
    }
}

/// Where outbound content comes from.
#[derive(Debug)]
pub enum Source {
    File(File),
    Memory(Bytes),
}

/// File being pulled by the controller.
#[derive(Debug)]
pub struct Outgoing {
    pub name: String,
    pub source: Option<Source>,
    pub position: u64,
    pub length: u64,
    pub chunk: usize,
}

impl Outgoing {
    /// Read the next chunk. `None` at end of file or after a read failure.
    pub fn next_chunk(&mut self) -> Option<Bytes> {
        if self.position >= self.length {
            return None;
        }
        let want = (self.length - self.position).min(self.chunk as u64) as usize;
        let chunk = match self.source.as_mut()? {
            Source::Memory(data) => {
                let start = self.position as usize;
                data.slice(start..start + want)
            }
            Source::File(file) => {
                let mut buf = vec![0u8; want];
                if let Err(e) = file.read_exact(&mut buf) {
                    warn!(file = %self.name, "read failed: {e}; ending transfer");
                    self.source = None;
                    self.position = self.length;
                    return None;
                }
                Bytes::from(buf)
            }
        };
        self.position += chunk.len() as u64;
        Some(chunk)
    }
}

/// Counters and handles for one connection.
#[derive(Debug, Default)]
pub struct FileTransferState {
    /// Files expected in the session (manifest lines or announced count).
    pub total_files: usize,
    /// Files started in the session.
    pub active_files: usize,
    pub active_deletes: usize,
    pub delete_percent: Option<u8>,
    pub manifest_counted: bool,
    pub receive: Option<Incoming>,
    pub send: Option<Outgoing>,
}

impl FileTransferState {
    /// Drop both handles and zero the counters.
    pub fn reset(&mut self) {
        if let Some(mut rx) = self.receive.take() {
            rx.close();
        }
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percent_rounds_down() {
        assert_eq!(percent(0, 3), 0);
        assert_eq!(percent(1, 3), 33);
        assert_eq!(percent(2, 3), 66);
        assert_eq!(percent(3, 3), 100);
        assert_eq!(percent(5, 3), 100);
        assert_eq!(percent(0, 0), 100);
    }

    #[test]
    fn memory_source_chunks() {
        let mut send = Outgoing {
            name: "v".into(),
            source: Some(Source::Memory(Bytes::from_static(b"abcdefg"))),
            position: 0,
            length: 7,
            chunk: 3,
        };
        assert_eq!(send.next_chunk().unwrap(), &b"abc"[..]);
        assert_eq!(send.next_chunk().unwrap(), &b"def"[..]);
        assert_eq!(send.next_chunk().unwrap(), &b"g"[..]);
        assert!(send.next_chunk().is_none());
    }

    #[test]
    fn receive_without_handle_still_counts() {
        let mut rx = Incoming {
            name: "x".into(),
            path: PathBuf::from("/nonexistent/x"),
            file: None,
            position: 0,
            length: 4,
            last_percent: None,
        };
        assert_eq!(rx.append(b"ab"), 2);
        assert_eq!(rx.percent(), 50);
        assert_eq!(rx.append(b"cdef"), 2);
        assert!(rx.is_complete());
        assert!(!rx.close());
    }
}
