//! Directory enumeration used by listing requests.

use std::io;
use std::path::Path;
use std::time::UNIX_EPOCH;

use crate::flags::EntryFlags;

/// One listing entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub size: u64,
    /// Modification time, seconds since the Unix epoch.
    pub modified: u32,
    pub flags: EntryFlags,
}

/// Filesystem capability consumed by the transfer engine.
pub trait Directory: Send {
    /// Entries of `path`, sorted by name.
    fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>>;

    fn exists(&self, path: &Path) -> bool;

    fn is_file(&self, path: &Path) -> bool;
}

/// [`Directory`] over `std::fs`.
#[derive(Debug, Clone, Copy, Default)]
pub struct FsDirectory;

impl Directory for FsDirectory {
    fn list(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        let mut entries = Vec::new();
        for entry in std::fs::read_dir(path)? {
            let entry = entry?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let link = entry.file_type()?.is_symlink();
            // Follow links for size and type; a dangling link lists as empty.
            let meta = match std::fs::metadata(entry.path()) {
                Ok(meta) => meta,
                Err(_) if link => entry.metadata()?,
                Err(e) => return Err(e),
            };

            let mut flags = if meta.is_dir() {
                EntryFlags::DIRECTORY
            } else {
                EntryFlags::for_file_name(&name)
            };
            if link {
                flags |= EntryFlags::LINK;
            }
            let modified = meta
                .modified()
                .ok()
                .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
                .map(|d| d.as_secs().min(u32::MAX as u64) as u32)
                .unwrap_or(0);

            entries.push(DirEntry {
                name,
                size: if meta.is_dir() { 0 } else { meta.len() },
                modified,
                flags,
            });
        }
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_file(&self, path: &Path) -> bool {
        path.is_file()
    }
}
