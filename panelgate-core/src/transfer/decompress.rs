//! In-place decompression of received assets.

use std::fs::File;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};

use flate2::read::GzDecoder;
use tracing::warn;

/// First two bytes of a gzip stream.
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Decompression capability consumed by the transfer engine.
pub trait Decompressor: Send {
    /// Replace the compressed file at `path` with its decompressed content.
    fn decompress_in_place(&self, path: &Path) -> io::Result<()>;
}

/// Gzip [`Decompressor`] backed by `flate2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct GzipDecompressor;

impl Decompressor for GzipDecompressor {
    fn decompress_in_place(&self, path: &Path) -> io::Result<()> {
        let compressed = sibling(path, "gz");
        std::fs::rename(path, &compressed)?;

        let result = (|| {
            let mut decoder = GzDecoder::new(BufReader::new(File::open(&compressed)?));
            let mut out = BufWriter::new(File::create(path)?);
            io::copy(&mut decoder, &mut out)?;
            out.into_inner().map_err(|e| e.into_error())?.sync_all()
        })();

        match result {
            Ok(()) => std::fs::remove_file(&compressed),
            Err(e) => {
                restore(&compressed, path);
                Err(e)
            }
        }
    }
}

/// Move the compressed upload back to `path`. `false` when it stays at
/// `compressed`.
fn restore(compressed: &Path, path: &Path) -> bool {
    match std::fs::rename(compressed, path) {
        Ok(()) => true,
        Err(e) => {
            warn!(
                from = %compressed.display(),
                to = %path.display(),
                "cannot restore compressed upload: {e}"
            );
            false
        }
    }
}

/// `path` with `.ext` appended to the file name.
fn sibling(path: &Path, ext: &str) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".");
    name.push(ext);
    path.with_file_name(name)
}

/// `true` when the file at `path` starts with the gzip magic.
pub fn is_gzip(path: &Path) -> bool {
    use std::io::Read;
    let mut magic = [0u8; 2];
    File::open(path)
        .and_then(|mut f| f.read_exact(&mut magic))
        .map(|_| magic == GZIP_MAGIC)
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn gunzips_and_removes_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page.xml");
        let mut enc = GzEncoder::new(Vec::new(), Compression::default());
        enc.write_all(b"<page name=\"main\"/>").unwrap();
        std::fs::write(&path, enc.finish().unwrap()).unwrap();

        assert!(is_gzip(&path));
        GzipDecompressor.decompress_in_place(&path).unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"<page name=\"main\"/>");
        assert!(!dir.path().join("page.xml.gz").exists());
        assert!(!is_gzip(&path));
    }

    #[test]
    fn corrupt_stream_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        std::fs::write(&path, [0x1f, 0x8b, 0x00, 0x01]).unwrap();

        assert!(GzipDecompressor.decompress_in_place(&path).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), [0x1f, 0x8b, 0x00, 0x01]);
    }

    #[test]
    fn failed_restore_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let compressed = dir.path().join("gone.gz");
        let path = dir.path().join("gone");

        assert!(!restore(&compressed, &path));
        assert!(!path.exists());
    }

    #[test]
    fn short_file_is_not_gzip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one");
        std::fs::write(&path, [0x1f]).unwrap();
        assert!(!is_gzip(&path));
    }
}
