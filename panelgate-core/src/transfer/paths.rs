//! Logical transfer paths to local filesystem paths.

use std::path::{Component, Path, PathBuf};

/// Logical root naming the panel's asset tree.
pub const PANEL_ROOT: &str = "AMXPanel";

/// Logical root of system files, stored under the asset tree.
pub const SYSTEM_ROOT: &str = "__system";

/// Maps `AMXPanel/...` and `__system/...` onto the local asset root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetRoot {
    root: PathBuf,
}

impl AssetRoot {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Resolve a logical path.
    ///
    /// Returns `None` for unknown roots and for anything that would leave
    /// the asset tree.
    pub fn resolve(&self, logical: &str) -> Option<PathBuf> {
        let logical = normalize(logical);
        let (head, rest) = logical.split_once('/').unwrap_or((logical, ""));
        let mut path = match head {
            PANEL_ROOT => self.root.clone(),
            SYSTEM_ROOT => self.root.join(SYSTEM_ROOT),
            _ => return None,
        };
        for part in rest.split('/').filter(|p| !p.is_empty() && *p != ".") {
            if part.contains('\\') {
                return None;
            }
            match Path::new(part).components().next() {
                Some(Component::Normal(_)) => path.push(part),
                _ => return None,
            }
        }
        Some(path)
    }
}

/// Logical name with the leading slash and NUL padding removed.
pub fn normalize(logical: &str) -> &str {
    logical.trim_end_matches('\0').trim_start_matches('/')
}
