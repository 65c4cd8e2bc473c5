//! Secure path resolution.
//!
//! Every filesystem access made on behalf of a request goes through
//! [`Volume::resolve`]. The request path is normalized lexically first, then
//! the longest existing prefix is canonicalized so symlinks are followed by
//! the OS (which bounds link chains with `ELOOP`), and the result must still
//! sit under the canonical volume root. Anything else fails closed.

use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};

use super::Volume;

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("path escapes volume root: {0:?}")]
    Escape(String),
    #[error("io error while resolving path: {0}")]
    Io(#[from] io::Error),
}

impl Volume {
    /// Map a volume-relative path to an absolute path under the volume root.
    ///
    /// Intermediate segments need not exist, so this is also used to pick
    ///  destinations for writes.
    pub fn resolve(&self, relative: &str) -> Result<PathBuf, PathError> {
        let normalized = normalize(relative)?;
        // Canonicalized per call: the root may only appear after startup
        let root = std::fs::canonicalize(self.root())?;
        let joined = root.join(&normalized);

        let resolved = canonicalize_existing_prefix(&joined)?;
        if !resolved.starts_with(&root) {
            tracing::warn!(
                volume = %self.name(),
                path = relative,
                "path resolves outside of volume root"
            );
            return Err(PathError::Escape(relative.to_string()));
        }

        Ok(resolved)
    }
}

/// Lexically normalize a request path: drop `.` and empty segments, apply
///  `..` against what came before, and refuse anything that would climb
///  above the start or override the root.
pub(crate) fn normalize(relative: &str) -> Result<PathBuf, PathError> {
    if relative.contains('\0') {
        return Err(PathError::Escape(relative.to_string()));
    }

    let mut segments: Vec<OsString> = Vec::new();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(segment) => segments.push(segment.to_os_string()),
            Component::CurDir => {}
            Component::ParentDir => {
                if segments.pop().is_none() {
                    return Err(PathError::Escape(relative.to_string()));
                }
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::Escape(relative.to_string()));
            }
        }
    }

    Ok(segments.iter().collect())
}

/// Canonicalize the deepest ancestor that exists and re-append the
///  missing tail. The tail holds only normal segments at this point.
fn canonicalize_existing_prefix(path: &Path) -> Result<PathBuf, PathError> {
    let mut existing = path.to_path_buf();
    let mut missing: Vec<OsString> = Vec::new();

    loop {
        match std::fs::symlink_metadata(&existing) {
            Ok(_) => break,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let Some(name) = existing.file_name() else {
                    break;
                };
                missing.push(name.to_os_string());
                if !existing.pop() {
                    break;
                }
            }
            Err(e) => return Err(e.into()),
        }
    }

    let mut base = match std::fs::canonicalize(&existing) {
        Ok(base) => base,
        // Dangling symlink: refuse rather than guess where it points
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(PathError::Escape(path.to_string_lossy().into_owned()));
        }
        Err(e) => return Err(e.into()),
    };
    for segment in missing.iter().rev() {
        base.push(segment);
    }
    Ok(base)
}
