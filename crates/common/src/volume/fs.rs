//! Filesystem operations on a volume.
//!
//! All of these are blocking and take volume-relative paths; every path is
//! passed through [`Volume::resolve`] before touching the disk. Callers on
//! an async runtime should run them on a blocking thread.

use std::fs::Metadata;
use std::path::Path;

use serde::Serialize;
use time::OffsetDateTime;

use super::{PathError, Volume};

/// Directory listings are truncated past this many entries
pub const MAX_LISTING_ENTRIES: usize = 1000;
/// Recursive walks stop descending past this depth
pub const MAX_WALK_DEPTH: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeEntry {
    pub name: String,
    /// Volume-relative path
    pub path: String,
    pub size: u64,
    pub is_dir: bool,
    pub mime_type: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub modified: Option<OffsetDateTime>,
}

impl VolumeEntry {
    pub fn from_metadata(path: &str, metadata: &Metadata) -> Self {
        let name = Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let mime_type = if metadata.is_dir() {
            "inode/directory".to_string()
        } else {
            mime_guess::from_path(path)
                .first_or_octet_stream()
                .essence_str()
                .to_string()
        };

        Self {
            name,
            path: path.to_string(),
            size: metadata.len(),
            is_dir: metadata.is_dir(),
            mime_type,
            modified: metadata.modified().ok().map(OffsetDateTime::from),
        }
    }
}

/// How search queries are matched against file names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SearchMode {
    #[default]
    Substring,
    /// Query characters must appear in order, not necessarily adjacent
    Fuzzy,
}

impl SearchMode {
    fn matches(&self, query: &str, name: &str) -> bool {
        match self {
            SearchMode::Substring => name.contains(query),
            SearchMode::Fuzzy => {
                let mut chars = name.chars();
                query.chars().all(|q| chars.any(|c| c == q))
            }
        }
    }
}

fn join_relative(base: &str, name: &str) -> String {
    let base = base.trim_end_matches('/');
    if base.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", base, name)
    }
}

impl Volume {
    pub fn entry(&self, path: &str) -> Result<VolumeEntry, PathError> {
        let resolved = self.resolve(path)?;
        let metadata = std::fs::metadata(resolved)?;
        Ok(VolumeEntry::from_metadata(path, &metadata))
    }

    /// List a directory: directories first, then by name, truncated at
    ///  [`MAX_LISTING_ENTRIES`].
    pub fn entries(&self, path: &str) -> Result<Vec<VolumeEntry>, PathError> {
        let resolved = self.resolve(path)?;

        let mut result = Vec::new();
        for dir_entry in std::fs::read_dir(resolved)? {
            let found = dir_entry.and_then(|entry| Ok((entry.metadata()?, entry)));
            let (metadata, dir_entry) = match found {
                Ok(found) => found,
                Err(e) => {
                    tracing::debug!(path, error = %e, "leaving unreadable entry out of listing");
                    continue;
                }
            };
            let name = dir_entry.file_name().to_string_lossy().into_owned();
            result.push(VolumeEntry::from_metadata(
                &join_relative(path, &name),
                &metadata,
            ));
        }

        result.sort_by(|a, b| b.is_dir.cmp(&a.is_dir).then_with(|| a.name.cmp(&b.name)));
        result.truncate(MAX_LISTING_ENTRIES);
        Ok(result)
    }

    /// Volume-relative paths of every regular file beneath `path`.
    ///
    /// Symlinks are not followed.
    pub fn walk_files(&self, path: &str) -> Result<Vec<String>, PathError> {
        let mut files = Vec::new();
        self.walk(path, |relative, _| {
            files.push(relative.to_string());
            true
        })?;
        Ok(files)
    }

    /// Find files beneath `path` whose lowercase name matches `query`.
    pub fn search(
        &self,
        path: &str,
        query: &str,
        mode: SearchMode,
        max_results: usize,
    ) -> Result<Vec<VolumeEntry>, PathError> {
        let query = query.to_lowercase();
        let mut results = Vec::new();
        if max_results == 0 {
            return Ok(results);
        }

        self.walk(path, |relative, metadata| {
            let name = Path::new(relative)
                .file_name()
                .map(|n| n.to_string_lossy().to_lowercase())
                .unwrap_or_default();
            if mode.matches(&query, &name) {
                results.push(VolumeEntry::from_metadata(relative, metadata));
            }
            results.len() < max_results
        })?;

        Ok(results)
    }

    /// Depth-first walk over regular files. The visitor returns `false`
    ///  to stop early.
    fn walk<F>(&self, path: &str, mut visit: F) -> Result<(), PathError>
    where
        F: FnMut(&str, &Metadata) -> bool,
    {
        let root = self.resolve(path)?;
        let mut stack = vec![(root, path.trim_end_matches('/').to_string(), 0usize)];

        while let Some((dir, relative, depth)) = stack.pop() {
            let read_dir = match std::fs::read_dir(&dir) {
                Ok(read_dir) => read_dir,
                Err(e) => {
                    tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable directory");
                    continue;
                }
            };

            for dir_entry in read_dir {
                let found = dir_entry.and_then(|entry| Ok((entry.file_type()?, entry)));
                let (file_type, dir_entry) = match found {
                    Ok(found) => found,
                    Err(e) => {
                        tracing::debug!(dir = %dir.display(), error = %e, "skipping unreadable entry");
                        continue;
                    }
                };
                let name = dir_entry.file_name().to_string_lossy().into_owned();
                let child = join_relative(&relative, &name);

                if file_type.is_dir() {
                    if depth + 1 < MAX_WALK_DEPTH {
                        stack.push((dir_entry.path(), child, depth + 1));
                    }
                } else if file_type.is_file() {
                    let metadata = match dir_entry.metadata() {
                        Ok(metadata) => metadata,
                        Err(e) => {
                            tracing::debug!(path = child, error = %e, "skipping vanished file");
                            continue;
                        }
                    };
                    if !visit(&child, &metadata) {
                        return Ok(());
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Privacy;

    fn fixture() -> (tempfile::TempDir, Volume) {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/nested")).unwrap();
        std::fs::write(dir.path().join("docs/readme.txt"), b"hello").unwrap();
        std::fs::write(dir.path().join("docs/nested/notes.md"), b"# notes").unwrap();
        std::fs::write(dir.path().join("zeta.bin"), b"\x00\x01").unwrap();
        let volume = Volume::new(
            "v",
            dir.path(),
            Privacy::Public,
            Vec::<String>::new(),
            Vec::<String>::new(),
        );
        (dir, volume)
    }

    #[test]
    fn test_entries_sorted_dirs_first() {
        let (_dir, volume) = fixture();
        let entries = volume.entries("").unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["docs", "zeta.bin"]);

        let entries = volume.entries("docs").unwrap();
        assert_eq!(entries[0].path, "docs/nested");
        assert!(entries[0].is_dir);
        assert_eq!(entries[1].path, "docs/readme.txt");
        assert_eq!(entries[1].mime_type, "text/plain");
        assert_eq!(entries[1].size, 5);
    }

    #[test]
    fn test_walk_files() {
        let (_dir, volume) = fixture();
        let mut files = volume.walk_files("docs").unwrap();
        files.sort();
        assert_eq!(files, vec!["docs/nested/notes.md", "docs/readme.txt"]);
    }

    #[test]
    fn test_search_modes() {
        let (_dir, volume) = fixture();
        let results = volume.search("", "README", SearchMode::Substring, 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].path, "docs/readme.txt");

        let results = volume.search("", "ntmd", SearchMode::Fuzzy, 10).unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].name, "notes.md");

        let results = volume.search("", "", SearchMode::Substring, 2).unwrap();
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_walk_skips_files_that_vanish() {
        let dir = tempfile::tempdir().unwrap();
        let names = ["a.txt", "b.txt", "c.txt"];
        for name in names {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }
        let volume = Volume::new(
            "v",
            dir.path(),
            Privacy::Public,
            Vec::<String>::new(),
            Vec::<String>::new(),
        );

        // The first visit removes every sibling out from under the walk
        let mut seen = Vec::new();
        volume
            .walk("", |relative, _| {
                if seen.is_empty() {
                    for name in names.iter().filter(|n| **n != relative) {
                        std::fs::remove_file(dir.path().join(name)).unwrap();
                    }
                }
                seen.push(relative.to_string());
                true
            })
            .unwrap();
        assert_eq!(seen.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_walk_does_not_follow_symlinks() {
        let (dir, volume) = fixture();
        let outside = tempfile::tempdir().unwrap();
        std::fs::write(outside.path().join("secret.txt"), b"nope").unwrap();
        std::os::unix::fs::symlink(outside.path(), dir.path().join("docs/escape")).unwrap();

        let files = volume.walk_files("").unwrap();
        assert!(files.iter().all(|f| !f.contains("secret")));
    }
}
