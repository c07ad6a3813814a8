//! Directory-wide maintenance: clear and prune
//!
//! Both walks visit children before their parent. Neither is transactional:
//! files written behind the walker survive, and a directory that refills
//! between being emptied and being removed is left in place.

use crate::errors::{io_error, Result};
use crate::store::{is_temp_file, FileStore};
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// What a walk removed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkReport {
    pub files_removed: usize,
    pub dirs_removed: usize,
}

/// Walks every shard directory under a cache root
#[derive(Debug, Clone)]
pub struct DirectoryWalker {
    root: PathBuf,
    store: FileStore,
}

impl DirectoryWalker {
    pub fn new(root: impl Into<PathBuf>, store: FileStore) -> Self {
        Self {
            root: root.into(),
            store,
        }
    }

    /// Remove every file and directory below the root, keeping the root
    pub fn clear(&self) -> Result<WalkReport> {
        let mut report = WalkReport::default();

        for entry in self.entries()? {
            let (path, is_dir) = match entry? {
                Some(entry) => entry,
                None => continue,
            };

            if is_dir {
                if remove_dir(&path)? {
                    report.dirs_removed += 1;
                }
            } else if self.store.delete(&path)? {
                report.files_removed += 1;
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            files = report.files_removed,
            dirs = report.dirs_removed,
            "cleared cache directory"
        );
        Ok(report)
    }

    /// Offer every item file to `visit` and remove directories left empty
    ///
    /// `visit` returns whether it removed the file. In-flight temporary
    /// files are not offered.
    pub fn prune<F>(&self, mut visit: F) -> Result<WalkReport>
    where
        F: FnMut(&Path) -> Result<bool>,
    {
        let mut report = WalkReport::default();

        for entry in self.entries()? {
            let (path, is_dir) = match entry? {
                Some(entry) => entry,
                None => continue,
            };

            if is_dir {
                if is_empty_dir(&path)? && remove_dir(&path)? {
                    report.dirs_removed += 1;
                }
                continue;
            }

            let is_temp = path
                .file_name()
                .and_then(|name| name.to_str())
                .is_some_and(is_temp_file);
            if is_temp {
                continue;
            }

            if visit(&path)? {
                report.files_removed += 1;
            }
        }

        tracing::debug!(
            root = %self.root.display(),
            files = report.files_removed,
            dirs = report.dirs_removed,
            "pruned cache directory"
        );
        Ok(report)
    }

    /// Children-first iterator over `(path, is_dir)` below the root
    ///
    /// Yields `Ok(None)` for entries that vanished while walking. An absent
    /// root yields nothing; a root that is a symlink to a directory is walked
    /// through the link.
    fn entries(&self) -> Result<impl Iterator<Item = Result<Option<(PathBuf, bool)>>>> {
        let present = match fs::metadata(&self.root) {
            Ok(meta) => meta.is_dir(),
            Err(e) if e.kind() == ErrorKind::NotFound => false,
            Err(e) => return Err(io_error(&self.root, "inspect cache root", e)),
        };

        let walk = WalkDir::new(&self.root)
            .min_depth(1)
            .contents_first(true)
            .into_iter()
            .take_while(move |_| present);

        Ok(walk.map(|entry| match entry {
            Ok(entry) => Ok(Some((entry.path().to_path_buf(), entry.file_type().is_dir()))),
            Err(err) => {
                let path = err.path().map(Path::to_path_buf).unwrap_or_default();
                match err.into_io_error() {
                    Some(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                    Some(e) => Err(io_error(path, "walk cache directory", e)),
                    None => Err(io_error(
                        path,
                        "walk cache directory",
                        io::Error::other("filesystem loop detected"),
                    )),
                }
            }
        }))
    }
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    match fs::read_dir(path) {
        Ok(mut entries) => Ok(entries.next().is_none()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(io_error(path, "read cache directory", e)),
    }
}

/// Remove an empty directory
///
/// A directory that is already gone or was refilled by a concurrent writer
/// is skipped and reported as not removed.
fn remove_dir(path: &Path) -> Result<bool> {
    match fs::remove_dir(path) {
        Ok(()) => Ok(true),
        Err(e) if matches!(e.kind(), ErrorKind::NotFound | ErrorKind::DirectoryNotEmpty) => {
            tracing::debug!(path = %path.display(), error = %e, "skipped directory removal");
            Ok(false)
        }
        Err(e) => Err(io_error(path, "remove cache directory", e)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::SystemTime;
    use tempfile::TempDir;

    fn walker(root: &Path) -> DirectoryWalker {
        DirectoryWalker::new(root, FileStore::new(SystemTime::UNIX_EPOCH, None))
    }

    fn populate(root: &Path) {
        for rel in ["a/4/one", "a/4/two", "f/0/three", "f/1/.pending.tmp"] {
            let path = root.join(rel);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(&path, rel).unwrap();
        }
    }

    #[test]
    fn test_clear_missing_root_is_noop() {
        let temp_dir = TempDir::new().unwrap();
        let report = walker(&temp_dir.path().join("no/such/dir")).clear().unwrap();
        assert_eq!(report, WalkReport::default());
    }

    #[test]
    fn test_clear_empties_but_keeps_root() {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path());

        let report = walker(temp_dir.path()).clear().unwrap();

        assert_eq!(report.files_removed, 4);
        assert_eq!(report.dirs_removed, 5);
        assert!(temp_dir.path().is_dir());
        assert_eq!(fs::read_dir(temp_dir.path()).unwrap().count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_clear_walks_through_symlinked_root() {
        let temp_dir = TempDir::new().unwrap();
        let real = temp_dir.path().join("real");
        let link = temp_dir.path().join("link");
        fs::create_dir(&real).unwrap();
        std::os::unix::fs::symlink(&real, &link).unwrap();
        populate(&real);

        let report = walker(&link).clear().unwrap();

        assert_eq!(report.files_removed, 4);
        assert!(link.is_dir());
        assert_eq!(fs::read_dir(&real).unwrap().count(), 0);
    }

    #[test]
    fn test_prune_offers_item_files_only() {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path());
        let mut seen = Vec::new();

        walker(temp_dir.path())
            .prune(|path| {
                seen.push(path.file_name().unwrap().to_string_lossy().to_string());
                Ok(false)
            })
            .unwrap();

        seen.sort();
        assert_eq!(seen, vec!["one", "three", "two"]);
    }

    #[test]
    fn test_prune_removes_directories_it_emptied() {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path());

        let report = walker(temp_dir.path())
            .prune(|path| {
                fs::remove_file(path).unwrap();
                Ok(true)
            })
            .unwrap();

        assert_eq!(report.files_removed, 3);
        // f/1 still holds the temporary file
        assert!(temp_dir.path().join("f/1").is_dir());
        assert!(!temp_dir.path().join("a").exists());
        assert!(!temp_dir.path().join("f/0").exists());
    }

    #[test]
    fn test_prune_propagates_visitor_errors() {
        let temp_dir = TempDir::new().unwrap();
        populate(temp_dir.path());

        let result = walker(temp_dir.path()).prune(|path| {
            Err(io_error(path, "read cache file", io::Error::other("disk on fire")))
        });

        assert!(result.is_err());
    }

    #[test]
    fn test_refilled_directory_is_skipped() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path().join("a");
        fs::create_dir(&dir).unwrap();
        fs::write(dir.join("late"), b"x").unwrap();

        assert!(!remove_dir(&dir).unwrap());
        assert!(!remove_dir(&temp_dir.path().join("gone")).unwrap());
    }
}
