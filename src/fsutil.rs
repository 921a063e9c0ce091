//! Filesystem helpers: directory scans and the read-and-watch primitive.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// List the immediate subdirectories of `dir`, sorted by name.
///
/// A missing path, a file, or an unreadable entry yields an empty or
/// shortened list rather than an error.
pub fn subdirectories(dir: &Path) -> Vec<PathBuf> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut dirs: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .map(|e| e.path())
        .filter(|p| p.is_dir())
        .collect();
    dirs.sort();
    dirs
}

/// Resolve a path to absolute without touching the filesystem beyond cwd.
pub fn absolutize(path: &Path) -> io::Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()?.join(path))
    }
}

fn file_digest(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    Some(blake3::hash(&bytes).to_hex().to_string())
}

/// Records the files read during a refresh together with their content
/// digests, so a caller can poll for changes and trigger another refresh.
#[derive(Debug, Default, Clone)]
pub struct WatchSet {
    files: BTreeMap<PathBuf, Option<String>>,
}

impl WatchSet {
    /// Forget all watched files.
    pub fn clear(&mut self) {
        self.files.clear();
    }

    /// Record `path` with its current digest (`None` if unreadable).
    pub fn note(&mut self, path: &Path) {
        self.files.insert(path.to_path_buf(), file_digest(path));
    }

    /// True if any watched file changed, appeared, or disappeared since it
    /// was noted.
    pub fn is_dirty(&self) -> bool {
        self.files
            .iter()
            .any(|(path, digest)| &file_digest(path) != digest)
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_subdirectories_skips_files_and_missing() {
        let dir = tempdir().unwrap();
        fs::create_dir(dir.path().join("b")).unwrap();
        fs::create_dir(dir.path().join("a")).unwrap();
        fs::write(dir.path().join("stray.txt"), b"x").unwrap();

        let subs = subdirectories(dir.path());
        assert_eq!(subs.len(), 2);
        assert!(subs[0].ends_with("a"));
        assert!(subs[1].ends_with("b"));

        assert!(subdirectories(&dir.path().join("nope")).is_empty());
    }

    #[test]
    fn test_watch_set_dirtiness() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("package.toml");
        fs::write(&file, b"one").unwrap();

        let mut watch = WatchSet::default();
        watch.note(&file);
        assert!(!watch.is_dirty());

        fs::write(&file, b"two").unwrap();
        assert!(watch.is_dirty());
    }

    #[test]
    fn test_watch_set_tracks_missing_files() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("absent.toml");

        let mut watch = WatchSet::default();
        watch.note(&file);
        assert!(!watch.is_dirty());

        fs::write(&file, b"now present").unwrap();
        assert!(watch.is_dirty());
    }
}
