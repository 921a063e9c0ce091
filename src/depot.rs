//! The depot: on-disk store of downloaded package builds.
//!
//! Non-local packages resolve to `<depot>/<name>/<version>/` once their
//! builds have been fetched. The catalog only probes these paths; fetching
//! is someone else's job.

use std::path::{Path, PathBuf};

use crate::types::PackageName;

#[derive(Debug, Clone)]
pub struct Depot {
    root: PathBuf,
}

impl Depot {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The directory a given package version would occupy.
    pub fn package_path(&self, name: &PackageName, version: &str) -> PathBuf {
        self.root.join(name.as_str()).join(version)
    }

    /// True if the package version is present on disk.
    pub fn has_package(&self, name: &PackageName, version: &str) -> bool {
        self.package_path(name, version).is_dir()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_package_path_layout() {
        let depot = Depot::new(PathBuf::from("/store"));
        let path = depot.package_path(&PackageName::new("alpha"), "1.0.0");
        assert_eq!(path, PathBuf::from("/store/alpha/1.0.0"));
    }

    #[test]
    fn test_has_package_probes_disk() {
        let dir = tempdir().unwrap();
        let depot = Depot::new(dir.path().to_path_buf());
        let name = PackageName::new("alpha");

        assert!(!depot.has_package(&name, "1.0.0"));
        std::fs::create_dir_all(depot.package_path(&name, "1.0.0")).unwrap();
        assert!(depot.has_package(&name, "1.0.0"));
    }
}
