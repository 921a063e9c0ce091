//! Project pinned-versions manifest.
//!
//! A project roots at the nearest directory containing `kiln.lock`, a toml
//! file whose `[versions]` table pins exact package versions. The catalog
//! feeds these pins to the solver as the previous solution.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PackageName;

/// File name of the project manifest.
pub const MANIFEST_FILE: &str = "kiln.lock";

#[derive(Error, Debug)]
pub enum ProjectError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Manifest {
    #[serde(default)]
    versions: BTreeMap<String, String>,
}

/// An active project directory with a pinned-versions manifest.
#[derive(Debug, Clone)]
pub struct Project {
    root: PathBuf,
}

impl Project {
    /// Open a project rooted at `root`. The manifest need not exist yet.
    pub fn at(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// Walk up from `start` looking for a `kiln.lock`.
    pub fn discover(start: &Path) -> Option<Self> {
        let mut dir = start;
        loop {
            if dir.join(MANIFEST_FILE).is_file() {
                return Some(Self::at(dir));
            }
            dir = dir.parent()?;
        }
    }

    pub fn root_dir(&self) -> &Path {
        &self.root
    }

    fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_FILE)
    }

    /// The project's current pinned versions. A missing manifest reads as
    /// an empty map.
    pub fn versions(&self) -> Result<BTreeMap<PackageName, String>, ProjectError> {
        let path = self.manifest_path();
        if !path.is_file() {
            return Ok(BTreeMap::new());
        }
        let manifest: Manifest = toml::from_str(&fs::read_to_string(path)?)?;
        Ok(manifest
            .versions
            .into_iter()
            .map(|(name, version)| (PackageName::new(&name), version))
            .collect())
    }

    /// Replace the pinned versions with `versions`.
    pub fn store_versions(
        &self,
        versions: &BTreeMap<PackageName, String>,
    ) -> Result<(), ProjectError> {
        let manifest = Manifest {
            versions: versions
                .iter()
                .map(|(name, version)| (name.to_string(), version.clone()))
                .collect(),
        };
        fs::write(self.manifest_path(), toml::to_string_pretty(&manifest)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_versions_roundtrip() {
        let dir = tempdir().unwrap();
        let project = Project::at(dir.path());

        let mut versions = BTreeMap::new();
        versions.insert(PackageName::new("alpha"), "1.0.0".to_string());
        versions.insert(PackageName::new("beta"), "2.3.1".to_string());
        project.store_versions(&versions).unwrap();

        let loaded = project.versions().unwrap();
        assert_eq!(loaded, versions);
    }

    #[test]
    fn test_missing_manifest_is_empty() {
        let dir = tempdir().unwrap();
        let project = Project::at(dir.path());
        assert!(project.versions().unwrap().is_empty());
    }

    #[test]
    fn test_discover_walks_up() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(MANIFEST_FILE), "[versions]\n").unwrap();
        let nested = dir.path().join("a/b");
        fs::create_dir_all(&nested).unwrap();

        let project = Project::discover(&nested).unwrap();
        assert_eq!(project.root_dir(), dir.path());
    }
}
