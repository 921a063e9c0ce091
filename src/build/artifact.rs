//! On-disk built package artifacts.
//!
//! A build of local package `name` lives in `<sourceDir>/.build.<name>/`
//! as a single postcard-encoded file. Artifacts are anchored to the source
//! tree they were built from; an artifact found under a different tree is
//! treated as absent.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::PackageName;

/// File name of the serialized artifact inside the build directory.
pub const ARTIFACT_FILE: &str = "built.bin";

#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Postcard(#[from] postcard::Error),
}

/// The product of compiling a package source tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuiltPackage {
    pub name: PackageName,
    /// The declared version of the source this was built from.
    pub version: String,
    /// Architectures this build serves.
    pub architectures: Vec<String>,
    /// Digest of the source tree at compile time.
    pub source_digest: String,
    /// Local versions of the local build-order dependencies at compile
    /// time.
    pub dep_versions: BTreeMap<PackageName, String>,
    /// Version of the tool that produced the build.
    pub tool_version: String,
    /// The source tree this artifact was built from.
    pub build_of: PathBuf,
}

impl BuiltPackage {
    pub fn architectures(&self) -> &[String] {
        &self.architectures
    }

    /// Load an artifact from `dir`, anchored at `build_of`.
    ///
    /// Returns `None` for a missing directory, an unreadable or corrupt
    /// file, a name mismatch, or an artifact built from a different source
    /// tree. Loading never fails hard; a bad cache entry just means a
    /// rebuild.
    pub fn init_from_path(name: &PackageName, dir: &Path, build_of: &Path) -> Option<Self> {
        let bytes = fs::read(dir.join(ARTIFACT_FILE)).ok()?;
        let artifact: BuiltPackage = postcard::from_bytes(&bytes).ok()?;
        if &artifact.name != name || artifact.build_of != build_of {
            return None;
        }
        Some(artifact)
    }

    /// Persist the artifact into `dir`, creating it as needed.
    pub fn save_to_path(&self, dir: &Path) -> Result<(), ArtifactError> {
        fs::create_dir_all(dir)?;
        fs::write(dir.join(ARTIFACT_FILE), postcard::to_allocvec(self)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample(name: &str, build_of: &Path) -> BuiltPackage {
        BuiltPackage {
            name: PackageName::new(name),
            version: "1.0.0".to_string(),
            architectures: vec!["x86_64".to_string()],
            source_digest: "digest".to_string(),
            dep_versions: BTreeMap::new(),
            tool_version: "0.3.1".to_string(),
            build_of: build_of.to_path_buf(),
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("alpha");
        let build_dir = source.join(".build.alpha");

        let artifact = sample("alpha", &source);
        artifact.save_to_path(&build_dir).unwrap();

        let loaded =
            BuiltPackage::init_from_path(&PackageName::new("alpha"), &build_dir, &source).unwrap();
        assert_eq!(loaded, artifact);
    }

    #[test]
    fn test_missing_directory_is_absent() {
        let dir = tempdir().unwrap();
        let loaded = BuiltPackage::init_from_path(
            &PackageName::new("alpha"),
            &dir.path().join("nope"),
            dir.path(),
        );
        assert!(loaded.is_none());
    }

    #[test]
    fn test_moved_source_tree_is_absent() {
        let dir = tempdir().unwrap();
        let source = dir.path().join("alpha");
        let build_dir = source.join(".build.alpha");
        sample("alpha", &source).save_to_path(&build_dir).unwrap();

        let elsewhere = dir.path().join("elsewhere");
        let loaded =
            BuiltPackage::init_from_path(&PackageName::new("alpha"), &build_dir, &elsewhere);
        assert!(loaded.is_none());
    }

    #[test]
    fn test_corrupt_artifact_is_absent() {
        let dir = tempdir().unwrap();
        let build_dir = dir.path().join(".build.alpha");
        fs::create_dir_all(&build_dir).unwrap();
        fs::write(build_dir.join(ARTIFACT_FILE), b"garbage").unwrap();

        let loaded =
            BuiltPackage::init_from_path(&PackageName::new("alpha"), &build_dir, dir.path());
        assert!(loaded.is_none());
    }
}
