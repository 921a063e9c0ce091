//! In-memory package catalogs.
//!
//! A catalog is a queryable view over three collections: packages,
//! versions, and builds. [`CatalogData`] is the plain value holding the
//! collections; [`ServerCatalog`] projects the remote registry and
//! [`CompleteCatalog`] merges it with local source trees (local wins).

pub mod complete;
mod local;
pub mod server;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::build::CompileError;
use crate::build::artifact::ArtifactError;
use crate::project::ProjectError;
use crate::resolver::ResolveError;
use crate::snapshot::{Snapshot, SnapshotError};
use crate::source::SourceError;
use crate::types::{PackageName, VersionId};

pub use complete::{CatalogConfig, CompleteCatalog, InitOptions};
pub use server::ServerCatalog;

/// The process-wide catalog pair: the server projection (`official`) and
/// the merged view (`complete`). Constructed once at program start and
/// passed by reference.
pub struct Catalogs {
    pub official: ServerCatalog,
    pub complete: CompleteCatalog,
}

impl Catalogs {
    pub fn new(official: ServerCatalog, complete: CompleteCatalog) -> Self {
        Self { official, complete }
    }
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("catalog has not been initialized")]
    NotInitialized,

    #[error("local package '{name}' is already registered at {}", existing.display())]
    DuplicateLocalPackage {
        name: PackageName,
        existing: PathBuf,
    },

    #[error("no local package named '{0}'")]
    NoSuchLocalPackage(PackageName),

    #[error("a version is required to locate non-local package '{0}'")]
    MissingVersion(PackageName),

    #[error("local package '{name}' declares version '{version}', which already carries a build suffix")]
    MalformedLocalVersion { name: PackageName, version: String },

    #[error(
        "version mismatch for local package '{name}': build order pins {pinned}, source declares {declared}"
    )]
    InternalInconsistency {
        name: PackageName,
        pinned: String,
        declared: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error(transparent)]
    Artifact(#[from] ArtifactError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Project(#[from] ProjectError),
}

/// One record per distinct package name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub name: PackageName,
    #[serde(default)]
    pub maintainers: Vec<String>,
    #[serde(default)]
    pub last_updated: Option<i64>,
}

/// A dependency edge carried by a version record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dependency {
    /// Requirement string, `None` when unconstrained.
    #[serde(default)]
    pub constraint: Option<String>,
    /// Weak dependencies constrain the chosen version without forcing the
    /// package into the solution.
    #[serde(default)]
    pub weak: bool,
}

/// One concrete version of a package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub package_name: PackageName,
    /// Semver-like string, optionally suffixed `+<buildId>`. Locally
    /// synthesised versions always end in `+local`.
    pub version: String,
    #[serde(default)]
    pub earliest_compatible_version: Option<String>,
    #[serde(default)]
    pub dependencies: BTreeMap<PackageName, Dependency>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_test: bool,
    #[serde(default)]
    pub contains_plugins: bool,
    #[serde(default)]
    pub test_name: Option<PackageName>,
}

/// An architecture-specific binary build of a version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Build {
    pub package_name: PackageName,
    pub version_id: VersionId,
    pub architecture: String,
    #[serde(default)]
    pub published: Option<i64>,
    #[serde(default)]
    pub built_by: Option<String>,
}

/// Strip any `+<buildId>` suffix from a version string.
pub fn base_version(version: &str) -> &str {
    version.split('+').next().unwrap_or(version)
}

fn parse_base(version: &str) -> Option<semver::Version> {
    semver::Version::parse(base_version(version)).ok()
}

/// The three indexed collections every catalog holds.
///
/// `CatalogData` is produced whole by a refresh and swapped into the
/// owning catalog, so clients always observe a consistent value.
#[derive(Debug, Default, Clone)]
pub struct CatalogData {
    packages: BTreeMap<PackageName, Package>,
    versions: BTreeMap<VersionId, Version>,
    by_package: BTreeMap<PackageName, Vec<VersionId>>,
    builds: Vec<Build>,
}

impl CatalogData {
    /// Build a catalog value from a server snapshot.
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let mut data = Self::default();
        data.insert_server_packages(snapshot);
        data
    }

    /// Clear all three collections.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Ingest a server snapshot's collections as-is; the snapshot is
    /// trusted to be internally consistent.
    pub fn insert_server_packages(&mut self, snapshot: &Snapshot) {
        for package in &snapshot.collections.packages {
            self.push_package(package.clone());
        }
        for version in &snapshot.collections.versions {
            self.push_version(version.clone());
        }
        for build in &snapshot.collections.builds {
            self.push_build(build.clone());
        }
    }

    pub fn push_package(&mut self, package: Package) {
        self.packages.insert(package.name.clone(), package);
    }

    pub fn push_version(&mut self, version: Version) {
        self.by_package
            .entry(version.package_name.clone())
            .or_default()
            .push(version.id.clone());
        self.versions.insert(version.id.clone(), version);
    }

    pub fn push_build(&mut self, build: Build) {
        self.builds.push(build);
    }

    /// Look up a package by name.
    pub fn get_package(&self, name: &PackageName) -> Option<&Package> {
        self.packages.get(name)
    }

    /// Look up a version by package name and full version string.
    pub fn get_version(&self, name: &PackageName, version: &str) -> Option<&Version> {
        self.by_package.get(name)?.iter().find_map(|id| {
            let v = self.versions.get(id)?;
            (v.version == version).then_some(v)
        })
    }

    /// The id of the latest version of `name`, by semver order ignoring
    /// any build suffix.
    pub fn get_latest_version(&self, name: &PackageName) -> Option<&VersionId> {
        self.versions_of(name)
            .max_by_key(|v| parse_base(&v.version))
            .map(|v| &v.id)
    }

    /// All builds recorded for a version id.
    pub fn get_all_builds(&self, version_id: &VersionId) -> Vec<&Build> {
        self.builds
            .iter()
            .filter(|b| &b.version_id == version_id)
            .collect()
    }

    pub fn get_version_by_id(&self, id: &VersionId) -> Option<&Version> {
        self.versions.get(id)
    }

    /// All version records of a package.
    pub fn versions_of<'a>(&'a self, name: &PackageName) -> impl Iterator<Item = &'a Version> + 'a {
        self.by_package
            .get(name)
            .into_iter()
            .flatten()
            .filter_map(|id| self.versions.get(id))
    }

    pub fn package_names(&self) -> impl Iterator<Item = &PackageName> {
        self.packages.keys()
    }

    pub fn package_count(&self) -> usize {
        self.packages.len()
    }

    pub fn version_count(&self) -> usize {
        self.versions.len()
    }

    pub fn builds(&self) -> &[Build] {
        &self.builds
    }

    /// Remove every package, version, and build belonging to `names`.
    ///
    /// Versions are removed first and their ids collected, so builds can
    /// be dropped by id; this keeps referential integrity regardless of
    /// what the snapshot contained.
    pub fn purge_packages(&mut self, names: &BTreeSet<PackageName>) {
        let mut removed_ids: BTreeSet<VersionId> = BTreeSet::new();
        self.versions.retain(|id, version| {
            if names.contains(&version.package_name) {
                removed_ids.insert(id.clone());
                false
            } else {
                true
            }
        });
        self.builds.retain(|b| !removed_ids.contains(&b.version_id));
        for name in names {
            self.packages.remove(name);
            self.by_package.remove(name);
        }
    }
}
