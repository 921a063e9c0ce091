//! Lazy building of local packages.
//!
//! Packages are compiled on first use, after their build-order
//! dependencies. Finished builds are cached under the source tree and
//! reused while they stay current.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::Path;

use crate::build::artifact::{ArtifactError, BuiltPackage};
use crate::catalog::complete::CompleteCatalog;
use crate::catalog::{base_version, Build, CatalogError};
use crate::source::PackageSource;
use crate::types::PackageName;
use crate::ui::Reporter;

/// The local form of a version string: any `+<buildId>` suffix replaced
/// with `+local`.
pub fn local_version_of(version: &str) -> String {
    format!("{}+local", base_version(version))
}

fn build_dir_for(source_root: &Path, name: &PackageName) -> std::path::PathBuf {
    source_root.join(format!(".build.{name}"))
}

/// Make sure the source tree's `.gitignore` covers build directories.
fn ensure_build_dirs_ignored(source_root: &Path) -> io::Result<()> {
    let path = source_root.join(".gitignore");
    let existing = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(e),
    };
    if existing.lines().any(|line| line.trim() == ".build*") {
        return Ok(());
    }
    let mut updated = existing;
    if !updated.is_empty() && !updated.ends_with('\n') {
        updated.push('\n');
    }
    updated.push_str(".build*\n");
    fs::write(&path, updated)
}

impl CompleteCatalog {
    /// Build a local package (and its local build-order dependencies)
    /// unless it is already built.
    pub fn ensure_built(&mut self, name: &PackageName) -> Result<(), CatalogError> {
        self.require_initialized()?;
        if !self.is_local_package(name) {
            return Err(CatalogError::NoSuchLocalPackage(name.clone()));
        }
        let mut on_stack = BTreeSet::new();
        self.build_package(name, &mut on_stack)
    }

    /// The build recursion. `on_stack` carries the names currently being
    /// built, for cycle detection; each name is processed at most once per
    /// process lifetime because it leaves `unbuilt` on entry.
    pub(crate) fn build_package(
        &mut self,
        name: &PackageName,
        on_stack: &mut BTreeSet<PackageName>,
    ) -> Result<(), CatalogError> {
        if !self.unbuilt.remove(name) {
            return Ok(());
        }
        on_stack.insert(name.clone());

        let Some(source) = self.package_sources.get(name).cloned() else {
            return Ok(());
        };

        for dep in self.compiler.build_order_constraints(&source) {
            // Non-local dependencies come from the depot, already built.
            if !self.effective_local_packages.contains_key(&dep.name) {
                continue;
            }

            if let Some(pinned) = &dep.version {
                let declared = self
                    .package_sources
                    .get(&dep.name)
                    .map(|s| s.version.clone())
                    .unwrap_or_default();
                if local_version_of(pinned) != local_version_of(&declared) {
                    return Err(CatalogError::InternalInconsistency {
                        name: dep.name.clone(),
                        pinned: pinned.clone(),
                        declared,
                    });
                }
            }

            if on_stack.contains(&dep.name) {
                // A cycle is tolerable if the other side already has a
                // current build on disk; otherwise record it and build
                // without enforcing this edge.
                if self.up_to_date_build(&dep.name).is_none() {
                    self.reporter.warning(&format!(
                        "circular dependency between {name} and {}",
                        dep.name
                    ));
                }
                continue;
            }

            self.build_package(&dep.name, on_stack)?;
        }

        let artifact = match self.up_to_date_build(name) {
            Some(artifact) => artifact,
            None => self.compile_and_cache(name, &source)?,
        };

        if let Some(version_id) = self.data.get_latest_version(name).cloned() {
            self.data.push_build(Build {
                package_name: name.clone(),
                version_id,
                architecture: artifact.architectures().join("+"),
                published: None,
                built_by: None,
            });
        }

        on_stack.remove(name);
        Ok(())
    }

    /// Look for a cached build of `name` that is still current.
    pub(crate) fn up_to_date_build(&self, name: &PackageName) -> Option<BuiltPackage> {
        let source = self.package_sources.get(name)?;
        let build_dir = build_dir_for(&source.source_root, name);
        let artifact = BuiltPackage::init_from_path(name, &build_dir, &source.source_root)?;
        let dep_versions = self.local_dep_versions(source);
        self.compiler
            .check_up_to_date(source, &artifact, &dep_versions)
            .then_some(artifact)
    }

    /// Local versions of the local build-order dependencies of `source`.
    fn local_dep_versions(&self, source: &PackageSource) -> BTreeMap<PackageName, String> {
        self.compiler
            .build_order_constraints(source)
            .into_iter()
            .filter_map(|dep| {
                let dep_source = self.package_sources.get(&dep.name)?;
                Some((dep.name, local_version_of(&dep_source.version)))
            })
            .collect()
    }

    fn compile_and_cache(
        &self,
        name: &PackageName,
        source: &PackageSource,
    ) -> Result<BuiltPackage, CatalogError> {
        self.reporter.job(
            &format!("building package {name}"),
            &source.source_root.display().to_string(),
        );

        let dep_versions = self.local_dep_versions(source);
        let artifact = self.compiler.compile(source, &dep_versions)?;

        let build_dir = build_dir_for(&source.source_root, name);
        match artifact.save_to_path(&build_dir) {
            Ok(()) => {
                if let Err(e) = ensure_build_dirs_ignored(&source.source_root) {
                    tracing::debug!(error = %e, "could not update .gitignore");
                }
            }
            // An unwritable source tree just means the build stays
            // in-memory for this process.
            Err(ArtifactError::Io(e)) if e.kind() == io::ErrorKind::PermissionDenied => {
                tracing::debug!(package = %name, "build cache not writable");
            }
            Err(e) => return Err(e.into()),
        }

        Ok(artifact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_local_version_replaces_any_build_suffix() {
        assert_eq!(local_version_of("1.2.3"), "1.2.3+local");
        assert_eq!(local_version_of("1.2.3+abc"), "1.2.3+local");
        assert_eq!(local_version_of("1.2.3+local"), "1.2.3+local");
        assert_eq!(
            local_version_of("1.2.3+abc"),
            local_version_of("1.2.3")
        );
    }

    #[test]
    fn test_gitignore_entry_written_once() {
        let dir = tempdir().unwrap();
        ensure_build_dirs_ignored(dir.path()).unwrap();
        ensure_build_dirs_ignored(dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(content.matches(".build*").count(), 1);
    }

    #[test]
    fn test_gitignore_appends_to_existing() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(".gitignore"), "target/").unwrap();
        ensure_build_dirs_ignored(dir.path()).unwrap();

        let content = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert!(content.contains("target/"));
        assert!(content.contains(".build*"));
    }
}
