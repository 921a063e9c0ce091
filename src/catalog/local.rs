//! The local-override engine.
//!
//! Replaces server-originated entries for locally present packages with
//! synthesised local entries, and surfaces each local package's declared
//! test package as its own catalog entry.

use std::collections::BTreeSet;

use crate::catalog::{CatalogError, Package, Version};
use crate::catalog::complete::CompleteCatalog;
use crate::source::{PackageSource, DECLARATION_FILE};
use crate::types::{PackageName, VersionId};

impl CompleteCatalog {
    /// Apply local overrides to the freshly ingested server data.
    ///
    /// Runs in two phases: first every server entry for an effective local
    /// name is purged, then local version records are synthesised, so no
    /// server version for a local name can survive.
    pub(crate) fn add_local_package_overrides(&mut self) -> Result<(), CatalogError> {
        self.recompute_effective_local_packages();

        let names: BTreeSet<PackageName> =
            self.effective_local_packages.keys().cloned().collect();
        self.data.purge_packages(&names);
        self.package_sources.clear();

        let entries: Vec<(PackageName, std::path::PathBuf)> = self
            .effective_local_packages
            .iter()
            .map(|(name, dir)| (name.clone(), dir.clone()))
            .collect();

        for (name, dir) in entries {
            let source = PackageSource::parse(&name, &dir)?;
            self.watch_set.note(&dir.join(DECLARATION_FILE));

            let test_source = source.test_source();
            self.insert_local_source(source)?;

            // A non-test package's declared test package becomes a local
            // package in its own right, rooted at the same source tree.
            // Test packages never declare further test packages.
            if let Some(test) = test_source {
                self.effective_local_packages
                    .insert(test.name.clone(), dir.clone());
                self.insert_local_source(test)?;
            }
        }

        self.unbuilt = self.effective_local_packages.keys().cloned().collect();
        Ok(())
    }

    /// Recompute the effective name-to-directory mapping.
    ///
    /// Directory scans consider each immediate subdirectory containing a
    /// package declaration; the earliest directory in the list wins ties
    /// by name. Explicit registrations overlay the scan results.
    fn recompute_effective_local_packages(&mut self) {
        let mut effective = std::collections::BTreeMap::new();

        for dir in &self.local_package_dirs {
            for subdir in crate::fsutil::subdirectories(dir) {
                if !subdir.join(DECLARATION_FILE).is_file() {
                    continue;
                }
                let Some(file_name) = subdir.file_name().and_then(|n| n.to_str()) else {
                    continue;
                };
                effective
                    .entry(PackageName::new(file_name))
                    .or_insert(subdir);
            }
        }

        for (name, dir) in &self.local_packages {
            effective.insert(name.clone(), dir.clone());
        }

        self.effective_local_packages = effective;
    }

    /// Synthesise the catalog records for one parsed local source.
    fn insert_local_source(&mut self, source: PackageSource) -> Result<(), CatalogError> {
        let mut purge = BTreeSet::new();
        purge.insert(source.name.clone());
        self.data.purge_packages(&purge);

        if source.version.contains('+') {
            return Err(CatalogError::MalformedLocalVersion {
                name: source.name.clone(),
                version: source.version.clone(),
            });
        }

        self.data.push_package(Package {
            name: source.name.clone(),
            maintainers: Vec::new(),
            last_updated: None,
        });

        self.data.push_version(Version {
            id: VersionId::fresh_local(),
            package_name: source.name.clone(),
            version: format!("{}+local", source.version),
            earliest_compatible_version: source.earliest_compatible_version.clone(),
            dependencies: source.dependency_metadata(),
            description: source.description.clone(),
            is_test: source.is_test,
            contains_plugins: source.contains_plugins,
            test_name: source.test_name.clone(),
        });

        self.package_sources.insert(source.name.clone(), source);
        Ok(())
    }
}
