//! The server catalog: a read-mostly projection of the remote registry.

use std::sync::Arc;

use crate::catalog::{Build, CatalogData, CatalogError, Package, Version};
use crate::snapshot::{self, RemoteRegistry, SnapshotCache};
use crate::types::{PackageName, VersionId};
use crate::ui::Reporter;

/// Answers "what exists upstream?", optionally operating offline from the
/// cached snapshot alone.
pub struct ServerCatalog {
    data: CatalogData,
    offline: bool,
    initialized: bool,
    cache: SnapshotCache,
    registry: Option<Box<dyn RemoteRegistry>>,
    reporter: Arc<dyn Reporter>,
}

impl ServerCatalog {
    pub fn new(
        cache: SnapshotCache,
        registry: Option<Box<dyn RemoteRegistry>>,
        reporter: Arc<dyn Reporter>,
    ) -> Self {
        Self {
            data: CatalogData::default(),
            offline: false,
            initialized: false,
            cache,
            registry,
            reporter,
        }
    }

    /// Record the offline flag and mark the catalog usable. No I/O happens
    /// here; the first `refresh` populates the collections.
    pub fn initialize(&mut self, offline: bool) {
        self.offline = offline;
        self.data.reset();
        self.initialized = true;
    }

    /// Rebuild the collections from the cached snapshot, updated from the
    /// registry unless offline. An unreachable registry leaves the catalog
    /// on stale data; a missing or corrupt cache yields an empty catalog.
    pub fn refresh(&mut self) -> Result<(), CatalogError> {
        self.initialized = false;
        let snapshot = snapshot::fetch_effective(
            &self.cache,
            self.registry.as_deref(),
            self.offline,
            &self.reporter,
        );
        self.data = CatalogData::from_snapshot(&snapshot);
        self.initialized = true;
        tracing::debug!(
            packages = self.data.package_count(),
            versions = self.data.version_count(),
            "server catalog refreshed"
        );
        Ok(())
    }

    fn require_initialized(&self) -> Result<(), CatalogError> {
        if self.initialized {
            Ok(())
        } else {
            Err(CatalogError::NotInitialized)
        }
    }

    /// The current catalog value.
    pub fn data(&self) -> Result<&CatalogData, CatalogError> {
        self.require_initialized()?;
        Ok(&self.data)
    }

    pub fn get_package(&self, name: &PackageName) -> Result<Option<&Package>, CatalogError> {
        Ok(self.data()?.get_package(name))
    }

    pub fn get_version(
        &self,
        name: &PackageName,
        version: &str,
    ) -> Result<Option<&Version>, CatalogError> {
        Ok(self.data()?.get_version(name, version))
    }

    pub fn get_latest_version(
        &self,
        name: &PackageName,
    ) -> Result<Option<&VersionId>, CatalogError> {
        Ok(self.data()?.get_latest_version(name))
    }

    pub fn get_all_builds(&self, version_id: &VersionId) -> Result<Vec<&Build>, CatalogError> {
        Ok(self.data()?.get_all_builds(version_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{Collections, Snapshot, SnapshotError};
    use crate::ui::NullReporter;
    use std::collections::BTreeMap;
    use tempfile::tempdir;

    fn seeded_cache(dir: &std::path::Path) -> SnapshotCache {
        let cache = SnapshotCache::new(dir.join("snapshot.bin"));
        let snapshot = Snapshot {
            fetched_at: 100,
            collections: Collections {
                packages: vec![Package {
                    name: PackageName::new("alpha"),
                    maintainers: Vec::new(),
                    last_updated: None,
                }],
                versions: vec![Version {
                    id: VersionId::new("srv-1"),
                    package_name: PackageName::new("alpha"),
                    version: "1.0.0".to_string(),
                    earliest_compatible_version: None,
                    dependencies: BTreeMap::new(),
                    description: None,
                    is_test: false,
                    contains_plugins: false,
                    test_name: None,
                }],
                builds: Vec::new(),
            },
        };
        cache.store(&snapshot).unwrap();
        cache
    }

    #[test]
    fn test_queries_fail_before_initialize() {
        let dir = tempdir().unwrap();
        let catalog = ServerCatalog::new(
            SnapshotCache::new(dir.path().join("snapshot.bin")),
            None,
            Arc::new(NullReporter),
        );
        assert!(matches!(
            catalog.get_package(&PackageName::new("alpha")),
            Err(CatalogError::NotInitialized)
        ));
    }

    #[test]
    fn test_offline_refresh_uses_cache() {
        let dir = tempdir().unwrap();
        let mut catalog =
            ServerCatalog::new(seeded_cache(dir.path()), None, Arc::new(NullReporter));
        catalog.initialize(true);
        catalog.refresh().unwrap();

        let name = PackageName::new("alpha");
        assert!(catalog.get_package(&name).unwrap().is_some());
        assert!(catalog.get_version(&name, "1.0.0").unwrap().is_some());
    }

    struct UnreachableRegistry;

    impl RemoteRegistry for UnreachableRegistry {
        fn update(&self, _prev: &Snapshot) -> Result<Snapshot, SnapshotError> {
            Err(SnapshotError::Status(503))
        }
    }

    #[test]
    fn test_unreachable_registry_falls_back_to_cache() {
        let dir = tempdir().unwrap();
        let mut catalog = ServerCatalog::new(
            seeded_cache(dir.path()),
            Some(Box::new(UnreachableRegistry)),
            Arc::new(NullReporter),
        );
        catalog.initialize(false);
        catalog.refresh().unwrap();

        assert!(catalog
            .get_package(&PackageName::new("alpha"))
            .unwrap()
            .is_some());
    }

    struct FreshRegistry;

    impl RemoteRegistry for FreshRegistry {
        fn update(&self, _prev: &Snapshot) -> Result<Snapshot, SnapshotError> {
            Ok(Snapshot {
                fetched_at: 200,
                collections: Collections {
                    packages: vec![Package {
                        name: PackageName::new("beta"),
                        maintainers: Vec::new(),
                        last_updated: None,
                    }],
                    versions: Vec::new(),
                    builds: Vec::new(),
                },
            })
        }
    }

    #[test]
    fn test_fresh_snapshot_replaces_and_persists() {
        let dir = tempdir().unwrap();
        let cache = seeded_cache(dir.path());
        let mut catalog = ServerCatalog::new(
            cache.clone(),
            Some(Box::new(FreshRegistry)),
            Arc::new(NullReporter),
        );
        catalog.initialize(false);
        catalog.refresh().unwrap();

        assert!(catalog
            .get_package(&PackageName::new("alpha"))
            .unwrap()
            .is_none());
        assert!(catalog
            .get_package(&PackageName::new("beta"))
            .unwrap()
            .is_some());

        // The fetched snapshot replaced the cache on disk.
        assert_eq!(cache.load_cached().fetched_at, 200);
    }
}
