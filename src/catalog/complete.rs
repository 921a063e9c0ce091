//! The complete catalog: the server projection merged with local source
//! trees. Local entries replace any server entry sharing a name, and this
//! is the catalog the rest of the tool consumes.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::build::{Compiler, SourceCompiler};
use crate::catalog::{Build, CatalogData, CatalogError, Package, Version};
use crate::depot::Depot;
use crate::fsutil::{self, WatchSet};
use crate::project::Project;
use crate::resolver::{
    self, ConstraintInput, PackagesResolver, ResolveOptions, ResolveOutcome, SolverOptions,
};
use crate::snapshot::{self, RemoteRegistry, SnapshotCache};
use crate::source::PackageSource;
use crate::types::{PackageName, VersionId};
use crate::ui::Reporter;

/// Everything a complete catalog needs wired in at construction.
pub struct CatalogConfig {
    pub cache_path: PathBuf,
    pub depot_root: PathBuf,
    pub registry: Option<Box<dyn RemoteRegistry>>,
    pub project: Option<Project>,
    pub compiler: Box<dyn Compiler>,
    pub reporter: Arc<dyn Reporter>,
}

impl CatalogConfig {
    pub fn new(cache_path: PathBuf, depot_root: PathBuf, reporter: Arc<dyn Reporter>) -> Self {
        Self {
            cache_path,
            depot_root,
            registry: None,
            project: None,
            compiler: Box::new(SourceCompiler::new()),
            reporter,
        }
    }
}

/// Options for [`CompleteCatalog::initialize`].
#[derive(Debug, Default, Clone)]
pub struct InitOptions {
    /// Directories to scan for local package source trees. Entries that do
    /// not exist are silently dropped.
    pub local_package_dirs: Vec<PathBuf>,
    pub offline: bool,
}

pub struct CompleteCatalog {
    pub(crate) data: CatalogData,
    initialized: bool,
    offline: bool,
    cache: SnapshotCache,
    registry: Option<Box<dyn RemoteRegistry>>,

    /// Ordered list of directories scanned for source trees.
    pub(crate) local_package_dirs: Vec<PathBuf>,
    /// Explicitly registered local packages; these beat directory scans.
    pub(crate) local_packages: BTreeMap<PackageName, PathBuf>,
    /// The resolved name-to-directory mapping after precedence rules.
    pub(crate) effective_local_packages: BTreeMap<PackageName, PathBuf>,
    /// Parsed declaration for each effective local package.
    pub(crate) package_sources: BTreeMap<PackageName, PackageSource>,
    /// Local packages not yet compiled in this process's lifetime.
    pub(crate) unbuilt: BTreeSet<PackageName>,

    resolver: Option<PackagesResolver>,
    project: Option<Project>,
    depot: Depot,
    pub(crate) compiler: Box<dyn Compiler>,
    pub(crate) reporter: Arc<dyn Reporter>,
    pub(crate) watch_set: WatchSet,
}

impl CompleteCatalog {
    pub fn new(config: CatalogConfig) -> Self {
        Self {
            data: CatalogData::default(),
            initialized: false,
            offline: false,
            cache: SnapshotCache::new(config.cache_path),
            registry: config.registry,
            local_package_dirs: Vec::new(),
            local_packages: BTreeMap::new(),
            effective_local_packages: BTreeMap::new(),
            package_sources: BTreeMap::new(),
            unbuilt: BTreeSet::new(),
            resolver: None,
            project: config.project,
            depot: Depot::new(config.depot_root),
            compiler: config.compiler,
            reporter: config.reporter,
            watch_set: WatchSet::default(),
        }
    }

    /// Configure local package directories and run the first refresh.
    pub fn initialize(&mut self, options: InitOptions) -> Result<(), CatalogError> {
        self.offline = options.offline;
        let mut dirs = Vec::new();
        for dir in options.local_package_dirs {
            let abs = fsutil::absolutize(&dir)?;
            if abs.is_dir() {
                dirs.push(abs);
            }
        }
        self.local_package_dirs = dirs;
        self.refresh()
    }

    /// Rebuild the whole catalog: ingest the effective registry snapshot,
    /// then apply local overrides. State is replaced in full; after a
    /// failure the catalog reads as uninitialised.
    pub fn refresh(&mut self) -> Result<(), CatalogError> {
        self.initialized = false;
        let snapshot = snapshot::fetch_effective(
            &self.cache,
            self.registry.as_deref(),
            self.offline,
            &self.reporter,
        );
        self.data = CatalogData::from_snapshot(&snapshot);
        self.watch_set.clear();
        self.add_local_package_overrides()?;
        self.initialized = true;
        tracing::debug!(
            packages = self.data.package_count(),
            local = self.effective_local_packages.len(),
            "complete catalog refreshed"
        );
        Ok(())
    }

    /// Install the constraint solver. Until this runs (it happens after
    /// the first refresh, since the solver is itself loaded through the
    /// catalog), `resolve_constraints` reports the solver as unavailable.
    pub fn install_resolver(&mut self) {
        if self.resolver.is_none() {
            self.resolver = Some(PackagesResolver::new());
        }
    }

    pub fn resolver_available(&self) -> bool {
        self.resolver.is_some()
    }

    pub(crate) fn require_initialized(&self) -> Result<(), CatalogError> {
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

    /// Membership test on the effective local set.
    pub fn is_local_package(&self, name: &PackageName) -> bool {
        self.effective_local_packages.contains_key(name)
    }

    pub fn effective_local_packages(&self) -> &BTreeMap<PackageName, PathBuf> {
        &self.effective_local_packages
    }

    pub fn unbuilt(&self) -> &BTreeSet<PackageName> {
        &self.unbuilt
    }

    /// Files read during the last refresh; dirty means a refresh is due.
    pub fn watch_set(&self) -> &WatchSet {
        &self.watch_set
    }

    /// Register a local package under an explicit name and path.
    ///
    /// Re-registering a name at the path it already has is allowed and
    /// still refreshes, so callers can use it to pick up an edited
    /// declaration. Only a different path is rejected.
    pub fn add_local_package(&mut self, name: &PackageName, dir: &Path) -> Result<(), CatalogError> {
        self.require_initialized()?;
        let abs = fsutil::absolutize(dir)?;
        if let Some(existing) = self.local_packages.get(name) {
            if existing != &abs {
                return Err(CatalogError::DuplicateLocalPackage {
                    name: name.clone(),
                    existing: existing.clone(),
                });
            }
        }
        self.local_packages.insert(name.clone(), abs);
        self.refresh()
    }

    /// Drop an explicitly registered local package.
    pub fn remove_local_package(&mut self, name: &PackageName) -> Result<(), CatalogError> {
        self.require_initialized()?;
        if self.local_packages.remove(name).is_none() {
            return Err(CatalogError::NoSuchLocalPackage(name.clone()));
        }
        self.refresh()
    }

    /// The directory to load a package from.
    ///
    /// Local packages are built on demand and load from their source tree.
    /// Anything else needs a version and loads from the depot, if the
    /// build is present there.
    pub fn get_load_path_for_package(
        &mut self,
        name: &PackageName,
        version: Option<&str>,
    ) -> Result<Option<PathBuf>, CatalogError> {
        self.require_initialized()?;

        if let Some(dir) = self.effective_local_packages.get(name).cloned() {
            if self.unbuilt.contains(name) {
                let mut on_stack = BTreeSet::new();
                self.build_package(name, &mut on_stack)?;
            }
            return Ok(Some(dir));
        }

        let Some(version) = version else {
            return Err(CatalogError::MissingVersion(name.clone()));
        };
        let path = self.depot.package_path(name, version);
        Ok(path.is_dir().then_some(path))
    }

    /// Broker a constraint-resolution request between the project's pinned
    /// versions and the solver.
    pub fn resolve_constraints(
        &self,
        input: &ConstraintInput,
        mut solver_opts: SolverOptions,
        opts: &ResolveOptions,
    ) -> Result<ResolveOutcome, CatalogError> {
        self.require_initialized()?;

        let Some(resolver) = &self.resolver else {
            return Ok(ResolveOutcome::SolverUnavailable);
        };

        let normalized = resolver::normalize(input)?;

        if !opts.ignore_project_deps {
            if let Some(project) = &self.project {
                solver_opts.previous_solution = Some(project.versions()?);
            }
        }

        let solution = resolver.resolve(
            &self.data,
            &normalized.dependencies,
            &normalized.constraints,
            &solver_opts,
        )?;
        tracing::debug!(packages = solution.len(), "constraint resolution complete");
        Ok(ResolveOutcome::Solution(solution))
    }
}
