//! PubGrub adapter for catalog version resolution.
//!
//! Implements the `DependencyProvider` trait so the SAT-based solver can
//! query available versions and dependency edges from a catalog value. A
//! synthetic root package carries the caller's dependency list.

use std::borrow::Borrow;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::error::Error;
use std::fmt;

use pubgrub::range::Range;
use pubgrub::solver::{Dependencies, DependencyProvider};
use pubgrub::version::SemanticVersion;
use semver::{Comparator, Op, VersionReq};

use super::{ResolveError, SolverOptions, VersionConstraint};
use crate::catalog::{base_version, CatalogData};
use crate::types::PackageName;

/// Solver package: the synthetic root or a real catalog package.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
enum SolvePkg {
    Root,
    Pkg(PackageName),
}

impl fmt::Display for SolvePkg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolvePkg::Root => write!(f, "(root)"),
            SolvePkg::Pkg(name) => write!(f, "{name}"),
        }
    }
}

fn parse_base(version: &str) -> Option<semver::Version> {
    semver::Version::parse(base_version(version)).ok()
}

fn to_solver_version(v: &semver::Version) -> SemanticVersion {
    SemanticVersion::new(v.major as u32, v.minor as u32, v.patch as u32)
}

fn comparator_range(c: &Comparator) -> Range<SemanticVersion> {
    let major = c.major as u32;
    let minor = c.minor.map(|m| m as u32);
    let patch = c.patch.map(|p| p as u32);
    let base = SemanticVersion::new(major, minor.unwrap_or(0), patch.unwrap_or(0));

    match c.op {
        Op::Exact => match (minor, patch) {
            (Some(_), Some(_)) => Range::exact(base),
            (Some(m), None) => Range::between(base, SemanticVersion::new(major, m + 1, 0)),
            (None, _) => Range::between(base, SemanticVersion::new(major + 1, 0, 0)),
        },
        Op::Greater => match (minor, patch) {
            (Some(_), Some(_)) => Range::higher_than(base.bump_patch()),
            (Some(m), None) => Range::higher_than(SemanticVersion::new(major, m + 1, 0)),
            (None, _) => Range::higher_than(SemanticVersion::new(major + 1, 0, 0)),
        },
        Op::GreaterEq => Range::higher_than(base),
        Op::Less => Range::strictly_lower_than(base),
        Op::LessEq => match (minor, patch) {
            (Some(_), Some(_)) => Range::strictly_lower_than(base.bump_patch()),
            (Some(m), None) => Range::strictly_lower_than(SemanticVersion::new(major, m + 1, 0)),
            (None, _) => Range::strictly_lower_than(SemanticVersion::new(major + 1, 0, 0)),
        },
        Op::Tilde => match (minor, patch) {
            (Some(m), _) => Range::between(base, SemanticVersion::new(major, m + 1, 0)),
            (None, _) => Range::between(base, SemanticVersion::new(major + 1, 0, 0)),
        },
        Op::Caret => {
            if major > 0 {
                Range::between(base, SemanticVersion::new(major + 1, 0, 0))
            } else {
                match (minor, patch) {
                    (Some(0), Some(p)) => Range::between(base, SemanticVersion::new(0, 0, p + 1)),
                    (Some(m), _) => Range::between(base, SemanticVersion::new(0, m + 1, 0)),
                    (None, _) => Range::between(base, SemanticVersion::new(1, 0, 0)),
                }
            }
        }
        Op::Wildcard => match (minor, patch) {
            (Some(m), Some(_)) | (Some(m), None) => Range::between(
                SemanticVersion::new(major, m, 0),
                SemanticVersion::new(major, m + 1, 0),
            ),
            (None, _) => Range::between(
                SemanticVersion::new(major, 0, 0),
                SemanticVersion::new(major + 1, 0, 0),
            ),
        },
        _ => Range::any(),
    }
}

fn requirement_range(req: &VersionReq) -> Range<SemanticVersion> {
    req.comparators
        .iter()
        .fold(Range::any(), |acc, c| acc.intersection(&comparator_range(c)))
}

/// Adapter that exposes a catalog value to the `PubGrub` solver.
struct CatalogProvider<'a> {
    catalog: &'a CatalogData,
    root_deps: Vec<PackageName>,
    /// Constraints by name; these also apply to packages pulled in
    /// transitively, without forcing them into the solution.
    constraints: HashMap<PackageName, Vec<VersionReq>>,
    /// Versions from the previous solution, preferred when admissible.
    previous: HashMap<PackageName, SemanticVersion>,
}

impl CatalogProvider<'_> {
    fn constraint_range(&self, name: &PackageName) -> Range<SemanticVersion> {
        match self.constraints.get(name) {
            Some(reqs) => reqs
                .iter()
                .fold(Range::any(), |acc, r| acc.intersection(&requirement_range(r))),
            None => Range::any(),
        }
    }

    /// Pick the version for `name`: the previous solution's entry when it
    /// is still admissible, otherwise the highest admissible version.
    fn candidate(
        &self,
        name: &PackageName,
        range: &Range<SemanticVersion>,
    ) -> Option<SemanticVersion> {
        let reqs = self.constraints.get(name);
        let mut admissible: Vec<SemanticVersion> = Vec::new();
        for record in self.catalog.versions_of(name) {
            let Some(base) = parse_base(&record.version) else {
                continue;
            };
            if let Some(reqs) = reqs {
                if !reqs.iter().all(|r| r.matches(&base)) {
                    continue;
                }
            }
            let version = to_solver_version(&base);
            if range.contains(&version) {
                admissible.push(version);
            }
        }

        if let Some(prev) = self.previous.get(name) {
            if admissible.contains(prev) {
                return Some(prev.clone());
            }
        }
        admissible.into_iter().max()
    }
}

impl DependencyProvider<SolvePkg, SemanticVersion> for CatalogProvider<'_> {
    fn choose_package_version<T: Borrow<SolvePkg>, U: Borrow<Range<SemanticVersion>>>(
        &self,
        potential_packages: impl Iterator<Item = (T, U)>,
    ) -> Result<(T, Option<SemanticVersion>), Box<dyn Error>> {
        let (pkg, range) = potential_packages
            .into_iter()
            .next()
            .expect("potential_packages is never empty");

        let range: &Range<SemanticVersion> = range.borrow();
        let version = match pkg.borrow() {
            SolvePkg::Root => {
                let zero = SemanticVersion::new(0, 0, 0);
                range.contains(&zero).then_some(zero)
            }
            SolvePkg::Pkg(name) => self.candidate(name, range),
        };

        Ok((pkg, version))
    }

    fn get_dependencies(
        &self,
        pkg: &SolvePkg,
        version: &SemanticVersion,
    ) -> Result<Dependencies<SolvePkg, SemanticVersion>, Box<dyn Error>> {
        use pubgrub::solver::DependencyConstraints;

        let mut deps: DependencyConstraints<SolvePkg, SemanticVersion> =
            DependencyConstraints::default();

        match pkg {
            SolvePkg::Root => {
                for name in &self.root_deps {
                    deps.insert(SolvePkg::Pkg(name.clone()), self.constraint_range(name));
                }
            }
            SolvePkg::Pkg(name) => {
                let record = self.catalog.versions_of(name).find(|r| {
                    parse_base(&r.version)
                        .map(|b| to_solver_version(&b) == *version)
                        .unwrap_or(false)
                });
                if let Some(record) = record {
                    for (dep_name, dep) in &record.dependencies {
                        if dep.weak {
                            continue;
                        }
                        let range = match &dep.constraint {
                            Some(text) => match VersionReq::parse(text) {
                                Ok(req) => requirement_range(&req),
                                // Requirements from snapshots are not
                                // trusted to parse; fall back to any.
                                Err(_) => Range::any(),
                            },
                            None => Range::any(),
                        };
                        deps.insert(SolvePkg::Pkg(dep_name.clone()), range);
                    }
                }
            }
        }

        Ok(Dependencies::Known(deps))
    }
}

/// Version solver over a catalog value, backed by the `PubGrub` algorithm.
#[derive(Debug, Default)]
pub struct PackagesResolver;

impl PackagesResolver {
    pub fn new() -> Self {
        Self
    }

    /// Solve for a consistent version of every requested dependency and
    /// its transitive closure.
    ///
    /// # Errors
    ///
    /// Returns [`ResolveError::NoSolution`] when the solver cannot satisfy
    /// the constraints (including when a requested package has no
    /// admissible version at all).
    pub fn resolve(
        &self,
        catalog: &CatalogData,
        dependencies: &[PackageName],
        constraints: &[VersionConstraint],
        opts: &SolverOptions,
    ) -> Result<BTreeMap<PackageName, String>, ResolveError> {
        if dependencies.is_empty() {
            return Ok(BTreeMap::new());
        }

        let mut seen = BTreeSet::new();
        let root_deps: Vec<PackageName> = dependencies
            .iter()
            .filter(|name| seen.insert((*name).clone()))
            .cloned()
            .collect();

        let mut constraint_map: HashMap<PackageName, Vec<VersionReq>> = HashMap::new();
        for constraint in constraints {
            constraint_map
                .entry(constraint.name.clone())
                .or_default()
                .push(constraint.requirement.clone());
        }

        let mut previous = HashMap::new();
        if let Some(prior) = &opts.previous_solution {
            for (name, version) in prior {
                if let Some(base) = parse_base(version) {
                    previous.insert(name.clone(), to_solver_version(&base));
                }
            }
        }

        let provider = CatalogProvider {
            catalog,
            root_deps,
            constraints: constraint_map,
            previous,
        };

        match pubgrub::solver::resolve(&provider, SolvePkg::Root, SemanticVersion::new(0, 0, 0)) {
            Ok(solution) => {
                let mut result = BTreeMap::new();
                for (pkg, version) in solution {
                    let SolvePkg::Pkg(name) = pkg else { continue };
                    let original = catalog.versions_of(&name).find(|r| {
                        parse_base(&r.version)
                            .map(|b| to_solver_version(&b) == version)
                            .unwrap_or(false)
                    });
                    if let Some(record) = original {
                        result.insert(name, record.version.clone());
                    }
                }
                Ok(result)
            }
            Err(e) => Err(ResolveError::NoSolution(e.to_string())),
        }
    }
}
