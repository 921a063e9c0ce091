//! Constraint-resolution inputs and outcomes.
//!
//! The catalog accepts constraints in two shapes — an ordered list of
//! dependency requests, or a map of name to requirement string — and
//! normalises both into a dependency list plus a constraint list before
//! handing them to the solver.

mod solver;

use std::collections::{BTreeMap, BTreeSet};

use semver::VersionReq;
use thiserror::Error;

use crate::types::PackageName;

pub use solver::PackagesResolver;

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("Failed to parse version constraint for {package}: {error}")]
    InvalidConstraint {
        package: PackageName,
        error: semver::Error,
    },

    #[error("Resolution failed: {0}")]
    NoSolution(String),
}

/// A single requested dependency, as given by a caller.
#[derive(Debug, Clone, PartialEq)]
pub struct DependencyRequest {
    pub name: PackageName,
    /// Optional requirement string (semver syntax).
    pub constraint: Option<String>,
    /// Weak requests constrain the version if the package is chosen, but
    /// do not force it into the solution.
    pub weak: bool,
}

/// The two accepted constraint shapes.
#[derive(Debug, Clone)]
pub enum ConstraintInput {
    /// Ordered dependency requests.
    List(Vec<DependencyRequest>),
    /// Name to requirement string; an empty string means unconstrained.
    Map(BTreeMap<PackageName, String>),
}

/// A parsed constraint annotated with the package it applies to.
#[derive(Debug, Clone)]
pub struct VersionConstraint {
    pub name: PackageName,
    pub requirement: VersionReq,
    /// The requirement as originally written, for messages.
    pub source: String,
}

/// Normalised solver input: which packages must appear in the solution,
/// and which version constraints apply.
#[derive(Debug, Default, Clone)]
pub struct Normalized {
    pub dependencies: Vec<PackageName>,
    pub constraints: Vec<VersionConstraint>,
}

/// Opaque options forwarded to the solver.
#[derive(Debug, Default, Clone)]
pub struct SolverOptions {
    /// A previously chosen version map; admissible entries are preferred
    /// over the newest admissible version.
    pub previous_solution: Option<BTreeMap<PackageName, String>>,
}

/// Options interpreted by the catalog's resolution entry point.
#[derive(Debug, Default, Clone)]
pub struct ResolveOptions {
    /// Skip the project's pinned versions as a prior.
    pub ignore_project_deps: bool,
}

/// The result of a resolution request.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveOutcome {
    /// A consistent version for every package in the dependency closure.
    Solution(BTreeMap<PackageName, String>),
    /// The solver has not been installed yet (it is itself bootstrapped
    /// from the catalog); callers fall back to local-only loading.
    SolverUnavailable,
}

fn parse_requirement(
    name: &PackageName,
    text: &str,
) -> Result<VersionConstraint, ResolveError> {
    let requirement = VersionReq::parse(text).map_err(|error| ResolveError::InvalidConstraint {
        package: name.clone(),
        error,
    })?;
    Ok(VersionConstraint {
        name: name.clone(),
        requirement,
        source: text.to_string(),
    })
}

/// Flatten either input shape into dependency and constraint lists.
///
/// List entries contribute a dependency unless marked weak, and a
/// constraint whenever one is present. Map keys always contribute a
/// dependency; non-empty values are parsed into constraints.
pub fn normalize(input: &ConstraintInput) -> Result<Normalized, ResolveError> {
    let mut dependencies = Vec::new();
    let mut seen = BTreeSet::new();
    let mut constraints = Vec::new();

    match input {
        ConstraintInput::List(entries) => {
            for entry in entries {
                if !entry.weak && seen.insert(entry.name.clone()) {
                    dependencies.push(entry.name.clone());
                }
                if let Some(text) = &entry.constraint {
                    constraints.push(parse_requirement(&entry.name, text)?);
                }
            }
        }
        ConstraintInput::Map(map) => {
            for (name, text) in map {
                if seen.insert(name.clone()) {
                    dependencies.push(name.clone());
                }
                if !text.is_empty() {
                    constraints.push(parse_requirement(name, text)?);
                }
            }
        }
    }

    Ok(Normalized {
        dependencies,
        constraints,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_map_input() {
        let mut map = BTreeMap::new();
        map.insert(PackageName::new("foo"), "1.0.0".to_string());
        map.insert(PackageName::new("bar"), String::new());

        let normalized = normalize(&ConstraintInput::Map(map)).unwrap();
        assert_eq!(
            normalized.dependencies,
            vec![PackageName::new("bar"), PackageName::new("foo")]
        );
        assert_eq!(normalized.constraints.len(), 1);
        assert_eq!(normalized.constraints[0].name, "foo");
        assert_eq!(normalized.constraints[0].source, "1.0.0");
    }

    #[test]
    fn test_normalize_weak_entries_constrain_without_depending() {
        let input = ConstraintInput::List(vec![
            DependencyRequest {
                name: PackageName::new("core"),
                constraint: None,
                weak: false,
            },
            DependencyRequest {
                name: PackageName::new("extras"),
                constraint: Some("=2.0.0".to_string()),
                weak: true,
            },
        ]);

        let normalized = normalize(&input).unwrap();
        assert_eq!(normalized.dependencies, vec![PackageName::new("core")]);
        assert_eq!(normalized.constraints.len(), 1);
        assert_eq!(normalized.constraints[0].name, "extras");
    }

    #[test]
    fn test_normalize_rejects_bad_requirement() {
        let mut map = BTreeMap::new();
        map.insert(PackageName::new("foo"), "not a requirement".to_string());

        let result = normalize(&ConstraintInput::Map(map));
        assert!(matches!(result, Err(ResolveError::InvalidConstraint { .. })));
    }

    #[test]
    fn test_normalize_dedupes_repeated_names() {
        let input = ConstraintInput::List(vec![
            DependencyRequest {
                name: PackageName::new("foo"),
                constraint: Some(">=1.0.0".to_string()),
                weak: false,
            },
            DependencyRequest {
                name: PackageName::new("foo"),
                constraint: Some("<2.0.0".to_string()),
                weak: false,
            },
        ]);

        let normalized = normalize(&input).unwrap();
        assert_eq!(normalized.dependencies.len(), 1);
        assert_eq!(normalized.constraints.len(), 2);
    }
}
