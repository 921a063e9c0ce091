//! Package declaration parsing.
//!
//! A local source tree declares itself in a `package.toml` at its root.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::catalog::Dependency;
use crate::types::PackageName;

/// File name of the package declaration inside a source tree.
pub const DECLARATION_FILE: &str = "package.toml";

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error in {path}: {error}")]
    Parse {
        path: PathBuf,
        error: toml::de::Error,
    },

    #[error("Declaration in {path} names the package '{declared}', expected '{expected}'")]
    NameMismatch {
        path: PathBuf,
        declared: String,
        expected: String,
    },

    #[error("Missing {DECLARATION_FILE} in {0}")]
    MissingDeclaration(PathBuf),
}

/// Dependency specification: either a bare requirement string or a table
/// with a `weak` marker.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DepSpec {
    Simple(String),
    Detailed {
        #[serde(default)]
        version: String,
        #[serde(default)]
        weak: bool,
    },
}

impl DepSpec {
    fn constraint(&self) -> Option<String> {
        let text = match self {
            DepSpec::Simple(v) => v,
            DepSpec::Detailed { version, .. } => version,
        };
        if text.is_empty() {
            None
        } else {
            Some(text.clone())
        }
    }

    fn weak(&self) -> bool {
        matches!(self, DepSpec::Detailed { weak: true, .. })
    }
}

#[derive(Debug, Deserialize)]
struct DeclPackage {
    #[serde(default)]
    name: Option<String>,
    version: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    earliest_compatible_version: Option<String>,
    #[serde(default)]
    contains_plugins: bool,
}

#[derive(Debug, Default, Deserialize)]
struct DeclTest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    dependencies: BTreeMap<String, DepSpec>,
}

#[derive(Debug, Deserialize)]
struct Declaration {
    package: DeclPackage,
    #[serde(default)]
    dependencies: BTreeMap<String, DepSpec>,
    #[serde(default, rename = "build-dependencies")]
    build_dependencies: BTreeMap<String, DepSpec>,
    #[serde(default)]
    test: DeclTest,
}

/// A single dependency as declared by a source tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDependency {
    pub constraint: Option<String>,
    pub weak: bool,
}

/// A parsed package source tree.
///
/// Versions here are the declared ones; the catalog tags them with the
/// `+local` build suffix when it synthesises version records.
#[derive(Debug, Clone)]
pub struct PackageSource {
    pub name: PackageName,
    pub version: String,
    pub description: Option<String>,
    pub earliest_compatible_version: Option<String>,
    pub dependencies: BTreeMap<PackageName, SourceDependency>,
    pub build_dependencies: BTreeMap<PackageName, SourceDependency>,
    pub test_dependencies: BTreeMap<PackageName, SourceDependency>,
    pub test_name: Option<PackageName>,
    pub is_test: bool,
    pub contains_plugins: bool,
    pub source_root: PathBuf,
}

fn convert_deps(raw: &BTreeMap<String, DepSpec>) -> BTreeMap<PackageName, SourceDependency> {
    raw.iter()
        .map(|(name, spec)| {
            (
                PackageName::new(name),
                SourceDependency {
                    constraint: spec.constraint(),
                    weak: spec.weak(),
                },
            )
        })
        .collect()
}

impl PackageSource {
    /// Parse the declaration in `dir` for the package `name`.
    ///
    /// The declaration's own `name` field is optional; when present it must
    /// agree with the name the package is registered under.
    pub fn parse(name: &PackageName, dir: &Path) -> Result<Self, SourceError> {
        let path = dir.join(DECLARATION_FILE);
        if !path.is_file() {
            return Err(SourceError::MissingDeclaration(dir.to_path_buf()));
        }

        let content = fs::read_to_string(&path)?;
        let decl: Declaration = toml::from_str(&content).map_err(|error| SourceError::Parse {
            path: path.clone(),
            error,
        })?;

        if let Some(declared) = &decl.package.name {
            if PackageName::new(declared) != *name {
                return Err(SourceError::NameMismatch {
                    path,
                    declared: declared.clone(),
                    expected: name.to_string(),
                });
            }
        }

        Ok(Self {
            name: name.clone(),
            version: decl.package.version,
            description: decl.package.description,
            earliest_compatible_version: decl.package.earliest_compatible_version,
            dependencies: convert_deps(&decl.dependencies),
            build_dependencies: convert_deps(&decl.build_dependencies),
            test_dependencies: convert_deps(&decl.test.dependencies),
            test_name: decl.test.name.as_deref().map(PackageName::new),
            is_test: false,
            contains_plugins: decl.package.contains_plugins,
            source_root: dir.to_path_buf(),
        })
    }

    /// Runtime dependencies as catalog records.
    pub fn dependency_metadata(&self) -> BTreeMap<PackageName, Dependency> {
        self.dependencies
            .iter()
            .map(|(name, dep)| {
                (
                    name.clone(),
                    Dependency {
                        constraint: dep.constraint.clone(),
                        weak: dep.weak,
                    },
                )
            })
            .collect()
    }

    /// Synthesise the companion test package, if one is declared.
    ///
    /// The test package lives in the same source tree, depends on the
    /// package under test plus the declared test dependencies, and never
    /// declares a test package of its own.
    pub fn test_source(&self) -> Option<PackageSource> {
        let test_name = self.test_name.clone()?;

        let mut dependencies = self.dependencies.clone();
        for (name, dep) in &self.test_dependencies {
            dependencies.insert(name.clone(), dep.clone());
        }
        dependencies.insert(
            self.name.clone(),
            SourceDependency {
                constraint: None,
                weak: false,
            },
        );

        Some(PackageSource {
            name: test_name,
            version: self.version.clone(),
            description: Some(format!("tests for {}", self.name)),
            earliest_compatible_version: self.earliest_compatible_version.clone(),
            dependencies,
            build_dependencies: self.build_dependencies.clone(),
            test_dependencies: BTreeMap::new(),
            test_name: None,
            is_test: true,
            contains_plugins: false,
            source_root: self.source_root.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_decl(dir: &Path, content: &str) {
        fs::write(dir.join(DECLARATION_FILE), content).unwrap();
    }

    #[test]
    fn test_parse_minimal() {
        let dir = tempdir().unwrap();
        write_decl(dir.path(), "[package]\nversion = \"1.0.0\"\n");

        let source = PackageSource::parse(&PackageName::new("alpha"), dir.path()).unwrap();
        assert_eq!(source.name, "alpha");
        assert_eq!(source.version, "1.0.0");
        assert!(!source.is_test);
        assert!(source.dependencies.is_empty());
        assert!(source.test_name.is_none());
    }

    #[test]
    fn test_parse_dependencies_and_weak_flag() {
        let dir = tempdir().unwrap();
        write_decl(
            dir.path(),
            r#"
[package]
version = "2.1.0"
description = "demo"

[dependencies]
beta = "1.2.0"
gamma = { version = "=2.0.0", weak = true }
delta = ""
"#,
        );

        let source = PackageSource::parse(&PackageName::new("alpha"), dir.path()).unwrap();
        let beta = &source.dependencies[&PackageName::new("beta")];
        assert_eq!(beta.constraint.as_deref(), Some("1.2.0"));
        assert!(!beta.weak);

        let gamma = &source.dependencies[&PackageName::new("gamma")];
        assert_eq!(gamma.constraint.as_deref(), Some("=2.0.0"));
        assert!(gamma.weak);

        // Empty requirement means unconstrained.
        let delta = &source.dependencies[&PackageName::new("delta")];
        assert_eq!(delta.constraint, None);
    }

    #[test]
    fn test_name_mismatch_is_rejected() {
        let dir = tempdir().unwrap();
        write_decl(dir.path(), "[package]\nname = \"other\"\nversion = \"1.0.0\"\n");

        let result = PackageSource::parse(&PackageName::new("alpha"), dir.path());
        assert!(matches!(result, Err(SourceError::NameMismatch { .. })));
    }

    #[test]
    fn test_test_source_synthesis() {
        let dir = tempdir().unwrap();
        write_decl(
            dir.path(),
            r#"
[package]
version = "1.0.0"

[dependencies]
beta = "1.0.0"

[test]
name = "alpha-test"
[test.dependencies]
checkers = ""
"#,
        );

        let source = PackageSource::parse(&PackageName::new("alpha"), dir.path()).unwrap();
        let test = source.test_source().unwrap();
        assert_eq!(test.name, "alpha-test");
        assert!(test.is_test);
        assert!(test.test_name.is_none());
        assert_eq!(test.source_root, source.source_root);
        assert!(test.dependencies.contains_key(&PackageName::new("alpha")));
        assert!(test.dependencies.contains_key(&PackageName::new("beta")));
        assert!(test.dependencies.contains_key(&PackageName::new("checkers")));
    }

    #[test]
    fn test_missing_declaration() {
        let dir = tempdir().unwrap();
        let result = PackageSource::parse(&PackageName::new("alpha"), dir.path());
        assert!(matches!(result, Err(SourceError::MissingDeclaration(_))));
    }
}
