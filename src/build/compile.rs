//! The compiler seam.
//!
//! The build driver talks to the compiler through a narrow trait: which
//! packages must be built first, produce an artifact, and decide whether
//! an existing artifact is still current.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::build::artifact::BuiltPackage;
use crate::source::PackageSource;
use crate::types::PackageName;

#[derive(Error, Debug)]
pub enum CompileError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Build failed for {name}: {reason}")]
    Failed { name: PackageName, reason: String },
}

/// A build-order edge: `name` must be built before the current package,
/// optionally pinned to an exact version.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildOrderConstraint {
    pub name: PackageName,
    pub version: Option<String>,
}

pub trait Compiler: Send + Sync {
    /// The packages that must be built before `source`, in no particular
    /// order. A superset of the runtime dependencies.
    fn build_order_constraints(&self, source: &PackageSource) -> Vec<BuildOrderConstraint>;

    /// Compile the source tree into an artifact. `local_dep_versions`
    /// records the local versions of the build-order dependencies that
    /// are themselves local, for the freshness check.
    fn compile(
        &self,
        source: &PackageSource,
        local_dep_versions: &BTreeMap<PackageName, String>,
    ) -> Result<BuiltPackage, CompileError>;

    /// Whether `built` is still current for `source`: same source
    /// contents, same dependency versions, same tool.
    fn check_up_to_date(
        &self,
        source: &PackageSource,
        built: &BuiltPackage,
        local_dep_versions: &BTreeMap<PackageName, String>,
    ) -> bool;
}

/// Extract the exact version from a `=x.y.z` requirement, if that is what
/// the requirement is.
fn pinned_version(constraint: &str) -> Option<String> {
    let stripped = constraint.strip_prefix('=')?.trim();
    semver::Version::parse(stripped).ok()?;
    Some(stripped.to_string())
}

/// Digest-based compiler over plain source trees.
///
/// "Compiling" a package records a content digest of its tree; the
/// artifact is up to date while the digest, the dependency versions, and
/// the tool version all still match.
pub struct SourceCompiler {
    tool_version: String,
}

impl SourceCompiler {
    pub fn new() -> Self {
        Self {
            tool_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    fn digest_tree(root: &Path) -> String {
        let mut hasher = blake3::Hasher::new();
        Self::digest_dir(root, root, &mut hasher);
        hasher.finalize().to_hex().to_string()
    }

    fn digest_dir(root: &Path, dir: &Path, hasher: &mut blake3::Hasher) {
        let Ok(entries) = fs::read_dir(dir) else {
            return;
        };
        let mut paths: Vec<_> = entries.filter_map(Result::ok).map(|e| e.path()).collect();
        paths.sort();

        for path in paths {
            let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
                continue;
            };
            // Build outputs and VCS metadata are not sources.
            if file_name.starts_with(".build") || file_name == ".git" {
                continue;
            }
            if path.is_dir() {
                Self::digest_dir(root, &path, hasher);
            } else if let Ok(bytes) = fs::read(&path) {
                if let Ok(relative) = path.strip_prefix(root) {
                    hasher.update(relative.to_string_lossy().as_bytes());
                }
                hasher.update(&bytes);
            }
        }
    }
}

impl Default for SourceCompiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler for SourceCompiler {
    fn build_order_constraints(&self, source: &PackageSource) -> Vec<BuildOrderConstraint> {
        let mut constraints = Vec::new();
        let mut seen = std::collections::BTreeSet::new();

        for (name, dep) in &source.dependencies {
            if dep.weak {
                continue;
            }
            if seen.insert(name.clone()) {
                constraints.push(BuildOrderConstraint {
                    name: name.clone(),
                    version: dep.constraint.as_deref().and_then(pinned_version),
                });
            }
        }
        for (name, dep) in &source.build_dependencies {
            if seen.insert(name.clone()) {
                constraints.push(BuildOrderConstraint {
                    name: name.clone(),
                    version: dep.constraint.as_deref().and_then(pinned_version),
                });
            }
        }
        constraints
    }

    fn compile(
        &self,
        source: &PackageSource,
        local_dep_versions: &BTreeMap<PackageName, String>,
    ) -> Result<BuiltPackage, CompileError> {
        Ok(BuiltPackage {
            name: source.name.clone(),
            version: source.version.clone(),
            architectures: vec![crate::arch::current().to_string()],
            source_digest: Self::digest_tree(&source.source_root),
            dep_versions: local_dep_versions.clone(),
            tool_version: self.tool_version.clone(),
            build_of: source.source_root.clone(),
        })
    }

    fn check_up_to_date(
        &self,
        source: &PackageSource,
        built: &BuiltPackage,
        local_dep_versions: &BTreeMap<PackageName, String>,
    ) -> bool {
        built.tool_version == self.tool_version
            && built.version == source.version
            && built.dep_versions == *local_dep_versions
            && built.source_digest == Self::digest_tree(&source.source_root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::DECLARATION_FILE;
    use tempfile::tempdir;

    fn parsed_source(dir: &Path, decl: &str) -> PackageSource {
        fs::write(dir.join(DECLARATION_FILE), decl).unwrap();
        PackageSource::parse(&PackageName::new("alpha"), dir).unwrap()
    }

    #[test]
    fn test_pinned_version_extraction() {
        assert_eq!(pinned_version("=1.2.3"), Some("1.2.3".to_string()));
        assert_eq!(pinned_version("^1.2.3"), None);
        assert_eq!(pinned_version("1.2.3"), None);
        assert_eq!(pinned_version("=not-a-version"), None);
    }

    #[test]
    fn test_build_order_includes_build_deps_and_skips_weak() {
        let dir = tempdir().unwrap();
        let source = parsed_source(
            dir.path(),
            r#"
[package]
version = "1.0.0"

[dependencies]
runtime = "1.0.0"
optional = { version = "=2.0.0", weak = true }

[build-dependencies]
tools = "=3.0.0"
"#,
        );

        let constraints = SourceCompiler::new().build_order_constraints(&source);
        let names: Vec<&str> = constraints.iter().map(|c| c.name.as_str()).collect();
        assert!(names.contains(&"runtime"));
        assert!(names.contains(&"tools"));
        assert!(!names.contains(&"optional"));

        let tools = constraints.iter().find(|c| c.name == "tools").unwrap();
        assert_eq!(tools.version.as_deref(), Some("3.0.0"));
    }

    #[test]
    fn test_compile_then_up_to_date_until_source_changes() {
        let dir = tempdir().unwrap();
        let source = parsed_source(dir.path(), "[package]\nversion = \"1.0.0\"\n");
        let compiler = SourceCompiler::new();
        let deps = BTreeMap::new();

        let built = compiler.compile(&source, &deps).unwrap();
        assert!(compiler.check_up_to_date(&source, &built, &deps));

        fs::write(dir.path().join("extra.txt"), b"changed").unwrap();
        assert!(!compiler.check_up_to_date(&source, &built, &deps));
    }

    #[test]
    fn test_build_directory_does_not_affect_digest() {
        let dir = tempdir().unwrap();
        let source = parsed_source(dir.path(), "[package]\nversion = \"1.0.0\"\n");
        let compiler = SourceCompiler::new();
        let deps = BTreeMap::new();

        let built = compiler.compile(&source, &deps).unwrap();
        fs::create_dir_all(dir.path().join(".build.alpha")).unwrap();
        fs::write(dir.path().join(".build.alpha/built.bin"), b"x").unwrap();
        assert!(compiler.check_up_to_date(&source, &built, &deps));
    }

    #[test]
    fn test_dep_version_change_invalidates() {
        let dir = tempdir().unwrap();
        let source = parsed_source(dir.path(), "[package]\nversion = \"1.0.0\"\n");
        let compiler = SourceCompiler::new();

        let mut deps = BTreeMap::new();
        deps.insert(PackageName::new("beta"), "1.0.0+local".to_string());
        let built = compiler.compile(&source, &deps).unwrap();

        let mut newer = BTreeMap::new();
        newer.insert(PackageName::new("beta"), "1.1.0+local".to_string());
        assert!(!compiler.check_up_to_date(&source, &built, &newer));
    }
}
