//! Identifier newtypes used throughout the catalog.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Package identifier in canonical (lowercase) form.
///
/// Catalog collections key on the canonical form, so `Alpha` and `alpha`
/// address the same entry. Everything else the crate needs is a view of
/// the canonical string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Canonicalize `name` into a package identifier.
    pub fn new(name: &str) -> Self {
        Self(name.to_lowercase())
    }

    /// The canonical name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for PackageName {
    fn eq(&self, other: &&str) -> bool {
        self.0.eq_ignore_ascii_case(other)
    }
}

/// Opaque version identifier, unique within a catalog.
///
/// Server snapshots ship their own ids. Locally synthesised versions draw
/// from a process-wide counter instead, which rules out collisions inside
/// a single catalog by construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionId(String);

static LOCAL_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

impl VersionId {
    /// Wrap an id taken from a server snapshot.
    pub fn new(id: &str) -> Self {
        Self(id.to_string())
    }

    /// Mint the next id for a locally synthesised version.
    pub fn fresh_local() -> Self {
        let n = LOCAL_ID_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("local-{n}"))
    }

    /// The id as text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_canonicalize_to_lowercase() {
        let name = PackageName::new("Alpha");
        assert_eq!(name.as_str(), "alpha");
        assert_eq!(name, "ALPHA");
        assert_eq!(PackageName::new("ALPHA"), PackageName::new("alpha"));
    }

    #[test]
    fn test_fresh_local_ids_are_distinct() {
        let a = VersionId::fresh_local();
        let b = VersionId::fresh_local();
        assert_ne!(a, b);
        assert!(a.as_str().starts_with("local-"));
    }
}
