//! kiln - Package Catalog and Build Orchestrator
//!
//! Maintains a unified, queryable view of packages available on a remote
//! registry and in local source trees, resolves version constraints over
//! the merged view, and lazily builds local packages on demand.

pub mod build;
pub mod catalog;
pub mod depot;
pub mod fsutil;
pub mod project;
pub mod resolver;
pub mod snapshot;
pub mod source;
pub mod types;
pub mod ui;

use std::path::PathBuf;

use dirs::home_dir;

/// Magic bytes identifying a zstd-compressed payload.
pub const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];

/// Default kiln home directory: `$KILN_HOME` or `~/.kiln`.
pub fn kiln_home() -> PathBuf {
    if let Some(home) = std::env::var_os("KILN_HOME") {
        return PathBuf::from(home);
    }
    home_dir()
        .expect("Could not determine home directory")
        .join(".kiln")
}

/// Cached registry snapshot: `~/.kiln/snapshot.bin`.
pub fn snapshot_cache_path() -> PathBuf {
    kiln_home().join("snapshot.bin")
}

/// Depot of downloaded package builds: `~/.kiln/depot`.
pub fn depot_path() -> PathBuf {
    kiln_home().join("depot")
}

/// Architecture constants
pub mod arch {
    /// ARM64 architecture
    pub const ARM64: &str = "arm64";
    /// x86_64 architecture
    pub const X86_64: &str = "x86_64";

    /// Get the current architecture string
    pub fn current() -> &'static str {
        if cfg!(target_arch = "aarch64") {
            ARM64
        } else {
            X86_64
        }
    }
}
