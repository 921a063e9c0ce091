//! Registry snapshots and their on-disk cache.
//!
//! A snapshot is a point-in-time serialisation of the remote registry's
//! catalog. The cache file is postcard-encoded and memory-mapped on load;
//! wire payloads may additionally be zstd-compressed.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::catalog::{Build, Package, Version};
use crate::ZSTD_MAGIC;

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Postcard(#[from] postcard::Error),

    #[error("Registry request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Registry returned HTTP {0}")]
    Status(u16),
}

/// The record collections carried by a snapshot. They feed the catalog's
/// ingestion verbatim.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Collections {
    #[serde(default)]
    pub packages: Vec<Package>,
    #[serde(default)]
    pub versions: Vec<Version>,
    #[serde(default)]
    pub builds: Vec<Build>,
}

/// A point-in-time view of the remote registry.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    /// Unix timestamp of when the registry produced this snapshot.
    pub fetched_at: i64,
    pub collections: Collections,
}

impl Snapshot {
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        Ok(postcard::to_allocvec(self)?)
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, SnapshotError> {
        Ok(postcard::from_bytes(data)?)
    }
}

/// On-disk snapshot cache.
///
/// A missing or corrupt cache file reads as an empty snapshot; the catalog
/// stays usable offline and the next successful refresh rewrites it.
#[derive(Debug, Clone)]
pub struct SnapshotCache {
    path: PathBuf,
}

impl SnapshotCache {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cached snapshot, tolerating absence and corruption.
    pub fn load_cached(&self) -> Snapshot {
        let Ok(file) = fs::File::open(&self.path) else {
            return Snapshot::default();
        };
        let Ok(mmap) = (unsafe { memmap2::Mmap::map(&file) }) else {
            return Snapshot::default();
        };

        let bytes: &[u8] = &mmap;
        if bytes.len() >= 4 && bytes[0..4] == ZSTD_MAGIC {
            match zstd::decode_all(bytes) {
                Ok(decompressed) => Snapshot::from_bytes(&decompressed).unwrap_or_default(),
                Err(_) => Snapshot::default(),
            }
        } else {
            Snapshot::from_bytes(bytes).unwrap_or_default()
        }
    }

    /// Persist a snapshot, creating parent directories as needed. The file
    /// is written uncompressed so the next load can mmap it directly.
    pub fn store(&self, snapshot: &Snapshot) -> Result<(), SnapshotError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, snapshot.to_bytes()?)?;
        Ok(())
    }
}

/// The remote side of a refresh: given the previous snapshot, produce an
/// updated one.
pub trait RemoteRegistry: Send + Sync {
    fn update(&self, prev: &Snapshot) -> Result<Snapshot, SnapshotError>;
}

/// The snapshot a refresh should ingest: the cached one, updated from the
/// registry unless offline. An unreachable registry is non-fatal; the
/// warning lands on the reporter and the cached snapshot is used.
pub fn fetch_effective(
    cache: &SnapshotCache,
    registry: Option<&dyn RemoteRegistry>,
    offline: bool,
    reporter: &dyn crate::ui::Reporter,
) -> Snapshot {
    let cached = cache.load_cached();
    if offline {
        return cached;
    }
    let Some(registry) = registry else {
        return cached;
    };

    match registry.update(&cached) {
        Ok(fresh) => {
            if let Err(e) = cache.store(&fresh) {
                reporter.warning(&format!("could not persist snapshot cache: {e}"));
            }
            fresh
        }
        Err(e) => {
            reporter.warning(&format!("package registry unreachable ({e}); using cached snapshot"));
            cached
        }
    }
}

/// HTTP snapshot fetcher. Blocking by design: catalog operations run to
/// completion on a single thread.
pub struct HttpRegistry {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpRegistry {
    pub fn new(url: &str) -> Result<Self, SnapshotError> {
        let client = reqwest::blocking::Client::builder()
            .user_agent("kiln-catalog")
            .build()?;
        Ok(Self {
            url: url.to_string(),
            client,
        })
    }
}

impl RemoteRegistry for HttpRegistry {
    fn update(&self, prev: &Snapshot) -> Result<Snapshot, SnapshotError> {
        let response = self.client.get(&self.url).send()?;
        if !response.status().is_success() {
            return Err(SnapshotError::Status(response.status().as_u16()));
        }
        let bytes = response.bytes()?;

        // Auto-detect zstd compression on the wire.
        let decoded = if bytes.len() >= 4 && bytes[0..4] == ZSTD_MAGIC {
            zstd::decode_all(bytes.as_ref())?
        } else {
            bytes.to_vec()
        };

        let snapshot = Snapshot::from_bytes(&decoded)?;
        if snapshot.fetched_at == prev.fetched_at {
            tracing::debug!(fetched_at = snapshot.fetched_at, "snapshot unchanged");
        }
        Ok(snapshot)
    }
}
