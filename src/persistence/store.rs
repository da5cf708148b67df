//! Snapshot file handling.

use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

use crate::gate::GateSnapshot;
use crate::limiter::LimiterSnapshot;
use crate::whitelist::WhitelistSnapshot;

/// Bumped whenever the snapshot layout changes incompatibly.
pub const SNAPSHOT_VERSION: u32 = 1;

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

/// Errors while reading or writing snapshots.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    #[error("unsupported snapshot version {found}, expected {expected}")]
    Version { found: u32, expected: u32 },
}

/// Everything that must survive a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceSnapshot {
    pub version: u32,
    /// Unix seconds at which the snapshot was taken.
    pub taken_at: u64,
    pub whitelist: WhitelistSnapshot,
    pub limiter: LimiterSnapshot,
    pub gate: GateSnapshot,
}

/// Reads and writes [`ServiceSnapshot`]s at a fixed path.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the snapshot, or `None` if no file exists yet.
    pub fn load(&self) -> Result<Option<ServiceSnapshot>, StoreError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let snapshot: ServiceSnapshot = serde_json::from_reader(reader)?;
        if snapshot.version != SNAPSHOT_VERSION {
            return Err(StoreError::Version {
                found: snapshot.version,
                expected: SNAPSHOT_VERSION,
            });
        }
        tracing::info!(
            path = %self.path.display(),
            principals = snapshot.limiter.principals.len(),
            members = snapshot.whitelist.members.len(),
            "Loaded state snapshot"
        );
        Ok(Some(snapshot))
    }

    /// Sibling temp file, unique per call so overlapping writers never share one.
    fn temp_path(&self) -> PathBuf {
        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(format!(".{}.{seq}.tmp", std::process::id()));
        self.path.with_file_name(name)
    }

    /// Write the snapshot to a temp file, fsync it, then rename over the target.
    pub fn save(&self, snapshot: &ServiceSnapshot) -> Result<(), StoreError> {
        let tmp = self.temp_path();
        let written = Self::write_synced(&tmp, snapshot)
            .and_then(|()| fs::rename(&tmp, &self.path).map_err(StoreError::from));
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        tracing::info!(
            path = %self.path.display(),
            principals = snapshot.limiter.principals.len(),
            "Saved state snapshot"
        );
        Ok(())
    }

    fn write_synced(path: &Path, snapshot: &ServiceSnapshot) -> Result<(), StoreError> {
        let mut writer = BufWriter::new(File::create(path)?);
        serde_json::to_writer_pretty(&mut writer, snapshot)?;
        writer.flush()?;
        let file = writer.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        Ok(())
    }
}
