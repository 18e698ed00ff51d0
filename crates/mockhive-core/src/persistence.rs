//! Atomic persistence of endpoint registry snapshots
//!
//! Write order: serialise to `<file>.tmp`, copy the existing `<file>` to
//! `<file>.backup`, then rename the tmp over `<file>`. At any crash point
//! either `<file>` or `<file>.backup` parses.

use crate::endpoint::Endpoint;
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};

/// Snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// On-disk registry snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotFile {
    /// Format version
    pub version: u32,
    /// When the snapshot was written
    pub saved_at: DateTime<Utc>,
    /// Endpoint count, for quick inspection
    pub count: usize,
    /// The endpoints themselves
    pub endpoints: Vec<Endpoint>,
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".tmp");
    PathBuf::from(p)
}

fn backup_path(path: &Path) -> PathBuf {
    let mut p = path.as_os_str().to_owned();
    p.push(".backup");
    PathBuf::from(p)
}

/// Write a snapshot atomically.
pub async fn save_snapshot(path: &Path, endpoints: &[Endpoint]) -> Result<()> {
    let snapshot = SnapshotFile {
        version: SNAPSHOT_VERSION,
        saved_at: Utc::now(),
        count: endpoints.len(),
        endpoints: endpoints.to_vec(),
    };
    let serialized = serde_json::to_vec_pretty(&snapshot)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::persistence(format!("Failed to create data directory: {}", e)))?;
    }

    let tmp = tmp_path(path);
    fs::write(&tmp, &serialized)
        .await
        .map_err(|e| Error::persistence(format!("Failed to write snapshot: {}", e)))?;

    if fs::try_exists(path).await.unwrap_or(false) {
        if let Err(e) = fs::copy(path, backup_path(path)).await {
            warn!(error = %e, "failed to refresh snapshot backup");
        }
    }

    fs::rename(&tmp, path)
        .await
        .map_err(|e| Error::persistence(format!("Failed to commit snapshot: {}", e)))?;

    Ok(())
}

async fn parse_snapshot(path: &Path) -> Option<SnapshotFile> {
    let bytes = fs::read(path).await.ok()?;
    match serde_json::from_slice::<SnapshotFile>(&bytes) {
        Ok(snapshot) => Some(snapshot),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "snapshot did not parse");
            None
        }
    }
}

/// Load endpoints from a snapshot, falling back to the backup file and
/// finally to an empty registry.
pub async fn load_snapshot(path: &Path) -> Vec<Endpoint> {
    if let Some(snapshot) = parse_snapshot(path).await {
        info!(count = snapshot.count, path = %path.display(), "loaded endpoint snapshot");
        return snapshot.endpoints;
    }
    let backup = backup_path(path);
    if let Some(snapshot) = parse_snapshot(&backup).await {
        warn!(
            count = snapshot.count,
            path = %backup.display(),
            "primary snapshot unreadable, recovered from backup"
        );
        return snapshot.endpoints;
    }
    Vec::new()
}
