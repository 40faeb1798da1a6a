//! Binary Table Snapshots
//!
//! A snapshot is a postcard-encoded version number followed by the
//! postcard-encoded table.

use crate::{SensorTable, TableError};
use std::path::Path;
use tracing::info;

/// Snapshot format version written by this crate
pub const SNAPSHOT_VERSION: u32 = 1;

/// Write a table snapshot to disk
pub fn save_snapshot(table: &SensorTable, path: impl AsRef<Path>) -> Result<(), TableError> {
    let path = path.as_ref();
    let mut bytes = postcard::to_allocvec(&SNAPSHOT_VERSION)?;
    bytes.extend(postcard::to_allocvec(table)?);

    std::fs::write(path, &bytes)?;
    info!(
        "Saved snapshot of {} rows ({} bytes) to {}",
        table.len(),
        bytes.len(),
        path.display()
    );
    Ok(())
}

/// Read a table snapshot, rejecting other format versions
pub fn load_snapshot(path: impl AsRef<Path>) -> Result<SensorTable, TableError> {
    let path = path.as_ref();
    let bytes = std::fs::read(path)?;

    let (version, rest): (u32, &[u8]) = postcard::take_from_bytes(&bytes)?;
    if version != SNAPSHOT_VERSION {
        return Err(TableError::UnsupportedVersion {
            found: version,
            expected: SNAPSHOT_VERSION,
        });
    }

    let table: SensorTable = postcard::from_bytes(rest)?;
    info!("Loaded snapshot of {} rows from {}", table.len(), path.display());
    Ok(table)
}
