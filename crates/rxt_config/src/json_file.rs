//! Whole-document JSON files used by the file-backed stores.

use rxt_error::{RxtResult, StorageError, StorageErrorKind};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use tracing::{debug, instrument};

/// Read and decode a JSON document. A missing file yields `None`.
///
/// # Errors
///
/// Returns a storage error if the file exists but cannot be read or decoded.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn read_json<T: DeserializeOwned>(path: &Path) -> RxtResult<Option<T>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        debug!("State file absent");
        return Ok(None);
    }
    let json = tokio::fs::read_to_string(path).await.map_err(|e| {
        StorageError::new(StorageErrorKind::FileRead(format!(
            "{}: {}",
            path.display(),
            e
        )))
    })?;
    let value = serde_json::from_str(&json).map_err(|e| {
        StorageError::new(StorageErrorKind::Serialization(format!(
            "{}: {}",
            path.display(),
            e
        )))
    })?;
    debug!("State file loaded");
    Ok(Some(value))
}

/// Encode and write a JSON document, replacing the previous one atomically.
///
/// The document is written to a sibling temp file and renamed over the target,
/// so a crash mid-write leaves the previous document intact.
///
/// # Errors
///
/// Returns a storage error if the parent directory cannot be created or the
/// file cannot be written.
#[instrument(skip_all, fields(path = %path.display()))]
pub async fn write_json<T: Serialize>(path: &Path, value: &T) -> RxtResult<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                parent.display(),
                e
            )))
        })?;
    }

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| StorageError::new(StorageErrorKind::Serialization(e.to_string())))?;

    let tmp = path.with_extension("json.tmp");
    let write_err = |e: std::io::Error| {
        StorageError::new(StorageErrorKind::FileWrite(format!(
            "{}: {}",
            path.display(),
            e
        )))
    };
    tokio::fs::write(&tmp, json).await.map_err(write_err)?;
    tokio::fs::rename(&tmp, path).await.map_err(write_err)?;
    debug!("State file written");
    Ok(())
}
