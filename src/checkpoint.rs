//! Processing checkpoint
//!
//! Remembers the end of the last exported episode so the next run only
//! looks at newer recordings.

use std::fs;
use std::path::Path;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{ExportError, Result};

/// On-disk checkpoint format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingState {
    pub last_processed_iso_time: NaiveDateTime,
}

/// Read the checkpoint; a missing or unreadable file means "no checkpoint"
pub fn load<P: AsRef<Path>>(path: P) -> Option<NaiveDateTime> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::info!("No checkpoint at {:?}, processing all recordings", path);
        return None;
    }
    match read(path) {
        Ok(state) => {
            tracing::info!(
                "Resuming after {} (from {:?})",
                state.last_processed_iso_time,
                path
            );
            Some(state.last_processed_iso_time)
        }
        Err(e) => {
            tracing::warn!("Ignoring checkpoint {:?}: {}", path, e);
            None
        }
    }
}

fn read(path: &Path) -> Result<ProcessingState> {
    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content).map_err(|e| ExportError::Checkpoint(e.to_string()))
}

/// Persist `last_processed` to `path`
pub fn save<P: AsRef<Path>>(path: P, last_processed: NaiveDateTime) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let state = ProcessingState {
        last_processed_iso_time: last_processed,
    };
    let content = serde_json::to_string_pretty(&state)
        .map_err(|e| ExportError::Checkpoint(e.to_string()))?;
    fs::write(path, content)?;
    tracing::info!("Checkpoint saved: {}", last_processed);
    Ok(())
}
