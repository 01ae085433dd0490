//! Directory scanner - turns recording files into catalog entries

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::config::PaddingPolicy;
use crate::error::{ExportError, Result};

use super::{parse_recording_start, Catalog, SourceFile};

/// A file found in the input directory
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    pub path: PathBuf,
    pub filename: String,
}

/// Duration lookup for a recording
pub trait DurationProbe {
    /// Container duration in seconds, `None` when the file cannot be probed
    fn probe_duration(&self, path: &Path) -> Option<f64>;
}

/// Outcome of a catalog scan
#[derive(Debug, Default)]
pub struct CatalogScan {
    pub catalog: Catalog,
    /// Files at or before the checkpoint
    pub skipped_checkpoint: usize,
    /// Files whose name carried no timestamp
    pub skipped_unparsable: usize,
    /// Files without a usable duration
    pub skipped_duration: usize,
}

/// List recordings with the given extension, sorted by filename
pub fn list_source_files<P: AsRef<Path>>(dir: P, extension: &str) -> Result<Vec<SourceEntry>> {
    let dir = dir.as_ref();
    let read_dir =
        std::fs::read_dir(dir).map_err(|_| ExportError::InputDir(dir.to_path_buf()))?;
    let wanted = extension.trim_start_matches('.').to_ascii_lowercase();

    let mut entries = Vec::new();
    for entry in read_dir {
        let entry = entry?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase() == wanted)
            .unwrap_or(false);
        if !matches {
            continue;
        }
        let filename = entry.file_name().to_string_lossy().into_owned();
        entries.push(SourceEntry { path, filename });
    }

    entries.sort_by(|a, b| a.filename.cmp(&b.filename));
    tracing::debug!("Found {} {} files in {:?}", entries.len(), wanted, dir);
    Ok(entries)
}

/// Build the catalog from listed files.
///
/// Files whose recording start is at or before `last_processed` are dropped
/// before probing. Catalog defects (bad name, no duration) skip the file and
/// never fail the scan.
pub fn build_catalog(
    entries: &[SourceEntry],
    probe: &dyn DurationProbe,
    last_processed: Option<NaiveDateTime>,
    policy: &PaddingPolicy,
) -> CatalogScan {
    let mut scan = CatalogScan::default();
    let mut files = Vec::with_capacity(entries.len());

    for entry in entries {
        let Some(start) = parse_recording_start(&entry.filename) else {
            tracing::warn!("Skipping {}: no timestamp in filename", entry.filename);
            scan.skipped_unparsable += 1;
            continue;
        };

        if last_processed.is_some_and(|checkpoint| start <= checkpoint) {
            scan.skipped_checkpoint += 1;
            continue;
        }

        let duration = match probe.probe_duration(&entry.path) {
            Some(d) if d > 0.0 && d.is_finite() => d,
            other => {
                tracing::warn!(
                    "Skipping {}: no usable duration ({:?})",
                    entry.filename,
                    other
                );
                scan.skipped_duration += 1;
                continue;
            }
        };

        let kill_offset = policy.typical_kill_position_secs.min(duration / 2.0);
        files.push(SourceFile::new(
            entry.path.clone(),
            start,
            duration,
            kill_offset,
        ));
    }

    scan.catalog = Catalog::new(files);
    tracing::info!(
        "Catalog: {} new recordings, {} already processed, {} unparsable, {} without duration",
        scan.catalog.len(),
        scan.skipped_checkpoint,
        scan.skipped_unparsable,
        scan.skipped_duration
    );
    scan
}
