//! Source catalog
//!
//! One entry per recording file on disk:
//! - recording start parsed from the filename
//! - duration probed from the container
//! - the kill moment derived from both
//!
//! The catalog is built once per run and never mutated afterwards.

pub mod filename;
pub mod scanner;

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::timeline::{seconds, seconds_between};

pub use filename::parse_recording_start;
pub use scanner::{build_catalog, list_source_files, CatalogScan, DurationProbe, SourceEntry};

/// A single cataloged recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceFile {
    pub path: PathBuf,
    pub recording_start: NaiveDateTime,
    pub kill_time: NaiveDateTime,
    pub duration_secs: f64,
}

impl SourceFile {
    /// Catalog entry with the kill placed at `kill_offset_secs` into the recording
    pub fn new(
        path: PathBuf,
        recording_start: NaiveDateTime,
        duration_secs: f64,
        kill_offset_secs: f64,
    ) -> Self {
        Self {
            path,
            recording_start,
            kill_time: recording_start + seconds(kill_offset_secs),
            duration_secs,
        }
    }

    /// Wall-clock time at which the recording stops
    pub fn recording_end(&self) -> NaiveDateTime {
        self.recording_start + seconds(self.duration_secs)
    }

    /// Whether `t` lies within `[recording_start, recording_end]`
    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.recording_start <= t && t <= self.recording_end()
    }

    /// Whether the recording spans the whole of `[start, end]`
    pub fn covers(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.recording_start <= start && self.recording_end() >= end
    }

    /// Whether the recording shares at least one instant with `[start, end]`
    pub fn intersects(&self, start: NaiveDateTime, end: NaiveDateTime) -> bool {
        self.recording_start <= end && self.recording_end() >= start
    }

    /// Seconds of `[start, end]` this recording holds footage for
    pub fn overlap_secs(&self, start: NaiveDateTime, end: NaiveDateTime) -> f64 {
        let lo = start.max(self.recording_start);
        let hi = end.min(self.recording_end());
        seconds_between(lo, hi).max(0.0)
    }

    /// File name for log output
    pub fn display_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// All recordings eligible for this run, ordered by recording start then path
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    files: Vec<SourceFile>,
}

impl Catalog {
    /// Build a catalog; equal start times are ordered by path
    pub fn new(mut files: Vec<SourceFile>) -> Self {
        files.sort_by(|a, b| {
            a.recording_start
                .cmp(&b.recording_start)
                .then_with(|| a.path.cmp(&b.path))
        });
        Self { files }
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Recordings whose interval intersects `[start, end]`
    pub fn relevant(&self, start: NaiveDateTime, end: NaiveDateTime) -> Vec<&SourceFile> {
        self.files
            .iter()
            .filter(|f| f.intersects(start, end))
            .collect()
    }
}
