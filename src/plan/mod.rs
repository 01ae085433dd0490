//! Clip plan emitter
//!
//! Turns resolved timeline segments into cut instructions for the external
//! cutter and names the exported file.

use std::path::PathBuf;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::catalog::{Catalog, SourceFile};
use crate::timeline::{seconds_between, Resolution, TimelineSegment};

/// One cut instruction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClipPlan {
    /// Recording to cut from
    pub source: SourceFile,
    /// Offset into the recording in seconds
    pub cut_start_secs: f64,
    /// Length of the cut in seconds
    pub cut_duration_secs: f64,
    /// 1-based concatenation order
    pub ordinal: usize,
    pub segment_start: NaiveDateTime,
    pub segment_end: NaiveDateTime,
    pub kill_count: usize,
}

impl ClipPlan {
    pub fn source_path(&self) -> &PathBuf {
        &self.source.path
    }

    /// Midpoint of the cut, relative to the recording start
    pub fn midpoint_secs(&self) -> f64 {
        self.cut_start_secs + self.cut_duration_secs / 2.0
    }
}

/// Build one plan per segment, in timeline order.
///
/// Each segment is cut from the relevant recording with the largest overlap;
/// on a tie the segment's own recording wins. Segments without any
/// overlapping recording are skipped.
pub fn emit_clip_plans(resolution: &Resolution, catalog: &Catalog) -> Vec<ClipPlan> {
    let window = &resolution.window;
    let relevant = catalog.relevant(window.start, window.end);

    let mut plans = Vec::with_capacity(resolution.segments().len());
    for segment in resolution.segments() {
        let Some(source) = best_source(segment, &relevant) else {
            tracing::warn!(
                "No recording overlaps {} - {}, skipping segment",
                segment.start_time,
                segment.end_time
            );
            continue;
        };

        let cut_start_secs = seconds_between(source.recording_start, segment.start_time).max(0.0);
        let plan = ClipPlan {
            source: source.clone(),
            cut_start_secs,
            cut_duration_secs: segment.duration_secs(),
            ordinal: plans.len() + 1,
            segment_start: segment.start_time,
            segment_end: segment.end_time,
            kill_count: segment.kill_times.len(),
        };
        tracing::debug!(
            "Clip {}: {} from {:.3}s for {:.3}s",
            plan.ordinal,
            source.display_name(),
            plan.cut_start_secs,
            plan.cut_duration_secs
        );
        plans.push(plan);
    }
    plans
}

fn best_source<'a>(
    segment: &'a TimelineSegment,
    relevant: &[&'a SourceFile],
) -> Option<&'a SourceFile> {
    let own = segment.source.overlap_secs(segment.start_time, segment.end_time);
    let mut best: Option<(&SourceFile, f64)> = (own > 0.0).then_some((&segment.source, own));

    for file in relevant {
        let overlap = file.overlap_secs(segment.start_time, segment.end_time);
        if overlap > best.map(|(_, o)| o).unwrap_or(0.0) {
            best = Some((*file, overlap));
        }
    }
    best.map(|(file, _)| file)
}

/// `killcount_<YYYYMMDD_HHMMSS>_group<N>.<ext>` for the `group`-th exported episode
pub fn output_file_name(first_kill: NaiveDateTime, group: usize, extension: &str) -> String {
    format!(
        "killcount_{}_group{}.{}",
        first_kill.format("%Y%m%d_%H%M%S"),
        group,
        extension.trim_start_matches('.')
    )
}
