//! Episode timeline model
//!
//! This module holds the interval types shared by the planning stages:
//! - [`Episode`]: a group of nearby kills and the recordings they came from
//! - [`TimelineSegment`]: a sub-range of an episode window cut from one recording
//! - [`Timeline`]: the resolved footage for one episode
//!
//! Times are wall-clock `NaiveDateTime` values with millisecond resolution.

pub mod grouper;
pub mod resolver;
pub mod window;

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::catalog::SourceFile;

pub use grouper::{group_episodes, seed_episodes};
pub use resolver::{resolve_coverage, CoverageGap, Resolution};
pub use window::{adjust_window, AdjustedWindow};

/// Convert fractional seconds to a millisecond-precision delta
pub fn seconds(secs: f64) -> TimeDelta {
    TimeDelta::milliseconds((secs * 1000.0).round() as i64)
}

/// Signed seconds from `from` to `to`
pub fn seconds_between(from: NaiveDateTime, to: NaiveDateTime) -> f64 {
    (to - from).num_milliseconds() as f64 / 1000.0
}

/// A group of temporally close kills destined for one output file
#[derive(Debug, Clone, PartialEq)]
pub struct Episode {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub kill_times: BTreeSet<NaiveDateTime>,
    /// Contributing recordings keyed by path
    pub sources: BTreeMap<PathBuf, SourceFile>,
}

impl Episode {
    /// Single-kill episode spanning `[kill - lead, kill + tail]`
    pub fn seed(source: &SourceFile, lead_secs: f64, tail_secs: f64) -> Self {
        let kill = source.kill_time;
        Self {
            start_time: kill - seconds(lead_secs),
            end_time: kill + seconds(tail_secs),
            kill_times: BTreeSet::from([kill]),
            sources: BTreeMap::from([(source.path.clone(), source.clone())]),
        }
    }

    /// Union of two episodes; the result spans both
    pub fn absorb(mut self, other: Episode) -> Episode {
        self.start_time = self.start_time.min(other.start_time);
        self.end_time = self.end_time.max(other.end_time);
        self.kill_times.extend(other.kill_times);
        for (path, source) in other.sources {
            self.sources.entry(path).or_insert(source);
        }
        self
    }

    pub fn kill_count(&self) -> usize {
        self.kill_times.len()
    }

    pub fn first_kill(&self) -> Option<NaiveDateTime> {
        self.kill_times.first().copied()
    }

    pub fn last_kill(&self) -> Option<NaiveDateTime> {
        self.kill_times.last().copied()
    }

    /// The recording whose kill event is `kill`
    pub fn owning_source(&self, kill: NaiveDateTime) -> Option<&SourceFile> {
        self.sources
            .values()
            .find(|s| s.kill_time == kill)
            .or_else(|| self.sources.values().find(|s| s.contains(kill)))
    }
}

/// A contiguous piece of an episode window taken from one recording
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineSegment {
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub source: SourceFile,
    /// Kills shown in this segment, ascending
    pub kill_times: Vec<NaiveDateTime>,
}

impl TimelineSegment {
    pub fn new(start_time: NaiveDateTime, end_time: NaiveDateTime, source: &SourceFile) -> Self {
        Self {
            start_time,
            end_time,
            source: source.clone(),
            kill_times: Vec::new(),
        }
    }

    pub fn duration_secs(&self) -> f64 {
        seconds_between(self.start_time, self.end_time)
    }

    pub fn contains(&self, t: NaiveDateTime) -> bool {
        self.start_time <= t && t <= self.end_time
    }
}

/// Resolved footage for one episode
#[derive(Debug, Clone, PartialEq)]
pub enum Timeline {
    /// One recording spans the whole window
    SingleCover(TimelineSegment),
    /// Ordered, non-overlapping pieces from several recordings
    Stitched(Vec<TimelineSegment>),
}

impl Timeline {
    pub fn segments(&self) -> &[TimelineSegment] {
        match self {
            Timeline::SingleCover(segment) => std::slice::from_ref(segment),
            Timeline::Stitched(segments) => segments,
        }
    }

    pub fn is_single_cover(&self) -> bool {
        matches!(self, Timeline::SingleCover(_))
    }
}
