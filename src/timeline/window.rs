//! Window adjuster - pads an episode's kill span with lead and tail footage

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::config::PaddingPolicy;

use super::{seconds, seconds_between, Episode};

/// Padded time range of one episode
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdjustedWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Tail padding that was asked for
    pub requested_tail_secs: f64,
    /// Tail padding actually applied after capping
    pub applied_tail_secs: f64,
}

impl AdjustedWindow {
    pub fn duration_secs(&self) -> f64 {
        seconds_between(self.start, self.end)
    }

    /// True when the padding policy cut the tail short
    pub fn tail_shortened(&self) -> bool {
        self.applied_tail_secs < self.requested_tail_secs
    }
}

/// Compute `[first_kill - lead, last_kill + min(tail, cap)]` for an episode.
///
/// The cap is the policy's tail cap, further limited by the footage left in
/// the recording that owns the last kill. The start is not clamped to any
/// recording; the resolver clips against real file bounds.
pub fn adjust_window(
    episode: &Episode,
    lead_secs: f64,
    tail_secs: f64,
    policy: &PaddingPolicy,
) -> Option<AdjustedWindow> {
    let first = episode.first_kill()?;
    let last = episode.last_kill()?;

    let room = episode
        .owning_source(last)
        .map(|s| seconds_between(last, s.recording_end()).max(0.0))
        .unwrap_or(0.0);
    let cap = policy.tail_cap_secs().min(room);
    let applied = tail_secs.min(cap).max(0.0);

    if applied < tail_secs {
        tracing::debug!(
            "Tail after {} shortened from {}s to {}s",
            last,
            tail_secs,
            applied
        );
    }

    Some(AdjustedWindow {
        start: first - seconds(lead_secs),
        end: last + seconds(applied),
        requested_tail_secs: tail_secs,
        applied_tail_secs: applied,
    })
}
