//! Coverage resolver
//!
//! Turns an adjusted window into the footage that will be cut for it. When a
//! single recording spans the whole window the answer is one segment.
//! Otherwise every kill gets a provisional segment in the recording that
//! holds it, and the segments are then normalised:
//! - overlapping pieces of different recordings are trimmed, earlier wins
//! - holes between recordings are bridged with whatever footage exists
//! - holes with no footage at all are reported as [`CoverageGap`]s
//!
//! Every retained kill ends up in exactly one segment.

use std::collections::BTreeSet;

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::catalog::{Catalog, SourceFile};
use crate::config::PaddingPolicy;
use crate::error::{ExportError, Result};

use super::{seconds, seconds_between, AdjustedWindow, Episode, Timeline, TimelineSegment};

/// Part of a window for which no recording holds footage
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CoverageGap {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    /// Episode kills that fall inside the gap and are lost
    pub swallowed_kills: Vec<NaiveDateTime>,
}

impl CoverageGap {
    pub fn duration_secs(&self) -> f64 {
        seconds_between(self.start, self.end)
    }
}

/// Resolved footage for one episode
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub window: AdjustedWindow,
    pub timeline: Timeline,
    /// Kills that no relevant recording contains
    pub unassigned: Vec<NaiveDateTime>,
    pub gaps: Vec<CoverageGap>,
}

impl Resolution {
    pub fn segments(&self) -> &[TimelineSegment] {
        self.timeline.segments()
    }

    /// True when nothing is left to cut
    pub fn is_empty(&self) -> bool {
        self.segments().is_empty()
    }

    /// Kills that made it into a segment
    pub fn retained_kills(&self) -> usize {
        self.segments().iter().map(|s| s.kill_times.len()).sum()
    }
}

/// Resolve an episode's adjusted window against the catalog.
///
/// Data problems (kills outside every recording, holes in the footage) are
/// reported in the returned [`Resolution`]. An `Err` means the resolved
/// timeline broke its own ordering invariants.
pub fn resolve_coverage(
    window: &AdjustedWindow,
    episode: &Episode,
    catalog: &Catalog,
    lead_secs: f64,
    tail_secs: f64,
    policy: &PaddingPolicy,
) -> Result<Resolution> {
    let relevant = catalog.relevant(window.start, window.end);

    if let Some(file) = relevant.iter().find(|f| f.covers(window.start, window.end)) {
        tracing::debug!(
            "Window {} - {} covered by {}",
            window.start,
            window.end,
            file.display_name()
        );
        let mut segment = TimelineSegment::new(window.start, window.end, file);
        segment.kill_times = episode.kill_times.iter().copied().collect();
        return Ok(Resolution {
            window: *window,
            timeline: Timeline::SingleCover(segment),
            unassigned: Vec::new(),
            gaps: Vec::new(),
        });
    }

    let (assigned, mut unassigned) = assign_kills(episode, &relevant);
    let provisional = provisional_segments(&assigned, window, lead_secs, tail_secs, policy);
    let normalised = trim_overlaps(dedup_segments(provisional));
    let stitched = coalesce(stitch_gaps(normalised, window, &relevant));

    let mut segments = Vec::with_capacity(stitched.len());
    for mut segment in stitched {
        if segment.start_time >= segment.end_time {
            for kill in &segment.kill_times {
                tracing::warn!(
                    "Kill at {} dropped: empty segment in {}",
                    kill,
                    segment.source.display_name()
                );
            }
            unassigned.extend(segment.kill_times.drain(..));
            continue;
        }
        segment.kill_times.sort();
        segment.kill_times.dedup();
        segments.push(segment);
    }
    unassigned.sort();

    check_timeline(&segments)?;
    let gaps = find_gaps(&segments, window, episode);

    tracing::debug!(
        "Window {} - {} stitched from {} segments, {} gaps",
        window.start,
        window.end,
        segments.len(),
        gaps.len()
    );

    Ok(Resolution {
        window: *window,
        timeline: Timeline::Stitched(segments),
        unassigned,
        gaps,
    })
}

/// Pair each kill with the earliest relevant recording containing it
fn assign_kills<'a>(
    episode: &Episode,
    relevant: &[&'a SourceFile],
) -> (Vec<(NaiveDateTime, &'a SourceFile)>, Vec<NaiveDateTime>) {
    let mut assigned = Vec::with_capacity(episode.kill_count());
    let mut unassigned = Vec::new();

    for &kill in &episode.kill_times {
        match relevant.iter().find(|f| f.contains(kill)) {
            Some(file) => assigned.push((kill, *file)),
            None => {
                tracing::warn!("Kill at {} is not inside any recording, skipping", kill);
                unassigned.push(kill);
            }
        }
    }
    (assigned, unassigned)
}

/// One segment per kill, clipped to the window and to the kill's recording.
///
/// A kill that already falls inside an earlier segment joins it. When the
/// next kill lives in another recording that starts within `tail` seconds of
/// this recording's end, the segment is stretched toward that end.
fn provisional_segments(
    assigned: &[(NaiveDateTime, &SourceFile)],
    window: &AdjustedWindow,
    lead_secs: f64,
    tail_secs: f64,
    policy: &PaddingPolicy,
) -> Vec<TimelineSegment> {
    let mut segments: Vec<TimelineSegment> = Vec::new();

    for (i, &(kill, file)) in assigned.iter().enumerate() {
        if let Some(existing) = segments.iter_mut().find(|s| s.contains(kill)) {
            existing.kill_times.push(kill);
            continue;
        }

        let file_end = file.recording_end();
        let start = window
            .start
            .max(kill - seconds(lead_secs))
            .max(file.recording_start);
        let mut end = window.end.min(kill + seconds(tail_secs)).min(file_end);

        if policy.tail_extension {
            if let Some(&(next_kill, next_file)) = assigned.get(i + 1) {
                let handoff = next_file.path != file.path
                    && seconds_between(file_end, next_kill) <= tail_secs;
                if handoff {
                    let room = seconds_between(kill, file_end).max(0.0);
                    let extension = room.min(policy.tail_cap_secs());
                    let extended = (kill + seconds(extension)).min(window.end);
                    if extended > end {
                        tracing::debug!(
                            "Extending segment for kill at {} to {} before handoff to {}",
                            kill,
                            extended,
                            next_file.display_name()
                        );
                        end = extended;
                    }
                }
            }
        }

        let mut segment = TimelineSegment::new(start, end, file);
        segment.kill_times.push(kill);
        segments.push(segment);
    }
    segments
}

/// Fold segments with identical bounds and recording, then sort by start
fn dedup_segments(segments: Vec<TimelineSegment>) -> Vec<TimelineSegment> {
    let mut unique: Vec<TimelineSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        let twin = unique.iter_mut().find(|u| {
            u.start_time == segment.start_time
                && u.end_time == segment.end_time
                && u.source.path == segment.source.path
        });
        match twin {
            Some(u) => u.kill_times.extend(segment.kill_times),
            None => unique.push(segment),
        }
    }
    unique.sort_by_key(|s| s.start_time);
    unique
}

/// Remove overlaps between consecutive segments.
///
/// Pieces of the same recording are merged. For different recordings the
/// earlier segment keeps the shared range, including any kill on it, and the
/// later one starts where the earlier ends.
fn trim_overlaps(segments: Vec<TimelineSegment>) -> Vec<TimelineSegment> {
    let mut out: Vec<TimelineSegment> = Vec::with_capacity(segments.len());

    for mut segment in segments {
        if let Some(prev) = out.last_mut() {
            if prev.source.path == segment.source.path && segment.start_time <= prev.end_time {
                prev.end_time = prev.end_time.max(segment.end_time);
                prev.kill_times.extend(segment.kill_times);
                continue;
            }
            if segment.start_time < prev.end_time {
                let boundary = prev.end_time;
                let (early, late): (Vec<_>, Vec<_>) = segment
                    .kill_times
                    .into_iter()
                    .partition(|k| *k <= boundary);
                prev.kill_times.extend(early);
                segment.kill_times = late;
                segment.start_time = boundary;
                if segment.start_time >= segment.end_time {
                    continue;
                }
            }
        }
        out.push(segment);
    }
    out
}

/// Close holes between segments and at both ends of the window.
///
/// A hole is first narrowed by growing the neighbouring segments inside
/// their own recordings, then filled from any other relevant recording.
fn stitch_gaps(
    segments: Vec<TimelineSegment>,
    window: &AdjustedWindow,
    relevant: &[&SourceFile],
) -> Vec<TimelineSegment> {
    let mut out: Vec<TimelineSegment> = Vec::with_capacity(segments.len());

    for mut segment in segments {
        match out.last_mut() {
            Some(prev) if prev.end_time < segment.start_time => {
                if prev.source.path == segment.source.path {
                    prev.end_time = segment.end_time;
                    prev.kill_times.extend(segment.kill_times);
                    continue;
                }
                segment.start_time = segment.source.recording_start.max(prev.end_time);
                if prev.end_time < segment.start_time {
                    prev.end_time = prev.source.recording_end().min(segment.start_time);
                }
            }
            Some(_) => {}
            None => {
                segment.start_time = window.start.max(segment.source.recording_start);
            }
        }

        let hole_start = out.last().map(|p| p.end_time).unwrap_or(window.start);
        out.extend(fill_hole(hole_start, segment.start_time, relevant));
        out.push(segment);
    }

    if let Some(last) = out.last_mut() {
        last.end_time = last
            .end_time
            .max(window.end.min(last.source.recording_end()));
    }
    let hole_start = out.last().map(|p| p.end_time).unwrap_or(window.start);
    out.extend(fill_hole(hole_start, window.end, relevant));
    out
}

/// Greedily cover `[from, to]`, always taking the recording that reaches furthest
fn fill_hole(
    from: NaiveDateTime,
    to: NaiveDateTime,
    relevant: &[&SourceFile],
) -> Vec<TimelineSegment> {
    let mut pieces = Vec::new();
    let mut cursor = from;

    while cursor < to {
        let covering = relevant
            .iter()
            .filter(|f| f.recording_start <= cursor && cursor < f.recording_end())
            .max_by_key(|f| f.recording_end());

        match covering {
            Some(file) => {
                let end = file.recording_end().min(to);
                tracing::debug!(
                    "Filling {} - {} from {}",
                    cursor,
                    end,
                    file.display_name()
                );
                pieces.push(TimelineSegment::new(cursor, end, file));
                cursor = end;
            }
            None => {
                let next = relevant
                    .iter()
                    .map(|f| f.recording_start)
                    .filter(|s| *s > cursor && *s < to)
                    .min();
                match next {
                    Some(start) => cursor = start,
                    None => break,
                }
            }
        }
    }
    pieces
}

/// Merge neighbours from the same recording that touch
fn coalesce(segments: Vec<TimelineSegment>) -> Vec<TimelineSegment> {
    let mut out: Vec<TimelineSegment> = Vec::with_capacity(segments.len());
    for segment in segments {
        if let Some(prev) = out.last_mut() {
            if prev.source.path == segment.source.path && prev.end_time == segment.start_time {
                prev.end_time = segment.end_time;
                prev.kill_times.extend(segment.kill_times);
                continue;
            }
        }
        out.push(segment);
    }
    out
}

fn check_timeline(segments: &[TimelineSegment]) -> Result<()> {
    for segment in segments {
        if segment.start_time < segment.source.recording_start
            || segment.end_time > segment.source.recording_end()
        {
            return Err(ExportError::CoverageDefect(format!(
                "segment {} - {} outside {}",
                segment.start_time,
                segment.end_time,
                segment.source.display_name()
            )));
        }
    }

    if let Some(pair) = segments.windows(2).find(|p| p[0].end_time > p[1].start_time) {
        return Err(ExportError::CoverageDefect(format!(
            "segment ending {} overlaps segment starting {}",
            pair[0].end_time, pair[1].start_time
        )));
    }

    let mut seen = BTreeSet::new();
    for kill in segments.iter().flat_map(|s| s.kill_times.iter()) {
        if !seen.insert(*kill) {
            return Err(ExportError::CoverageDefect(format!(
                "kill at {} assigned twice",
                kill
            )));
        }
    }
    Ok(())
}

/// Uncovered ranges of the window and the kills lost in them
fn find_gaps(
    segments: &[TimelineSegment],
    window: &AdjustedWindow,
    episode: &Episode,
) -> Vec<CoverageGap> {
    let mut holes = Vec::new();
    let mut cursor = window.start;
    for segment in segments {
        if cursor < segment.start_time {
            holes.push((cursor, segment.start_time));
        }
        cursor = cursor.max(segment.end_time);
    }
    if cursor < window.end {
        holes.push((cursor, window.end));
    }

    let retained: BTreeSet<NaiveDateTime> = segments
        .iter()
        .flat_map(|s| s.kill_times.iter().copied())
        .collect();

    holes
        .into_iter()
        .map(|(start, end)| {
            let swallowed_kills: Vec<NaiveDateTime> = episode
                .kill_times
                .iter()
                .copied()
                .filter(|k| start <= *k && *k <= end && !retained.contains(k))
                .collect();
            if swallowed_kills.is_empty() {
                tracing::info!("No footage for {} - {}, leaving a gap", start, end);
            } else {
                tracing::warn!(
                    "No footage for {} - {}: {} kills lost",
                    start,
                    end,
                    swallowed_kills.len()
                );
            }
            CoverageGap {
                start,
                end,
                swallowed_kills,
            }
        })
        .collect()
}
