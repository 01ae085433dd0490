//! Episode grouper - merges nearby kills into killstreak episodes

use crate::catalog::Catalog;
use crate::config::{GroupingConfig, PaddingPolicy};

use super::{seconds, Episode};

/// One seed episode per cataloged kill.
///
/// Seeds span `[kill - lead, kill + min(tail, tail cap)]`, in catalog order.
pub fn seed_episodes(
    catalog: &Catalog,
    grouping: &GroupingConfig,
    policy: &PaddingPolicy,
) -> Vec<Episode> {
    let tail = grouping.tail_secs.min(policy.tail_cap_secs());
    catalog
        .files()
        .iter()
        .map(|source| Episode::seed(source, grouping.lead_secs, tail))
        .collect()
}

/// Merge seeds whose gap is at most `threshold_secs`, then drop episodes
/// with fewer than `min_kills` kills.
///
/// Seeds are stably sorted by start time, so equal starts keep their input
/// order. The gap is measured from the running episode's end to the next
/// seed's start.
pub fn group_episodes(mut seeds: Vec<Episode>, threshold_secs: f64, min_kills: usize) -> Vec<Episode> {
    seeds.sort_by_key(|e| e.start_time);
    let threshold = seconds(threshold_secs);

    let merged = seeds.into_iter().fold(Vec::<Episode>::new(), |mut acc, next| {
        match acc.pop() {
            Some(current) if next.start_time - current.end_time <= threshold => {
                acc.push(current.absorb(next));
            }
            Some(current) => {
                acc.push(current);
                acc.push(next);
            }
            None => acc.push(next),
        }
        acc
    });

    let total = merged.len();
    let kept: Vec<Episode> = merged
        .into_iter()
        .filter(|e| e.kill_count() >= min_kills)
        .collect();

    tracing::info!(
        "Grouped kills into {} episodes, {} with at least {} kills (gap <= {}s)",
        total,
        kept.len(),
        min_kills,
        threshold_secs
    );
    kept
}
