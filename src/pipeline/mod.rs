//! Export pipeline
//!
//! Drives the planning stages for every episode and hands the resulting clip
//! plans to a [`ClipTool`]. Episodes are isolated from each other: a failed
//! cut or concat only loses that episode.

pub mod progress;

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::catalog::Catalog;
use crate::config::ExportConfig;
use crate::error::{ExportError, Result, ToolError};
use crate::ffmpeg::move_into_place;
use crate::plan::{emit_clip_plans, output_file_name, ClipPlan};
use crate::timeline::{
    adjust_window, group_episodes, resolve_coverage, seed_episodes, AdjustedWindow, CoverageGap,
};

pub use progress::{CancelFlag, NoProgress, ProgressSink, TracingProgress};

/// External cut and concat operations
pub trait ClipTool {
    /// Cut `plan` into `output`
    fn cut(&self, plan: &ClipPlan, output: &Path) -> std::result::Result<(), ToolError>;

    /// Join `clips` in order into `output`
    fn concat(&self, clips: &[PathBuf], output: &Path) -> std::result::Result<(), ToolError>;

    /// Produce `output` from the cut clips; a single clip is moved, not re-encoded
    fn finalize(&self, clips: &[PathBuf], output: &Path) -> std::result::Result<(), ToolError> {
        match clips {
            [] => Err(ToolError::NothingToConcat),
            [single] => move_into_place(single, output),
            _ => self.concat(clips, output),
        }
    }
}

/// Everything needed to export one episode
#[derive(Debug, Clone, Serialize)]
pub struct EpisodePlan {
    /// 1-based position among the grouped episodes
    pub index: usize,
    pub first_kill: NaiveDateTime,
    pub kill_count: usize,
    pub window: AdjustedWindow,
    pub single_cover: bool,
    pub clips: Vec<ClipPlan>,
    pub gaps: Vec<CoverageGap>,
    pub unassigned: Vec<NaiveDateTime>,
}

/// Planning result for a whole run
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlannedRun {
    pub episodes: Vec<EpisodePlan>,
    /// Episodes dropped during planning
    pub skipped: usize,
}

/// Summary of an export run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunReport {
    pub exported: usize,
    pub skipped: usize,
    pub failed: usize,
    pub outputs: Vec<PathBuf>,
    /// New checkpoint; `None` when nothing succeeded or the run was cancelled
    pub checkpoint: Option<NaiveDateTime>,
    pub cancelled: bool,
}

/// Group the catalog into episodes and plan the cuts for each.
///
/// Resolution problems stay local to their episode.
pub fn plan_episodes(catalog: &Catalog, config: &ExportConfig) -> PlannedRun {
    let grouping = &config.grouping;
    let policy = &config.padding;

    let seeds = seed_episodes(catalog, grouping, policy);
    let episodes = group_episodes(seeds, grouping.threshold_secs, grouping.min_kills);

    let mut run = PlannedRun::default();
    for (i, episode) in episodes.iter().enumerate() {
        let index = i + 1;
        let (Some(first_kill), Some(window)) = (
            episode.first_kill(),
            adjust_window(episode, grouping.lead_secs, grouping.tail_secs, policy),
        ) else {
            run.skipped += 1;
            continue;
        };

        let resolution = match resolve_coverage(
            &window,
            episode,
            catalog,
            grouping.lead_secs,
            grouping.tail_secs,
            policy,
        ) {
            Ok(resolution) => resolution,
            Err(e) => {
                tracing::error!("Episode {} at {} not resolved: {}", index, first_kill, e);
                run.skipped += 1;
                continue;
            }
        };

        let clips = emit_clip_plans(&resolution, catalog);
        if clips.is_empty() {
            tracing::warn!("Episode {} at {} has no footage, skipping", index, first_kill);
            run.skipped += 1;
            continue;
        }

        tracing::info!(
            "Episode {}: {} kills from {}, {} clips over {:.1}s",
            index,
            episode.kill_count(),
            first_kill,
            clips.len(),
            window.duration_secs()
        );
        run.episodes.push(EpisodePlan {
            index,
            first_kill,
            kill_count: episode.kill_count(),
            window,
            single_cover: resolution.timeline.is_single_cover(),
            clips,
            gaps: resolution.gaps,
            unassigned: resolution.unassigned,
        });
    }
    run
}

/// Runs planned episodes through a [`ClipTool`]
pub struct Exporter<'a> {
    tool: &'a dyn ClipTool,
    progress: &'a dyn ProgressSink,
    cancel: CancelFlag,
    output_dir: PathBuf,
    temp_dir: PathBuf,
    extension: String,
}

impl<'a> Exporter<'a> {
    pub fn new(
        config: &ExportConfig,
        tool: &'a dyn ClipTool,
        progress: &'a dyn ProgressSink,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            tool,
            progress,
            cancel,
            output_dir: config.output_dir.clone(),
            temp_dir: config.resolved_temp_dir(),
            extension: config.encoding.output_extension.clone(),
        }
    }

    /// Export every planned episode in order
    pub fn run(&self, planned: &PlannedRun) -> RunReport {
        let mut report = RunReport {
            skipped: planned.skipped,
            ..RunReport::default()
        };
        let total = planned.episodes.len();

        for (i, episode) in planned.episodes.iter().enumerate() {
            if self.cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            let group = report.exported + 1;
            self.progress.report(
                i + 1,
                total,
                &format!("episode at {} ({} kills)", episode.first_kill, episode.kill_count),
            );

            match self.export_episode(episode, group, i + 1, total) {
                Ok(output) => {
                    tracing::info!("Exported {:?}", output);
                    report.exported += 1;
                    report.outputs.push(output);
                    report.checkpoint = report.checkpoint.max(Some(episode.window.end));
                }
                Err(ExportError::Cancelled) => {
                    report.cancelled = true;
                    break;
                }
                Err(e) => {
                    tracing::error!("Episode at {} failed: {}", episode.first_kill, e);
                    report.failed += 1;
                }
            }
        }

        if report.cancelled {
            tracing::warn!("Run cancelled, checkpoint left unchanged");
            report.checkpoint = None;
        }
        tracing::info!(
            "Run finished: {} exported, {} skipped, {} failed",
            report.exported,
            report.skipped,
            report.failed
        );
        report
    }

    fn export_episode(
        &self,
        episode: &EpisodePlan,
        group: usize,
        index: usize,
        total: usize,
    ) -> Result<PathBuf> {
        fs::create_dir_all(&self.output_dir)?;
        fs::create_dir_all(&self.temp_dir)?;

        let output = self
            .output_dir
            .join(output_file_name(episode.first_kill, group, &self.extension));

        let mut clips = Vec::with_capacity(episode.clips.len());
        for clip in &episode.clips {
            if self.cancel.is_cancelled() {
                return Err(ExportError::Cancelled);
            }
            self.progress.report(
                index,
                total,
                &format!("clip {}/{} from {}", clip.ordinal, episode.clips.len(), clip.source.display_name()),
            );
            let temp = self.temp_dir.join(temp_clip_name(episode.index, clip));
            self.tool.cut(clip, &temp)?;
            clips.push(temp);
        }

        if self.cancel.is_cancelled() {
            return Err(ExportError::Cancelled);
        }
        self.tool.finalize(&clips, &output)?;
        Ok(output)
    }
}

/// `temp_<episode index>_<ordinal>_<source file name>`; the planned index
/// stays unique across failed episodes, unlike the output group number
fn temp_clip_name(episode_index: usize, clip: &ClipPlan) -> String {
    format!(
        "temp_{}_{}_{}",
        episode_index,
        clip.ordinal,
        clip.source.display_name()
    )
}
