//! Test fixtures: synthetic recordings and a recording clip tool

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{NaiveDate, NaiveDateTime};

use crate::catalog::{Catalog, DurationProbe, SourceFile};
use crate::config::ExportConfig;
use crate::error::ToolError;
use crate::pipeline::{CancelFlag, ClipTool, ProgressSink};
use crate::plan::ClipPlan;
use crate::timeline::{
    adjust_window, group_episodes, resolve_coverage, seed_episodes, Episode, Resolution,
};

/// 2024-06-18 at the given wall-clock time
pub fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 18)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

/// Recording with an explicit kill offset
pub fn recording(name: &str, start: NaiveDateTime, duration: f64, kill_offset: f64) -> SourceFile {
    SourceFile::new(PathBuf::from("/recordings").join(name), start, duration, kill_offset)
}

/// Recorder file name for a start time, e.g. `War Thunder 2024.06.18 - 10.00.00.DVR.mp4`
pub fn recorder_name(start: NaiveDateTime) -> String {
    format!("War Thunder {}.DVR.mp4", start.format("%Y.%m.%d - %H.%M.%S"))
}

/// Config writing into `dir`, with the checkpoint kept there too
pub fn export_config(dir: &Path) -> ExportConfig {
    ExportConfig {
        input_dir: dir.join("recordings"),
        output_dir: dir.join("exports"),
        temp_dir: Some(dir.join("temp")),
        state_file: dir.join("state.json"),
        ..ExportConfig::default()
    }
}

/// Run every grouped episode of `catalog` through window adjustment and
/// coverage resolution
pub fn resolve_all(catalog: &Catalog, config: &ExportConfig) -> Vec<(Episode, Resolution)> {
    let grouping = &config.grouping;
    let policy = &config.padding;
    let seeds = seed_episodes(catalog, grouping, policy);
    group_episodes(seeds, grouping.threshold_secs, grouping.min_kills)
        .into_iter()
        .map(|episode| {
            let window =
                adjust_window(&episode, grouping.lead_secs, grouping.tail_secs, policy).unwrap();
            let resolution = resolve_coverage(
                &window,
                &episode,
                catalog,
                grouping.lead_secs,
                grouping.tail_secs,
                policy,
            )
            .unwrap();
            (episode, resolution)
        })
        .collect()
}

/// Durations keyed by file name
pub struct FixedProbe(pub HashMap<String, f64>);

impl DurationProbe for FixedProbe {
    fn probe_duration(&self, path: &Path) -> Option<f64> {
        let name = path.file_name()?.to_string_lossy().into_owned();
        self.0.get(&name).copied()
    }
}

/// A cut as seen by the fake tool
#[derive(Debug, Clone, PartialEq)]
pub struct CutCall {
    pub source: String,
    pub offset: f64,
    pub duration: f64,
    pub output: PathBuf,
}

/// Clip tool that writes placeholder files and records every call
#[derive(Default)]
pub struct FakeTool {
    pub cuts: Mutex<Vec<CutCall>>,
    pub concats: Mutex<Vec<(Vec<PathBuf>, PathBuf)>>,
    fail_source: Option<String>,
    cancel_after: Option<(usize, CancelFlag)>,
}

impl FakeTool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every cut taken from the named source file
    pub fn failing_on(source: &str) -> Self {
        Self {
            fail_source: Some(source.to_string()),
            ..Self::default()
        }
    }

    /// Raise `flag` once `cuts` cuts have completed
    pub fn cancelling_after(cuts: usize, flag: CancelFlag) -> Self {
        Self {
            cancel_after: Some((cuts, flag)),
            ..Self::default()
        }
    }

    pub fn cut_calls(&self) -> Vec<CutCall> {
        self.cuts.lock().unwrap().clone()
    }

    pub fn concat_calls(&self) -> Vec<(Vec<PathBuf>, PathBuf)> {
        self.concats.lock().unwrap().clone()
    }
}

impl ClipTool for FakeTool {
    fn cut(&self, plan: &ClipPlan, output: &Path) -> Result<(), ToolError> {
        let source = plan.source.display_name();
        let mut cuts = self.cuts.lock().unwrap();
        cuts.push(CutCall {
            source: source.clone(),
            offset: plan.cut_start_secs,
            duration: plan.cut_duration_secs,
            output: output.to_path_buf(),
        });

        if self.fail_source.as_deref() == Some(source.as_str()) {
            return Err(ToolError::Failed {
                tool: "ffmpeg".to_string(),
                status: "exit status: 1".to_string(),
                stderr: format!("{}: Invalid data found when processing input", source),
            });
        }

        fs::write(output, vec![0u8; 512]).map_err(|e| ToolError::Spawn {
            tool: "ffmpeg".to_string(),
            source: e,
        })?;

        if let Some((after, flag)) = &self.cancel_after {
            if cuts.len() >= *after {
                flag.cancel();
            }
        }
        Ok(())
    }

    fn concat(&self, clips: &[PathBuf], output: &Path) -> Result<(), ToolError> {
        self.concats
            .lock()
            .unwrap()
            .push((clips.to_vec(), output.to_path_buf()));
        fs::write(output, vec![0u8; 512 * clips.len()]).map_err(|e| ToolError::Spawn {
            tool: "ffmpeg".to_string(),
            source: e,
        })?;
        for clip in clips {
            let _ = fs::remove_file(clip);
        }
        Ok(())
    }
}

/// Keeps every progress report
#[derive(Default)]
pub struct RecordingProgress(pub Mutex<Vec<(usize, usize, String)>>);

impl ProgressSink for RecordingProgress {
    fn report(&self, index: usize, total: usize, label: &str) {
        self.0.lock().unwrap().push((index, total, label.to_string()));
    }
}
