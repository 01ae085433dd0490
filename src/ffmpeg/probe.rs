//! Recording duration probes

use std::path::{Path, PathBuf};

use crate::catalog::DurationProbe;
use crate::error::ToolError;

use super::{run_tool, tool_command};

/// Probes container durations by running ffprobe
#[derive(Debug, Clone)]
pub struct FfprobeDuration {
    ffprobe_path: PathBuf,
}

impl FfprobeDuration {
    pub fn new(ffprobe_path: impl Into<PathBuf>) -> Self {
        Self {
            ffprobe_path: ffprobe_path.into(),
        }
    }

    fn probe(&self, path: &Path) -> Result<f64, ToolError> {
        let mut command = tool_command(&self.ffprobe_path);
        command
            .arg("-v")
            .arg("error")
            .arg("-show_entries")
            .arg("format=duration")
            .arg("-of")
            .arg("default=noprint_wrappers=1:nokey=1")
            .arg(path);
        let output = run_tool(command, "ffprobe")?;
        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }
}

impl DurationProbe for FfprobeDuration {
    fn probe_duration(&self, path: &Path) -> Option<f64> {
        match self.probe(path) {
            Ok(duration) => Some(duration),
            Err(e) => {
                tracing::warn!("Could not probe {:?}: {}", path, e);
                None
            }
        }
    }
}

/// Parse the bare duration ffprobe prints with `nokey=1`
pub fn parse_probe_output(stdout: &str) -> Result<f64, ToolError> {
    let text = stdout.trim();
    let line = text.lines().next().unwrap_or("").trim();
    line.parse::<f64>()
        .ok()
        .filter(|d| d.is_finite())
        .ok_or_else(|| ToolError::ProbeOutput(text.to_string()))
}

/// Probes durations in-process through libav
#[cfg(feature = "libav")]
#[derive(Debug, Clone, Default)]
pub struct LibavDuration;

#[cfg(feature = "libav")]
impl LibavDuration {
    pub fn new() -> Result<Self, ToolError> {
        super::init()?;
        Ok(Self)
    }
}

#[cfg(feature = "libav")]
impl DurationProbe for LibavDuration {
    fn probe_duration(&self, path: &Path) -> Option<f64> {
        use ffmpeg_next as ffmpeg;

        match ffmpeg::format::input(&path) {
            Ok(context) => Some(context.duration() as f64 / ffmpeg::ffi::AV_TIME_BASE as f64),
            Err(e) => {
                tracing::warn!("Could not open {:?}: {}", path, e);
                None
            }
        }
    }
}
