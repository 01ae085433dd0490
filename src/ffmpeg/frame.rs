//! Single-frame extraction for the duplicate detector

use std::path::{Path, PathBuf};

use crate::dedup::FrameSampler;
use crate::error::ToolError;

use super::{run_tool, tool_command};

/// Grabs one PNG frame from a recording by piping it out of ffmpeg
#[derive(Debug, Clone)]
pub struct FfmpegFrameSampler {
    ffmpeg_path: PathBuf,
}

impl FfmpegFrameSampler {
    pub fn new(ffmpeg_path: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
        }
    }
}

impl FrameSampler for FfmpegFrameSampler {
    fn sample_png(&self, source: &Path, at_secs: f64) -> Result<Vec<u8>, ToolError> {
        let mut command = tool_command(&self.ffmpeg_path);
        command
            .arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-ss")
            .arg(format!("{:.3}", at_secs.max(0.0)))
            .arg("-i")
            .arg(source)
            .arg("-frames:v")
            .arg("1")
            .arg("-f")
            .arg("image2pipe")
            .arg("-vcodec")
            .arg("png")
            .arg("-");
        let output = run_tool(command, "ffmpeg")?;
        if output.stdout.is_empty() {
            return Err(ToolError::Failed {
                tool: "ffmpeg".to_string(),
                status: output.status.to_string(),
                stderr: format!("no frame at {:.3}s in {:?}", at_secs, source),
            });
        }
        Ok(output.stdout)
    }
}
