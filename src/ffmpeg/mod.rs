//! FFmpeg module - external tool wrappers
//!
//! This module handles:
//! - Duration probing (ffprobe, or libav with the `libav` feature)
//! - Encoder detection and the hardware to software fallback
//! - Cutting, concatenating and finalizing clips
//! - Frame sampling for the duplicate detector

pub mod clip;
pub mod frame;
pub mod probe;

use std::path::Path;
use std::process::{Command, Output, Stdio};

#[cfg(target_os = "windows")]
use std::os::windows::process::CommandExt;

use crate::error::ToolError;

pub use clip::{format_concat_entry, move_into_place, FfmpegTool};
pub use frame::FfmpegFrameSampler;
pub use probe::{parse_probe_output, FfprobeDuration};
#[cfg(feature = "libav")]
pub use probe::LibavDuration;

/// Keeps console windows from popping up for child processes on Windows
#[cfg(target_os = "windows")]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Clips at or below this size are treated as failed cuts
pub const MIN_CLIP_BYTES: u64 = 100;

/// Initialize the libav libraries
#[cfg(feature = "libav")]
pub fn init() -> Result<(), ToolError> {
    ffmpeg_next::init().map_err(|e| ToolError::Libav(format!("ffmpeg::init() failed: {}", e)))?;
    tracing::info!("libav initialized");
    Ok(())
}

/// Video encoders in order of preference
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoEncoder {
    H264Nvenc,
    HevcNvenc,
    Libx264,
}

impl VideoEncoder {
    pub fn codec_name(&self) -> &'static str {
        match self {
            VideoEncoder::H264Nvenc => "h264_nvenc",
            VideoEncoder::HevcNvenc => "hevc_nvenc",
            VideoEncoder::Libx264 => "libx264",
        }
    }

    pub fn is_hardware(&self) -> bool {
        !matches!(self, VideoEncoder::Libx264)
    }
}

/// Pick the best encoder from `ffmpeg -encoders` output
pub fn select_encoder(encoder_listing: &str, prefer_hardware: bool) -> VideoEncoder {
    if !prefer_hardware {
        return VideoEncoder::Libx264;
    }
    let listing = encoder_listing.to_lowercase();
    if listing.contains(" h264_nvenc") {
        return VideoEncoder::H264Nvenc;
    }
    if listing.contains(" hevc_nvenc") {
        return VideoEncoder::HevcNvenc;
    }
    VideoEncoder::Libx264
}

/// Ask the ffmpeg binary which encoders it was built with
pub fn detect_encoder(ffmpeg_path: &Path, prefer_hardware: bool) -> VideoEncoder {
    if !prefer_hardware {
        return VideoEncoder::Libx264;
    }
    let listing = tool_command(ffmpeg_path)
        .arg("-hide_banner")
        .arg("-encoders")
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .output()
        .map(|out| String::from_utf8_lossy(&out.stdout).into_owned())
        .unwrap_or_default();

    let encoder = select_encoder(&listing, prefer_hardware);
    tracing::info!("Using video encoder {}", encoder.codec_name());
    encoder
}

/// A `Command` for an external tool with platform flags applied
pub(crate) fn tool_command(program: &Path) -> Command {
    #[allow(unused_mut)]
    let mut command = Command::new(program);
    #[cfg(target_os = "windows")]
    command.creation_flags(CREATE_NO_WINDOW);
    command
}

/// Run a prepared command to completion, turning a non-zero exit into an error
pub(crate) fn run_tool(mut command: Command, tool: &str) -> Result<Output, ToolError> {
    tracing::debug!("Running {:?}", command);
    let output = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .map_err(|source| ToolError::Spawn {
            tool: tool.to_string(),
            source,
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ToolError::Failed {
            tool: tool.to_string(),
            status: output.status.to_string(),
            stderr: last_lines(&stderr, 5),
        });
    }
    Ok(output)
}

/// The tail end of a tool's stderr, where the actual error usually is
fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let skip = lines.len().saturating_sub(n);
    lines[skip..].join("\n")
}
