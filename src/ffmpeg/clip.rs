//! Clip cutting and concatenation through the ffmpeg binary

use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::EncodingConfig;
use crate::error::ToolError;
use crate::pipeline::ClipTool;
use crate::plan::ClipPlan;

use super::{detect_encoder, run_tool, tool_command, VideoEncoder, MIN_CLIP_BYTES};

/// Cuts and joins clips with an external ffmpeg
#[derive(Debug, Clone)]
pub struct FfmpegTool {
    config: EncodingConfig,
    encoder: VideoEncoder,
    /// Where concat list files are written
    work_dir: PathBuf,
}

impl FfmpegTool {
    /// Create a tool, detecting the best available encoder
    pub fn new(config: &EncodingConfig, work_dir: impl Into<PathBuf>) -> Self {
        let encoder = detect_encoder(&config.ffmpeg_path, config.prefer_hardware);
        Self::with_encoder(config, encoder, work_dir)
    }

    pub fn with_encoder(
        config: &EncodingConfig,
        encoder: VideoEncoder,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            config: config.clone(),
            encoder,
            work_dir: work_dir.into(),
        }
    }

    /// Encoder attempts in order: the detected one, then libx264
    fn encoder_ladder(&self) -> Vec<VideoEncoder> {
        if self.encoder.is_hardware() {
            vec![self.encoder, VideoEncoder::Libx264]
        } else {
            vec![VideoEncoder::Libx264]
        }
    }

    fn run_with_fallback<F>(&self, what: &str, build: F) -> Result<(), ToolError>
    where
        F: Fn(VideoEncoder) -> Vec<OsString>,
    {
        let mut last_error = None;
        for encoder in self.encoder_ladder() {
            let mut command = tool_command(&self.config.ffmpeg_path);
            command.args(build(encoder));
            match run_tool(command, "ffmpeg") {
                Ok(_) => return Ok(()),
                Err(e) => {
                    tracing::warn!("{} with {} failed: {}", what, encoder.codec_name(), e);
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or(ToolError::NothingToConcat))
    }

    /// Write the concat demuxer list for `clips`
    fn write_concat_list(&self, clips: &[&PathBuf]) -> Result<tempfile::NamedTempFile, ToolError> {
        let io_err = |source: std::io::Error| ToolError::Spawn {
            tool: "concat list".to_string(),
            source,
        };
        fs::create_dir_all(&self.work_dir).map_err(io_err)?;
        let mut list = tempfile::Builder::new()
            .prefix("concat_list_")
            .suffix(".txt")
            .tempfile_in(&self.work_dir)
            .map_err(io_err)?;
        for clip in clips {
            list.write_all(format_concat_entry(clip).as_bytes())
                .map_err(io_err)?;
        }
        list.flush().map_err(io_err)?;
        Ok(list)
    }
}

impl ClipTool for FfmpegTool {
    fn cut(&self, plan: &ClipPlan, output: &Path) -> Result<(), ToolError> {
        let offset = plan.cut_start_secs;
        let duration = plan.cut_duration_secs;
        if !(offset >= 0.0 && duration > 0.0 && offset.is_finite() && duration.is_finite()) {
            return Err(ToolError::InvalidCut { offset, duration });
        }

        tracing::info!(
            "Cutting {} from {:.2}s for {:.2}s",
            plan.source.display_name(),
            offset,
            duration
        );
        self.run_with_fallback("Cut", |encoder| {
            build_cut_args(&plan.source.path, offset, duration, encoder, &self.config, output)
        })
    }

    fn concat(&self, clips: &[PathBuf], output: &Path) -> Result<(), ToolError> {
        let usable: Vec<&PathBuf> = clips
            .iter()
            .filter(|clip| {
                let ok = fs::metadata(clip)
                    .map(|m| m.len() > MIN_CLIP_BYTES)
                    .unwrap_or(false);
                if !ok {
                    tracing::warn!("Skipping missing or tiny clip {:?}", clip);
                }
                ok
            })
            .collect();

        match usable.as_slice() {
            [] => return Err(ToolError::NothingToConcat),
            [single] => return move_into_place(single, output),
            _ => {}
        }

        let list = self.write_concat_list(&usable)?;
        tracing::info!("Concatenating {} clips into {:?}", usable.len(), output);
        self.run_with_fallback("Concat", |encoder| {
            build_concat_args(list.path(), encoder, &self.config, output)
        })?;

        for clip in usable {
            if let Err(e) = fs::remove_file(clip) {
                tracing::warn!("Could not remove temp clip {:?}: {}", clip, e);
            }
        }
        Ok(())
    }
}

/// Video and audio encoding flags for one encoder
fn encoder_args(encoder: VideoEncoder, config: &EncodingConfig) -> Vec<OsString> {
    let mut args: Vec<String> = vec!["-c:v".into(), encoder.codec_name().into()];
    if encoder.is_hardware() {
        args.extend([
            "-preset".into(),
            config.gpu_preset.clone(),
            "-rc".into(),
            "vbr".into(),
            "-cq".into(),
            config.cq.to_string(),
        ]);
    } else {
        args.extend([
            "-preset".into(),
            config.cpu_preset.clone(),
            "-crf".into(),
            config.crf.to_string(),
        ]);
    }
    args.extend([
        "-b:v".into(),
        config.video_bitrate.clone(),
        "-maxrate".into(),
        config.max_bitrate.clone(),
        "-bufsize".into(),
        config.buffer_size.clone(),
        "-c:a".into(),
        "aac".into(),
        "-b:a".into(),
        config.audio_bitrate.clone(),
    ]);
    args.into_iter().map(OsString::from).collect()
}

/// Arguments for re-encoding `duration` seconds of `input` starting at `offset`
pub fn build_cut_args(
    input: &Path,
    offset: f64,
    duration: f64,
    encoder: VideoEncoder,
    config: &EncodingConfig,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-hide_banner".into(),
        "-i".into(),
        input.into(),
        "-ss".into(),
        format!("{:.3}", offset).into(),
        "-t".into(),
        format!("{:.3}", duration).into(),
    ];
    args.extend(encoder_args(encoder, config));
    if config.decimate {
        args.extend(["-vf", "mpdecimate", "-vsync", "vfr"].map(OsString::from));
    }
    args.extend(["-map_metadata", "-1", "-avoid_negative_ts", "make_zero", "-y"].map(OsString::from));
    args.push(output.into());
    args
}

/// Arguments for joining the clips named in `list_file`
pub fn build_concat_args(
    list_file: &Path,
    encoder: VideoEncoder,
    config: &EncodingConfig,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = vec![
        "-hide_banner".into(),
        "-f".into(),
        "concat".into(),
        "-safe".into(),
        "0".into(),
        "-i".into(),
        list_file.into(),
    ];
    args.extend(encoder_args(encoder, config));
    args.extend(["-vsync", "vfr", "-map_metadata", "-1", "-y"].map(OsString::from));
    args.push(output.into());
    args
}

/// One `file '...'` line for the concat demuxer.
///
/// Paths are made absolute, use forward slashes, and have single quotes
/// escaped.
pub fn format_concat_entry(path: &Path) -> String {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let normalized = absolute.to_string_lossy().replace('\\', "/");
    let escaped = normalized.replace('\'', "'\\''");
    format!("file '{}'\n", escaped)
}

/// Move a finished clip to `output`: rename, or copy then delete across devices
pub fn move_into_place(clip: &Path, output: &Path) -> Result<(), ToolError> {
    if output.exists() {
        if let Err(e) = fs::remove_file(output) {
            tracing::warn!("Could not replace existing {:?}: {}", output, e);
        }
    }

    let rename_error = match fs::rename(clip, output) {
        Ok(()) => {
            tracing::debug!("Renamed {:?} to {:?}", clip, output);
            return Ok(());
        }
        Err(e) => e,
    };

    fs::copy(clip, output).map_err(|copy_error| ToolError::Finalize {
        rename: rename_error.to_string(),
        copy: copy_error.to_string(),
    })?;
    if let Err(e) = fs::remove_file(clip) {
        tracing::warn!("Copied {:?} but could not remove it: {}", clip, e);
    }
    tracing::debug!("Copied {:?} to {:?}", clip, output);
    Ok(())
}
