//! Exporter configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Killstreak grouping parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingConfig {
    /// Seconds of footage kept before each kill
    pub lead_secs: f64,

    /// Seconds of footage kept after each kill
    pub tail_secs: f64,

    /// Maximum gap in seconds between two kill windows of one episode
    pub threshold_secs: f64,

    /// Minimum number of kills an episode needs to be exported
    pub min_kills: usize,
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            lead_secs: 10.0,
            tail_secs: 5.0,
            threshold_secs: 30.0,
            min_kills: 2,
        }
    }
}

/// Reference recording shape used to cap tail padding.
///
/// Replay recorders write fixed-length files with the kill near the middle,
/// so footage after a kill rarely exceeds `typical_video_length_secs -
/// typical_kill_position_secs`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaddingPolicy {
    /// Typical length of one recording in seconds
    pub typical_video_length_secs: f64,

    /// Typical offset of the kill inside a recording in seconds
    pub typical_kill_position_secs: f64,

    /// Extend a segment toward its file boundary when the next kill lives in
    /// the following file
    pub tail_extension: bool,
}

impl Default for PaddingPolicy {
    fn default() -> Self {
        Self {
            typical_video_length_secs: 40.0,
            typical_kill_position_secs: 20.0,
            tail_extension: true,
        }
    }
}

impl PaddingPolicy {
    /// Upper bound for any tail padding or tail extension, in seconds
    pub fn tail_cap_secs(&self) -> f64 {
        (self.typical_video_length_secs - self.typical_kill_position_secs).max(0.0)
    }
}

/// Encoder settings for the cut and concat steps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    /// Path or name of the ffmpeg binary
    pub ffmpeg_path: PathBuf,

    /// Path or name of the ffprobe binary
    pub ffprobe_path: PathBuf,

    /// Try NVENC before falling back to libx264
    pub prefer_hardware: bool,

    /// NVENC preset
    pub gpu_preset: String,

    /// libx264 preset
    pub cpu_preset: String,

    /// Target video bitrate (ffmpeg notation)
    pub video_bitrate: String,

    /// Maximum video bitrate
    pub max_bitrate: String,

    /// Rate control buffer size
    pub buffer_size: String,

    /// AAC bitrate
    pub audio_bitrate: String,

    /// libx264 constant rate factor
    pub crf: u8,

    /// NVENC constant quality value
    pub cq: u8,

    /// Drop duplicated frames with mpdecimate while cutting
    pub decimate: bool,

    /// Extension of the exported clips
    pub output_extension: String,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            prefer_hardware: true,
            gpu_preset: "p7".to_string(),
            cpu_preset: "fast".to_string(),
            video_bitrate: "8M".to_string(),
            max_bitrate: "10M".to_string(),
            buffer_size: "20M".to_string(),
            audio_bitrate: "192k".to_string(),
            crf: 18,
            cq: 20,
            decimate: false,
            output_extension: "mp4".to_string(),
        }
    }
}

/// Perceptual duplicate detection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Run the detector after planning
    pub enabled: bool,

    /// Perceptual hash edge length
    pub hash_size: u32,

    /// Maximum Hamming distance for two clips to count as duplicates
    pub hamming_threshold: u32,
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            hash_size: 16,
            hamming_threshold: 5,
        }
    }
}

/// Upper bound for any configured span, one day
pub const MAX_PADDING_SECS: f64 = 86_400.0;

/// Top-level exporter configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    /// Directory holding the source recordings
    pub input_dir: PathBuf,

    /// Directory receiving exported clips
    pub output_dir: PathBuf,

    /// File extension of source recordings
    pub source_extension: String,

    /// Checkpoint file path
    pub state_file: PathBuf,

    /// Directory for temporary clips (defaults to `<output_dir>/temp`)
    pub temp_dir: Option<PathBuf>,

    /// Grouping configuration
    pub grouping: GroupingConfig,

    /// Padding policy
    pub padding: PaddingPolicy,

    /// Encoding configuration
    pub encoding: EncodingConfig,

    /// Duplicate detection configuration
    pub dedup: DedupConfig,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Log output format (pretty, json)
    pub log_format: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("."),
            output_dir: PathBuf::from("exports"),
            source_extension: "mp4".to_string(),
            state_file: PathBuf::from("processing_state.json"),
            temp_dir: None,
            grouping: GroupingConfig::default(),
            padding: PaddingPolicy::default(),
            encoding: EncodingConfig::default(),
            dedup: DedupConfig::default(),
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
        }
    }
}

impl ExportConfig {
    /// Directory used for intermediate clips
    pub fn resolved_temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| self.output_dir.join("temp"))
    }

    /// Reject values the planner cannot work with
    pub fn validate(&self) -> Result<(), String> {
        let g = &self.grouping;
        let in_range = |secs: f64| (0.0..=MAX_PADDING_SECS).contains(&secs);
        if !(in_range(g.lead_secs) && in_range(g.tail_secs) && in_range(g.threshold_secs)) {
            return Err(format!(
                "lead, tail and threshold must be between 0 and {}s",
                MAX_PADDING_SECS
            ));
        }
        if !(in_range(self.padding.typical_video_length_secs)
            && in_range(self.padding.typical_kill_position_secs))
        {
            return Err(format!(
                "typical video length and kill position must be between 0 and {}s",
                MAX_PADDING_SECS
            ));
        }
        if g.min_kills == 0 {
            return Err("min_kills must be at least 1".to_string());
        }
        if self.padding.typical_kill_position_secs > self.padding.typical_video_length_secs {
            return Err("typical kill position lies past the typical video length".to_string());
        }
        if self.encoding.output_extension.trim_start_matches('.').is_empty() {
            return Err("output extension must not be empty".to_string());
        }
        Ok(())
    }
}
