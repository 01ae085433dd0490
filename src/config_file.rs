//! Configuration file support
//!
//! Loads exporter configuration from TOML files. Every section is optional so
//! a file only needs to name the values it changes.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::config::ExportConfig;

/// Configuration file format
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Input/output locations
    pub paths: Option<PathSettings>,
    /// Grouping settings
    pub grouping: Option<GroupingSettings>,
    /// Padding policy settings
    pub padding: Option<PaddingSettings>,
    /// Encoder settings
    pub encoding: Option<EncodingSettings>,
    /// Duplicate detection settings
    pub dedup: Option<DedupSettings>,
    /// Logging settings
    pub logging: Option<LoggingSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathSettings {
    /// Directory holding the source recordings
    pub input_dir: Option<PathBuf>,
    /// Directory receiving exported clips
    pub output_dir: Option<PathBuf>,
    /// Extension of source recordings
    pub source_extension: Option<String>,
    /// Checkpoint file
    pub state_file: Option<PathBuf>,
    /// Temporary clip directory
    pub temp_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroupingSettings {
    pub lead_secs: Option<f64>,
    pub tail_secs: Option<f64>,
    pub threshold_secs: Option<f64>,
    pub min_kills: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaddingSettings {
    pub typical_video_length_secs: Option<f64>,
    pub typical_kill_position_secs: Option<f64>,
    pub tail_extension: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingSettings {
    pub ffmpeg_path: Option<PathBuf>,
    pub ffprobe_path: Option<PathBuf>,
    pub prefer_hardware: Option<bool>,
    pub gpu_preset: Option<String>,
    pub cpu_preset: Option<String>,
    pub video_bitrate: Option<String>,
    pub max_bitrate: Option<String>,
    pub buffer_size: Option<String>,
    pub audio_bitrate: Option<String>,
    pub crf: Option<u8>,
    pub cq: Option<u8>,
    pub decimate: Option<bool>,
    pub output_extension: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupSettings {
    pub enabled: Option<bool>,
    pub hash_size: Option<u32>,
    pub hamming_threshold: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,
    /// Output format (json, pretty)
    pub format: Option<String>,
}

impl ConfigFile {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: ConfigFile = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }

    /// Configuration file spelling out every default
    pub fn default_config() -> Self {
        let defaults = ExportConfig::default();
        let g = defaults.grouping;
        let p = defaults.padding;
        let e = defaults.encoding;
        let d = defaults.dedup;
        Self {
            paths: Some(PathSettings {
                input_dir: Some(defaults.input_dir),
                output_dir: Some(defaults.output_dir),
                source_extension: Some(defaults.source_extension),
                state_file: Some(defaults.state_file),
                temp_dir: None,
            }),
            grouping: Some(GroupingSettings {
                lead_secs: Some(g.lead_secs),
                tail_secs: Some(g.tail_secs),
                threshold_secs: Some(g.threshold_secs),
                min_kills: Some(g.min_kills),
            }),
            padding: Some(PaddingSettings {
                typical_video_length_secs: Some(p.typical_video_length_secs),
                typical_kill_position_secs: Some(p.typical_kill_position_secs),
                tail_extension: Some(p.tail_extension),
            }),
            encoding: Some(EncodingSettings {
                ffmpeg_path: Some(e.ffmpeg_path),
                ffprobe_path: Some(e.ffprobe_path),
                prefer_hardware: Some(e.prefer_hardware),
                gpu_preset: Some(e.gpu_preset),
                cpu_preset: Some(e.cpu_preset),
                video_bitrate: Some(e.video_bitrate),
                max_bitrate: Some(e.max_bitrate),
                buffer_size: Some(e.buffer_size),
                audio_bitrate: Some(e.audio_bitrate),
                crf: Some(e.crf),
                cq: Some(e.cq),
                decimate: Some(e.decimate),
                output_extension: Some(e.output_extension),
            }),
            dedup: Some(DedupSettings {
                enabled: Some(d.enabled),
                hash_size: Some(d.hash_size),
                hamming_threshold: Some(d.hamming_threshold),
            }),
            logging: Some(LoggingSettings {
                level: Some(defaults.log_level),
                format: Some(defaults.log_format),
            }),
        }
    }

    /// Convert to ExportConfig, filling gaps with defaults
    pub fn into_export_config(self) -> ExportConfig {
        let mut config = ExportConfig::default();

        if let Some(paths) = self.paths {
            if let Some(v) = paths.input_dir {
                config.input_dir = v;
            }
            if let Some(v) = paths.output_dir {
                config.output_dir = v;
            }
            if let Some(v) = paths.source_extension {
                config.source_extension = v;
            }
            if let Some(v) = paths.state_file {
                config.state_file = v;
            }
            config.temp_dir = paths.temp_dir;
        }

        if let Some(g) = self.grouping {
            let target = &mut config.grouping;
            target.lead_secs = g.lead_secs.unwrap_or(target.lead_secs);
            target.tail_secs = g.tail_secs.unwrap_or(target.tail_secs);
            target.threshold_secs = g.threshold_secs.unwrap_or(target.threshold_secs);
            target.min_kills = g.min_kills.unwrap_or(target.min_kills);
        }

        if let Some(p) = self.padding {
            let target = &mut config.padding;
            target.typical_video_length_secs = p
                .typical_video_length_secs
                .unwrap_or(target.typical_video_length_secs);
            target.typical_kill_position_secs = p
                .typical_kill_position_secs
                .unwrap_or(target.typical_kill_position_secs);
            target.tail_extension = p.tail_extension.unwrap_or(target.tail_extension);
        }

        if let Some(e) = self.encoding {
            let target = &mut config.encoding;
            if let Some(v) = e.ffmpeg_path {
                target.ffmpeg_path = v;
            }
            if let Some(v) = e.ffprobe_path {
                target.ffprobe_path = v;
            }
            target.prefer_hardware = e.prefer_hardware.unwrap_or(target.prefer_hardware);
            if let Some(v) = e.gpu_preset {
                target.gpu_preset = v;
            }
            if let Some(v) = e.cpu_preset {
                target.cpu_preset = v;
            }
            if let Some(v) = e.video_bitrate {
                target.video_bitrate = v;
            }
            if let Some(v) = e.max_bitrate {
                target.max_bitrate = v;
            }
            if let Some(v) = e.buffer_size {
                target.buffer_size = v;
            }
            if let Some(v) = e.audio_bitrate {
                target.audio_bitrate = v;
            }
            target.crf = e.crf.unwrap_or(target.crf);
            target.cq = e.cq.unwrap_or(target.cq);
            target.decimate = e.decimate.unwrap_or(target.decimate);
            if let Some(v) = e.output_extension {
                target.output_extension = v;
            }
        }

        if let Some(d) = self.dedup {
            let target = &mut config.dedup;
            target.enabled = d.enabled.unwrap_or(target.enabled);
            target.hash_size = d.hash_size.unwrap_or(target.hash_size);
            target.hamming_threshold = d.hamming_threshold.unwrap_or(target.hamming_threshold);
        }

        if let Some(logging) = self.logging {
            if let Some(level) = logging.level {
                config.log_level = level;
            }
            if let Some(format) = logging.format {
                config.log_format = format;
            }
        }

        config
    }
}

/// Generate default configuration file at the specified path
pub fn generate_default_config<P: AsRef<Path>>(path: P) -> Result<(), Box<dyn std::error::Error>> {
    let config = ConfigFile::default_config();
    config.to_file(path)?;
    Ok(())
}
