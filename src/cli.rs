//! Command line arguments

use std::path::PathBuf;

use clap::Parser;

use crate::config::ExportConfig;

/// Export killstreak clips from timestamped replay recordings.
#[derive(Parser, Debug, Clone)]
#[command(name = "killstreak-exporter")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Directory holding the source recordings
    #[arg(short, long)]
    pub input_dir: Option<PathBuf>,

    /// Directory receiving exported clips
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Seconds kept before each kill
    #[arg(long)]
    pub lead: Option<f64>,

    /// Seconds kept after each kill
    #[arg(long)]
    pub tail: Option<f64>,

    /// Maximum gap in seconds between kills of one episode
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Minimum kills per exported episode
    #[arg(long)]
    pub min_kills: Option<usize>,

    /// Checkpoint file
    #[arg(long)]
    pub state_file: Option<PathBuf>,

    /// Directory for intermediate clips
    #[arg(long)]
    pub temp_dir: Option<PathBuf>,

    /// Print the clip plans as JSON without cutting anything
    #[arg(long)]
    pub dry_run: bool,

    /// Report visually similar clips after planning
    #[arg(long)]
    pub find_duplicates: bool,

    /// Write a default configuration file to the --config path and exit
    #[arg(long)]
    pub write_default_config: bool,

    /// Logging level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

impl Args {
    /// Overlay command line values on a loaded configuration
    pub fn apply_to(&self, mut config: ExportConfig) -> ExportConfig {
        if let Some(ref dir) = self.input_dir {
            config.input_dir = dir.clone();
        }
        if let Some(ref dir) = self.output_dir {
            config.output_dir = dir.clone();
        }
        if let Some(lead) = self.lead {
            config.grouping.lead_secs = lead;
        }
        if let Some(tail) = self.tail {
            config.grouping.tail_secs = tail;
        }
        if let Some(threshold) = self.threshold {
            config.grouping.threshold_secs = threshold;
        }
        if let Some(min_kills) = self.min_kills {
            config.grouping.min_kills = min_kills;
        }
        if let Some(ref path) = self.state_file {
            config.state_file = path.clone();
        }
        if let Some(ref dir) = self.temp_dir {
            config.temp_dir = Some(dir.clone());
        }
        if self.find_duplicates {
            config.dedup.enabled = true;
        }
        if let Some(ref level) = self.log_level {
            config.log_level = level.clone();
        }
        config
    }
}
