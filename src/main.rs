//! Killstreak exporter binary
//!
//! Scans a folder of replay recordings, groups kills into episodes and
//! exports one clip per episode.

use std::path::Path;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use killstreak_exporter::catalog::{build_catalog, list_source_files, DurationProbe};
use killstreak_exporter::checkpoint;
use killstreak_exporter::cli::Args;
use killstreak_exporter::config::ExportConfig;
use killstreak_exporter::config_file::{generate_default_config, ConfigFile};
use killstreak_exporter::dedup::{find_duplicates, fingerprint_plans};
use killstreak_exporter::ffmpeg::{FfmpegFrameSampler, FfmpegTool};
use killstreak_exporter::pipeline::{plan_episodes, CancelFlag, Exporter, RunReport, TracingProgress};
use killstreak_exporter::{ExportError, Result};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
const APP_NAME: &str = "killstreak-exporter";

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.write_default_config {
        generate_default_config(&args.config).map_err(|e| ExportError::Config(e.to_string()))?;
        println!("Wrote default configuration to {}", args.config.display());
        return Ok(());
    }

    // Load configuration before logging so the file can pick the level
    let (file_config, load_error) = load_config(&args.config);
    let config = args.apply_to(file_config);
    init_logging(&config.log_level, &config.log_format);

    tracing::info!("{} v{} starting", APP_NAME, VERSION);
    if let Some(e) = load_error {
        tracing::warn!(
            "Failed to load config file {}: {}. Using defaults.",
            args.config.display(),
            e
        );
    }
    config.validate().map_err(ExportError::Config)?;
    tracing::debug!("Configuration loaded: {:?}", config);

    let cancel = CancelFlag::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::warn!("Interrupt received, stopping after the current operation");
                cancel.cancel();
            }
        });
    }

    let dry_run = args.dry_run;
    let report = tokio::task::spawn_blocking(move || run(&config, dry_run, cancel))
        .await
        .map_err(|e| ExportError::Io(std::io::Error::other(e)))??;

    if let Some(report) = report {
        tracing::info!(
            "{} clips exported, {} episodes skipped, {} failed{}",
            report.exported,
            report.skipped,
            report.failed,
            if report.cancelled { " (cancelled)" } else { "" }
        );
        for output in &report.outputs {
            println!("{}", output.display());
        }
    }
    Ok(())
}

/// Read the config file if present; a broken file falls back to defaults
fn load_config(path: &Path) -> (ExportConfig, Option<String>) {
    if !path.exists() {
        return (ExportConfig::default(), None);
    }
    match ConfigFile::from_file(path) {
        Ok(cf) => (cf.into_export_config(), None),
        Err(e) => (ExportConfig::default(), Some(e.to_string())),
    }
}

/// Scan, plan and export. Returns `None` for a dry run.
fn run(config: &ExportConfig, dry_run: bool, cancel: CancelFlag) -> Result<Option<RunReport>> {
    let entries = list_source_files(&config.input_dir, &config.source_extension)?;
    let last_processed = checkpoint::load(&config.state_file);
    let probe = duration_probe(config)?;
    let scan = build_catalog(&entries, probe.as_ref(), last_processed, &config.padding);
    let planned = plan_episodes(&scan.catalog, config);

    if config.dedup.enabled {
        let sampler = FfmpegFrameSampler::new(config.encoding.ffmpeg_path.clone());
        let prints = fingerprint_plans(
            planned.episodes.iter().flat_map(|e| e.clips.iter()),
            &sampler,
            config.dedup.hash_size,
            |plan| format!("{} @ {}", plan.source.display_name(), plan.segment_start),
        );
        let pairs = find_duplicates(&prints, config.dedup.hamming_threshold);
        for pair in &pairs {
            tracing::warn!(
                "Possible duplicate: {} ~ {} (distance {})",
                pair.first,
                pair.second,
                pair.distance
            );
        }
        tracing::info!("{} possible duplicate clip pairs", pairs.len());
    }

    if dry_run {
        let json = serde_json::to_string_pretty(&planned)
            .map_err(|e| ExportError::Config(format!("cannot render plans: {}", e)))?;
        println!("{}", json);
        return Ok(None);
    }

    let tool = FfmpegTool::new(&config.encoding, config.resolved_temp_dir());
    let progress = TracingProgress;
    let report = Exporter::new(config, &tool, &progress, cancel).run(&planned);

    if let Some(done) = report.checkpoint {
        checkpoint::save(&config.state_file, done)?;
    }
    Ok(Some(report))
}

#[cfg(feature = "libav")]
fn duration_probe(_config: &ExportConfig) -> Result<Box<dyn DurationProbe>> {
    Ok(Box::new(killstreak_exporter::ffmpeg::LibavDuration::new()?))
}

#[cfg(not(feature = "libav"))]
fn duration_probe(config: &ExportConfig) -> Result<Box<dyn DurationProbe>> {
    Ok(Box::new(killstreak_exporter::ffmpeg::FfprobeDuration::new(
        config.encoding.ffprobe_path.clone(),
    )))
}

/// Initialize logging with tracing
fn init_logging(level: &str, format: &str) {
    let json = format.eq_ignore_ascii_case("json");
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("killstreak_exporter={}", level).into()),
        )
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}
