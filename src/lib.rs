//! Killstreak exporter
//!
//! Groups kill events recorded as timestamped replay files into episodes,
//! resolves each episode's padded window against the available footage, and
//! exports one clip per episode through ffmpeg.

pub mod catalog;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod config_file;
pub mod dedup;
pub mod error;
pub mod ffmpeg;
pub mod pipeline;
pub mod plan;
pub mod timeline;

#[cfg(test)]
mod integration;

pub use error::{ExportError, Result, ToolError};
