use std::path::PathBuf;

use thiserror::Error;

/// Main error type for the killstreak exporter
#[derive(Error, Debug)]
pub enum ExportError {
    /// An external ffmpeg/ffprobe invocation failed
    #[error("Tool error: {0}")]
    Tool(#[from] ToolError),

    /// A standard I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The input directory could not be read
    #[error("Input directory not readable: {0}")]
    InputDir(PathBuf),

    /// A recording filename did not carry a usable timestamp
    #[error("Unparsable recording filename: {0}")]
    Filename(String),

    /// Configuration file or CLI value was invalid
    #[error("Configuration error: {0}")]
    Config(String),

    /// The checkpoint file could not be read or written
    #[error("Checkpoint error: {0}")]
    Checkpoint(String),

    /// A resolved timeline broke its ordering or overlap invariant
    #[error("Coverage defect: {0}")]
    CoverageDefect(String),

    /// A duplicate-detection frame could not be decoded or hashed
    #[error("Frame hash error: {0}")]
    FrameHash(String),

    /// The run was cancelled between operations
    #[error("Processing cancelled")]
    Cancelled,
}

/// Errors from the external ffmpeg/ffprobe binaries
#[derive(Error, Debug)]
pub enum ToolError {
    #[error("Failed to start {tool}: {source}")]
    Spawn {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} exited with {status}: {stderr}")]
    Failed {
        tool: String,
        status: String,
        stderr: String,
    },

    #[error("Unreadable ffprobe output: {0}")]
    ProbeOutput(String),

    #[error("Invalid cut range: offset={offset:.3}s duration={duration:.3}s")]
    InvalidCut { offset: f64, duration: f64 },

    #[error("No usable clips to concatenate")]
    NothingToConcat,

    #[error("Failed to move clip into place: rename error: {rename}; copy error: {copy}")]
    Finalize { rename: String, copy: String },

    #[cfg(feature = "libav")]
    #[error("libav error: {0}")]
    Libav(String),
}

/// Result type alias for convenience
pub type Result<T> = std::result::Result<T, ExportError>;
