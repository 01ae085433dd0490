//! Progress reporting and cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Receives `(index, total, label)` at episode and clip boundaries
pub trait ProgressSink: Send + Sync {
    fn report(&self, index: usize, total: usize, label: &str);
}

/// Logs progress through tracing
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingProgress;

impl ProgressSink for TracingProgress {
    fn report(&self, index: usize, total: usize, label: &str) {
        tracing::info!("[{}/{}] {}", index, total, label);
    }
}

/// Discards progress
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn report(&self, _index: usize, _total: usize, _label: &str) {}
}

/// Shared cancellation signal, checked between operations
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
