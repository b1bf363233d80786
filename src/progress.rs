// src/progress.rs

//! Build progress reporting
//!
//! The build pass reports progress through the [`ProgressTracker`] trait so
//! callers decide how (or whether) to surface it. Implementations:
//! - `LogProgress`: logs to tracing at roughly 10% intervals
//! - `SilentProgress`: no-op for tests and scripted use
//!
//! Resources are processed on a worker pool, so trackers must be
//! `Send + Sync` and tolerate concurrent `increment` calls.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::info;

/// Coarse stages of a build
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildPhase {
    Validating,
    Collecting,
    Processing,
    Writing,
    Signing,
}

impl std::fmt::Display for BuildPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Validating => "validating project",
            Self::Collecting => "collecting resources",
            Self::Processing => "processing resources",
            Self::Writing => "writing pack",
            Self::Signing => "signing pack",
        };
        f.write_str(name)
    }
}

/// Core trait for progress tracking
pub trait ProgressTracker: Send + Sync {
    /// Set the current status message
    fn set_message(&self, message: &str);

    /// Increment progress by the given amount
    fn increment(&self, amount: u64);

    /// Set the total (length) of the progress
    fn set_length(&self, length: u64);

    fn position(&self) -> u64;

    fn length(&self) -> u64;

    /// Finish progress successfully with a message
    fn finish_with_message(&self, message: &str);

    /// Finish progress with an error message
    fn finish_with_error(&self, message: &str);

    fn is_finished(&self) -> bool;

    /// Announce a new build phase
    fn set_phase(&self, phase: BuildPhase) {
        self.set_message(&phase.to_string());
    }
}

/// Silent progress tracker (no-op apart from counting)
#[derive(Debug, Default)]
pub struct SilentProgress {
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
}

impl SilentProgress {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProgressTracker for SilentProgress {
    fn set_message(&self, _message: &str) {}

    fn increment(&self, amount: u64) {
        self.position.fetch_add(amount, Ordering::Relaxed);
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn finish_with_error(&self, _message: &str) {
        self.finished.store(true, Ordering::Relaxed);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}

/// Logging progress tracker
///
/// Logs progress updates to tracing at info level.
#[derive(Debug)]
pub struct LogProgress {
    name: String,
    position: AtomicU64,
    length: AtomicU64,
    finished: AtomicBool,
}

impl LogProgress {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            position: AtomicU64::new(0),
            length: AtomicU64::new(0),
            finished: AtomicBool::new(false),
        }
    }

    fn log_interval(&self) -> u64 {
        std::cmp::max(1, self.length.load(Ordering::Relaxed) / 10)
    }
}

impl ProgressTracker for LogProgress {
    fn set_message(&self, message: &str) {
        info!("{}: {}", self.name, message);
    }

    fn increment(&self, amount: u64) {
        let old_pos = self.position.fetch_add(amount, Ordering::Relaxed);
        let new_pos = old_pos + amount;
        let length = self.length.load(Ordering::Relaxed);
        let interval = self.log_interval();

        if length > 0 && new_pos / interval > old_pos / interval {
            let percent = (new_pos * 100) / length;
            info!("{}: {}% ({}/{})", self.name, percent, new_pos, length);
        }
    }

    fn set_length(&self, length: u64) {
        self.length.store(length, Ordering::Relaxed);
    }

    fn position(&self) -> u64 {
        self.position.load(Ordering::Relaxed)
    }

    fn length(&self) -> u64 {
        self.length.load(Ordering::Relaxed)
    }

    fn finish_with_message(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        info!("{}: {}", self.name, message);
    }

    fn finish_with_error(&self, message: &str) {
        self.finished.store(true, Ordering::Relaxed);
        info!("{}: ERROR - {}", self.name, message);
    }

    fn is_finished(&self) -> bool {
        self.finished.load(Ordering::Relaxed)
    }
}
