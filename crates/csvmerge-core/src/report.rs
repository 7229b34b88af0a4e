//! Operation log shared by the pipeline stages

use tracing::{info, warn};

/// `tracing` target of the events mirroring log entries
pub const MERGE_LOG_TARGET: &str = "csvmerge_core::merge_log";

/// Ordered, human-readable record of what a merge run did
///
/// Every entry is also emitted as a `tracing` event so the same story shows
/// up in structured logs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeLog {
    entries: Vec<String>,
}

impl MergeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a step outcome
    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        info!(target: MERGE_LOG_TARGET, "{}", message);
        self.entries.push(message);
    }

    /// Record a recovered failure or skipped step
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!(target: MERGE_LOG_TARGET, "{}", message);
        self.entries.push(message);
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<String> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when some entry contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.entries.iter().any(|e| e.contains(needle))
    }
}
