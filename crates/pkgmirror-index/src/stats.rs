/*! [CopyStatistics]: lock-free, monotonically non-decreasing counters updated
from worker threads as package files are attempted and copied. */

use std::sync::atomic::{AtomicU64, Ordering};

/// Progress counters for a mirror operation.
///
/// All fields are `AtomicU64` so worker threads in the Async Section can
/// update them without contending on a mutex; readers (the CLI's progress
/// bar, the final summary line) use `Ordering::Relaxed` since these are
/// independent counters with no cross-field invariant that requires a
/// stronger ordering.
#[derive(Debug, Default)]
pub struct CopyStatistics {
    total: AtomicU64,
    copied: AtomicU64,
    total_bytes: AtomicU64,
    copied_bytes: AtomicU64,
}

impl CopyStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_total(&self, packages: u64, bytes: u64) {
        self.total.fetch_add(packages, Ordering::Relaxed);
        self.total_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_copied(&self, packages: u64, bytes: u64) {
        self.copied.fetch_add(packages, Ordering::Relaxed);
        self.copied_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn total(&self) -> u64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn copied(&self) -> u64 {
        self.copied.load(Ordering::Relaxed)
    }

    pub fn total_bytes(&self) -> u64 {
        self.total_bytes.load(Ordering::Relaxed)
    }

    pub fn copied_bytes(&self) -> u64 {
        self.copied_bytes.load(Ordering::Relaxed)
    }

    /// Render the stdout summary line specified for mirror completion.
    pub fn summary_line(&self) -> String {
        format!("Packages processed: {}/{}", self.copied(), self.total())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_line_format() {
        let stats = CopyStatistics::new();
        stats.add_total(10, 1000);
        stats.add_copied(7, 700);
        assert_eq!(stats.summary_line(), "Packages processed: 7/10");
    }
}
