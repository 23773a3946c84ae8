//! CLI-specific progress handling for isocost
//!
//! Exploration has no known total, so progress is a spinner showing the
//! running cell and segment counts.

use std::sync::Arc;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use isocost::{ExploreStats, ProgressCallback};

/// Creates a spinner for CLI display
pub fn create_spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template("{spinner:.green} [{elapsed_precise}] {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Spinner fed by the explorer's progress callback
pub struct ProgressManager {
    pub pb: ProgressBar,
}

impl ProgressManager {
    /// Create a new progress manager
    pub fn new(message: &str) -> Self {
        let pb = create_spinner();

        // Print initial message to stderr
        eprintln!("{message}");
        pb.set_message("starting");

        Self { pb }
    }

    /// Callback updating the spinner message
    pub fn callback(&self) -> ProgressCallback {
        let pb = self.pb.clone();
        Arc::new(move |stats: &ExploreStats| {
            pb.set_message(format!(
                "{} cells explored, {} segments, {} cached costs",
                stats.flat_cells + stats.fine_cells,
                stats.segments,
                stats.matrix_entries
            ));
        })
    }

    pub fn finish(&self, stats: &ExploreStats) {
        self.pb.finish_with_message(format!("✅ Done: {stats}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_spinner() {
        let pb = create_spinner();
        assert!(pb.length().is_none());
        pb.finish();
    }

    #[test]
    fn test_callback_updates_message() {
        let manager = ProgressManager::new("Test exploration");
        let callback = manager.callback();
        callback(&ExploreStats { fine_cells: 3, segments: 5, ..Default::default() });
        assert!(manager.pb.message().contains("3 cells explored, 5 segments"));
        manager.finish(&ExploreStats::default());
    }
}
