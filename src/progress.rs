//! Progress bar display for the copy phase

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

/// Progress display for copying the bundle plan
///
/// Shared by the copy workers; `indicatif` bars are internally synchronized.
pub struct ProgressDisplay {
    file_pb: ProgressBar,
}

impl ProgressDisplay {
    /// Create a progress display for `total_files` copies; hidden when `quiet`
    pub fn new(total_files: u64, quiet: bool) -> Self {
        let file_style = ProgressStyle::default_bar()
            .template("[{bar:40.cyan/blue}] {pos}/{len} files {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-");

        let file_pb = if quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::with_draw_target(Some(total_files), ProgressDrawTarget::stderr());
            pb.set_style(file_style);
            pb
        };

        Self { file_pb }
    }

    /// A display that never draws
    pub fn hidden() -> Self {
        Self::new(0, true)
    }

    /// Record one processed file
    pub fn update_file(&self, file_path: &str) {
        // Truncate long paths for display
        let display_path = if file_path.chars().count() > 50 {
            let tail: String = file_path
                .chars()
                .rev()
                .take(47)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect();
            format!("...{tail}")
        } else {
            file_path.to_string()
        };
        self.file_pb.set_message(display_path);
        self.file_pb.inc(1);
    }

    pub fn position(&self) -> u64 {
        self.file_pb.position()
    }

    pub fn finish(&self) {
        self.file_pb.finish_and_clear();
    }

    /// Abandon on error
    pub fn abandon(&self) {
        self.file_pb.abandon();
    }
}
