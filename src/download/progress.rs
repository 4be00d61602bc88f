//! Byte progress for a single transfer.

use indicatif::{ProgressBar, ProgressStyle};

/// Progress bar that exists only when enabled and the total size is known.
pub(crate) struct TransferProgress {
    bar: Option<ProgressBar>,
}

impl TransferProgress {
    pub(crate) fn start(enabled: bool, total: Option<u64>, already: u64, label: &str) -> Self {
        let bar = total.filter(|&total| enabled && total > 0).map(|total| {
            let bar = ProgressBar::new(total);
            bar.set_style(
                ProgressStyle::with_template(
                    "{msg} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({percent}%)",
                )
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#> "),
            );
            bar.set_message(label.to_string());
            bar.set_position(already);
            bar
        });
        Self { bar }
    }

    pub(crate) fn advance(&self, bytes: u64) {
        if let Some(bar) = &self.bar {
            bar.inc(bytes);
        }
    }

    pub(crate) fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }

    pub(crate) fn abandon(&self) {
        if let Some(bar) = &self.bar {
            bar.abandon();
        }
    }
}
