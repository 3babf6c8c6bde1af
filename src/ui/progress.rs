use crate::driver::BatchReport;
use crate::input::InputRecord;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use std::time::Duration;

pub struct ProgressManager {
    multi_progress: MultiProgress,
    enabled: bool,
}

impl ProgressManager {
    pub fn new(enabled: bool) -> Self {
        Self {
            multi_progress: MultiProgress::new(),
            enabled,
        }
    }

    /// A bar when the record count is bounded, otherwise a spinner that counts
    /// records as they stream in.
    pub fn create_record_progress(&self, record_limit: Option<usize>) -> ProgressBar {
        if !self.enabled {
            return ProgressBar::hidden();
        }

        let pb = match record_limit {
            Some(limit) => {
                let pb = self.multi_progress.add(ProgressBar::new(limit as u64));
                pb.set_style(
                    ProgressStyle::with_template(
                        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos:>5}/{len:5} files {msg}",
                    )
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .progress_chars("#>-"),
                );
                pb
            }
            None => {
                let pb = self.multi_progress.add(ProgressBar::new_spinner());
                pb.set_style(
                    ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {pos} files {msg}")
                        .unwrap_or_else(|_| ProgressStyle::default_spinner())
                        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
                );
                pb
            }
        };

        pb.set_message("Waiting for input...");
        pb.enable_steady_tick(Duration::from_millis(100));
        pb
    }

    pub fn suspend<F, R>(&self, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        if self.enabled {
            self.multi_progress.suspend(f)
        } else {
            f()
        }
    }
}

pub fn update_record_started(pb: &ProgressBar, index: usize, record: &InputRecord) {
    pb.set_message(format!("#{} {}", index, record.basename()));
}

pub fn update_record_finished(pb: &ProgressBar) {
    pb.inc(1);
}

pub fn finish_progress_with_summary(pb: &ProgressBar, report: &BatchReport) {
    let final_message = format!(
        "{} extracted, {} failed (completed in {})",
        report.succeeded(),
        report.failed(),
        format_duration(report.elapsed())
    );
    pb.finish_with_message(final_message);
}

pub(crate) fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    if secs >= 60 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else if secs > 0 {
        format!("{}s", secs)
    } else {
        format!("{}ms", duration.as_millis())
    }
}
