use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

use super::core::BatchSummary;

/// Terminal progress bar for one batch, driven by the executor's progress callback.
#[derive(Clone)]
pub struct BatchProgress {
    bar: ProgressBar,
    workers: usize,
}

impl BatchProgress {
    pub fn new(total: usize, workers: usize) -> Self {
        let style = ProgressStyle::with_template(
            "🔐 [{elapsed_precise}] {bar:40.cyan/blue} {pos:>7}/{len:7} files {spinner} {msg}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ");

        let bar = ProgressBar::new(total as u64);
        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(100));

        Self { bar, workers }
    }

    /// A progress bar that never draws.
    pub fn hidden(total: usize) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::hidden());
        Self { bar, workers: 1 }
    }

    /// Callback suitable for `TaskExecutor::with_progress`.
    pub fn reporter(&self) -> impl Fn(usize, usize, usize) + Send + Sync + 'static {
        let bar = self.bar.clone();
        let parallel = self.workers > 1;
        move |completed, _total, worker_id| {
            bar.set_position(completed as u64);
            if parallel {
                bar.set_message(format!("[worker {}]", worker_id + 1));
            }
        }
    }

    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    pub fn finish(&self, summary: &BatchSummary) {
        self.bar.finish_with_message(format!(
            "processed {} | skipped {} | failed {}",
            summary.processed, summary.skipped, summary.failed
        ));
    }

    /// Remove the bar without leaving a final line, e.g. on interruption.
    pub fn abandon(&self) {
        self.bar.finish_and_clear();
    }
}
