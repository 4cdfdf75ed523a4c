//! 通信中のスピナー表示

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::{Duration, Instant};

/// Dropで消えるスピナー
pub struct Spinner {
    bar: ProgressBar,
    start: Instant,
}

impl Spinner {
    pub fn start(message: impl Into<String>) -> Self {
        let bar = ProgressBar::new_spinner();
        bar.set_draw_target(ProgressDrawTarget::stderr());
        let style = ProgressStyle::with_template("{spinner} {msg} ({elapsed})")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        bar.set_message(message.into());
        bar.enable_steady_tick(Duration::from_millis(120));
        Self {
            bar,
            start: Instant::now(),
        }
    }
}

impl Drop for Spinner {
    fn drop(&mut self) {
        tracing::debug!(elapsed_ms = self.start.elapsed().as_millis() as u64, "通信終了");
        self.bar.finish_and_clear();
    }
}
