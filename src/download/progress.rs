//! 进度上报与 CLI 进度条管理。
//!
//! 纯观察性质：有没有回调、有没有进度条都不影响调度与结果。

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::models::ProgressSnapshot;

pub type ProgressCallback = Box<dyn FnMut(ProgressSnapshot) + Send>;

pub(crate) struct ProgressReporter {
    pub(crate) snapshot: ProgressSnapshot,
    cb: Option<ProgressCallback>, // optional UI callback
    bar: Option<ProgressBar>,
}

impl ProgressReporter {
    pub(crate) fn new(total: usize, show_bar: bool, cb: Option<ProgressCallback>) -> Self {
        let bar = show_bar.then(|| {
            let style = ProgressStyle::with_template(
                "{prefix} [{elapsed_precise}] {wide_bar} {pos}/{len} ({eta})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("##-");

            let bar =
                ProgressBar::with_draw_target(Some(total as u64), ProgressDrawTarget::stderr());
            bar.set_style(style);
            bar.set_prefix("downloading files");
            bar
        });

        let mut reporter = Self {
            snapshot: ProgressSnapshot {
                total,
                ..ProgressSnapshot::default()
            },
            cb,
            bar,
        };
        reporter.emit();
        reporter
    }

    fn emit(&mut self) {
        if let Some(cb) = self.cb.as_mut() {
            cb(self.snapshot);
        }
    }

    pub(crate) fn record(&mut self, succeeded: bool) {
        self.snapshot.done = (self.snapshot.done + 1).min(self.snapshot.total);
        if succeeded {
            self.snapshot.succeeded += 1;
        } else {
            self.snapshot.failed += 1;
        }
        if let Some(bar) = self.bar.as_ref() {
            bar.inc(1);
        }
        self.emit();
    }

    pub(crate) fn finish(&mut self) {
        if let Some(bar) = self.bar.take() {
            bar.finish_and_clear();
        }
    }
}

impl Drop for ProgressReporter {
    fn drop(&mut self) {
        self.finish();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn callback_sees_every_completion() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut reporter = ProgressReporter::new(
            3,
            false,
            Some(Box::new(move |snap: ProgressSnapshot| sink.lock().unwrap().push(snap))),
        );

        reporter.record(true);
        reporter.record(false);
        reporter.record(true);
        reporter.finish();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(seen[0].done, 0);
        assert_eq!(
            seen[3],
            ProgressSnapshot {
                done: 3,
                succeeded: 2,
                failed: 1,
                total: 3
            }
        );
    }
}
