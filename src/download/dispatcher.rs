//! 批量下载调度：固定大小的工作线程池。
//!
//! 任务全部进入一个 crossbeam 队列，N 个工作线程各自取任务、同步执行到结束，
//! 结果通过第二个通道回到调用线程，按完成顺序汇总。

use std::path::PathBuf;
use std::thread;

use crossbeam_channel as channel;
use tracing::{debug, error, info, warn};

use super::error::{DownloadError, InputError};
use super::fetcher::Fetcher;
use super::models::{DownloadResult, DownloadTask};
use super::progress::{ProgressCallback, ProgressReporter};

pub const DEFAULT_MAX_WORKERS: usize = 5;

struct TaskEvent<'a> {
    task: &'a DownloadTask,
    outcome: Result<PathBuf, DownloadError>,
}

pub struct Dispatcher<F> {
    fetcher: F,
    max_workers: usize,
    show_progress: bool,
}

impl<F: Fetcher> Dispatcher<F> {
    /// `max_workers` is an upper bound; a batch never starts more threads than
    /// it has tasks. Zero is rejected with [`InputError::ZeroWorkers`].
    pub fn new(fetcher: F, max_workers: usize) -> Result<Self, InputError> {
        if max_workers == 0 {
            return Err(InputError::ZeroWorkers);
        }
        Ok(Self {
            fetcher,
            max_workers,
            show_progress: false,
        })
    }

    /// Draw an `indicatif` bar on stderr while a batch runs.
    pub fn with_progress_bar(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    pub fn run(&self, tasks: &[DownloadTask]) -> DownloadResult {
        self.run_with_progress(tasks, None)
    }

    /// Runs every task and returns once the pool has drained.
    ///
    /// Classified failures land in `failures`; a panicking fetcher is a bug and
    /// resumes unwinding here after the remaining workers finish.
    pub fn run_with_progress(
        &self,
        tasks: &[DownloadTask],
        progress: Option<ProgressCallback>,
    ) -> DownloadResult {
        if tasks.is_empty() {
            info!("no download tasks to execute");
            return DownloadResult::default();
        }

        let total = tasks.len();
        let workers = self.max_workers.min(total);
        debug!("dispatching {total} tasks on {workers} workers");

        let (tx, rx) = channel::unbounded::<&DownloadTask>();
        for task in tasks {
            // rx 仍在作用域内，发送不会失败。
            let _ = tx.send(task);
        }
        drop(tx);

        let (tx_evt, rx_evt) = channel::unbounded::<TaskEvent<'_>>();
        let mut reporter = ProgressReporter::new(total, self.show_progress, progress);
        let mut result = DownloadResult {
            successes: Vec::with_capacity(total),
            failures: Vec::new(),
        };

        thread::scope(|scope| {
            let mut spawned = 0usize;
            for id in 0..workers {
                let rx = rx.clone();
                let tx_evt = tx_evt.clone();
                let fetcher = &self.fetcher;

                let handle = thread::Builder::new()
                    .name(format!("download-worker-{id}"))
                    .spawn_scoped(scope, move || work(fetcher, &rx, &tx_evt));
                match handle {
                    Ok(_) => spawned += 1,
                    Err(err) => warn!("failed to spawn download worker {id}: {err}"),
                }
            }

            if spawned == 0 {
                // 一个线程都起不来时退化为在调用线程上串行执行，保证每个任务都有结果。
                work(&self.fetcher, &rx, &tx_evt);
            }
            drop(tx_evt);

            for event in rx_evt.iter() {
                match event.outcome {
                    Ok(path) => {
                        result.successes.push(path);
                        reporter.record(true);
                    }
                    Err(err) => {
                        error!(
                            "task failed for {} ({} stage): {err}",
                            event.task.display_name(),
                            err.stage()
                        );
                        result.failures.push(event.task.clone());
                        reporter.record(false);
                    }
                }
            }
        });

        reporter.finish();
        info!(
            "batch finished: {} succeeded, {} failed",
            result.successes.len(),
            result.failures.len()
        );
        result
    }
}

fn work<'a, F: Fetcher>(
    fetcher: &F,
    rx: &channel::Receiver<&'a DownloadTask>,
    tx_evt: &channel::Sender<TaskEvent<'a>>,
) {
    for task in rx.iter() {
        let outcome = fetcher.fetch(&task.url, task.destination_path.as_deref());
        if tx_evt.send(TaskEvent { task, outcome }).is_err() {
            return;
        }
    }
}
