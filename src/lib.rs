//! harvest-dl：并发批量文件下载。
//!
//! 给定一组 URL → 目标路径的任务，用固定大小的线程池并发下载，跳过本地已完整的文件，
//! 单个任务失败不会中断整批，最后按成功 / 失败两组返回。
//!
//! 代码结构：
//! - `download`：任务模型、单文件下载、批量调度
//! - `base_system`：配置与日志等基础设施（命令行入口使用）
//!
//! The library never installs a `tracing` subscriber, so it stays silent unless
//! the embedding application sets one up.
//!
//! ```no_run
//! let result = harvest_dl::download(
//!     ["https://example.com/a.png", "https://example.com/b.png"],
//!     Some(std::path::Path::new("out")),
//!     4,
//! )?;
//! for task in &result.failures {
//!     eprintln!("failed: {}", task.url);
//! }
//! # Ok::<(), harvest_dl::BatchError>(())
//! ```

use std::path::Path;

pub mod base_system;
pub mod download;

pub use download::{
    BatchError, DEFAULT_MAX_WORKERS, Dispatcher, DownloadError, DownloadInput, DownloadResult,
    DownloadTask, FailureStage, FetchOptions, Fetcher, HttpFetcher, InputError, NetworkError,
    ProgressSnapshot,
};

/// High-level entry point: mixed URLs / tasks in, aggregate result out.
///
/// Input problems (empty URL, zero workers) and a client that cannot be built
/// are reported before any request is made. Per-file failures never surface
/// as `Err`; they are in [`DownloadResult::failures`].
pub fn download<I>(
    inputs: I,
    destination_dir: Option<&Path>,
    max_workers: usize,
) -> Result<DownloadResult, BatchError>
where
    I: IntoIterator,
    I::Item: Into<DownloadInput>,
{
    download_with(inputs, destination_dir, max_workers, FetchOptions::default())
}

/// Same as [`download`] with explicit fetch settings (timeout, chunk size, default dir).
pub fn download_with<I>(
    inputs: I,
    destination_dir: Option<&Path>,
    max_workers: usize,
    options: FetchOptions,
) -> Result<DownloadResult, BatchError>
where
    I: IntoIterator,
    I::Item: Into<DownloadInput>,
{
    let tasks = download::prepare_tasks(inputs, destination_dir)?;
    let fetcher = HttpFetcher::new(options).map_err(BatchError::Client)?;
    let dispatcher = Dispatcher::new(fetcher, max_workers)?;
    Ok(dispatcher.run(&tasks))
}
