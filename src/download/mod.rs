//! 下载流程模块入口。
//!
//! 子模块：
//! - `models`      — 数据模型（DownloadTask / DownloadResult / ProgressSnapshot 等）
//! - `error`       — 网络阶段 / 文件阶段错误分类
//! - `fetcher`     — 单文件下载（跳过判断 + 分块落盘）
//! - `dispatcher`  — 固定大小工作池，批量调度与结果汇总
//! - `progress`    — 进度上报与 CLI 进度条
//! - `inputs`      — 高层入口的输入整理与清单解析

pub mod dispatcher;
pub mod error;
pub mod fetcher;
pub mod inputs;
pub mod models;
pub mod progress;

pub use dispatcher::{DEFAULT_MAX_WORKERS, Dispatcher};
pub use error::{BatchError, DownloadError, FailureStage, InputError, NetworkError};
pub use fetcher::{DEFAULT_CHUNK_SIZE, DEFAULT_REQUEST_TIMEOUT, FetchOptions, Fetcher, HttpFetcher};
pub use inputs::{ManifestError, inputs_from_value, load_manifest, prepare_tasks};
pub use models::{DownloadInput, DownloadResult, DownloadTask, ProgressSnapshot};
pub use progress::ProgressCallback;
