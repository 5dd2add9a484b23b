//! 下载相关的数据模型定义。
//!
//! 包含下载任务、批量结果、输入项与进度快照。

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// 从 URL 推导文件名失败时使用的兜底名称。
pub const FALLBACK_FILE_NAME: &str = "downloaded_file";

/// A single URL → destination pair. Immutable once built; resubmitting the same
/// value is how a caller retries it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DownloadTask {
    pub url: String,
    #[serde(default)]
    pub destination_path: Option<PathBuf>,
}

impl DownloadTask {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            destination_path: None,
        }
    }

    pub fn with_destination(url: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            url: url.into(),
            destination_path: Some(path.into()),
        }
    }

    /// 日志里展示用的名字：优先目标文件名，其次 URL。
    pub fn display_name(&self) -> String {
        self.destination_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.url.clone())
    }
}

/// Outcome of one batch run. Both lists are in completion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DownloadResult {
    pub successes: Vec<PathBuf>,
    pub failures: Vec<DownloadTask>,
}

impl DownloadResult {
    pub fn total(&self) -> usize {
        self.successes.len() + self.failures.len()
    }

    pub fn is_complete_success(&self) -> bool {
        self.failures.is_empty()
    }
}

/// 高层入口接受的输入项：裸 URL 或预先构造好的任务，可混合。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadInput {
    Url(String),
    Task(DownloadTask),
}

impl From<&str> for DownloadInput {
    fn from(value: &str) -> Self {
        Self::Url(value.to_string())
    }
}

impl From<String> for DownloadInput {
    fn from(value: String) -> Self {
        Self::Url(value)
    }
}

impl From<DownloadTask> for DownloadInput {
    fn from(value: DownloadTask) -> Self {
        Self::Task(value)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ProgressSnapshot {
    pub done: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub total: usize,
}

/// Last non-query path segment of `url`, or [`FALLBACK_FILE_NAME`].
pub fn file_name_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let name = without_query.rsplit('/').next().unwrap_or_default().trim();
    if name.is_empty() || name == "." || name == ".." {
        FALLBACK_FILE_NAME.to_string()
    } else {
        name.to_string()
    }
}
