//! 下载错误分类：网络阶段 / 文件阶段。

use std::io;
use std::path::PathBuf;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    Network,
    File,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Network => f.write_str("network"),
            FailureStage::File => f.write_str("file"),
        }
    }
}

/// Why the request half of a fetch failed.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// Connection refused, DNS, timeout, broken body stream.
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("unexpected HTTP status {0}")]
    Status(StatusCode),
    #[error("response body interrupted: {0}")]
    Body(#[source] io::Error),
}

#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("network request for {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: NetworkError,
    },
    #[error("file operation for {} failed: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl DownloadError {
    pub fn network(url: &str, source: impl Into<NetworkError>) -> Self {
        Self::Network {
            url: url.to_string(),
            source: source.into(),
        }
    }

    pub fn file(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }

    pub fn stage(&self) -> FailureStage {
        match self {
            DownloadError::Network { .. } => FailureStage::Network,
            DownloadError::File { .. } => FailureStage::File,
        }
    }
}

/// 高层入口的调用方错误：在任何网络请求之前同步返回。
#[derive(Debug, Error)]
pub enum InputError {
    #[error("invalid item type in download list at index {index}: {kind}")]
    UnsupportedInput { index: usize, kind: &'static str },
    #[error("download list must be a sequence, got {kind}")]
    NotAList { kind: &'static str },
    #[error("empty url at index {index}")]
    EmptyUrl { index: usize },
    #[error("max_workers must be at least 1")]
    ZeroWorkers,
    #[error("malformed download task at index {index}: {reason}")]
    MalformedTask { index: usize, reason: String },
}

/// 高层入口无法开始下载的原因。
///
/// `Input` 是调用方的问题，改参数即可；`Client` 来自运行环境（TLS 后端、代理配置等）。
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Input(#[from] InputError),
    #[error("failed to build http client: {0}")]
    Client(#[source] reqwest::Error),
}
