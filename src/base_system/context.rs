//! 全局配置结构（Config）与默认值。
//!
//! 该模块同时提供生成 `config.yml` 的字段元信息。

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::config::{ConfigError, ConfigSpec, FieldMeta};
use crate::download::{
    DEFAULT_CHUNK_SIZE, DEFAULT_MAX_WORKERS, DEFAULT_REQUEST_TIMEOUT, FetchOptions,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    // 网络配置
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    // 保存配置
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default)]
    pub save_path: String,

    // 界面配置
    #[serde(default = "default_true")]
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            request_timeout: default_request_timeout(),
            user_agent: default_user_agent(),
            chunk_size: default_chunk_size(),
            save_path: String::new(),
            show_progress: default_true(),
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::Validation("max_workers must be at least 1".into()));
        }
        if self.request_timeout == 0 {
            return Err(ConfigError::Validation("request_timeout must be positive".into()));
        }
        if self.chunk_size == 0 {
            return Err(ConfigError::Validation("chunk_size must be positive".into()));
        }
        Ok(())
    }

    /// `save_path` 为空表示不指定目录。
    pub fn save_dir(&self) -> Option<PathBuf> {
        let trimmed = self.save_path.trim();
        (!trimmed.is_empty()).then(|| PathBuf::from(trimmed))
    }

    pub fn fetch_options(&self) -> FetchOptions {
        FetchOptions {
            request_timeout: Duration::from_secs(self.request_timeout),
            chunk_size: self.chunk_size,
            default_dir: self.save_dir().unwrap_or_else(std::env::temp_dir),
            user_agent: self.user_agent.clone(),
        }
    }
}

impl ConfigSpec for Config {
    const FILE_NAME: &'static str = "config.yml";

    fn fields() -> &'static [FieldMeta] {
        static FIELDS: [FieldMeta; 6] = [
            FieldMeta {
                name: "max_workers",
                description: "最大并发下载线程数（至少为 1）",
            },
            FieldMeta {
                name: "request_timeout",
                description: "请求超时时间（秒）",
            },
            FieldMeta {
                name: "user_agent",
                description: "HTTP 请求使用的 User-Agent",
            },
            FieldMeta {
                name: "chunk_size",
                description: "写盘分块大小（字节）",
            },
            FieldMeta {
                name: "save_path",
                description: "默认保存目录，留空则使用系统临时目录",
            },
            FieldMeta {
                name: "show_progress",
                description: "是否在终端显示下载进度条",
            },
        ];
        &FIELDS
    }
}

fn default_max_workers() -> usize {
    DEFAULT_MAX_WORKERS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT.as_secs()
}

fn default_user_agent() -> String {
    concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_true() -> bool {
    true
}
