//! 高层入口的输入整理：URL / 任务混合列表 → 任务列表，以及清单文件解析。
//!
//! 这里的所有校验都在发起任何网络请求之前完成。

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::Value;
use thiserror::Error;

use super::error::InputError;
use super::models::{DownloadInput, DownloadTask, file_name_from_url};

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("io error at {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("invalid json at {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid yaml at {path}: {source}")]
    Yaml {
        path: PathBuf,
        source: serde_yaml::Error,
    },
    #[error(transparent)]
    Input(#[from] InputError),
}

/// Turns mixed inputs into tasks.
///
/// Bare URLs get `destination_dir/<file name from url>` when a directory is
/// given and no destination otherwise; prebuilt tasks pass through untouched.
pub fn prepare_tasks<I>(
    inputs: I,
    destination_dir: Option<&Path>,
) -> Result<Vec<DownloadTask>, InputError>
where
    I: IntoIterator,
    I::Item: Into<DownloadInput>,
{
    inputs
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item.into() {
            DownloadInput::Url(url) => {
                if url.trim().is_empty() {
                    return Err(InputError::EmptyUrl { index });
                }
                let destination_path =
                    destination_dir.map(|dir| dir.join(file_name_from_url(&url)));
                Ok(DownloadTask {
                    url,
                    destination_path,
                })
            }
            DownloadInput::Task(task) => {
                if task.url.trim().is_empty() {
                    return Err(InputError::EmptyUrl { index });
                }
                Ok(task)
            }
        })
        .collect()
}

/// 把动态类型的列表（JSON/YAML 清单）转为输入项；字符串与任务对象以外的元素直接报错。
pub fn inputs_from_value(value: Value) -> Result<Vec<DownloadInput>, InputError> {
    let Value::Array(items) = value else {
        return Err(InputError::NotAList {
            kind: value_kind(&value),
        });
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::String(url) => Ok(DownloadInput::Url(url)),
            Value::Object(_) => serde_json::from_value::<DownloadTask>(item)
                .map(DownloadInput::Task)
                .map_err(|e| InputError::MalformedTask {
                    index,
                    reason: e.to_string(),
                }),
            other => Err(InputError::UnsupportedInput {
                index,
                kind: value_kind(&other),
            }),
        })
        .collect()
}

/// `.yml` / `.yaml` 按 YAML 解析，其余按 JSON。
pub fn load_manifest(path: &Path) -> Result<Vec<DownloadInput>, ManifestError> {
    let raw = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    let is_yaml = path
        .extension()
        .and_then(|s| s.to_str())
        .map(|s| s.eq_ignore_ascii_case("yml") || s.eq_ignore_ascii_case("yaml"))
        .unwrap_or(false);

    let value: Value = if is_yaml {
        serde_yaml::from_str(&raw).map_err(|source| ManifestError::Yaml {
            path: path.to_path_buf(),
            source,
        })?
    } else {
        serde_json::from_str(&raw).map_err(|source| ManifestError::Json {
            path: path.to_path_buf(),
            source,
        })?
    };

    Ok(inputs_from_value(value)?)
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "integer",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
