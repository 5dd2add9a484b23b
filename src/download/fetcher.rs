//! 单文件下载：一次 GET，按大小判断是否跳过，分块流式落盘。

use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Client, Response};
use reqwest::header::{ACCEPT, ACCEPT_ENCODING, HeaderMap, HeaderValue};
use tracing::{debug, info};

use super::error::{DownloadError, NetworkError};
use super::models::file_name_from_url;

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_CHUNK_SIZE: usize = 8192;

/// Anything that can turn `(url, destination)` into a file on disk.
///
/// The dispatcher shares one fetcher between all of its worker threads.
/// Closures with the matching signature implement this too, which is what the
/// tests use as doubles.
pub trait Fetcher: Sync {
    fn fetch(&self, url: &str, destination: Option<&Path>) -> Result<PathBuf, DownloadError>;
}

impl<F> Fetcher for F
where
    F: Fn(&str, Option<&Path>) -> Result<PathBuf, DownloadError> + Sync,
{
    fn fetch(&self, url: &str, destination: Option<&Path>) -> Result<PathBuf, DownloadError> {
        self(url, destination)
    }
}

#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub request_timeout: Duration,
    pub chunk_size: usize,
    /// 任务未指定目标路径时的落盘目录。
    pub default_dir: PathBuf,
    pub user_agent: String,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            chunk_size: DEFAULT_CHUNK_SIZE,
            default_dir: std::env::temp_dir(),
            user_agent: concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    chunk_size: usize,
    default_dir: PathBuf,
}

impl HttpFetcher {
    pub fn new(options: FetchOptions) -> Result<Self, reqwest::Error> {
        // reqwest is built without decompression support; ask for identity so
        // Content-Length matches the bytes that end up on disk.
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("identity"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(options.user_agent)
            .timeout(options.request_timeout)
            .build()?;

        Ok(Self {
            client,
            chunk_size: options.chunk_size.max(1),
            default_dir: options.default_dir,
        })
    }

    pub fn resolve_destination(&self, url: &str, destination: Option<&Path>) -> PathBuf {
        match destination {
            Some(path) => path.to_path_buf(),
            None => self.default_dir.join(file_name_from_url(url)),
        }
    }

    fn write_body(
        &self,
        url: &str,
        path: &Path,
        response: &mut Response,
    ) -> Result<u64, DownloadError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| DownloadError::file(parent, e))?;
        }

        // File::create 会截断已有内容：不做追加式续传。
        let mut file = File::create(path).map_err(|e| DownloadError::file(path, e))?;
        let mut buf = vec![0u8; self.chunk_size];
        let mut written = 0u64;

        loop {
            let n = match response.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(DownloadError::network(url, NetworkError::Body(e))),
            };
            file.write_all(&buf[..n]).map_err(|e| DownloadError::file(path, e))?;
            written += n as u64;
        }

        file.flush().map_err(|e| DownloadError::file(path, e))?;
        Ok(written)
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str, destination: Option<&Path>) -> Result<PathBuf, DownloadError> {
        let path = self.resolve_destination(url, destination);
        debug!("GET {url} -> {}", path.display());

        let mut response = self
            .client
            .get(url)
            .send()
            .map_err(|e| DownloadError::network(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::network(url, NetworkError::Status(status)));
        }

        if is_already_complete(&path, response.content_length())? {
            info!("file already exists and is complete: {}", display_name(&path));
            return Ok(path);
        }

        let written = self.write_body(url, &path, &mut response)?;
        info!("download completed: {} ({written} bytes)", display_name(&path));
        Ok(path)
    }
}

/// 本地文件存在且大小与服务端 Content-Length（>0）一致时视为已完成。
///
/// Only sizes are compared, never content.
pub fn is_already_complete(path: &Path, remote_len: Option<u64>) -> Result<bool, DownloadError> {
    let Some(remote_len) = remote_len.filter(|len| *len > 0) else {
        return Ok(false);
    };
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.is_file() && meta.len() == remote_len),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(DownloadError::file(path, e)),
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
