//! 命令行模式下的日志系统。
//!
//! 库本身只发 `tracing` 事件，不安装订阅者；只有命令行入口会调用 [`LogSystem::init`]。
//!
//! - 控制台：stdout，级别可调；`--json` 时关闭，stdout 只留给结果。进度条画在 stderr。
//! - 文件：`<base>/logs/latest.log`，始终记录 DEBUG 及以上，带线程名（`download-worker-N`）。
//! - 收尾：`LogSystem` 被 drop 或收到 Ctrl-C 时刷盘，并按需把 `latest.log` 压缩为 zip。

use std::fs::{self, File};
use std::io::{self, IsTerminal};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::{panic, process, thread};

use time::OffsetDateTime;
use time::macros::format_description;
use tracing::{error, warn};
use tracing_appender::non_blocking::{NonBlockingBuilder, WorkerGuard};
use tracing_appender::rolling;
use tracing_subscriber::Layer;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use zip::CompressionMethod;
use zip::write::FileOptions;

const LATEST_LOG: &str = "latest.log";
/// 启动时超过该大小的 `latest.log` 先归档再继续写。
const ROTATE_AT_BYTES: u64 = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum LogError {
    #[error("failed to create log directory {}: {source}", .path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to install tracing subscriber: {0}")]
    SubscriberInit(#[from] TryInitError),
    #[error("failed to archive {}: {source}", .path.display())]
    Archive {
        path: PathBuf,
        #[source]
        source: ArchiveError,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
    #[error(transparent)]
    Timestamp(#[from] time::error::Format),
}

#[derive(Clone, Copy, Debug)]
pub struct LogOptions {
    /// 控制台级别；文件层不受影响。
    pub console_level: LevelFilter,
    pub console: bool,
    pub archive_on_exit: bool,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            console_level: LevelFilter::INFO,
            console: true,
            archive_on_exit: false,
        }
    }
}

/// 已安装的全局订阅者。drop 时刷盘并（可选）归档。
pub struct LogSystem {
    shutdown: Arc<Shutdown>,
}

impl LogSystem {
    /// 日志目录为 `base_dir/logs`，未指定时为当前目录下的 `logs`。
    pub fn init(options: LogOptions, base_dir: Option<&Path>) -> Result<Self, LogError> {
        let files = LogFiles::under(base_dir);
        files.prepare()?;

        let (file_writer, guard) = NonBlockingBuilder::default()
            .lossy(false)
            .thread_name("harvest-dl-log")
            .finish(rolling::never(&files.dir, LATEST_LOG));

        let console_layer = options.console.then(|| {
            fmt::layer()
                .with_target(false)
                .with_ansi(io::stdout().is_terminal())
                .with_writer(io::stdout)
                .with_filter(options.console_level)
        });

        let file_layer = fmt::layer()
            .with_target(false)
            .with_thread_names(true)
            .with_ansi(false)
            .with_writer(file_writer)
            .with_filter(LevelFilter::DEBUG);

        tracing_subscriber::registry()
            .with(console_layer)
            .with(file_layer)
            .try_init()?;

        let shutdown = Arc::new(Shutdown {
            files,
            guard: Mutex::new(Some(guard)),
            archive_on_exit: options.archive_on_exit,
        });

        let on_interrupt = Arc::clone(&shutdown);
        if let Err(err) = ctrlc::set_handler(move || {
            warn!("interrupted; files still being written may be incomplete");
            on_interrupt.finish();
            process::exit(130);
        }) {
            warn!("failed to install Ctrl-C handler: {err}");
        }
        log_panics();

        Ok(Self { shutdown })
    }
}

impl Drop for LogSystem {
    fn drop(&mut self) {
        self.shutdown.finish();
    }
}

struct Shutdown {
    files: LogFiles,
    guard: Mutex<Option<WorkerGuard>>,
    archive_on_exit: bool,
}

impl Shutdown {
    /// 只有拿到 guard 的那一次调用负责收尾。
    fn finish(&self) {
        let guard = self
            .guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        let Some(guard) = guard else {
            return;
        };
        // WorkerGuard 的 drop 会等后台写线程把队列写完。
        drop(guard);

        if self.archive_on_exit {
            if let Err(err) = self.files.archive() {
                eprintln!("failed to archive {}: {err}", self.files.latest.display());
            }
        }
    }
}

/// 工作线程 panic 时其余线程还在跑，这里只记一条日志，不收尾。
fn log_panics() {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        let current = thread::current();
        error!(
            "thread '{}' panicked: {info}",
            current.name().unwrap_or("<unnamed>")
        );
        previous(info);
    }));
}

struct LogFiles {
    dir: PathBuf,
    latest: PathBuf,
}

impl LogFiles {
    fn under(base_dir: Option<&Path>) -> Self {
        let dir = base_dir.unwrap_or(Path::new(".")).join("logs");
        let latest = dir.join(LATEST_LOG);
        Self { dir, latest }
    }

    fn prepare(&self) -> Result<(), LogError> {
        fs::create_dir_all(&self.dir).map_err(|source| LogError::CreateDir {
            path: self.dir.clone(),
            source,
        })?;
        if fs::metadata(&self.latest).is_ok_and(|m| m.len() >= ROTATE_AT_BYTES) {
            self.archive().map_err(|source| LogError::Archive {
                path: self.latest.clone(),
                source,
            })?;
        }
        Ok(())
    }

    /// `latest.log` → `log_<UTC 时间戳>.zip`，然后删除原文件；空文件或不存在时不产生归档。
    fn archive(&self) -> Result<Option<PathBuf>, ArchiveError> {
        let len = match fs::metadata(&self.latest) {
            Ok(meta) => meta.len(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        if len == 0 {
            fs::remove_file(&self.latest)?;
            return Ok(None);
        }

        let stamp = OffsetDateTime::now_utc().format(format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))?;
        let target = self.dir.join(format!("log_{stamp}.zip"));

        let mut zip = zip::ZipWriter::new(File::create(&target)?);
        zip.start_file(
            format!("{stamp}.log"),
            FileOptions::default().compression_method(CompressionMethod::Deflated),
        )?;
        io::copy(&mut File::open(&self.latest)?, &mut zip)?;
        zip.finish()?;

        fs::remove_file(&self.latest)?;
        Ok(Some(target))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tracing::info;

    fn files_in(dir: &Path) -> LogFiles {
        LogFiles {
            dir: dir.to_path_buf(),
            latest: dir.join(LATEST_LOG),
        }
    }

    fn read_archive(path: &Path) -> String {
        let mut zip = zip::ZipArchive::new(File::open(path).unwrap()).unwrap();
        let mut text = String::new();
        zip.by_index(0).unwrap().read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn archive_zips_and_removes_latest() {
        let dir = tempfile::tempdir().unwrap();
        let files = files_in(dir.path());
        fs::write(&files.latest, "INFO download completed: a.png\n").unwrap();

        let archive = files.archive().unwrap().unwrap();

        assert!(!files.latest.exists());
        let name = archive.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("log_") && name.ends_with(".zip"));
        assert_eq!(read_archive(&archive), "INFO download completed: a.png\n");
    }

    #[test]
    fn empty_log_is_dropped_without_archive() {
        let dir = tempfile::tempdir().unwrap();
        let files = files_in(dir.path());
        fs::write(&files.latest, "").unwrap();

        assert!(files.archive().unwrap().is_none());
        assert!(!files.latest.exists());
    }

    #[test]
    fn missing_log_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        assert!(files_in(dir.path()).archive().unwrap().is_none());
    }

    // 本模块唯一安装全局订阅者的测试。
    #[test]
    fn worker_panic_keeps_the_log_open_until_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let log = LogSystem::init(
            LogOptions {
                console: false,
                archive_on_exit: true,
                ..LogOptions::default()
            },
            Some(dir.path()),
        )
        .unwrap();
        let logs = dir.path().join("logs");

        let worker = thread::Builder::new()
            .name("download-worker-0".into())
            .spawn(|| panic!("fetcher bug"))
            .unwrap();
        let joined: thread::Result<()> = worker.join();
        assert!(joined.is_err());
        info!("remaining tasks finished after the panic");

        assert!(logs.join(LATEST_LOG).exists());

        drop(log);

        assert!(!logs.join(LATEST_LOG).exists());
        let archive = fs::read_dir(&logs)
            .unwrap()
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .find(|p| p.extension().is_some_and(|ext| ext == "zip"))
            .unwrap();
        let text = read_archive(&archive);
        assert!(text.contains("thread 'download-worker-0' panicked"));
        assert!(text.contains("fetcher bug"));
        assert!(text.contains("remaining tasks finished after the panic"));
    }
}
