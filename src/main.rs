//! harvest-dl 命令行入口。
//!
//! 读取配置 → 合并命令行参数 → 初始化日志 → 整理任务 → 批量下载 → 输出汇总。

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing::{info, warn};

use harvest_dl::base_system::config::load_or_create;
use harvest_dl::base_system::context::Config;
use harvest_dl::base_system::logging::{LogOptions, LogSystem};
use harvest_dl::download::{DownloadInput, load_manifest, prepare_tasks};
use harvest_dl::{Dispatcher, DownloadResult, HttpFetcher};

const VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Parser)]
#[command(name = "harvest-dl")]
#[command(version, about = "Concurrent batch file downloader")]
struct Cli {
    /// 要下载的 URL，可与 --manifest 同时使用
    urls: Vec<String>,

    /// JSON / YAML 清单文件：URL 字符串或 {url, destination_path} 对象组成的列表
    #[arg(short, long)]
    manifest: Option<PathBuf>,

    /// 保存目录（覆盖配置中的 save_path）
    #[arg(short = 'o', long)]
    dest_dir: Option<PathBuf>,

    /// 最大并发线程数（覆盖配置中的 max_workers）
    #[arg(short = 'j', long)]
    workers: Option<usize>,

    /// 请求超时时间（秒）
    #[arg(long)]
    timeout: Option<u64>,

    /// 配置文件路径
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 数据目录（存放 config.yml 和 logs）
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// 以 JSON 输出结果
    #[arg(long, default_value_t = false)]
    json: bool,

    /// 不显示进度条
    #[arg(long, default_value_t = false)]
    no_progress: bool,

    /// 启用调试日志输出
    #[arg(long, default_value_t = false)]
    debug: bool,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config: Config = load_or_create(cli.config.as_deref(), cli.data_dir.as_deref())
        .map_err(|e| anyhow!(e.to_string()))?;
    apply_overrides(&mut config, &cli);
    config.validate().map_err(|e| anyhow!(e.to_string()))?;

    let _log = LogSystem::init(
        LogOptions {
            console_level: if cli.debug {
                LevelFilter::DEBUG
            } else {
                LevelFilter::INFO
            },
            // JSON 模式下 stdout 只留给结果。
            console: !cli.json,
            archive_on_exit: true,
        },
        cli.data_dir.as_deref(),
    )
    .context("initializing logging")?;
    info!("harvest-dl v{VERSION}");

    let mut inputs: Vec<DownloadInput> =
        cli.urls.iter().cloned().map(DownloadInput::from).collect();
    if let Some(manifest) = cli.manifest.as_deref() {
        let loaded = load_manifest(manifest)
            .with_context(|| format!("loading manifest {}", manifest.display()))?;
        inputs.extend(loaded);
    }
    if inputs.is_empty() {
        warn!("no urls given; pass urls or --manifest");
    }

    let tasks = prepare_tasks(inputs, config.save_dir().as_deref())?;
    let fetcher = HttpFetcher::new(config.fetch_options()).context("building http client")?;
    let dispatcher = Dispatcher::new(fetcher, config.max_workers)?
        .with_progress_bar(config.show_progress && !cli.json);

    let result = dispatcher.run(&tasks);
    report(&result, cli.json)?;

    Ok(if result.is_complete_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(2)
    })
}

fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(dir) = cli.dest_dir.as_ref() {
        config.save_path = dir.to_string_lossy().into_owned();
    }
    if let Some(workers) = cli.workers {
        config.max_workers = workers;
    }
    if let Some(timeout) = cli.timeout {
        config.request_timeout = timeout;
    }
    if cli.no_progress {
        config.show_progress = false;
    }
}

fn report(result: &DownloadResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(result)?);
        return Ok(());
    }

    println!(
        "下载完成：共 {} 个，成功 {} 个，失败 {} 个",
        result.total(),
        result.successes.len(),
        result.failures.len()
    );
    for task in &result.failures {
        match task.destination_path.as_ref() {
            Some(path) => println!("  失败: {} -> {}", task.url, path.display()),
            None => println!("  失败: {}", task.url),
        }
    }
    Ok(())
}
