use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;

use auto_classify::config::{CancelGranularity, PathsConfig, StagingStrategy};
use auto_classify::error::SetupError;
use auto_classify::utils::logging;
use auto_classify::{App, Config, RunOptions, RunStatus};

/// 对候选光变进行批量分类，并把高置信度结果写回时序库
#[derive(Parser, Debug)]
#[command(name = "auto-classify", version, about)]
struct Cli {
    /// 候选文件（CSV，首列为 source_id）
    #[arg(long)]
    candidate_file: PathBuf,

    /// 数据库名
    #[arg(long)]
    db: Option<String>,

    /// 写回所需的最低置信度
    #[arg(long)]
    threshold: Option<f64>,

    /// 每批候选数
    #[arg(long)]
    batch_size: Option<usize>,

    /// 从断点继续
    #[arg(long)]
    resume: bool,

    /// 配置文件（TOML）
    #[arg(long)]
    config: Option<PathBuf>,

    /// 批内执行方式
    #[arg(long, value_enum)]
    staging: Option<StagingStrategy>,

    /// 停止信号检查粒度
    #[arg(long, value_enum)]
    cancel_granularity: Option<CancelGranularity>,

    /// 只分类，不写回
    #[arg(long)]
    no_update: bool,

    /// 日志级别（RUST_LOG 优先）
    #[arg(long, default_value = "info")]
    log_level: String,
}

impl Cli {
    /// 命令行参数覆盖配置文件与环境变量
    fn apply(&self, config: &mut Config) {
        if let Some(db) = &self.db {
            config.database.name = db.clone();
        }
        if let Some(threshold) = self.threshold {
            config.classification.confidence_threshold = threshold;
        }
        if let Some(batch_size) = self.batch_size {
            config.classification.batch_size = batch_size;
        }
        if let Some(staging) = self.staging {
            config.classification.staging = staging;
        }
        if let Some(granularity) = self.cancel_granularity {
            config.classification.cancel_granularity = granularity;
        }
        if self.no_update {
            config.classification.update_database = false;
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // 初始化日志
    logging::init(&cli.log_level);

    // 加载配置（失败时按默认路径写 error 快照）
    let mut config = match Config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let err = App::report_setup_failure(&PathsConfig::default(), SetupError::from(e));
            return Err(err).context("配置加载失败");
        }
    };
    cli.apply(&mut config);

    let options = RunOptions {
        candidate_file: cli.candidate_file.clone(),
        resume: cli.resume,
    };

    // 初始化并运行应用（失败时 error 快照已写出）
    let mut app = App::new(config);
    let Ok(report) = app.run(&options).await else {
        return Ok(ExitCode::FAILURE);
    };

    logging::print_final_stats(
        report.status_label(),
        report.processed,
        report.results.len(),
        report.updated_count,
        report.total_candidates,
    );

    Ok(match report.status {
        RunStatus::Error => ExitCode::FAILURE,
        _ => ExitCode::SUCCESS,
    })
}
