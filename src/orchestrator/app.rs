//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 持有配置与各类文件资源，完成启动阶段（读取输入、连接模型服务与时序库），
//! 然后把批处理交给 `Orchestrator`。
//!
//! 启动阶段的任何失败都会写一份 `error` 进度快照并返回 `SetupError`，
//! 此时尚未处理任何批次。配置本身加载失败时 `App` 还不存在，
//! 由 `report_setup_failure` 按默认路径写出同样的快照。

use std::path::PathBuf;

use tracing::{error, info};

use crate::config::{Config, PathsConfig};
use crate::error::{AppError, AppResult, SetupError};
use crate::infrastructure::{
    CancellationSignal, CheckpointStore, ProgressReporter, StopFile, TdengineClient,
};
use crate::models::{CandidateSource, ClassVocabulary, ProgressSnapshot, RunStatus};
use crate::orchestrator::batch_processor::{Orchestrator, RunReport};
use crate::services::{ModelServiceClient, TdengineGateway};
use crate::utils::logging::log_startup;
use crate::workflow::CandidateFlow;

/// 单次运行的参数
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub candidate_file: PathBuf,
    /// 是否尝试从断点继续
    pub resume: bool,
}

/// 应用主结构
pub struct App {
    config: Config,
    progress: ProgressReporter,
    stop: StopFile,
    checkpoints: CheckpointStore,
}

impl App {
    pub fn new(config: Config) -> Self {
        let paths = &config.paths;
        let progress =
            ProgressReporter::new(&paths.progress_file, paths.progress_min_interval());
        let stop = StopFile::new(&paths.stop_file).clear_on_observe(paths.clear_stop_on_observe);
        let checkpoints = CheckpointStore::new(&paths.state_file);
        Self {
            config,
            progress,
            stop,
            checkpoints,
        }
    }

    /// 运行应用主逻辑
    ///
    /// 出错时先写 `error` 快照再返回错误
    pub async fn run(&mut self, options: &RunOptions) -> AppResult<RunReport> {
        match self.run_inner(options).await {
            Ok(report) => Ok(report),
            Err(e) => {
                error!("❌ 运行失败: {}", e);
                self.emit(error_snapshot(&e));
                Err(e)
            }
        }
    }

    /// 尚未构造 `App` 时的启动失败（例如配置文件无法解析）
    ///
    /// 与 `run` 的失败路径一致：清除残留的停止文件，写 `error` 快照
    pub fn report_setup_failure(paths: &PathsConfig, err: SetupError) -> AppError {
        let err = AppError::from(err);
        error!("❌ 启动失败: {}", err);

        if paths.clear_stop_on_start {
            StopFile::new(&paths.stop_file).clear();
        }
        let mut progress =
            ProgressReporter::new(&paths.progress_file, paths.progress_min_interval());
        if let Err(e) = progress.publish(&error_snapshot(&err)) {
            tracing::debug!("进度写入失败（已忽略）: {}", e);
        }
        err
    }

    async fn run_inner(&mut self, options: &RunOptions) -> AppResult<RunReport> {
        log_startup(&self.config);
        self.emit(ProgressSnapshot::running(0, "Initializing..."));

        if self.config.paths.clear_stop_on_start {
            self.stop.clear();
        }
        self.config.validate().map_err(SetupError::from)?;

        self.emit(ProgressSnapshot::running(1, "Reading candidate list..."));
        let source = CandidateSource::open(&options.candidate_file).await?;

        self.emit(ProgressSnapshot::running(2, "Loading model..."));
        let vocabulary = ClassVocabulary::load(self.config.model.metadata_path.as_deref())?;
        let model = ModelServiceClient::connect(&self.config.model)
            .await
            .map_err(|source| SetupError::ModelUnavailable {
                endpoint: self.config.model.endpoint.clone(),
                source,
            })?;
        info!("✓ 模型服务已连接: {} ({} 个类别)", model.endpoint(), vocabulary.len());

        if source.candidates().is_empty() {
            info!("⚠️ 候选文件为空，程序结束");
            self.emit(ProgressSnapshot::new(
                100,
                "No candidates to process",
                RunStatus::Completed,
            ));
            return Ok(RunReport::empty());
        }

        self.emit(ProgressSnapshot::running(5, "Connecting to database..."));
        let db = &self.config.database;
        let client = TdengineClient::connect(db)
            .await
            .map_err(|source| SetupError::StoreConnect {
                host: db.host.clone(),
                port: db.port,
                source,
            })?;
        info!("✓ 时序库已连接: {}:{}", db.host, db.port);
        let gateway = TdengineGateway::new(client, db);

        let classification = &self.config.classification;
        let flow = CandidateFlow::new(&gateway, &model, &model, &vocabulary, classification);
        let mut orchestrator = Orchestrator::new(
            classification,
            flow,
            &self.stop,
            &mut self.progress,
            &self.checkpoints,
        )
        .with_result_path(self.config.paths.result_file.clone());

        orchestrator.run(&source, options.resume).await
    }

    fn emit(&mut self, snapshot: ProgressSnapshot) {
        if let Err(e) = self.progress.publish(&snapshot) {
            tracing::debug!("进度写入失败（已忽略）: {}", e);
        }
    }
}

fn error_snapshot(err: &AppError) -> ProgressSnapshot {
    ProgressSnapshot::new(0, format!("Error: {}", err), RunStatus::Error)
}
