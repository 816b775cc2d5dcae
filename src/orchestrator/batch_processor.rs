//! 批量分类编排器 - 编排层
//!
//! ## 职责
//!
//! 把一份候选列表切成固定大小的批次，逐批交给 `CandidateFlow` 处理，
//! 并负责断点、进度、停止信号与结果文件。
//!
//! ## 核心功能
//!
//! 1. **断点续跑**：每批完成后写断点；续跑时只接受同一输入、同一批大小的断点
//! 2. **协作式停止**：批次边界总是检查停止信号，细粒度模式下每个候选之前也检查
//! 3. **两种批内执行方式**：逐个候选（interleaved）或分三阶段（staged）
//! 4. **进度上报**：每个候选处理完都上报一次，带批次细节
//! 5. **收尾**：完成时写结果、清断点、重置输入；暂停时写部分结果
//!
//! ## 状态机
//!
//! ```text
//! Init → Loading → [Resuming] → Processing(i) → Checkpointed(i) → … → Completed
//!                                     │
//!                                     └─ 停止信号 → Paused / Stopped
//! ```
//!
//! 批内被打断时，本批的部分结果直接丢弃，断点下标保持不变，续跑时整批重做。

use std::path::PathBuf;

use tracing::{debug, info, warn};

use crate::config::{CancelGranularity, ClassificationConfig, StagingStrategy};
use crate::error::AppResult;
use crate::infrastructure::atomic_file::write_json_atomic;
use crate::infrastructure::{CancellationSignal, CheckpointStore, ProgressReporter};
use crate::models::{
    partition, BatchInfo, Candidate, CandidateSource, ClassificationResult, FeatureVector,
    LightCurve, PipelineState, ProgressSnapshot, ResultArtifact, RunCounts, RunStatus, Stage,
};
use crate::services::{Classifier, FeatureExtractor, LightCurveGateway};
use crate::utils::logging::{log_batch_complete, log_batch_start, log_candidates_loaded};
use crate::workflow::{CandidateCtx, CandidateFlow, ProcessResult};

/// 编排器所处的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Loading,
    Resuming,
    /// 正在处理第 i 批（从0开始）
    Processing(usize),
    /// 第 i 批已写入断点
    Checkpointed(usize),
    Completed,
    Paused,
    /// 被停止且未启用断点
    Stopped,
}

/// 一次运行的结果汇总
#[derive(Debug, Clone)]
pub struct RunReport {
    /// `Completed`、`Paused` 或 `Stopped`
    pub status: RunStatus,
    pub results: Vec<ClassificationResult>,
    /// 已完成的批次数（下一次续跑的起点）
    pub completed_batch_index: usize,
    pub total_batches: usize,
    pub total_candidates: usize,
    /// 已完成批次中的候选数
    pub processed: usize,
    pub updated_count: usize,
}

impl RunReport {
    /// 没有任何候选时的报告
    pub fn empty() -> Self {
        Self {
            status: RunStatus::Completed,
            results: Vec::new(),
            completed_batch_index: 0,
            total_batches: 0,
            total_candidates: 0,
            processed: 0,
            updated_count: 0,
        }
    }

    pub fn status_label(&self) -> &'static str {
        match self.status {
            RunStatus::Running => "running",
            RunStatus::Paused => "paused",
            RunStatus::Completed => "completed",
            RunStatus::Error => "error",
            RunStatus::Stopped => "stopped",
        }
    }
}

/// 单批处理结果
#[derive(Debug, Default)]
struct BatchOutcome {
    results: Vec<ClassificationResult>,
    updated: usize,
    lightcurves_fetched: usize,
    features_extracted: usize,
    /// 被停止信号打断，结果不完整
    interrupted: bool,
}

/// 当前批次在整个运行中的位置
#[derive(Debug, Clone, Copy)]
struct BatchPosition {
    index: usize,
    total_batches: usize,
    len: usize,
    /// 本批之前累计的写回数
    updated_before: usize,
}

impl BatchPosition {
    fn number(&self) -> usize {
        self.index + 1
    }
}

/// 批量分类编排器
///
/// - 只做调度、断点和上报，单个候选的业务判断全部委托给 `CandidateFlow`
/// - 进度与断点写入失败只记录日志，不影响分类本身
pub struct Orchestrator<'a, G, X, C, K> {
    config: &'a ClassificationConfig,
    flow: CandidateFlow<'a, G, X, C>,
    cancel: &'a K,
    progress: &'a mut ProgressReporter,
    checkpoints: &'a CheckpointStore,
    result_path: Option<PathBuf>,
    state: RunState,
}

impl<'a, G, X, C, K> Orchestrator<'a, G, X, C, K>
where
    G: LightCurveGateway,
    X: FeatureExtractor,
    C: Classifier,
    K: CancellationSignal,
{
    pub fn new(
        config: &'a ClassificationConfig,
        flow: CandidateFlow<'a, G, X, C>,
        cancel: &'a K,
        progress: &'a mut ProgressReporter,
        checkpoints: &'a CheckpointStore,
    ) -> Self {
        Self {
            config,
            flow,
            cancel,
            progress,
            checkpoints,
            result_path: None,
            state: RunState::Init,
        }
    }

    /// 指定结果文件路径；`None` 时写到候选文件旁
    pub fn with_result_path(mut self, path: Option<PathBuf>) -> Self {
        self.result_path = path;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// 运行整个批处理
    ///
    /// 只有结果文件写入失败会返回错误；其余失败都在本地降级
    pub async fn run(&mut self, source: &CandidateSource, resume: bool) -> AppResult<RunReport> {
        self.transition(RunState::Loading);

        let candidates = source.candidates();
        let total = candidates.len();
        if total == 0 {
            info!("⚠️ 没有待处理的候选");
            self.emit(&ProgressSnapshot::new(
                100,
                "No candidates to process",
                RunStatus::Completed,
            ));
            self.transition(RunState::Completed);
            return Ok(RunReport::empty());
        }

        let batch_size = self.config.batch_size.max(1);
        let batches = partition(candidates, batch_size);
        let total_batches = batches.len();
        log_candidates_loaded(total, total_batches, batch_size);

        let mut state = self.initial_state(source.identity(), batch_size, total_batches, resume);
        let mut interrupted = false;

        for (batch_idx, batch) in batches
            .iter()
            .enumerate()
            .skip(state.completed_batch_index)
        {
            if self.cancel.is_cancelled() {
                info!("⏸️ 收到停止信号，在第 {} 批之前停止", batch_idx + 1);
                interrupted = true;
                break;
            }

            self.transition(RunState::Processing(batch_idx));
            let start = batch_idx * batch_size;
            log_batch_start(
                batch_idx + 1,
                total_batches,
                start + 1,
                start + batch.len(),
                total,
            );

            let position = BatchPosition {
                index: batch_idx,
                total_batches,
                len: batch.len(),
                updated_before: state.total_updated,
            };
            let outcome = match self.config.staging {
                StagingStrategy::Interleaved => self.process_interleaved(batch, position).await,
                StagingStrategy::Staged => self.process_staged(batch, position).await,
            };

            if outcome.interrupted {
                info!(
                    "⏸️ 第 {} 批处理中收到停止信号，丢弃本批 {} 个部分结果",
                    batch_idx + 1,
                    outcome.results.len()
                );
                self.save_checkpoint(&state);
                interrupted = true;
                break;
            }

            let classified = outcome.results.len();
            state.results.extend(outcome.results);
            state.total_updated += outcome.updated;
            state.lightcurves_fetched += outcome.lightcurves_fetched;
            state.features_extracted += outcome.features_extracted;
            state.completed_batch_index = batch_idx + 1;
            self.save_checkpoint(&state);
            self.transition(RunState::Checkpointed(batch_idx));
            log_batch_complete(batch_idx + 1, classified, outcome.updated, batch.len());
        }

        if interrupted {
            self.finish_interrupted(source, state, total, total_batches)
        } else {
            self.finish_completed(source, state, total, total_batches).await
        }
    }

    /// 决定从哪个批次开始
    fn initial_state(
        &mut self,
        identity: &str,
        batch_size: usize,
        total_batches: usize,
        resume: bool,
    ) -> PipelineState {
        let fresh = PipelineState::fresh(identity, batch_size);
        if !resume {
            return fresh;
        }

        self.transition(RunState::Resuming);
        match self.checkpoints.load(identity, batch_size) {
            Some(saved) if saved.completed_batch_index <= total_batches => {
                info!(
                    "🔄 从第 {} 批继续 (已有 {} 个结果，已写回 {} 个)",
                    saved.completed_batch_index + 1,
                    saved.results.len(),
                    saved.total_updated
                );
                saved
            }
            Some(saved) => {
                warn!(
                    "⚠️ 断点批次 {} 超出总批次 {}，从头开始",
                    saved.completed_batch_index, total_batches
                );
                fresh
            }
            None => {
                info!("未找到可用断点，从头开始");
                fresh
            }
        }
    }

    /// 逐个候选：获取 → 提取 → 分类
    async fn process_interleaved(
        &mut self,
        batch: &[Candidate],
        position: BatchPosition,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();

        for (i, candidate) in batch.iter().enumerate() {
            if self.fine_cancelled() {
                outcome.interrupted = true;
                return outcome;
            }

            let ctx = CandidateCtx::new(position.number(), i + 1, candidate.source_id);
            let processed = self.flow.run(candidate, &ctx).await;
            outcome.lightcurves_fetched += usize::from(processed.fetched());
            outcome.features_extracted += usize::from(processed.extracted());
            if let ProcessResult::Classified(result) = processed {
                if result.updated {
                    outcome.updated += 1;
                }
                outcome.results.push(result);
            }

            let fraction = (i + 1) as f64 / position.len as f64;
            let message = format!(
                "Batch {}/{}: Processing {}/{}",
                position.number(),
                position.total_batches,
                i + 1,
                position.len
            );
            self.emit_batch_progress(
                position,
                i + 1,
                outcome.updated,
                fraction,
                None,
                message,
            );
        }

        outcome
    }

    /// 分阶段：整批获取，再整批提取，再整批分类
    ///
    /// 每个候选的结果与逐个处理完全一致，只是调用顺序不同
    async fn process_staged(
        &mut self,
        batch: &[Candidate],
        position: BatchPosition,
    ) -> BatchOutcome {
        let mut outcome = BatchOutcome::default();
        let n = position.len;

        let mut curves: Vec<Option<LightCurve>> = Vec::with_capacity(n);
        for (i, candidate) in batch.iter().enumerate() {
            if self.fine_cancelled() {
                outcome.interrupted = true;
                return outcome;
            }
            let ctx = CandidateCtx::new(position.number(), i + 1, candidate.source_id);
            curves.push(self.flow.fetch(candidate, &ctx).await.ok());
            self.emit_stage_progress(position, Stage::Fetch, i, 0);
        }
        outcome.lightcurves_fetched = curves.iter().flatten().count();

        let mut features: Vec<Option<FeatureVector>> = Vec::with_capacity(n);
        for (i, (candidate, curve)) in batch.iter().zip(&curves).enumerate() {
            if self.fine_cancelled() {
                outcome.interrupted = true;
                return outcome;
            }
            let ctx = CandidateCtx::new(position.number(), i + 1, candidate.source_id);
            let extracted = match curve {
                Some(lc) => self.flow.extract(lc, &ctx).await.ok(),
                None => None,
            };
            features.push(extracted);
            self.emit_stage_progress(position, Stage::Extract, i, 0);
        }
        outcome.features_extracted = features.iter().flatten().count();

        for (i, (candidate, (curve, fv))) in batch
            .iter()
            .zip(curves.iter().zip(&features))
            .enumerate()
        {
            if self.fine_cancelled() {
                outcome.interrupted = true;
                return outcome;
            }
            if let (Some(lc), Some(fv)) = (curve, fv) {
                let ctx = CandidateCtx::new(position.number(), i + 1, candidate.source_id);
                if let ProcessResult::Classified(result) =
                    self.flow.classify(candidate, lc.len(), fv, &ctx).await
                {
                    if result.updated {
                        outcome.updated += 1;
                    }
                    outcome.results.push(result);
                }
            }
            self.emit_stage_progress(position, Stage::Classify, i, outcome.updated);
        }

        outcome
    }

    /// 完成：写结果、清断点、重置输入
    async fn finish_completed(
        &mut self,
        source: &CandidateSource,
        state: PipelineState,
        total: usize,
        total_batches: usize,
    ) -> AppResult<RunReport> {
        let counts = run_counts(&state, total);
        let artifact = ResultArtifact::new(
            state.results,
            counts,
            self.config.confidence_threshold,
            true,
        );
        let result_path = self.result_path(source);
        write_json_atomic(&result_path, &artifact, true)?;
        info!("💾 结果已保存至: {}", result_path.display());

        if self.config.checkpoint_enabled {
            if let Err(e) = self.checkpoints.clear() {
                warn!("⚠️ 清除断点失败: {}", e);
            }
        }
        match source.reset().await {
            Ok(()) => info!("🧹 候选文件已重置: {}", source.path().display()),
            Err(e) => warn!("⚠️ 重置候选文件失败: {}", e),
        }

        let message = format!(
            "Done: {} classified, {} updated",
            artifact.count, artifact.updated_count
        );
        self.emit(&ProgressSnapshot::new(100, message, RunStatus::Completed));
        self.transition(RunState::Completed);

        Ok(RunReport {
            status: RunStatus::Completed,
            completed_batch_index: total_batches,
            total_batches,
            total_candidates: total,
            processed: total,
            updated_count: artifact.updated_count,
            results: artifact.results,
        })
    }

    /// 暂停：写部分结果，断点保持在最后一个完成的批次
    fn finish_interrupted(
        &mut self,
        source: &CandidateSource,
        state: PipelineState,
        total: usize,
        total_batches: usize,
    ) -> AppResult<RunReport> {
        let completed = state.completed_batch_index;
        let counts = run_counts(&state, total);
        let artifact = ResultArtifact::new(
            state.results,
            counts,
            self.config.confidence_threshold,
            false,
        );
        let result_path = self.result_path(source);
        write_json_atomic(&result_path, &artifact, true)?;
        info!("💾 部分结果已保存至: {}", result_path.display());

        let percent = (completed * 100 / total_batches) as u8;
        let (status, run_state, message) = if self.config.checkpoint_enabled {
            (
                RunStatus::Paused,
                RunState::Paused,
                format!("Paused: Completed {}/{} batches", completed, total_batches),
            )
        } else {
            (
                RunStatus::Stopped,
                RunState::Stopped,
                format!(
                    "Stopped: Completed {}/{} batches (checkpoint disabled)",
                    completed, total_batches
                ),
            )
        };
        self.emit(&ProgressSnapshot::new(percent, message, status));
        self.transition(run_state);

        let batch_size = self.config.batch_size.max(1);
        Ok(RunReport {
            status,
            completed_batch_index: completed,
            total_batches,
            total_candidates: total,
            processed: (completed * batch_size).min(total),
            updated_count: artifact.updated_count,
            results: artifact.results,
        })
    }

    fn result_path(&self, source: &CandidateSource) -> PathBuf {
        self.result_path
            .clone()
            .unwrap_or_else(|| source.result_path())
    }

    fn fine_cancelled(&self) -> bool {
        self.config.cancel_granularity == CancelGranularity::Fine && self.cancel.is_cancelled()
    }

    fn save_checkpoint(&self, state: &PipelineState) {
        if !self.config.checkpoint_enabled {
            return;
        }
        if let Err(e) = self.checkpoints.save(state) {
            warn!("⚠️ 断点写入失败（继续运行）: {}", e);
        }
    }

    fn emit_stage_progress(
        &mut self,
        position: BatchPosition,
        stage: Stage,
        i: usize,
        updated_in_batch: usize,
    ) {
        let stage_index = match stage {
            Stage::Fetch => 0.0,
            Stage::Extract => 1.0,
            Stage::Classify => 2.0,
        };
        let fraction = (stage_index + (i + 1) as f64 / position.len as f64) / 3.0;
        let verb = match stage {
            Stage::Fetch => "Fetching lightcurves",
            Stage::Extract => "Extracting features",
            Stage::Classify => "Classifying",
        };
        let message = format!(
            "Batch {}/{}: {} {}/{}",
            position.number(),
            position.total_batches,
            verb,
            i + 1,
            position.len
        );
        self.emit_batch_progress(
            position,
            i + 1,
            updated_in_batch,
            fraction,
            Some(stage),
            message,
        );
    }

    fn emit_batch_progress(
        &mut self,
        position: BatchPosition,
        processed: usize,
        updated_in_batch: usize,
        fraction: f64,
        stage: Option<Stage>,
        message: String,
    ) {
        let overall = (position.index as f64 + fraction) / position.total_batches as f64 * 100.0;
        let snapshot = ProgressSnapshot::running(overall as u8, message).with_batch_info(BatchInfo {
            current_batch: position.number(),
            total_batches: position.total_batches,
            batch_progress: (fraction * 100.0) as u8,
            processed,
            batch_total: position.len,
            updated: position.updated_before + updated_in_batch,
            stage,
        });
        self.emit(&snapshot);
    }

    fn emit(&mut self, snapshot: &ProgressSnapshot) {
        if let Err(e) = self.progress.publish(snapshot) {
            debug!("进度写入失败（已忽略）: {}", e);
        }
    }

    fn transition(&mut self, next: RunState) {
        debug!("状态: {:?} → {:?}", self.state, next);
        self.state = next;
    }
}

fn run_counts(state: &PipelineState, total_candidates: usize) -> RunCounts {
    RunCounts {
        total_candidates,
        updated: state.total_updated,
        lightcurves_fetched: state.lightcurves_fetched,
        features_extracted: state.features_extracted,
    }
}
