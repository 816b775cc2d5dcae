//! 候选处理流程 - 流程层
//!
//! 核心职责：定义"一个候选"的完整处理流程
//!
//! 流程顺序：
//! 1. 读取光变曲线（缺失或有效点不足 → 静默跳过）
//! 2. 特征提取（失败 → 静默跳过）
//! 3. 分类，取稳定 arg-max
//! 4. 置信度达到阈值且允许写回 → 写入分类标签（失败只记录，结果保留）
//!
//! 三个阶段也单独暴露，供分阶段批处理使用

use tracing::{debug, info, warn};

use crate::config::ClassificationConfig;
use crate::models::{
    Candidate, ClassVocabulary, ClassificationResult, ConfidenceLevel, FeatureVector, LightCurve,
};
use crate::services::{stable_argmax, Classifier, FeatureExtractor, LightCurveGateway};
use crate::workflow::candidate_ctx::CandidateCtx;

const DEFAULT_REASON: &str = "unknown";

/// 候选处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessResult {
    /// 已分类（`updated` 表示是否已写回）
    Classified(ClassificationResult),
    /// 跳过，不产生结果
    Skipped(SkipReason),
}

impl ProcessResult {
    /// 是否取得了可用的光变曲线
    pub fn fetched(&self) -> bool {
        matches!(
            self,
            Self::Classified(_)
                | Self::Skipped(SkipReason::ExtractionFailed | SkipReason::ClassificationFailed)
        )
    }

    /// 是否完成了特征提取
    pub fn extracted(&self) -> bool {
        matches!(self, Self::Classified(_) | Self::Skipped(SkipReason::ClassificationFailed))
    }
}

/// 跳过原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// 没有光变曲线或有效点不足
    InsufficientSamples,
    /// 读取光变曲线失败
    FetchFailed,
    /// 特征提取失败
    ExtractionFailed,
    /// 分类器调用失败或输出为空
    ClassificationFailed,
}

/// 候选处理流程
///
/// - 编排单个候选的处理顺序
/// - 决定何时跳过、何时写回
/// - 不持有任何资源，只依赖业务能力（services）
pub struct CandidateFlow<'a, G, X, C> {
    gateway: &'a G,
    extractor: &'a X,
    classifier: &'a C,
    vocabulary: &'a ClassVocabulary,
    threshold: f64,
    write_back: bool,
}

impl<'a, G, X, C> CandidateFlow<'a, G, X, C>
where
    G: LightCurveGateway,
    X: FeatureExtractor,
    C: Classifier,
{
    pub fn new(
        gateway: &'a G,
        extractor: &'a X,
        classifier: &'a C,
        vocabulary: &'a ClassVocabulary,
        config: &ClassificationConfig,
    ) -> Self {
        Self {
            gateway,
            extractor,
            classifier,
            vocabulary,
            threshold: config.confidence_threshold,
            write_back: config.update_database,
        }
    }

    /// 逐步执行完整流程
    pub async fn run(&self, candidate: &Candidate, ctx: &CandidateCtx) -> ProcessResult {
        let light_curve = match self.fetch(candidate, ctx).await {
            Ok(lc) => lc,
            Err(reason) => return ProcessResult::Skipped(reason),
        };
        let features = match self.extract(&light_curve, ctx).await {
            Ok(fv) => fv,
            Err(reason) => return ProcessResult::Skipped(reason),
        };
        self.classify(candidate, light_curve.len(), &features, ctx).await
    }

    /// 阶段 1：读取光变曲线
    pub async fn fetch(
        &self,
        candidate: &Candidate,
        ctx: &CandidateCtx,
    ) -> Result<LightCurve, SkipReason> {
        let samples = match self.gateway.fetch(candidate).await {
            Ok(samples) => samples,
            Err(e) => {
                warn!("{} 读取光变曲线失败，跳过: {}", ctx, e);
                return Err(SkipReason::FetchFailed);
            }
        };

        LightCurve::from_samples(&samples).ok_or_else(|| {
            debug!("{} 有效采样点不足 ({} 行)，跳过", ctx, samples.len());
            SkipReason::InsufficientSamples
        })
    }

    /// 阶段 2：特征提取
    pub async fn extract(
        &self,
        light_curve: &LightCurve,
        ctx: &CandidateCtx,
    ) -> Result<FeatureVector, SkipReason> {
        match self.extractor.extract(light_curve).await {
            Ok(named) => Ok(FeatureVector::from_named(&named)),
            Err(e) => {
                debug!("{} 特征提取失败，跳过: {}", ctx, e);
                Err(SkipReason::ExtractionFailed)
            }
        }
    }

    /// 阶段 3：分类，并按阈值决定是否写回
    pub async fn classify(
        &self,
        candidate: &Candidate,
        data_point_count: usize,
        features: &FeatureVector,
        ctx: &CandidateCtx,
    ) -> ProcessResult {
        let probabilities = match self.classifier.predict_probabilities(features).await {
            Ok(p) => p,
            Err(e) => {
                warn!("{} 分类失败，跳过: {}", ctx, e);
                return ProcessResult::Skipped(SkipReason::ClassificationFailed);
            }
        };
        let Some((class_index, confidence)) = stable_argmax(&probabilities) else {
            warn!("{} 分类器输出无有效概率，跳过", ctx);
            return ProcessResult::Skipped(SkipReason::ClassificationFailed);
        };
        let predicted_class = self.vocabulary.name(class_index);

        let mut result = ClassificationResult {
            source_id: candidate.source_id,
            healpix_id: candidate.healpix_id,
            ra: candidate.ra,
            dec: candidate.dec,
            predicted_class,
            confidence: round4(confidence),
            data_point_count,
            updated: false,
            reason: candidate
                .reason
                .clone()
                .unwrap_or_else(|| DEFAULT_REASON.to_string()),
            status: ConfidenceLevel::of(confidence, self.threshold),
        };

        if result.status == ConfidenceLevel::HighConfidence && self.write_back {
            match self
                .gateway
                .set_class(candidate, &result.predicted_class)
                .await
            {
                Ok(()) => {
                    result.updated = true;
                    info!(
                        "{} ✓ 已写回分类 {} (置信度: {:.4})",
                        ctx, result.predicted_class, confidence
                    );
                }
                Err(e) => {
                    warn!("{} ⚠️ 写回分类失败: {}", ctx, e);
                }
            }
        }

        ProcessResult::Classified(result)
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_flags_follow_skip_reason() {
        let skipped = ProcessResult::Skipped;
        assert!(!skipped(SkipReason::FetchFailed).fetched());
        assert!(!skipped(SkipReason::InsufficientSamples).fetched());
        assert!(skipped(SkipReason::ExtractionFailed).fetched());
        assert!(!skipped(SkipReason::ExtractionFailed).extracted());
        assert!(skipped(SkipReason::ClassificationFailed).extracted());
    }

    #[test]
    fn test_round4() {
        assert_eq!(round4(0.973_149), 0.9731);
        assert_eq!(round4(1.0), 1.0);
    }
}
