use serde::{Deserialize, Serialize};

use super::result::ClassificationResult;

/// 断点状态
///
/// `results` 只包含 `[0, completed_batch_index)` 批次中未被跳过的候选
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineState {
    /// 输入标识（候选文件路径）
    pub input_identity: String,
    /// 写断点时使用的批大小；批大小不同则批次索引没有意义
    #[serde(default)]
    pub batch_size: usize,
    pub completed_batch_index: usize,
    #[serde(default)]
    pub results: Vec<ClassificationResult>,
    #[serde(default)]
    pub total_updated: usize,
    #[serde(default)]
    pub lightcurves_fetched: usize,
    #[serde(default)]
    pub features_extracted: usize,
}

impl PipelineState {
    /// 空状态：从第 0 批开始
    pub fn fresh(input_identity: impl Into<String>, batch_size: usize) -> Self {
        Self {
            input_identity: input_identity.into(),
            batch_size,
            completed_batch_index: 0,
            results: Vec::new(),
            total_updated: 0,
            lightcurves_fetched: 0,
            features_extracted: 0,
        }
    }

    /// 断点是否属于给定的输入与批大小
    pub fn matches(&self, input_identity: &str, batch_size: usize) -> bool {
        self.input_identity == input_identity && self.batch_size == batch_size
    }
}
