use serde::{Deserialize, Serialize};

/// 运行状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Paused,
    Completed,
    Error,
    Stopped,
}

/// 分阶段处理时的当前阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Fetch,
    Extract,
    Classify,
}

/// 批次进度，平铺进进度快照
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchInfo {
    pub current_batch: usize,
    pub total_batches: usize,
    pub batch_progress: u8,
    pub processed: usize,
    pub batch_total: usize,
    pub updated: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stage: Option<Stage>,
}

/// 进度快照，每次整体覆盖写入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressSnapshot {
    pub percent: u8,
    pub message: String,
    pub status: RunStatus,
    pub timestamp: i64,
    #[serde(flatten)]
    pub batch_info: Option<BatchInfo>,
}

impl ProgressSnapshot {
    /// 百分比会被截断到 100
    pub fn new(percent: u8, message: impl Into<String>, status: RunStatus) -> Self {
        Self {
            percent: percent.min(100),
            message: message.into(),
            status,
            timestamp: chrono::Utc::now().timestamp(),
            batch_info: None,
        }
    }

    pub fn running(percent: u8, message: impl Into<String>) -> Self {
        Self::new(percent, message, RunStatus::Running)
    }

    pub fn with_batch_info(mut self, batch_info: BatchInfo) -> Self {
        self.batch_info = Some(batch_info);
        self
    }
}
