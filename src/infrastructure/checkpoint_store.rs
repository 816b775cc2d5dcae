//! 断点存储
//!
//! 保存失败只返回错误，由调用方记录日志后继续；断点永远不会中止流水线

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::ObservabilityError;
use crate::infrastructure::atomic_file::write_json_atomic;
use crate::models::PipelineState;

/// 基于单个 JSON 文件的断点存储
#[derive(Debug, Clone)]
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 覆盖写入断点
    pub fn save(&self, state: &PipelineState) -> Result<(), ObservabilityError> {
        write_json_atomic(&self.path, state, false)?;
        debug!(
            "断点已保存: 已完成 {} 批, {} 条结果",
            state.completed_batch_index,
            state.results.len()
        );
        Ok(())
    }

    /// 读取属于给定输入的断点
    ///
    /// 文件不存在、无法解析、或属于其他输入/批大小时返回 `None`
    pub fn load(&self, input_identity: &str, batch_size: usize) -> Option<PipelineState> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!("读取断点失败 ({}): {}", self.path.display(), e);
                return None;
            }
        };

        let state: PipelineState = match serde_json::from_str(&content) {
            Ok(state) => state,
            Err(e) => {
                warn!("断点文件已损坏，忽略: {}", e);
                return None;
            }
        };

        if !state.matches(input_identity, batch_size) {
            debug!(
                "断点属于其他输入 ({} / 批大小 {})，忽略",
                state.input_identity, state.batch_size
            );
            return None;
        }

        Some(state)
    }

    /// 删除断点文件；文件不存在视为成功
    pub fn clear(&self) -> Result<(), ObservabilityError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ObservabilityError::io(&self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassificationResult, ConfidenceLevel};

    fn result(source_id: u64) -> ClassificationResult {
        ClassificationResult {
            source_id,
            healpix_id: 0,
            ra: None,
            dec: None,
            predicted_class: "EA".to_string(),
            confidence: 0.99,
            data_point_count: 20,
            updated: false,
            reason: "unknown".to_string(),
            status: ConfidenceLevel::HighConfidence,
        }
    }

    #[test]
    fn test_save_then_load_matching_identity() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("state.json"));

        let mut state = PipelineState::fresh("/data/candidates.csv", 2);
        state.completed_batch_index = 1;
        state.results = vec![result(1), result(2)];
        state.total_updated = 1;
        store.save(&state).unwrap();

        assert_eq!(store.load("/data/candidates.csv", 2), Some(state));
    }

    #[test]
    fn test_identity_or_batch_size_mismatch_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("state.json"));
        store.save(&PipelineState::fresh("/data/a.csv", 2)).unwrap();

        assert!(store.load("/data/b.csv", 2).is_none());
        assert!(store.load("/data/a.csv", 3).is_none());
    }

    #[test]
    fn test_clear_removes_file_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = CheckpointStore::new(dir.path().join("state.json"));
        store.save(&PipelineState::fresh("x", 1)).unwrap();

        store.clear().unwrap();
        assert!(!store.path().exists());
        store.clear().unwrap();
        assert!(store.load("x", 1).is_none());
    }

    #[test]
    fn test_corrupt_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        fs::write(&path, "{not json").unwrap();

        assert!(CheckpointStore::new(path).load("x", 1).is_none());
    }

    #[test]
    fn test_save_failure_is_returned_not_raised() {
        let store = CheckpointStore::new("/nonexistent/dir/state.json");
        assert!(store.save(&PipelineState::fresh("x", 1)).is_err());
    }
}
