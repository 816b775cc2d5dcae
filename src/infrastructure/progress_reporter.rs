//! 进度上报
//!
//! 在固定位置维护一份进度快照，每次原子覆盖。可选限流：距上次写入不足
//! `min_interval` 的更新被丢弃，但 0%、100% 以及非 running 状态的快照总是写入，
//! 终态不会丢失。

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::error::ObservabilityError;
use crate::infrastructure::atomic_file::write_json_atomic;
use crate::models::{ProgressSnapshot, RunStatus};

/// 一次上报的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Published {
    Written,
    Suppressed,
}

/// 进度快照写入器
#[derive(Debug)]
pub struct ProgressReporter {
    path: PathBuf,
    min_interval: Duration,
    last_write: Option<Instant>,
}

impl ProgressReporter {
    /// `min_interval` 为零时不限流
    pub fn new(path: impl Into<PathBuf>, min_interval: Duration) -> Self {
        Self {
            path: path.into(),
            min_interval,
            last_write: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 上报一份快照
    pub fn publish(
        &mut self,
        snapshot: &ProgressSnapshot,
    ) -> Result<Published, ObservabilityError> {
        self.publish_at(snapshot, Instant::now())
    }

    /// 以给定时刻上报，限流判断基于该时刻
    pub fn publish_at(
        &mut self,
        snapshot: &ProgressSnapshot,
        now: Instant,
    ) -> Result<Published, ObservabilityError> {
        if !self.should_write(snapshot, now) {
            return Ok(Published::Suppressed);
        }

        write_json_atomic(&self.path, snapshot, false)?;
        self.last_write = Some(now);
        Ok(Published::Written)
    }

    fn should_write(&self, snapshot: &ProgressSnapshot, now: Instant) -> bool {
        if snapshot.percent == 0
            || snapshot.percent >= 100
            || snapshot.status != RunStatus::Running
            || self.min_interval.is_zero()
        {
            return true;
        }
        match self.last_write {
            Some(last) => now.saturating_duration_since(last) >= self.min_interval,
            None => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reporter(dir: &tempfile::TempDir, interval_ms: u64) -> ProgressReporter {
        ProgressReporter::new(dir.path().join("progress.json"), Duration::from_millis(interval_ms))
    }

    fn read(reporter: &ProgressReporter) -> ProgressSnapshot {
        serde_json::from_str(&std::fs::read_to_string(reporter.path()).unwrap()).unwrap()
    }

    #[test]
    fn test_updates_every_10ms_persist_at_most_once_per_window() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = reporter(&dir, 100);
        let start = Instant::now();

        let mut written_at = Vec::new();
        for i in 0..50u64 {
            let now = start + Duration::from_millis(i * 10);
            let percent = (1 + i) as u8;
            let outcome = reporter
                .publish_at(&ProgressSnapshot::running(percent, format!("step {}", i)), now)
                .unwrap();
            if outcome == Published::Written {
                written_at.push(i * 10);
            }
        }

        assert_eq!(written_at, vec![0, 100, 200, 300, 400]);
        for pair in written_at.windows(2) {
            assert!(pair[1] - pair[0] >= 100);
        }

        // 终态紧跟在上一次写入之后也必须落盘
        let terminal = ProgressSnapshot::new(100, "Done", RunStatus::Completed);
        let outcome = reporter
            .publish_at(&terminal, start + Duration::from_millis(405))
            .unwrap();
        assert_eq!(outcome, Published::Written);
        assert_eq!(read(&reporter).status, RunStatus::Completed);
    }

    #[test]
    fn test_zero_percent_always_passes() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = reporter(&dir, 100);
        let now = Instant::now();

        reporter.publish_at(&ProgressSnapshot::running(50, "a"), now).unwrap();
        let outcome = reporter
            .publish_at(&ProgressSnapshot::new(0, "error", RunStatus::Error), now)
            .unwrap();
        assert_eq!(outcome, Published::Written);
        assert_eq!(read(&reporter).status, RunStatus::Error);
    }

    #[test]
    fn test_paused_snapshot_is_never_suppressed() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = reporter(&dir, 100);
        let now = Instant::now();

        reporter.publish_at(&ProgressSnapshot::running(33, "a"), now).unwrap();
        let outcome = reporter
            .publish_at(&ProgressSnapshot::new(33, "Paused", RunStatus::Paused), now)
            .unwrap();
        assert_eq!(outcome, Published::Written);
    }

    #[test]
    fn test_zero_interval_disables_rate_limit() {
        let dir = tempfile::tempdir().unwrap();
        let mut reporter = reporter(&dir, 0);
        let now = Instant::now();

        for percent in 1..10 {
            let outcome = reporter
                .publish_at(&ProgressSnapshot::running(percent, ""), now)
                .unwrap();
            assert_eq!(outcome, Published::Written);
        }
        assert_eq!(read(&reporter).percent, 9);
    }

    #[test]
    fn test_io_failure_is_returned() {
        let mut reporter =
            ProgressReporter::new("/nonexistent/dir/progress.json", Duration::from_millis(100));
        assert!(reporter.publish(&ProgressSnapshot::running(0, "")).is_err());
    }
}
