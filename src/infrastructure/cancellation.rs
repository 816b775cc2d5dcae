//! 停止信号
//!
//! 协作式取消：编排层在固定的检查点轮询 `is_cancelled`。停止文件只是其中一种实现，
//! 进程内调用方（以及测试）使用 `CancelFlag`。

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

/// 可轮询的停止信号
pub trait CancellationSignal {
    /// 是否已请求停止
    fn is_cancelled(&self) -> bool;

    /// 清除停止请求
    fn clear(&self);
}

/// 停止文件：文件存在即表示请求停止
#[derive(Debug, Clone)]
pub struct StopFile {
    path: PathBuf,
    clear_on_observe: bool,
}

impl StopFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            clear_on_observe: false,
        }
    }

    /// 观察到停止文件后立即删除，使下一次运行不受影响
    pub fn clear_on_observe(mut self, enabled: bool) -> Self {
        self.clear_on_observe = enabled;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CancellationSignal for StopFile {
    fn is_cancelled(&self) -> bool {
        if !self.path.exists() {
            return false;
        }
        debug!("检测到停止文件: {}", self.path.display());
        if self.clear_on_observe {
            self.clear();
        }
        true
    }

    fn clear(&self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("删除停止文件失败 ({}): {}", self.path.display(), e),
        }
    }
}

/// 进程内停止标志，可在任务之间克隆共享
#[derive(Debug, Clone, Default)]
pub struct CancelFlag {
    inner: Arc<AtomicBool>,
}

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    /// 请求停止
    pub fn cancel(&self) {
        self.inner.store(true, Ordering::SeqCst);
    }
}

impl CancellationSignal for CancelFlag {
    fn is_cancelled(&self) -> bool {
        self.inner.load(Ordering::SeqCst)
    }

    fn clear(&self) {
        self.inner.store(false, Ordering::SeqCst);
    }
}
