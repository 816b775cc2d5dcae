//! 基础设施层（Infrastructure）
//!
//! 持有文件与连接等资源，只暴露能力，不认识批次与流程

pub mod atomic_file;
pub mod cancellation;
pub mod checkpoint_store;
pub mod progress_reporter;
pub mod tdengine;

pub use cancellation::{CancelFlag, CancellationSignal, StopFile};
pub use checkpoint_store::CheckpointStore;
pub use progress_reporter::{Published, ProgressReporter};
pub use tdengine::TdengineClient;
