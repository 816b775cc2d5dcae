//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量处理和流程调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `app` - 应用入口
//! - 持有配置、进度、断点与停止文件
//! - 启动阶段：读取候选、连接模型服务与时序库
//! - 启动失败时写 `error` 快照
//!
//! ### `batch_processor` - 批量分类编排器
//! - 切分批次、断点续跑
//! - 批内逐个或分阶段执行
//! - 轮询停止信号，写进度与结果文件
//!
//! ## 层次关系
//!
//! ```text
//! app (启动 + 资源)
//!     ↓
//! batch_processor::Orchestrator (处理 Vec<Candidate>)
//!     ↓
//! workflow::CandidateFlow (处理单个 Candidate)
//!     ↓
//! services (能力层：光变读取 / 特征提取 / 分类)
//!     ↓
//! infrastructure (基础设施：TDengine / 进度 / 断点 / 停止信号)
//! ```

pub mod app;
pub mod batch_processor;

// 重新导出主要类型
pub use app::{App, RunOptions};
pub use batch_processor::{Orchestrator, RunReport, RunState};
