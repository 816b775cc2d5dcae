//! # Auto Classify
//!
//! 对一批光变候选进行可续跑的批量分类
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有文件与连接，只暴露能力
//! - `TdengineClient` - 时序库 REST 连接
//! - `ProgressReporter` / `CheckpointStore` - 原子写入的进度快照与断点
//! - `StopFile` / `CancelFlag` - 协作式停止信号
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，只处理单个候选
//! - `TdengineGateway` - 读取光变、写回分类标签
//! - `ModelServiceClient` - 特征提取与分类推理
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一个候选"的完整处理流程
//! - `CandidateCtx` - 上下文封装（批次 + 位置 + source_id）
//! - `CandidateFlow` - 流程编排（fetch → extract → classify → write-back）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/app` - 启动阶段与资源管理
//! - `orchestrator/batch_processor` - 分批、断点、停止与进度
//!
//! ## 模块结构

pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use config::Config;
pub use error::{AppError, AppResult};
pub use models::{Candidate, CandidateSource, ClassificationResult, ProgressSnapshot, RunStatus};
pub use orchestrator::{App, Orchestrator, RunOptions, RunReport};
pub use workflow::{CandidateCtx, CandidateFlow, ProcessResult};
