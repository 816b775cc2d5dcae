//! 候选处理上下文
//!
//! 封装"我正在处理第几批的第几个候选"这一信息

use std::fmt::Display;

/// 候选处理上下文
#[derive(Debug, Clone, Copy)]
pub struct CandidateCtx {
    /// 批次编号（从1开始，仅用于日志）
    pub batch_number: usize,

    /// 候选在批内的位置（从1开始）
    pub position: usize,

    pub source_id: u64,
}

impl CandidateCtx {
    pub fn new(batch_number: usize, position: usize, source_id: u64) -> Self {
        Self {
            batch_number,
            position,
            source_id,
        }
    }
}

impl Display for CandidateCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "[批次 {} 候选#{} source_id#{}]",
            self.batch_number, self.position, self.source_id
        )
    }
}
