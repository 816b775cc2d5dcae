use serde::{Deserialize, Serialize};

/// 待分类的候选天体，加载后不再修改
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub source_id: u64,
    #[serde(default)]
    pub healpix_id: u64,
    #[serde(default)]
    pub ra: Option<f64>,
    #[serde(default)]
    pub dec: Option<f64>,
    #[serde(default)]
    pub reason: Option<String>,
}

impl Candidate {
    /// 只有 source_id 的候选，其余字段取默认值
    pub fn new(source_id: u64) -> Self {
        Self {
            source_id,
            healpix_id: 0,
            ra: None,
            dec: None,
            reason: None,
        }
    }

    pub fn with_healpix(mut self, healpix_id: u64) -> Self {
        self.healpix_id = healpix_id;
        self
    }
}

/// 按固定大小切分批次，保持输入顺序
///
/// 相同输入与相同批大小必然得到相同的切分，断点续跑依赖这一点
pub fn partition(candidates: &[Candidate], batch_size: usize) -> Vec<&[Candidate]> {
    candidates.chunks(batch_size.max(1)).collect()
}
