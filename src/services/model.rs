//! 模型能力边界：特征提取与分类
//!
//! 具体算法属于外部协作方，这里只定义契约与 arg-max 规则

use std::collections::HashMap;

use crate::error::ModelError;
use crate::models::{FeatureVector, LightCurve};

/// 特征提取
#[allow(async_fn_in_trait)]
pub trait FeatureExtractor {
    /// 返回"特征名 → 数值"；缺失的特征由调用方补 0.0
    async fn extract(&self, light_curve: &LightCurve) -> Result<HashMap<String, f64>, ModelError>;
}

/// 分类器
#[allow(async_fn_in_trait)]
pub trait Classifier {
    /// 返回按类别索引排列的概率向量
    async fn predict_probabilities(&self, features: &FeatureVector) -> Result<Vec<f64>, ModelError>;
}

/// 稳定的 arg-max：并列时取最小索引，NaN 不参与比较
pub fn stable_argmax(probabilities: &[f64]) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for (idx, &p) in probabilities.iter().enumerate() {
        if p.is_nan() {
            continue;
        }
        match best {
            Some((_, best_p)) if p <= best_p => {}
            _ => best = Some((idx, p)),
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_argmax_picks_highest() {
        assert_eq!(stable_argmax(&[0.1, 0.7, 0.2]), Some((1, 0.7)));
    }

    #[test]
    fn test_argmax_ties_resolve_to_lowest_index() {
        assert_eq!(stable_argmax(&[0.2, 0.4, 0.4]), Some((1, 0.4)));
        assert_eq!(stable_argmax(&[0.25, 0.25, 0.25, 0.25]), Some((0, 0.25)));
    }

    #[test]
    fn test_argmax_ignores_nan_and_handles_empty() {
        assert_eq!(stable_argmax(&[f64::NAN, 0.3, 0.1]), Some((1, 0.3)));
        assert_eq!(stable_argmax(&[f64::NAN]), None);
        assert_eq!(stable_argmax(&[]), None);
    }
}
