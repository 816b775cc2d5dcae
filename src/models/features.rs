use std::collections::HashMap;

/// 分类模型使用的特征名，顺序即特征向量的顺序
pub const FEATURE_NAMES: [&str; 15] = [
    "PeriodLS",
    "Mean",
    "Rcs",
    "Psi_eta",
    "StetsonK_AC",
    "Gskew",
    "Psi_CS",
    "Skew",
    "Freq1_harmonics_amplitude_1",
    "Eta_e",
    "LinearTrend",
    "Freq1_harmonics_amplitude_0",
    "AndersonDarling",
    "MaxSlope",
    "StetsonK",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

/// 定长特征向量，所有分量都是有限值
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector([f64; FEATURE_COUNT]);

impl FeatureVector {
    /// 按规范词表从"特征名 → 数值"映射中取值，缺失或非有限值记为 0.0
    pub fn from_named(values: &HashMap<String, f64>) -> Self {
        let mut out = [0.0; FEATURE_COUNT];
        for (slot, name) in out.iter_mut().zip(FEATURE_NAMES) {
            *slot = values
                .get(name)
                .copied()
                .filter(|v| v.is_finite())
                .unwrap_or(0.0);
        }
        Self(out)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_and_non_finite_default_to_zero() {
        let mut named = HashMap::new();
        named.insert("PeriodLS".to_string(), 0.73);
        named.insert("Mean".to_string(), f64::NAN);
        named.insert("StetsonK".to_string(), f64::NEG_INFINITY);
        named.insert("NotAFeature".to_string(), 42.0);

        let fv = FeatureVector::from_named(&named);
        assert_eq!(fv.values().len(), 15);
        assert_eq!(fv.values()[0], 0.73);
        assert_eq!(fv.values()[1], 0.0);
        assert_eq!(fv.values()[14], 0.0);
        assert!(fv.values().iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_order_follows_vocabulary() {
        let named: HashMap<String, f64> = FEATURE_NAMES
            .iter()
            .enumerate()
            .map(|(i, n)| (n.to_string(), i as f64))
            .collect();

        let fv = FeatureVector::from_named(&named);
        for (i, v) in fv.values().iter().enumerate() {
            assert_eq!(*v, i as f64);
        }
    }
}
