use serde::{Deserialize, Serialize};

/// 单个候选的分类结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Gaia source_id 超出 JSON 安全整数范围，序列化为字符串
    #[serde(with = "source_id_string")]
    pub source_id: u64,
    pub healpix_id: u64,
    pub ra: Option<f64>,
    pub dec: Option<f64>,
    #[serde(rename = "prediction")]
    pub predicted_class: String,
    pub confidence: f64,
    #[serde(rename = "data_points")]
    pub data_point_count: usize,
    pub updated: bool,
    pub reason: String,
    /// 置信度是否达到写回阈值（与是否真的写回无关）
    #[serde(default)]
    pub status: ConfidenceLevel,
}

/// 置信度相对阈值的分档
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceLevel {
    HighConfidence,
    #[default]
    LowConfidence,
}

impl ConfidenceLevel {
    pub fn of(confidence: f64, threshold: f64) -> Self {
        if confidence >= threshold {
            Self::HighConfidence
        } else {
            Self::LowConfidence
        }
    }
}

/// 写结果文件所需的累计计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunCounts {
    pub total_candidates: usize,
    pub updated: usize,
    /// 成功取得可用光变曲线的候选数
    pub lightcurves_fetched: usize,
    /// 成功提取特征的候选数
    pub features_extracted: usize,
}

/// 运行结束（完成或暂停）时写出的结果文件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultArtifact {
    pub results: Vec<ClassificationResult>,
    pub count: usize,
    pub total_candidates: usize,
    pub updated_count: usize,
    pub lightcurves_fetched: usize,
    pub features_extracted: usize,
    pub high_confidence_count: usize,
    pub threshold: f64,
    pub completed: bool,
    pub timestamp: i64,
}

impl ResultArtifact {
    pub fn new(
        results: Vec<ClassificationResult>,
        counts: RunCounts,
        threshold: f64,
        completed: bool,
    ) -> Self {
        let high_confidence_count = results
            .iter()
            .filter(|r| r.status == ConfidenceLevel::HighConfidence)
            .count();
        Self {
            count: results.len(),
            results,
            total_candidates: counts.total_candidates,
            updated_count: counts.updated,
            lightcurves_fetched: counts.lightcurves_fetched,
            features_extracted: counts.features_extracted,
            high_confidence_count,
            threshold,
            completed,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// 写出为字符串，读入时兼容字符串与整数
mod source_id_string {
    use serde::de::{self, Visitor};
    use serde::{Deserializer, Serializer};
    use std::fmt;

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct SourceIdVisitor;

        impl<'de> Visitor<'de> for SourceIdVisitor {
            type Value = u64;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("a string or integer representing a source_id")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                value.trim().parse().map_err(E::custom)
            }

            fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                Ok(value)
            }

            fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                u64::try_from(value).map_err(E::custom)
            }
        }

        deserializer.deserialize_any(SourceIdVisitor)
    }
}
