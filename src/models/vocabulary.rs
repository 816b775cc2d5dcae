//! 类别词表
//!
//! 模型输出的概率向量按类别索引排列；元数据文件给出"类别名 → 索引"映射，
//! 缺失时退回内置的 10 类词表

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use serde::Deserialize;
use tracing::{info, warn};

use crate::error::SetupError;

/// 内置类别词表，索引即位置
pub const DEFAULT_CLASSES: [&str; 10] = [
    "Non-var", "ROT", "EA", "EW", "CEP", "DSCT", "RRAB", "RRC", "M", "SR",
];

/// 类别索引 ↔ 类别名
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassVocabulary {
    names: BTreeMap<usize, String>,
}

#[derive(Debug, Deserialize)]
struct ModelMetadata {
    #[serde(default)]
    class_map: Option<HashMap<String, usize>>,
}

impl ClassVocabulary {
    /// 内置词表
    pub fn builtin() -> Self {
        Self {
            names: DEFAULT_CLASSES
                .iter()
                .enumerate()
                .map(|(i, name)| (i, name.to_string()))
                .collect(),
        }
    }

    /// 由"类别名 → 索引"映射构造
    pub fn from_class_map(class_map: HashMap<String, usize>) -> Self {
        Self {
            names: class_map.into_iter().map(|(name, i)| (i, name)).collect(),
        }
    }

    /// 从模型元数据加载词表
    ///
    /// 路径未配置或文件不存在时使用内置词表；文件存在但无法解析属于启动错误
    pub fn load(path: Option<&Path>) -> Result<Self, SetupError> {
        let Some(path) = path.filter(|p| p.exists()) else {
            info!("未找到模型元数据，使用内置 {} 类词表", DEFAULT_CLASSES.len());
            return Ok(Self::builtin());
        };

        let content = std::fs::read_to_string(path).map_err(|e| SetupError::ModelMetadata {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let metadata: ModelMetadata =
            serde_json::from_str(&content).map_err(|e| SetupError::ModelMetadata {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })?;

        match metadata.class_map {
            Some(class_map) if !class_map.is_empty() => {
                let vocabulary = Self::from_class_map(class_map);
                info!("✓ 已加载模型元数据: {} 个类别", vocabulary.len());
                Ok(vocabulary)
            }
            _ => {
                warn!("模型元数据中没有 class_map，使用内置词表");
                Ok(Self::builtin())
            }
        }
    }

    /// 类别名；索引不在词表中时返回索引的十进制字符串
    pub fn name(&self, index: usize) -> String {
        self.names
            .get(&index)
            .cloned()
            .unwrap_or_else(|| index.to_string())
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}

impl Default for ClassVocabulary {
    fn default() -> Self {
        Self::builtin()
    }
}
