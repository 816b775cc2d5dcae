use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// 未显式指定配置文件时尝试读取的默认路径
pub const DEFAULT_CONFIG_FILE: &str = "auto_classify.toml";

/// 程序配置
///
/// 启动时构造一次，之后以只读引用传给各个组件；任何组件都不读取进程级全局状态
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub model: ModelConfig,
    pub classification: ClassificationConfig,
    pub paths: PathsConfig,
}

/// 时序库（TDengine REST 接口）配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// 数据库名
    pub name: String,
    /// 光变曲线所在的超级表
    pub super_table: String,
    pub timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 6041,
            user: "root".to_string(),
            password: "taosdata".to_string(),
            name: "gaiadr2_lc".to_string(),
            super_table: "sensor_data".to_string(),
            timeout_secs: 30,
        }
    }
}

/// 模型服务配置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// 特征提取 + 分类推理服务地址
    pub endpoint: String,
    /// 类别映射元数据；文件不存在时使用内置的 10 类词表
    pub metadata_path: Option<PathBuf>,
    pub timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://127.0.0.1:8765".to_string(),
            metadata_path: Some(PathBuf::from("../classifier/metadata.json")),
            timeout_secs: 60,
        }
    }
}

/// 单次运行的分类参数，运行期间不可变
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassificationConfig {
    /// 写回时序库所需的最低置信度
    pub confidence_threshold: f64,
    /// 是否把高置信度预测写回时序库
    pub update_database: bool,
    pub batch_size: usize,
    pub staging: StagingStrategy,
    pub cancel_granularity: CancelGranularity,
    /// 关闭后不写断点，停止时状态为 `stopped` 而非 `paused`
    pub checkpoint_enabled: bool,
}

impl Default for ClassificationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.95,
            update_database: true,
            batch_size: 5000,
            staging: StagingStrategy::Interleaved,
            cancel_granularity: CancelGranularity::Fine,
            checkpoint_enabled: true,
        }
    }
}

/// 进度、断点、停止信号等文件位置
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub progress_file: PathBuf,
    pub state_file: PathBuf,
    pub stop_file: PathBuf,
    /// 结果文件；未设置时为候选文件旁的 `<stem>_results.json`
    pub result_file: Option<PathBuf>,
    /// 进度写入的最小间隔（毫秒），0 表示不限流
    pub progress_min_interval_ms: u64,
    /// 启动时清除上一次遗留的停止信号
    pub clear_stop_on_start: bool,
    /// 观察到停止信号后立即删除
    pub clear_stop_on_observe: bool,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            progress_file: PathBuf::from("/tmp/auto_classify_progress.json"),
            state_file: PathBuf::from("/tmp/auto_classify_state.json"),
            stop_file: PathBuf::from("/tmp/auto_classify_stop"),
            result_file: None,
            progress_min_interval_ms: 100,
            clear_stop_on_start: true,
            clear_stop_on_observe: false,
        }
    }
}

impl PathsConfig {
    pub fn progress_min_interval(&self) -> Duration {
        Duration::from_millis(self.progress_min_interval_ms)
    }
}

/// 批内的处理方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum StagingStrategy {
    /// 逐个候选：获取 → 提取 → 分类
    #[default]
    Interleaved,
    /// 分阶段：整批获取，再整批提取，再整批分类
    Staged,
}

/// 停止信号的检查粒度
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum CancelGranularity {
    /// 只在批次边界检查
    Coarse,
    /// 每个候选之前都检查
    #[default]
    Fine,
}

impl Config {
    /// 按"默认值 → 配置文件 → 环境变量"的顺序构造配置
    ///
    /// 显式传入的配置文件必须存在；未传入时仅在默认文件存在时读取
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// 从 TOML 文件读取配置，缺省字段使用默认值
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadFailed {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::TomlParseFailed {
            path: path.to_path_buf(),
            source,
        })
    }

    /// 使用环境变量覆盖配置
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        if let Some(host) = env_string("TAOS_HOST") {
            self.database.host = host;
        }
        if let Some(host) = env_string("AUTO_CLASSIFY_DB_HOST") {
            self.database.host = host;
        }
        if let Some(port) = env_parse("AUTO_CLASSIFY_DB_PORT", "u16")? {
            self.database.port = port;
        }
        if let Some(name) = env_string("AUTO_CLASSIFY_DB_NAME") {
            self.database.name = name;
        }
        if let Some(endpoint) = env_string("AUTO_CLASSIFY_MODEL_ENDPOINT") {
            self.model.endpoint = endpoint;
        }
        if let Some(threshold) = env_parse("AUTO_CLASSIFY_THRESHOLD", "f64")? {
            self.classification.confidence_threshold = threshold;
        }
        if let Some(update) = env_parse("AUTO_CLASSIFY_UPDATE_DATABASE", "bool")? {
            self.classification.update_database = update;
        }
        if let Some(batch_size) = env_parse("AUTO_CLASSIFY_BATCH_SIZE", "usize")? {
            self.classification.batch_size = batch_size;
        }
        Ok(())
    }

    /// 校验配置值
    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.classification.confidence_threshold;
        if !threshold.is_finite() || !(0.0..=1.0).contains(&threshold) {
            return Err(ConfigError::InvalidValue {
                field: "classification.confidence_threshold".to_string(),
                reason: format!("{} 不在 [0, 1] 范围内", threshold),
            });
        }
        if self.classification.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "classification.batch_size".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        if self.database.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "database.port".to_string(),
                reason: "必须大于 0".to_string(),
            });
        }
        Ok(())
    }
}

fn env_string(var_name: &str) -> Option<String> {
    std::env::var(var_name).ok().filter(|v| !v.trim().is_empty())
}

fn env_parse<T: FromStr>(var_name: &str, expected_type: &str) -> Result<Option<T>, ConfigError> {
    match env_string(var_name) {
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::EnvVarParseFailed {
                var_name: var_name.to_string(),
                value,
                expected_type: expected_type.to_string(),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.classification.batch_size, 5000);
        assert_eq!(config.classification.confidence_threshold, 0.95);
        assert_eq!(config.paths.progress_min_interval(), Duration::from_millis(100));
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[database]
host = "taos.internal"

[classification]
batch_size = 200
staging = "staged"
cancel_granularity = "coarse"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        assert_eq!(config.database.host, "taos.internal");
        assert_eq!(config.database.port, 6041);
        assert_eq!(config.classification.batch_size, 200);
        assert_eq!(config.classification.staging, StagingStrategy::Staged);
        assert_eq!(config.classification.cancel_granularity, CancelGranularity::Coarse);
        assert!(config.classification.update_database);
    }

    #[test]
    fn test_invalid_toml_is_reported() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[classification\nbatch_size = ").unwrap();

        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::TomlParseFailed { .. }));
    }

    #[test]
    fn test_validate_rejects_out_of_range_values() {
        let mut config = Config::default();
        config.classification.confidence_threshold = 1.5;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.classification.batch_size = 0;
        assert!(config.validate().is_err());
    }
}
