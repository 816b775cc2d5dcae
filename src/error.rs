use std::path::PathBuf;

use thiserror::Error;

/// 应用程序错误类型
///
/// 只有 `Setup` 会终止一次运行；其余错误都在本地降级处理
#[derive(Debug, Error)]
pub enum AppError {
    /// 启动阶段错误（致命）
    #[error("启动错误: {0}")]
    Setup(#[from] SetupError),
    /// 时序库访问错误
    #[error("时序库错误: {0}")]
    Gateway(#[from] GatewayError),
    /// 模型服务错误
    #[error("模型错误: {0}")]
    Model(#[from] ModelError),
    /// 进度/断点等可观测性文件错误
    #[error("可观测性错误: {0}")]
    Observability(#[from] ObservabilityError),
}

/// 启动阶段错误：在处理任何批次之前发生，直接导致非零退出码
#[derive(Debug, Error)]
pub enum SetupError {
    /// 候选文件不存在
    #[error("候选文件不存在: {}", .path.display())]
    InputNotFound { path: PathBuf },
    /// 读取候选文件失败
    #[error("读取候选文件失败 ({}): {source}", .path.display())]
    InputUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// 候选文件内容无法解析
    #[error("候选文件第 {line} 行解析失败: {reason}")]
    InputParse { line: usize, reason: String },
    /// 模型服务不可用
    #[error("模型服务不可用 ({endpoint}): {source}")]
    ModelUnavailable {
        endpoint: String,
        #[source]
        source: ModelError,
    },
    /// 模型元数据无法解析
    #[error("模型元数据解析失败 ({}): {reason}", .path.display())]
    ModelMetadata { path: PathBuf, reason: String },
    /// 时序库连接失败
    #[error("数据库连接失败 ({host}:{port}): {source}")]
    StoreConnect {
        host: String,
        port: u16,
        #[source]
        source: GatewayError,
    },
    /// 配置错误
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// 时序库（TDengine REST）访问错误
#[derive(Debug, Error)]
pub enum GatewayError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务端返回错误码
    #[error("SQL 执行失败: code={code}, desc={desc}")]
    BadResponse { code: i64, desc: String },
    /// 返回行的格式与预期不符
    #[error("返回数据格式错误: {0}")]
    MalformedRow(String),
    /// 找不到候选对应的子表
    #[error("找不到 source_id={source_id} 对应的子表")]
    TableNotFound { source_id: u64 },
    /// 分类标签中含有非法字符
    #[error("非法的分类标签: {0}")]
    InvalidTag(String),
}

/// 模型服务（特征提取 / 分类器）错误
#[derive(Debug, Error)]
pub enum ModelError {
    /// 网络请求失败
    #[error("请求失败 ({endpoint}): {source}")]
    RequestFailed {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },
    /// 服务返回非成功状态码
    #[error("模型服务返回错误状态 ({endpoint}): {status}")]
    BadStatus { endpoint: String, status: u16 },
    /// 概率向量为空
    #[error("分类器返回了空的概率向量")]
    EmptyProbabilities,
}

/// 可观测性文件（进度、断点、结果）读写错误
#[derive(Debug, Error)]
pub enum ObservabilityError {
    /// 文件读写失败
    #[error("文件读写失败 ({}): {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// JSON 序列化失败
    #[error("JSON 序列化失败: {0}")]
    Json(#[from] serde_json::Error),
}

/// 配置错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 配置文件读取失败
    #[error("读取配置文件失败 ({}): {source}", .path.display())]
    ReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// TOML 解析失败
    #[error("TOML解析失败 ({}): {source}", .path.display())]
    TomlParseFailed {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// 环境变量解析失败
    #[error("环境变量 {var_name} 解析失败: 值 '{value}' 无法转换为 {expected_type}")]
    EnvVarParseFailed {
        var_name: String,
        value: String,
        expected_type: String,
    },
    /// 配置值超出允许范围
    #[error("配置项 {field} 无效: {reason}")]
    InvalidValue { field: String, reason: String },
}

// ========== 便捷构造函数 ==========

impl ObservabilityError {
    /// 创建文件读写错误
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        ObservabilityError::Io {
            path: path.into(),
            source,
        }
    }
}

impl GatewayError {
    /// 创建请求失败错误
    pub fn request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        GatewayError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        }
    }
}

impl ModelError {
    /// 创建请求失败错误
    pub fn request_failed(endpoint: impl Into<String>, source: reqwest::Error) -> Self {
        ModelError::RequestFailed {
            endpoint: endpoint.into(),
            source,
        }
    }
}

// ========== Result 类型别名 ==========

/// 应用程序结果类型
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_setup_error_converts_into_app_error() {
        let err: AppError = SetupError::InputNotFound {
            path: PathBuf::from("/tmp/missing.csv"),
        }
        .into();

        assert!(matches!(err, AppError::Setup(_)));
        assert!(err.to_string().contains("/tmp/missing.csv"));
    }

    #[test]
    fn test_config_error_is_a_setup_error() {
        let err: SetupError = ConfigError::InvalidValue {
            field: "batch_size".to_string(),
            reason: "必须大于 0".to_string(),
        }
        .into();

        assert!(err.to_string().contains("batch_size"));
    }
}
