//! TDengine REST 客户端 - 基础设施层
//!
//! 持有唯一的 HTTP 连接资源，只暴露"执行 SQL"的能力

use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::GatewayError;

/// TDengine REST 客户端
///
/// 职责：
/// - 持有 HTTP 客户端与认证信息
/// - 暴露 query() / execute() 能力
/// - 不认识候选与光变曲线
pub struct TdengineClient {
    client: Client,
    endpoint: String,
    user: String,
    password: String,
}

/// `/rest/sql` 的响应
#[derive(Debug, Deserialize)]
struct SqlResponse {
    code: i64,
    #[serde(default)]
    desc: Option<String>,
    #[serde(default)]
    data: Vec<Vec<JsonValue>>,
}

impl TdengineClient {
    /// 创建客户端（不发起请求）
    pub fn new(config: &DatabaseConfig) -> Result<Self, GatewayError> {
        let endpoint = format!("http://{}:{}/rest/sql", config.host, config.port);
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| GatewayError::request_failed(&endpoint, e))?;

        Ok(Self {
            client,
            endpoint,
            user: config.user.clone(),
            password: config.password.clone(),
        })
    }

    /// 创建客户端并用一次轻量查询确认服务可用
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, GatewayError> {
        let client = Self::new(config)?;
        client.query("SELECT SERVER_VERSION()").await?;
        debug!("TDengine 连接成功: {}", client.endpoint);
        Ok(client)
    }

    /// 执行查询并返回所有行
    pub async fn query(&self, sql: &str) -> Result<Vec<Vec<JsonValue>>, GatewayError> {
        debug!("SQL: {}", sql);

        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.user, Some(&self.password))
            .body(sql.to_string())
            .send()
            .await
            .map_err(|e| GatewayError::request_failed(&self.endpoint, e))?;

        let body: SqlResponse = response
            .json()
            .await
            .map_err(|e| GatewayError::request_failed(&self.endpoint, e))?;

        if body.code != 0 {
            return Err(GatewayError::BadResponse {
                code: body.code,
                desc: body.desc.unwrap_or_default(),
            });
        }

        Ok(body.data)
    }

    /// 执行不关心返回行的语句
    pub async fn execute(&self, sql: &str) -> Result<(), GatewayError> {
        self.query(sql).await.map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_response_shape() {
        let body: SqlResponse =
            serde_json::from_str(r#"{"code": 9730, "desc": "Table does not exist"}"#).unwrap();
        assert_eq!(body.code, 9730);
        assert!(body.data.is_empty());
    }

    #[test]
    fn test_data_response_shape() {
        let body: SqlResponse = serde_json::from_str(
            r#"{"code":0,"column_meta":[["ts","BIGINT",8]],"data":[[1600000000000,15.2,0.01]],"rows":1}"#,
        )
        .unwrap();
        assert_eq!(body.data.len(), 1);
        assert_eq!(body.data[0][0].as_i64(), Some(1_600_000_000_000));
    }

    /// 需要本地 TDengine (taosAdapter) 服务
    #[tokio::test]
    #[ignore]
    async fn test_connect_local_server() {
        let client = TdengineClient::connect(&DatabaseConfig::default()).await;
        assert!(client.is_ok(), "应该能够连接本地 TDengine");
    }
}
