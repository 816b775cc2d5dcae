//! 光变曲线网关 - 业务能力层
//!
//! 只负责"按候选读取光变曲线"与"写回分类标签"两种能力，不关心流程

use serde_json::Value as JsonValue;
use tracing::debug;

use crate::config::DatabaseConfig;
use crate::error::GatewayError;
use crate::infrastructure::TdengineClient;
use crate::models::{Candidate, RawSample};

/// 时序库访问边界
///
/// `fetch` 只读；`set_class` 是幂等的标签覆盖，重复执行结果相同
#[allow(async_fn_in_trait)]
pub trait LightCurveGateway {
    /// 按时间升序返回候选的全部原始采样
    async fn fetch(&self, candidate: &Candidate) -> Result<Vec<RawSample>, GatewayError>;

    /// 把分类结果写入候选所在子表的 `cls` 标签
    async fn set_class(&self, candidate: &Candidate, class_name: &str) -> Result<(), GatewayError>;
}

/// 基于 TDengine 超级表的网关
pub struct TdengineGateway {
    client: TdengineClient,
    database: String,
    super_table: String,
}

impl TdengineGateway {
    pub fn new(client: TdengineClient, config: &DatabaseConfig) -> Self {
        Self {
            client,
            database: config.name.clone(),
            super_table: config.super_table.clone(),
        }
    }

    /// 找到候选所在的子表名
    ///
    /// healpix_id 非零时子表名可以直接拼出；否则需要到超级表里查一次 tbname
    async fn resolve_table(&self, candidate: &Candidate) -> Result<String, GatewayError> {
        if candidate.healpix_id != 0 {
            return Ok(child_table_name(&self.super_table, candidate));
        }

        let sql = format!(
            "SELECT tbname FROM {}.{} WHERE source_id = {} LIMIT 1",
            self.database, self.super_table, candidate.source_id
        );
        let rows = self.client.query(&sql).await?;
        let table = rows
            .first()
            .and_then(|row| row.first())
            .and_then(JsonValue::as_str)
            .ok_or(GatewayError::TableNotFound {
                source_id: candidate.source_id,
            })?;

        // tbname 可能带库名前缀
        Ok(table.rsplit('.').next().unwrap_or(table).to_string())
    }
}

impl LightCurveGateway for TdengineGateway {
    async fn fetch(&self, candidate: &Candidate) -> Result<Vec<RawSample>, GatewayError> {
        let sql = format!(
            "SELECT CAST(ts AS BIGINT), mag, mag_error FROM {}.{} WHERE source_id = {} ORDER BY ts ASC",
            self.database, self.super_table, candidate.source_id
        );
        let rows = self.client.query(&sql).await?;
        debug!("source_id={} 返回 {} 行", candidate.source_id, rows.len());
        rows.iter().map(|row| parse_sample(row)).collect()
    }

    async fn set_class(&self, candidate: &Candidate, class_name: &str) -> Result<(), GatewayError> {
        validate_tag(class_name)?;
        let table = self.resolve_table(candidate).await?;
        let sql = format!(
            "ALTER TABLE {}.{} SET TAG cls = '{}'",
            self.database, table, class_name
        );
        self.client.execute(&sql).await
    }
}

fn child_table_name(super_table: &str, candidate: &Candidate) -> String {
    format!(
        "{}_{}_{}",
        super_table, candidate.healpix_id, candidate.source_id
    )
}

/// 标签值直接拼进 SQL，只允许不含引号与反斜杠的名字
fn validate_tag(class_name: &str) -> Result<(), GatewayError> {
    if class_name.is_empty() || class_name.contains(['\'', '"', '\\', ';']) {
        return Err(GatewayError::InvalidTag(class_name.to_string()));
    }
    Ok(())
}

/// 解析一行 (ts, mag, mag_error)；空值记为 NaN，由光变曲线构造时过滤
fn parse_sample(row: &[JsonValue]) -> Result<RawSample, GatewayError> {
    let timestamp_ms = row
        .first()
        .and_then(|v| v.as_i64().or_else(|| v.as_str().and_then(|s| s.parse().ok())))
        .ok_or_else(|| GatewayError::MalformedRow(format!("{:?}", row)))?;
    let number = |idx: usize| row.get(idx).and_then(JsonValue::as_f64).unwrap_or(f64::NAN);

    Ok(RawSample::new(timestamp_ms, number(1), number(2)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_child_table_name() {
        let candidate = Candidate::new(42).with_healpix(7);
        assert_eq!(child_table_name("sensor_data", &candidate), "sensor_data_7_42");
    }

    #[test]
    fn test_parse_sample_with_nulls() {
        let sample =
            parse_sample(&[json!(1_600_000_000_000i64), json!(15.3), JsonValue::Null]).unwrap();
        assert_eq!(sample.timestamp_ms, 1_600_000_000_000);
        assert_eq!(sample.magnitude, 15.3);
        assert!(sample.error.is_nan());

        let sample = parse_sample(&[json!("1600000000001"), json!(15.3), json!(0.1)]).unwrap();
        assert_eq!(sample.timestamp_ms, 1_600_000_000_001);
    }

    #[test]
    fn test_parse_sample_without_timestamp_is_malformed() {
        let err = parse_sample(&[JsonValue::Null, json!(1.0), json!(0.1)]).unwrap_err();
        assert!(matches!(err, GatewayError::MalformedRow(_)));
    }

    #[test]
    fn test_validate_tag() {
        assert!(validate_tag("Non-var").is_ok());
        assert!(validate_tag("RRAB").is_ok());
        assert!(validate_tag("x'; DROP TABLE t; --").is_err());
        assert!(validate_tag("").is_err());
    }
}
