//! 模型服务客户端 - 业务能力层
//!
//! 特征提取与分类推理由独立的模型服务完成，这里通过 HTTP 调用
//!
//! - `GET  /health`
//! - `POST /extract  {times, magnitudes, errors, features}` → `{features: {name: value}}`
//! - `POST /predict  {features: [...]}` → `{probabilities: [...]}`

use std::collections::HashMap;
use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ModelConfig;
use crate::error::ModelError;
use crate::models::{FeatureVector, LightCurve, FEATURE_NAMES};
use crate::services::model::{Classifier, FeatureExtractor};

/// 模型服务客户端，同时实现特征提取与分类
pub struct ModelServiceClient {
    client: Client,
    endpoint: String,
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    times: &'a [f64],
    magnitudes: &'a [f64],
    errors: &'a [f64],
    features: &'a [&'a str],
}

#[derive(Deserialize)]
struct ExtractResponse {
    /// 非有限值在 JSON 中以 null 表示
    features: HashMap<String, Option<f64>>,
}

#[derive(Serialize)]
struct PredictRequest<'a> {
    features: &'a [f64],
}

#[derive(Deserialize)]
struct PredictResponse {
    probabilities: Vec<f64>,
}

impl ModelServiceClient {
    pub fn new(config: &ModelConfig) -> Result<Self, ModelError> {
        let endpoint = config.endpoint.trim_end_matches('/').to_string();
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ModelError::request_failed(&endpoint, e))?;
        Ok(Self { client, endpoint })
    }

    /// 创建客户端并检查服务健康状态
    pub async fn connect(config: &ModelConfig) -> Result<Self, ModelError> {
        let service = Self::new(config)?;
        let url = format!("{}/health", service.endpoint);
        let response = service
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ModelError::request_failed(&url, e))?;
        if !response.status().is_success() {
            return Err(ModelError::BadStatus {
                endpoint: url,
                status: response.status().as_u16(),
            });
        }
        debug!("模型服务可用: {}", service.endpoint);
        Ok(service)
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post<Req: Serialize, Resp: DeserializeOwned>(
        &self,
        path: &str,
        body: &Req,
    ) -> Result<Resp, ModelError> {
        let url = format!("{}/{}", self.endpoint, path);
        let response = self
            .client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| ModelError::request_failed(&url, e))?;

        if !response.status().is_success() {
            return Err(ModelError::BadStatus {
                endpoint: url,
                status: response.status().as_u16(),
            });
        }

        response
            .json()
            .await
            .map_err(|e| ModelError::request_failed(&url, e))
    }
}

impl FeatureExtractor for ModelServiceClient {
    async fn extract(&self, light_curve: &LightCurve) -> Result<HashMap<String, f64>, ModelError> {
        let request = ExtractRequest {
            times: &light_curve.times,
            magnitudes: &light_curve.magnitudes,
            errors: &light_curve.errors,
            features: &FEATURE_NAMES,
        };
        let response: ExtractResponse = self.post("extract", &request).await?;

        Ok(response
            .features
            .into_iter()
            .filter_map(|(name, value)| value.map(|v| (name, v)))
            .collect())
    }
}

impl Classifier for ModelServiceClient {
    async fn predict_probabilities(
        &self,
        features: &FeatureVector,
    ) -> Result<Vec<f64>, ModelError> {
        let request = PredictRequest {
            features: features.values(),
        };
        let response: PredictResponse = self.post("predict", &request).await?;
        if response.probabilities.is_empty() {
            return Err(ModelError::EmptyProbabilities);
        }
        Ok(response.probabilities)
    }
}
