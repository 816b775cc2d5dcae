//! 业务能力层（Services）
//!
//! 描述"我能做什么"，只处理单个候选

pub mod light_curve_gateway;
pub mod model;
pub mod model_service;

pub use light_curve_gateway::{LightCurveGateway, TdengineGateway};
pub use model::{stable_argmax, Classifier, FeatureExtractor};
pub use model_service::ModelServiceClient;
