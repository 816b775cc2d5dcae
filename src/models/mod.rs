pub mod candidate;
pub mod features;
pub mod light_curve;
pub mod loaders;
pub mod progress;
pub mod result;
pub mod state;
pub mod vocabulary;

pub use candidate::{partition, Candidate};
pub use features::{FeatureVector, FEATURE_COUNT, FEATURE_NAMES};
pub use light_curve::{LightCurve, RawSample, MIN_SAMPLES};
pub use loaders::CandidateSource;
pub use progress::{BatchInfo, ProgressSnapshot, RunStatus, Stage};
pub use result::{ClassificationResult, ConfidenceLevel, ResultArtifact, RunCounts};
pub use state::PipelineState;
pub use vocabulary::{ClassVocabulary, DEFAULT_CLASSES};
