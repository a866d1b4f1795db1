use serde::Serialize;
use std::collections::BTreeMap;

use crate::{claim::ClaimRecord, error::ModelError};

/// Core trait for a trained fraud classifier.
///
/// Implementations must be stateless and deterministic: scoring the same
/// rows twice, alone or inside a larger batch, yields the same output.
pub trait Classifier: Send + Sync {
    /// Predicted class label per claim.
    fn predict(&self, claims: &[ClaimRecord]) -> Result<Vec<i64>, ModelError>;

    /// Class probabilities per claim, one column per class in
    /// [`ModelInfo::classes`] order.
    fn predict_proba(&self, claims: &[ClaimRecord]) -> Result<Vec<Vec<f64>>, ModelError>;

    /// Static description of the loaded model.
    fn describe(&self) -> ModelInfo;
}

/// Introspection data exposed by `GET /model` and the `inspect_model` tool.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub name: String,
    pub model_type: String,
    pub feature_names: Vec<String>,
    pub n_features: usize,
    pub classes: Vec<i64>,
    pub steps: Vec<PipelineStep>,
    pub categories: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PipelineStep {
    pub name: String,
    pub kind: String,
    pub columns: Vec<String>,
}
