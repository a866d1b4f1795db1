use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    claim::ClaimRecord,
    classifier::Classifier,
    error::{ModelError, PredictError, ProcessingError},
    table::{FileFormat, Table},
};

/// Positive ("fraud") class label.
pub const FRAUD_LABEL: i64 = 1;

/// Per-row outcome, echoing a few input fields for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub row_id: usize,
    pub prediction: i64,
    pub fraud_probability: f64,
    pub is_fraud: bool,
    pub claim_amount: f64,
    pub patient_age: i64,
    pub provider_type: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total_claims: usize,
    pub fraud_cases: usize,
    pub legitimate_cases: usize,
}

impl BatchSummary {
    pub fn from_results(results: &[PredictionResult]) -> Self {
        let fraud_cases = results.iter().filter(|r| r.is_fraud).count();
        Self {
            total_claims: results.len(),
            fraud_cases,
            legitimate_cases: results.len() - fraud_cases,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchPrediction {
    pub summary: BatchSummary,
    pub results: Vec<PredictionResult>,
}

/// Scores all claims in one batch call and shapes the response rows.
pub fn predict_claims(
    model: &dyn Classifier,
    claims: &[ClaimRecord],
) -> Result<BatchPrediction, ProcessingError> {
    let predictions = model.predict(claims)?;
    let probabilities = model.predict_proba(claims)?;

    for actual in [predictions.len(), probabilities.len()] {
        if actual != claims.len() {
            return Err(ModelError::OutputLength {
                expected: claims.len(),
                actual,
            }
            .into());
        }
    }

    let results: Vec<PredictionResult> = claims
        .iter()
        .zip(predictions.iter().zip(&probabilities))
        .enumerate()
        .map(|(row_id, (claim, (prediction, proba)))| PredictionResult {
            row_id,
            prediction: *prediction,
            // column 1 is the positive class for a binary model
            fraud_probability: proba.get(1).copied().unwrap_or(0.0),
            is_fraud: *prediction == FRAUD_LABEL,
            claim_amount: claim.claim_amount,
            patient_age: claim.patient_age,
            provider_type: claim.provider_type.clone(),
        })
        .collect();

    let summary = BatchSummary::from_results(&results);
    debug!(
        total = summary.total_claims,
        fraud = summary.fraud_cases,
        "Scored batch"
    );

    Ok(BatchPrediction { summary, results })
}

/// Parse, validate, project and score an uploaded file.
pub fn predict_file(
    model: &dyn Classifier,
    format: FileFormat,
    bytes: &[u8],
) -> Result<BatchPrediction, PredictError> {
    let table = Table::parse(format, bytes)?;
    let claims = table.project()?;
    Ok(predict_claims(model, &claims)?)
}
