//! Fixtures shared by unit tests.

use serde_json::{Value, json};

use crate::{
    claim::{ClaimRecord, REQUIRED_COLUMNS},
    pipeline::PipelineModel,
    sample::write_csv,
};

/// Logistic regression on claim amount alone: fraud above 5000.
pub fn amount_model_json() -> Value {
    json!({
        "name": "amount_only",
        "feature_names": REQUIRED_COLUMNS,
        "preprocessor": {
            "numeric": {
                "columns": ["Claim_Amount"],
                "mean": [0.0],
                "scale": [1000.0]
            }
        },
        "classifier": {
            "type": "logistic_regression",
            "classes": [0, 1],
            "coefficients": [1.0],
            "intercept": -5.0
        }
    })
}

/// Two-tree forest over claim amount and a one-hot provider type.
pub fn forest_model_json() -> Value {
    json!({
        "feature_names": REQUIRED_COLUMNS,
        "preprocessor": {
            "numeric": {
                "columns": ["Claim_Amount"],
                "mean": [0.0],
                "scale": [1.0]
            },
            "categorical": {
                "columns": ["Provider_Type"],
                "categories": [["Laboratory", "Pharmacy"]]
            }
        },
        "classifier": {
            "type": "random_forest",
            "classes": [0, 1],
            "trees": [
                { "nodes": [
                    { "node": "split", "feature": 0, "threshold": 1000.0, "left": 1, "right": 2 },
                    { "node": "leaf", "probabilities": [0.9, 0.1] },
                    { "node": "leaf", "probabilities": [0.3, 0.7] }
                ]},
                { "nodes": [
                    { "node": "split", "feature": 0, "threshold": 2000.0, "left": 1, "right": 2 },
                    { "node": "leaf", "probabilities": [0.9, 0.1] },
                    { "node": "leaf", "probabilities": [0.4, 0.6] }
                ]}
            ]
        }
    })
}

pub fn fixed_model() -> PipelineModel {
    PipelineModel::from_json(amount_model_json().to_string().as_bytes()).unwrap()
}

pub fn single_class_model() -> PipelineModel {
    let mut artifact = amount_model_json();
    artifact["classifier"]["classes"] = json!([0]);
    PipelineModel::from_json(artifact.to_string().as_bytes()).unwrap()
}

pub fn claim(amount: f64, provider_type: &str) -> ClaimRecord {
    ClaimRecord {
        claim_amount: amount,
        patient_age: 47,
        patient_gender: "Male".to_string(),
        provider_type: provider_type.to_string(),
        diagnosis_code: "A09".to_string(),
        procedure_code: "99214".to_string(),
        number_of_procedures: 2,
        admission_type: "Urgent".to_string(),
        discharge_type: "Home".to_string(),
        length_of_stay_days: 5,
        service_type: "Inpatient".to_string(),
        deductible_amount: 300.0,
        copay_amount: 25.5,
        previous_claims_patient: 3,
        previous_claims_provider: 40,
        provider_patient_distance_miles: 12.25,
        claim_submitted_late: false,
    }
}

pub fn claims_csv(claims: &[ClaimRecord]) -> String {
    let mut buffer = Vec::new();
    write_csv(&mut buffer, claims).unwrap();
    String::from_utf8(buffer).unwrap()
}
