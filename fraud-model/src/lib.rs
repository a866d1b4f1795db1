pub mod batch;
pub mod claim;
pub mod classifier;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod sample;
pub mod table;

#[cfg(test)]
mod testing;

// Re-export commonly used types
pub use batch::{BatchPrediction, BatchSummary, FRAUD_LABEL, PredictionResult, predict_claims, predict_file};
pub use claim::{ClaimField, ClaimRecord, FieldKind, FieldValue, REQUIRED_COLUMNS};
pub use classifier::{Classifier, ModelInfo, PipelineStep};
pub use error::{ArtifactError, ModelError, PredictError, ProcessingError, Result};
pub use loader::{DEFAULT_MODEL_FILE, load_model, read_model, resolve_model_path, service_base_dir};
pub use pipeline::{PipelineArtifact, PipelineModel};
pub use table::{Cell, FileFormat, Table};
