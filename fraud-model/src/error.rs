use thiserror::Error;

/// Outcome taxonomy of a batch prediction request.
#[derive(Error, Debug)]
pub enum PredictError {
    #[error("Model is not loaded.")]
    ModelUnavailable,

    #[error("Only .csv, .xlsx, and .xls files are supported.")]
    UnsupportedFormat,

    #[error("Missing columns: {}", format_column_list(.0))]
    MissingColumns(Vec<String>),

    #[error("Prediction error: {0}")]
    Processing(#[from] ProcessingError),
}

/// Anything that goes wrong after the upload passed the availability and
/// extension checks, except a missing-column schema mismatch.
#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("{0}")]
    Csv(#[from] csv::Error),

    #[error("{0}")]
    Spreadsheet(#[from] calamine::Error),

    #[error("Worksheet not found in workbook")]
    NoWorksheet,

    #[error("No columns to parse from file")]
    EmptyFile,

    #[error("could not convert {value:?} in column '{column}' (row {row}) to {target}")]
    Coercion {
        column: &'static str,
        row: usize,
        value: String,
        target: &'static str,
    },

    #[error("{0}")]
    Model(#[from] ModelError),

    #[error("prediction worker failed: {0}")]
    Worker(String),
}

/// Errors raised by a classifier while scoring a batch.
#[derive(Error, Debug)]
pub enum ModelError {
    #[error("value {value:?} for feature '{column}' is not numeric")]
    NonNumericFeature { column: String, value: String },

    #[error("model returned {actual} outputs for {expected} rows")]
    OutputLength { expected: usize, actual: usize },
}

/// Errors raised while loading a model artifact from disk.
#[derive(Error, Debug)]
pub enum ArtifactError {
    #[error("failed to read model artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to deserialize model artifact: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid model artifact: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, PredictError>;

/// Renders column names as `['A', 'B']`.
pub fn format_column_list(columns: &[String]) -> String {
    let quoted: Vec<String> = columns.iter().map(|c| format!("'{}'", c)).collect();
    format!("[{}]", quoted.join(", "))
}
