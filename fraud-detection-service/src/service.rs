use axum::{
    Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Multipart, Request, State, multipart::MultipartRejection},
    http::{HeaderValue, StatusCode},
    middleware::{Next, from_fn},
    response::{Json, Response},
    routing::{get, post},
};
use fraud_model::{
    BatchPrediction, Classifier, FileFormat, ModelInfo, PredictError, ProcessingError,
    load_model, predict_file,
};
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{Instrument, info};
use uuid::Uuid;

use crate::{config::ServiceConfig, error::ApiError, models::HealthResponse};

/// Multipart part carrying the uploaded claims file.
pub const UPLOAD_FIELD: &str = "file";

const CORRELATION_HEADER: &str = "x-correlation-id";

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Shared, read-only state. The model is fixed at startup; `None` means the
/// service runs degraded.
#[derive(Clone)]
pub struct AppState {
    pub model: Option<Arc<dyn Classifier>>,
}

impl AppState {
    pub fn new(model: Option<Arc<dyn Classifier>>) -> Self {
        Self { model }
    }

    fn require_model(&self) -> Result<Arc<dyn Classifier>, ApiError> {
        self.model
            .clone()
            .ok_or_else(|| PredictError::ModelUnavailable.into())
    }
}

pub async fn create_app(config: &ServiceConfig) -> Router {
    let model = load_model(&config.model_path).await;
    build_router(AppState::new(model), config.max_upload_bytes)
}

pub fn build_router(app_state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/model", get(model_info))
        .route("/predict", post(predict))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
        .layer(from_fn(correlation_id_middleware))
        .with_state(app_state)
}

/// Tags each request with a correlation ID and runs it inside a span
/// carrying that ID.
async fn correlation_id_middleware(mut request: Request, next: Next) -> Response {
    let correlation_id = Uuid::new_v4().to_string();
    let header = HeaderValue::from_str(&correlation_id).ok();

    if let Some(value) = &header {
        request
            .headers_mut()
            .insert(CORRELATION_HEADER, value.clone());
    }

    let span = tracing::info_span!("http_request", correlation_id = %correlation_id);
    let mut response = next.run(request).instrument(span).await;

    if let Some(value) = header {
        response.headers_mut().insert(CORRELATION_HEADER, value);
    }
    response
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Fraud Detection API",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Batch fraud prediction for insurance claim spreadsheets",
        "endpoints": {
            "POST /predict": "Upload a .csv, .xlsx or .xls file of claims (multipart field 'file')",
            "GET /model": "Describe the loaded model",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.model.is_some();
    Json(HealthResponse {
        status: if model_loaded { "healthy" } else { "degraded" }.to_string(),
        model_loaded,
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

async fn model_info(State(state): State<AppState>) -> ApiResult<ModelInfo> {
    let model = state.require_model()?;
    Ok(Json(model.describe()))
}

struct Upload {
    file_name: String,
    format: FileFormat,
    bytes: Bytes,
}

/// Finds the upload part. The file name is checked before the part body is
/// read.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let format = FileFormat::from_filename(&file_name)?;
        let bytes = field.bytes().await?;
        return Ok(Upload {
            file_name,
            format,
            bytes,
        });
    }

    Err(ApiError::new(
        StatusCode::UNPROCESSABLE_ENTITY,
        format!("Field '{}' is required.", UPLOAD_FIELD),
    ))
}

async fn predict(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<BatchPrediction> {
    // checked before the upload is touched
    let model = state.require_model()?;
    let mut multipart = multipart?;

    let upload = read_upload(&mut multipart).await?;
    info!(
        file_name = %upload.file_name,
        bytes = upload.bytes.len(),
        "Received claims file"
    );

    let Upload {
        file_name,
        format,
        bytes,
    } = upload;
    let batch = tokio::task::spawn_blocking(move || predict_file(&*model, format, &bytes))
        .await
        .map_err(|e| PredictError::from(ProcessingError::Worker(e.to_string())))??;

    info!(
        file_name = %file_name,
        total_claims = batch.summary.total_claims,
        fraud_cases = batch.summary.fraud_cases,
        "Prediction completed"
    );

    Ok(Json(batch))
}
