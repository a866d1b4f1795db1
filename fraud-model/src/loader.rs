use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::{classifier::Classifier, error::ArtifactError, pipeline::PipelineModel};

/// Artifact file name looked up next to the service executable.
pub const DEFAULT_MODEL_FILE: &str = "fraud_detection_model.json";

/// Directory containing the running executable, so artifact lookup does not
/// depend on the working directory the process was started from.
pub fn service_base_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Relative paths are resolved against `base_dir`; no path means the default
/// artifact file inside `base_dir`.
pub fn resolve_model_path(base_dir: &Path, configured: Option<&Path>) -> PathBuf {
    match configured {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => base_dir.join(path),
        None => base_dir.join(DEFAULT_MODEL_FILE),
    }
}

/// Reads and validates an artifact.
pub async fn read_model(path: &Path) -> Result<PipelineModel, ArtifactError> {
    let bytes = tokio::fs::read(path).await?;
    PipelineModel::from_json(&bytes)
}

/// Startup load. Failures are logged and yield `None` so the service can still
/// come up and report itself unavailable.
pub async fn load_model(path: &Path) -> Option<Arc<dyn Classifier>> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        warn!(path = %path.display(), "Model file not found");
        return None;
    }

    match read_model(path).await {
        Ok(model) => {
            let info = model.describe();
            info!(
                path = %path.display(),
                name = %info.name,
                estimator = ?info.steps.last().map(|s| s.kind.as_str()),
                "Model loaded successfully."
            );
            Some(Arc::new(model))
        }
        Err(e) => {
            error!(path = %path.display(), error = %e, "Error loading model");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::amount_model_json;
    use std::io::Write;

    #[test]
    fn resolves_relative_to_base_dir() {
        let base = Path::new("/srv/fraud/bin");
        assert_eq!(
            resolve_model_path(base, None),
            PathBuf::from("/srv/fraud/bin/fraud_detection_model.json")
        );
        assert_eq!(
            resolve_model_path(base, Some(Path::new("../models/m.json"))),
            PathBuf::from("/srv/fraud/bin/../models/m.json")
        );
        assert_eq!(
            resolve_model_path(base, Some(Path::new("/opt/m.json"))),
            PathBuf::from("/opt/m.json")
        );
    }

    #[tokio::test]
    async fn loads_valid_artifact() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(amount_model_json().to_string().as_bytes())
            .unwrap();

        let model = load_model(file.path()).await;
        assert!(model.is_some());
        assert_eq!(model.unwrap().describe().classes, vec![0, 1]);
    }

    #[tokio::test]
    async fn missing_artifact_leaves_model_unset() {
        let dir = tempfile::tempdir().unwrap();
        let model = load_model(&dir.path().join("absent.json")).await;
        assert!(model.is_none());
    }

    #[tokio::test]
    async fn corrupt_artifact_leaves_model_unset() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"\x80\x04\x95 pickled bytes").unwrap();

        assert!(load_model(file.path()).await.is_none());
        assert!(matches!(
            read_model(file.path()).await,
            Err(ArtifactError::Json(_))
        ));
    }
}
