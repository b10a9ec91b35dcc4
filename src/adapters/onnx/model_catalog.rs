use async_trait::async_trait;
use std::path::Path;

use crate::application::ports::ModelCatalogPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::ModelId;

pub struct OnnxModelCatalog;

impl OnnxModelCatalog {
    pub fn new() -> Self { Self }
}

impl Default for OnnxModelCatalog {
    fn default() -> Self { Self::new() }
}

#[async_trait]
impl ModelCatalogPort for OnnxModelCatalog {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()> {
        if model.onnx_path.trim().is_empty() {
            return Err(DomainError::InvalidInput("onnx_path empty".into()));
        }
        let path = Path::new(&model.onnx_path);
        if !path.is_file() {
            return Err(DomainError::NotFound(format!("model file not found: {}", model.onnx_path)));
        }
        if path.extension().and_then(|e| e.to_str()) != Some("onnx") {
            return Err(DomainError::InvalidInput(format!("not an .onnx file: {}", model.onnx_path)));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_empty_and_missing_paths() {
        let catalog = OnnxModelCatalog::new();
        let empty = ModelId { name: "yolo".into(), onnx_path: "  ".into() };
        assert!(matches!(catalog.validate_model(&empty).await, Err(DomainError::InvalidInput(_))));

        let missing = ModelId::from_path("/definitely/not/here/yolo11n.onnx");
        assert!(matches!(catalog.validate_model(&missing).await, Err(DomainError::NotFound(_))));
    }

    #[tokio::test]
    async fn accepts_existing_onnx_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.onnx");
        std::fs::write(&path, b"onnx").unwrap();
        let model = ModelId::from_path(path.to_str().unwrap());
        assert!(OnnxModelCatalog::new().validate_model(&model).await.is_ok());

        let txt = dir.path().join("weights.pt");
        std::fs::write(&txt, b"pt").unwrap();
        let wrong = ModelId::from_path(txt.to_str().unwrap());
        assert!(matches!(
            OnnxModelCatalog::new().validate_model(&wrong).await,
            Err(DomainError::InvalidInput(_))
        ));
    }
}
