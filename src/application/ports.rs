use async_trait::async_trait;
use image::RgbImage;

use crate::domain::{
    artifact::{ArtifactRequest, StoredArtifacts},
    detection::Detection,
    errors::DomainResult,
    model::ModelId,
};

/// Motor de detección. Es CPU-bound y bloqueante: llamar desde `spawn_blocking`.
pub trait DetectorPort: Send + Sync {
    fn detect(&self, image: &RgbImage) -> DomainResult<Vec<Detection>>;
}

/// Dibuja cajas y etiquetas sobre una copia de la imagen.
pub trait AnnotatorPort: Send + Sync {
    fn annotate(&self, image: &RgbImage, detections: &[Detection]) -> RgbImage;
}

#[async_trait]
pub trait ArtifactStorePort: Send + Sync {
    async fn persist(&self, request: ArtifactRequest) -> DomainResult<StoredArtifacts>;
}

#[async_trait]
pub trait ModelCatalogPort: Send + Sync {
    async fn validate_model(&self, model: &ModelId) -> DomainResult<()>;
}
