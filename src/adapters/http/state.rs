use std::path::PathBuf;
use std::sync::Arc;

use crate::application::services::DetectionService;
use crate::domain::model::InferenceConfig;

/// Estado compartido para los manejadores HTTP de Axum.
/// Siguiendo la Arquitectura Hexagonal, el estado contiene los servicios (Casos de Uso).
#[derive(Clone)]
pub struct HttpState {
    /// Pipeline subida -> inferencia -> anotación -> persistencia.
    pub detection: Arc<DetectionService>,
    /// Configuración de inferencia activa (solo lectura).
    pub inference: Arc<InferenceConfig>,
    pub site: Arc<SiteConfig>,
}

/// Rutas y límites de la parte web.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub templates_dir: PathBuf,
    pub static_dir: PathBuf,
    pub max_upload_bytes: usize,
}
