use serde::Serialize;
use std::path::PathBuf;

use super::detection::DetectionRecord;

pub const DEFAULT_EXTENSION: &str = ".jpg";

/// Todo lo que produce una petición y debe quedar en disco.
#[derive(Debug, Clone)]
pub struct ArtifactRequest {
    pub input_bytes: Vec<u8>,
    /// Extensión con punto, ya saneada (".png").
    pub input_extension: String,
    pub output_jpeg: Vec<u8>,
    pub records: Vec<DetectionRecord>,
}

/// Rutas escritas para una petición.
#[derive(Debug, Clone, Serialize)]
pub struct StoredArtifacts {
    pub id: u64,
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub json_path: PathBuf,
    pub display_path: PathBuf,
    pub display_url: String,
}

pub fn base_name(id: u64) -> String {
    format!("image{}", id)
}

pub fn input_file_name(id: u64, extension: &str) -> String {
    format!("{}{}", base_name(id), extension)
}

pub fn output_file_name(id: u64) -> String {
    format!("{}_output.jpg", base_name(id))
}

pub fn json_file_name(id: u64) -> String {
    format!("{}_data.json", base_name(id))
}

pub fn display_file_name(timestamp: i64) -> String {
    format!("output_{}.jpg", timestamp)
}

/// Extensión del fichero subido, en minúsculas y con punto.
/// Si falta o contiene algo raro se usa ".jpg".
pub fn extension_from_filename(filename: Option<&str>) -> String {
    let ext = filename
        .map(std::path::Path::new)
        .and_then(|p| p.extension())
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty() && e.len() <= 8 && e.chars().all(|c| c.is_ascii_alphanumeric()));

    match ext {
        Some(e) => format!(".{}", e.to_ascii_lowercase()),
        None => DEFAULT_EXTENSION.to_string(),
    }
}
