use clap::Parser;
use std::path::PathBuf;

use crate::adapters::http::state::SiteConfig;
use crate::adapters::storage::fs_store::StorageLayout;
use crate::domain::model::{InferenceConfig, ModelId, YoloParams};

/// Servidor de detección YOLO: sube una imagen, recibe cajas anotadas y JSON.
#[derive(Parser, Debug, Clone)]
#[command(name = "yolo-detect-server", version, about, long_about = None)]
pub struct Settings {
    #[arg(long, env = "DETECT_HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "DETECT_PORT", default_value_t = 8000)]
    pub port: u16,

    /// Modelo YOLO exportado a ONNX
    #[arg(long = "model", env = "DETECT_MODEL", default_value = "models/yolo11n.onnx")]
    pub model_path: String,

    #[arg(long, default_value_t = 640)]
    pub input_size: u32,

    /// Umbral de confianza
    #[arg(long = "conf", default_value_t = 0.25)]
    pub conf_threshold: f32,

    /// Umbral IoU para NMS
    #[arg(long = "iou", default_value_t = 0.7)]
    pub iou_threshold: f32,

    #[arg(long = "max-det", default_value_t = 300)]
    pub max_detections: usize,

    #[arg(long, default_value_t = 4)]
    pub intra_threads: usize,

    #[arg(long, env = "DETECT_DATA_DIR", default_value = "saved_data")]
    pub data_dir: PathBuf,

    #[arg(long, default_value = "static")]
    pub static_dir: PathBuf,

    #[arg(long, default_value = "templates")]
    pub templates_dir: PathBuf,

    #[arg(long, default_value_t = 95)]
    pub jpeg_quality: u8,

    #[arg(long, default_value_t = 50)]
    pub max_upload_mb: usize,

    /// Semilla para los colores de las etiquetas (salida reproducible)
    #[arg(long)]
    pub seed: Option<u64>,
}

impl Settings {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn inference_config(&self) -> InferenceConfig {
        InferenceConfig {
            model: ModelId::from_path(&self.model_path),
            params: YoloParams {
                input_size: self.input_size,
                conf_threshold: self.conf_threshold.clamp(0.0, 1.0),
                iou_threshold: self.iou_threshold.clamp(0.0, 1.0),
                max_detections: self.max_detections,
            },
        }
    }

    pub fn storage_layout(&self) -> StorageLayout {
        StorageLayout::new(&self.data_dir, &self.static_dir)
    }

    pub fn site_config(&self) -> SiteConfig {
        SiteConfig {
            templates_dir: self.templates_dir.clone(),
            static_dir: self.static_dir.clone(),
            max_upload_bytes: self.max_upload_mb.max(1) * 1024 * 1024,
        }
    }
}
