use serde::{Deserialize, Serialize};

use crate::domain::{
    detection::DetectionRecord,
    model::{InferenceConfig, YoloParams},
};

/// Fichero recibido por `POST /detect`.
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectResponse {
    pub json_output: Vec<DetectionRecord>,
    pub image_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub model_name: String,
    pub model_path: String,
    pub yolo: YoloParams,
}

impl From<&InferenceConfig> for ConfigResponse {
    fn from(c: &InferenceConfig) -> Self {
        Self {
            model_name: c.model.name.clone(),
            model_path: c.model.onnx_path.clone(),
            yolo: c.params.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
