use anyhow::{anyhow, Context, Result};
use image::{imageops::FilterType, RgbImage};
use ndarray::{s, Array4, ArrayView2, ArrayViewD, Axis, Ix3, IxDyn};
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Tensor;
use std::fs;
use std::sync::Mutex;
use tracing::{info, warn};

use crate::adapters::onnx::classes::{default_names, parse_names};
use crate::application::ports::DetectorPort;
use crate::domain::detection::Detection;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::model::{InferenceConfig, YoloParams};

/// Motor YOLO (v8/11, salida `[1, 4 + clases, candidatos]`) sobre ONNX Runtime.
pub struct OnnxYoloEngine {
    // `Session::run` necesita acceso exclusivo.
    session: Mutex<Session>,
    classes: Vec<String>,
    params: YoloParams,
}

impl OnnxYoloEngine {
    pub fn load(config: &InferenceConfig, intra_threads: usize) -> Result<Self> {
        #[allow(unused_mut)]
        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(intra_threads)?;

        // CUDA es opcional: si el proveedor no arranca, ONNX Runtime sigue en CPU.
        #[cfg(feature = "cuda")]
        {
            builder = builder.with_execution_providers([CUDAExecutionProvider::default().build()])?;
        }

        let path = &config.model.onnx_path;
        let model_bytes = fs::read(path).with_context(|| format!("leyendo modelo {}", path))?;
        let session = builder.commit_from_memory(&model_bytes)?;

        let classes = match read_metadata_names(&session) {
            Some(names) => names,
            None => {
                warn!("⚠️ El modelo no declara `names`; se usan las 80 clases COCO");
                default_names()
            }
        };

        info!(
            "🧠 Modelo {} cargado ({} clases, imgsz {})",
            config.model.name,
            classes.len(),
            config.params.input_size
        );

        Ok(Self {
            session: Mutex::new(session),
            classes,
            params: config.params.clone(),
        })
    }

    pub fn infer(&self, rgb: &RgbImage) -> Result<Vec<Detection>> {
        let input = to_input_array(rgb, self.params.input_size);
        let input_tensor = Tensor::from_array(input)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("sesión ONNX envenenada"))?;
        let outputs = session.run(ort::inputs![input_tensor])?;
        let (shape_out, data_out) = outputs[0].try_extract_tensor::<f32>()?;

        let dims: Vec<usize> = shape_out.iter().map(|&x| x as usize).collect();
        let array_view = ArrayViewD::from_shape(IxDyn(&dims), data_out)?;
        let view = array_view
            .into_dimensionality::<Ix3>()
            .context("la salida del modelo debería tener 3 dimensiones")?;

        Ok(decode_output(
            view.index_axis(Axis(0), 0),
            &self.classes,
            &self.params,
            rgb.width(),
            rgb.height(),
        ))
    }
}

impl DetectorPort for OnnxYoloEngine {
    fn detect(&self, image: &RgbImage) -> DomainResult<Vec<Detection>> {
        self.infer(image)
            .map_err(|e| DomainError::Inference(format!("{:#}", e)))
    }
}

fn read_metadata_names(session: &Session) -> Option<Vec<String>> {
    let metadata = session.metadata().ok()?;
    let raw = metadata.custom("names").unwrap_or(None)?;
    parse_names(&raw)
}

/// Redimensiona a `imgsz x imgsz` y pasa a NCHW en [0, 1].
pub fn to_input_array(rgb: &RgbImage, imgsz: u32) -> Array4<f32> {
    let resized = image::imageops::resize(rgb, imgsz, imgsz, FilterType::Triangle);
    let size = imgsz as usize;

    let mut input = Array4::<f32>::zeros((1, 3, size, size));
    for (x, y, pixel) in resized.enumerate_pixels() {
        input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
        input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
        input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
    }
    input
}

/// Convierte la salida `[4 + clases, candidatos]` en detecciones sobre la imagen original:
/// umbral de confianza, NMS por clase, orden descendente y recorte a `max_detections`.
pub fn decode_output(
    output: ArrayView2<f32>,
    classes: &[String],
    params: &YoloParams,
    img_width: u32,
    img_height: u32,
) -> Vec<Detection> {
    if output.shape()[0] <= 4 {
        return Vec::new();
    }

    let num_candidates = output.shape()[1];
    let imgsz = params.input_size as f32;
    let sx = img_width as f32 / imgsz;
    let sy = img_height as f32 / imgsz;
    let max_x = img_width as f32;
    let max_y = img_height as f32;

    let mut detections = Vec::new();

    for i in 0..num_candidates {
        let scores = output.slice(s![4.., i]);
        let Some((class_id, &max_score)) = scores
            .indexed_iter()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };

        if max_score <= params.conf_threshold {
            continue;
        }

        let cx = output[[0, i]];
        let cy = output[[1, i]];
        let w = output[[2, i]];
        let h = output[[3, i]];

        detections.push(Detection {
            x1: ((cx - w / 2.0) * sx).clamp(0.0, max_x),
            y1: ((cy - h / 2.0) * sy).clamp(0.0, max_y),
            x2: ((cx + w / 2.0) * sx).clamp(0.0, max_x),
            y2: ((cy + h / 2.0) * sy).clamp(0.0, max_y),
            score: max_score,
            class_id,
            label: classes
                .get(class_id)
                .filter(|name| !name.is_empty())
                .cloned()
                .unwrap_or_else(|| format!("class_{}", class_id)),
        });
    }

    detections.sort_by(|a, b| b.score.total_cmp(&a.score));
    let mut kept = non_max_suppression(detections, params.iou_threshold);
    kept.truncate(params.max_detections);
    kept
}

/// NMS voraz por clase. Espera las cajas ordenadas por confianza descendente.
pub fn non_max_suppression(mut boxes: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    let mut result = Vec::new();
    while !boxes.is_empty() {
        let current = boxes.remove(0);
        boxes.retain(|other| other.class_id != current.class_id || iou(&current, other) <= iou_threshold);
        result.push(current);
    }
    result
}

fn iou(a: &Detection, b: &Detection) -> f32 {
    let x1 = a.x1.max(b.x1);
    let y1 = a.y1.max(b.y1);
    let x2 = a.x2.min(b.x2);
    let y2 = a.y2.min(b.y2);
    let inter = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
    let union = a.area() + b.area() - inter;
    if union <= 0.0 {
        0.0
    } else {
        inter / union
    }
}
