use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Caja detectada por el modelo, en píxeles de la imagen original.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
    pub class_id: usize,
    pub label: String,
}

impl Detection {
    /// Coordenadas enteras usadas para dibujar y persistir (truncadas hacia cero).
    pub fn pixel_box(&self) -> [i32; 4] {
        [self.x1 as i32, self.y1 as i32, self.x2 as i32, self.y2 as i32]
    }

    pub fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }
}

/// Registro estructurado por objeto, tal como se devuelve y se guarda en JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectionRecord {
    pub object_id: usize,
    pub class_name: String,
    pub confidence_score: String,
    pub bbox_coordinates: [i32; 4],
    pub relative_bbox_coordinates: [f64; 4],
}

impl DetectionRecord {
    pub fn new(object_id: usize, det: &Detection, img_width: u32, img_height: u32) -> Self {
        let bbox = det.pixel_box();
        Self {
            object_id,
            class_name: det.label.clone(),
            confidence_score: format_confidence(det.score),
            bbox_coordinates: bbox,
            relative_bbox_coordinates: relative_bbox(bbox, img_width, img_height),
        }
    }
}

/// Construye los registros de una imagen respetando el orden del modelo.
pub fn build_records(detections: &[Detection], img_width: u32, img_height: u32) -> Vec<DetectionRecord> {
    detections
        .iter()
        .enumerate()
        .map(|(i, det)| DetectionRecord::new(i, det, img_width, img_height))
        .collect()
}

pub fn format_confidence(score: f32) -> String {
    format!("{:.2}", score)
}

/// Normaliza una caja en píxeles al rango [0, 1], redondeando a 4 decimales.
pub fn relative_bbox(bbox: [i32; 4], img_width: u32, img_height: u32) -> [f64; 4] {
    let w = img_width.max(1) as f64;
    let h = img_height.max(1) as f64;
    let norm = |v: i32, size: f64| round4((v as f64 / size).clamp(0.0, 1.0));
    [norm(bbox[0], w), norm(bbox[1], h), norm(bbox[2], w), norm(bbox[3], h)]
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}

/// Resumen legible para logs: "2 person, 1 dog".
pub fn summarize_detections(detections: &[Detection]) -> String {
    let mut counts = BTreeMap::new();
    for det in detections {
        *counts.entry(det.label.as_str()).or_insert(0usize) += 1;
    }
    counts
        .iter()
        .map(|(label, count)| format!("{} {}", count, label))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn det(x1: f32, y1: f32, x2: f32, y2: f32, score: f32, label: &str) -> Detection {
        Detection { x1, y1, x2, y2, score, class_id: 0, label: label.to_string() }
    }

    #[test]
    fn record_keeps_model_order_and_formats_score() {
        let dets = vec![det(10.0, 20.0, 110.0, 220.0, 0.876, "person"), det(0.0, 0.0, 5.0, 5.0, 0.3, "dog")];
        let records = build_records(&dets, 200, 400);

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].object_id, 0);
        assert_eq!(records[0].class_name, "person");
        assert_eq!(records[0].confidence_score, "0.88");
        assert_eq!(records[0].bbox_coordinates, [10, 20, 110, 220]);
        assert_eq!(records[0].relative_bbox_coordinates, [0.05, 0.05, 0.55, 0.55]);
        assert_eq!(records[1].object_id, 1);
        assert_eq!(records[1].confidence_score, "0.30");
    }

    #[test]
    fn relative_bbox_stays_in_unit_range() {
        let rel = relative_bbox([-4, -1, 700, 900], 640, 480);
        assert!(rel.iter().all(|v| (0.0..=1.0).contains(v)));
        assert_eq!(rel, [0.0, 0.0, 1.0, 1.0]);
    }

    #[test]
    fn relative_bbox_rounds_to_four_decimals() {
        let rel = relative_bbox([1, 1, 2, 2], 3, 7);
        assert_eq!(rel, [0.3333, 0.1429, 0.6667, 0.2857]);
    }

    #[test]
    fn record_serializes_with_expected_keys() {
        let record = DetectionRecord::new(3, &det(1.0, 2.0, 3.0, 4.0, 0.5, "cat"), 10, 10);
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["object_id"], 3);
        assert_eq!(value["class_name"], "cat");
        assert_eq!(value["confidence_score"], "0.50");
        assert_eq!(value["relative_bbox_coordinates"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn summary_counts_labels() {
        let dets = vec![
            det(0.0, 0.0, 1.0, 1.0, 0.9, "person"),
            det(0.0, 0.0, 1.0, 1.0, 0.9, "dog"),
            det(0.0, 0.0, 1.0, 1.0, 0.9, "person"),
        ];
        assert_eq!(summarize_detections(&dets), "1 dog, 2 person");
        assert_eq!(summarize_detections(&[]), "");
    }
}
