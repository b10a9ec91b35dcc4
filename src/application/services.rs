use std::sync::Arc;
use std::time::Instant;

use image::{codecs::jpeg::JpegEncoder, RgbImage};
use tracing::info;

use crate::{
    application::{
        dto::{DetectResponse, Upload},
        ports::{AnnotatorPort, ArtifactStorePort, DetectorPort},
    },
    domain::{
        artifact::{extension_from_filename, ArtifactRequest},
        detection::{build_records, summarize_detections, DetectionRecord},
        errors::{DomainError, DomainResult},
    },
};

/// Resultado de pasar una imagen por el modelo y el anotador.
pub struct AnnotatedImage {
    pub image: RgbImage,
    pub records: Vec<DetectionRecord>,
}

/// Caso de uso principal: subida -> decodificación -> inferencia -> anotación -> persistencia.
#[derive(Clone)]
pub struct DetectionService {
    detector: Arc<dyn DetectorPort>,
    annotator: Arc<dyn AnnotatorPort>,
    store: Arc<dyn ArtifactStorePort>,
    jpeg_quality: u8,
}

impl DetectionService {
    pub fn new(
        detector: Arc<dyn DetectorPort>,
        annotator: Arc<dyn AnnotatorPort>,
        store: Arc<dyn ArtifactStorePort>,
        jpeg_quality: u8,
    ) -> Self {
        Self {
            detector,
            annotator,
            store,
            jpeg_quality: jpeg_quality.clamp(1, 100),
        }
    }

    pub async fn detect(&self, upload: Upload) -> DomainResult<DetectResponse> {
        if upload.bytes.is_empty() {
            return Err(DomainError::InvalidInput("el fichero subido está vacío".into()));
        }

        let detector = self.detector.clone();
        let annotator = self.annotator.clone();
        let quality = self.jpeg_quality;
        let Upload { filename, bytes } = upload;

        // Decodificar, inferir y codificar es trabajo de CPU: fuera del runtime async.
        let (annotated, output_jpeg, bytes) = tokio::task::spawn_blocking(move || {
            let image = decode_image(&bytes)?;
            let annotated = detect_and_annotate(detector.as_ref(), annotator.as_ref(), &image)?;
            let jpeg = encode_jpeg(&annotated.image, quality)?;
            Ok::<_, DomainError>((annotated, jpeg, bytes))
        })
        .await
        .map_err(|e| DomainError::OperationFailed(format!("tarea de inferencia abortada: {}", e)))??;

        let stored = self
            .store
            .persist(ArtifactRequest {
                input_bytes: bytes,
                input_extension: extension_from_filename(filename.as_deref()),
                output_jpeg,
                records: annotated.records.clone(),
            })
            .await?;

        info!(
            "📦 image{} guardada ({} objetos) -> {}",
            stored.id,
            annotated.records.len(),
            stored.display_url
        );

        Ok(DetectResponse {
            json_output: annotated.records,
            image_url: stored.display_url,
        })
    }
}

pub fn decode_image(bytes: &[u8]) -> DomainResult<RgbImage> {
    let img = image::load_from_memory(bytes).map_err(|e| DomainError::Decode(e.to_string()))?;
    Ok(img.to_rgb8())
}

/// Una sola llamada al modelo por imagen; los registros siguen el orden del modelo.
pub fn detect_and_annotate(
    detector: &dyn DetectorPort,
    annotator: &dyn AnnotatorPort,
    image: &RgbImage,
) -> DomainResult<AnnotatedImage> {
    let t_infer = Instant::now();
    let detections = detector.detect(image)?;
    let infer_ms = t_infer.elapsed().as_secs_f32() * 1000.0;

    info!(
        "🔍 {}x{} en {:.1} ms: [{}]",
        image.width(),
        image.height(),
        infer_ms,
        summarize_detections(&detections)
    );

    let annotated = annotator.annotate(image, &detections);
    let records = build_records(&detections, image.width(), image.height());

    Ok(AnnotatedImage {
        image: annotated,
        records,
    })
}

pub fn encode_jpeg(image: &RgbImage, quality: u8) -> DomainResult<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, quality)
        .encode_image(image)
        .map_err(|e| DomainError::OperationFailed(format!("codificación JPEG: {}", e)))?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::Rgb;
    use std::path::PathBuf;
    use std::sync::Mutex;

    use crate::domain::{artifact::StoredArtifacts, detection::Detection};

    struct FixedDetector(Vec<Detection>);

    impl DetectorPort for FixedDetector {
        fn detect(&self, _image: &RgbImage) -> DomainResult<Vec<Detection>> {
            Ok(self.0.clone())
        }
    }

    struct FailingDetector;

    impl DetectorPort for FailingDetector {
        fn detect(&self, _image: &RgbImage) -> DomainResult<Vec<Detection>> {
            Err(DomainError::Inference("session run failed".into()))
        }
    }

    struct NoopAnnotator;

    impl AnnotatorPort for NoopAnnotator {
        fn annotate(&self, image: &RgbImage, _detections: &[Detection]) -> RgbImage {
            image.clone()
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        requests: Mutex<Vec<ArtifactRequest>>,
    }

    #[async_trait]
    impl ArtifactStorePort for MemoryStore {
        async fn persist(&self, request: ArtifactRequest) -> DomainResult<StoredArtifacts> {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            let id = requests.len() as u64;
            Ok(StoredArtifacts {
                id,
                input_path: PathBuf::from(format!("inputs/image{}", id)),
                output_path: PathBuf::from(format!("outputs/image{}_output.jpg", id)),
                json_path: PathBuf::from(format!("json/image{}_data.json", id)),
                display_path: PathBuf::from("static/outputs/output_1.jpg"),
                display_url: "/static/outputs/output_1.jpg".into(),
            })
        }
    }

    fn png_bytes(w: u32, h: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(w, h, Rgb([30, 60, 90]));
        let mut buf = std::io::Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn person() -> Detection {
        Detection { x1: 4.0, y1: 8.0, x2: 40.0, y2: 60.0, score: 0.91, class_id: 0, label: "person".into() }
    }

    #[tokio::test]
    async fn detect_returns_one_record_per_detection() {
        let store = Arc::new(MemoryStore::default());
        let service = DetectionService::new(
            Arc::new(FixedDetector(vec![person(), person()])),
            Arc::new(NoopAnnotator),
            store.clone(),
            90,
        );

        let response = service
            .detect(Upload { filename: Some("cam.PNG".into()), bytes: png_bytes(80, 64) })
            .await
            .unwrap();

        assert_eq!(response.json_output.len(), 2);
        assert_eq!(response.json_output[1].object_id, 1);
        assert_eq!(response.json_output[0].confidence_score, "0.91");
        assert_eq!(response.image_url, "/static/outputs/output_1.jpg");

        let requests = store.requests.lock().unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].input_extension, ".png");
        assert_eq!(requests[0].records.len(), 2);
        // El JPEG anotado debe poder leerse de nuevo.
        let out = image::load_from_memory(&requests[0].output_jpeg).unwrap();
        assert_eq!((out.width(), out.height()), (80, 64));
    }

    #[tokio::test]
    async fn undecodable_upload_is_a_decode_error() {
        let service = DetectionService::new(
            Arc::new(FixedDetector(vec![])),
            Arc::new(NoopAnnotator),
            Arc::new(MemoryStore::default()),
            90,
        );
        let err = service
            .detect(Upload { filename: Some("x.jpg".into()), bytes: b"not an image".to_vec() })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Decode(_)));
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let service = DetectionService::new(
            Arc::new(FixedDetector(vec![])),
            Arc::new(NoopAnnotator),
            Arc::new(MemoryStore::default()),
            90,
        );
        let err = service.detect(Upload { filename: None, bytes: vec![] }).await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn inference_failure_persists_nothing() {
        let store = Arc::new(MemoryStore::default());
        let service = DetectionService::new(Arc::new(FailingDetector), Arc::new(NoopAnnotator), store.clone(), 90);
        let err = service
            .detect(Upload { filename: None, bytes: png_bytes(16, 16) })
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Inference(_)));
        assert!(store.requests.lock().unwrap().is_empty());
    }
}
