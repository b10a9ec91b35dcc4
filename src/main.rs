use std::sync::Arc;

use clap::Parser;
use yolo_detect_server::{
    adapters::{
        http::{router, state::HttpState},
        onnx::{model_catalog::OnnxModelCatalog, yolo_engine::OnnxYoloEngine},
        render::annotator::PaletteAnnotator,
        storage::fs_store::FsArtifactStore,
    },
    application::{ports::ModelCatalogPort, services::DetectionService},
    config::Settings,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Inicializar logs (RUST_LOG=info por defecto)
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    tracing_subscriber::fmt::init();

    let settings = Settings::parse();
    let infer = settings.inference_config();

    tracing::info!("🔧 Inicializando adaptadores de infraestructura...");

    // 2. Validar y cargar el modelo antes de aceptar peticiones
    OnnxModelCatalog::new().validate_model(&infer.model).await?;
    let intra_threads = settings.intra_threads;
    let engine = {
        let infer = infer.clone();
        tokio::task::spawn_blocking(move || OnnxYoloEngine::load(&infer, intra_threads)).await??
    };

    // 3. Directorios de persistencia y copia web
    let store = FsArtifactStore::new(settings.storage_layout());
    store.ensure_dirs().await?;

    // 4. Servicio (Capa de Aplicación)
    let detection = Arc::new(DetectionService::new(
        Arc::new(engine),
        Arc::new(PaletteAnnotator::new(settings.seed)),
        Arc::new(store),
        settings.jpeg_quality,
    ));

    let state = HttpState {
        detection,
        inference: Arc::new(infer),
        site: Arc::new(settings.site_config()),
    };

    // 5. Router de Axum (incluye /static)
    let app = router(state);

    // 6. Lanzar el Servidor
    let addr = settings.bind_addr();
    tracing::info!("🚀 Servidor de detección iniciado en http://{}", addr);
    tracing::info!("📂 Datos en '{}', estáticos en '{}'", settings.data_dir.display(), settings.static_dir.display());

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
