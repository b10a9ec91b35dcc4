use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::application::ports::ArtifactStorePort;
use crate::domain::{
    artifact::{
        base_name, display_file_name, input_file_name, json_file_name, output_file_name,
        ArtifactRequest, StoredArtifacts,
    },
    detection::DetectionRecord,
    errors::{DomainError, DomainResult},
};

/// Directorios donde se guardan los artefactos de cada petición.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub inputs: PathBuf,
    pub outputs: PathBuf,
    pub json: PathBuf,
    /// Copias para mostrar en la web (servidas bajo `display_url_prefix`).
    pub display: PathBuf,
    pub display_url_prefix: String,
}

impl StorageLayout {
    /// `<data_dir>/{inputs,outputs,json}` y `<static_dir>/outputs` servido en `/static/outputs`.
    pub fn new(data_dir: impl AsRef<Path>, static_dir: impl AsRef<Path>) -> Self {
        let data_dir = data_dir.as_ref();
        Self {
            inputs: data_dir.join("inputs"),
            outputs: data_dir.join("outputs"),
            json: data_dir.join("json"),
            display: static_dir.as_ref().join("outputs"),
            display_url_prefix: "/static/outputs".to_string(),
        }
    }

    fn dirs(&self) -> [&Path; 4] {
        [
            self.inputs.as_path(),
            self.outputs.as_path(),
            self.json.as_path(),
            self.display.as_path(),
        ]
    }
}

pub struct FsArtifactStore {
    layout: StorageLayout,
    // Serializa el cálculo del siguiente id y la escritura de cada conjunto.
    write_lock: Mutex<()>,
}

impl FsArtifactStore {
    pub fn new(layout: StorageLayout) -> Self {
        Self { layout, write_lock: Mutex::new(()) }
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Crea todos los directorios (idempotente). Se llama al arrancar.
    pub async fn ensure_dirs(&self) -> DomainResult<()> {
        for dir in self.layout.dirs() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| DomainError::Storage(format!("{}: {}", dir.display(), e)))?;
        }
        Ok(())
    }

    /// Número de entradas en `inputs` y los nombres sin extensión ya usados.
    async fn scan_inputs(&self) -> DomainResult<(u64, HashSet<String>)> {
        let mut entries = fs::read_dir(&self.layout.inputs).await?;
        let mut count = 0;
        let mut stems = HashSet::new();
        while let Some(entry) = entries.next_entry().await? {
            count += 1;
            if let Some(stem) = Path::new(&entry.file_name()).file_stem().and_then(|s| s.to_str()) {
                stems.insert(stem.to_string());
            }
        }
        Ok((count, stems))
    }

    /// Un id está ocupado si existe `imageN.*` en inputs o cualquiera de sus salidas.
    async fn id_taken(&self, id: u64, stems: &HashSet<String>) -> DomainResult<bool> {
        if stems.contains(&base_name(id)) {
            return Ok(true);
        }
        Ok(fs::try_exists(self.layout.outputs.join(output_file_name(id))).await?
            || fs::try_exists(self.layout.json.join(json_file_name(id))).await?)
    }

    /// Reserva `imageN<ext>` con create-new; si el id está ocupado, prueba N+1.
    async fn claim_input(&self, extension: &str) -> DomainResult<(u64, PathBuf, fs::File)> {
        let (count, stems) = self.scan_inputs().await?;
        let mut id = count + 1;
        loop {
            if self.id_taken(id, &stems).await? {
                debug!("image{} ya está en uso, probando image{}", id, id + 1);
                id += 1;
                continue;
            }
            let path = self.layout.inputs.join(input_file_name(id, extension));
            match OpenOptions::new().write(true).create_new(true).open(&path).await {
                Ok(file) => return Ok((id, path, file)),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    debug!("{} ya existe, probando image{}", path.display(), id + 1);
                    id += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    async fn claim_display(&self, id: u64) -> DomainResult<(PathBuf, String)> {
        let timestamp = chrono::Utc::now().timestamp();
        let mut name = display_file_name(timestamp);
        if fs::try_exists(self.layout.display.join(&name)).await? {
            name = format!("output_{}_{}.jpg", timestamp, id);
        }
        let url = format!("{}/{}", self.layout.display_url_prefix.trim_end_matches('/'), name);
        Ok((self.layout.display.join(name), url))
    }

    async fn write_set(
        &self,
        id: u64,
        mut input_file: fs::File,
        request: &ArtifactRequest,
        written: &mut Vec<PathBuf>,
    ) -> DomainResult<(PathBuf, PathBuf, PathBuf, String)> {
        input_file.write_all(&request.input_bytes).await?;
        input_file.flush().await?;

        let output_path = self.layout.outputs.join(output_file_name(id));
        write_new(&output_path, &request.output_jpeg, written).await?;

        let json_path = self.layout.json.join(json_file_name(id));
        write_new(&json_path, &records_to_json(&request.records)?, written).await?;

        let (display_path, display_url) = self.claim_display(id).await?;
        write_new(&display_path, &request.output_jpeg, written).await?;

        Ok((output_path, json_path, display_path, display_url))
    }
}

/// Crea `path` sin pisar nada y lo apunta en `written` en cuanto existe.
async fn write_new(path: &Path, bytes: &[u8], written: &mut Vec<PathBuf>) -> DomainResult<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path).await?;
    written.push(path.to_path_buf());
    file.write_all(bytes).await?;
    file.flush().await?;
    Ok(())
}

#[async_trait]
impl ArtifactStorePort for FsArtifactStore {
    async fn persist(&self, request: ArtifactRequest) -> DomainResult<StoredArtifacts> {
        let _guard = self.write_lock.lock().await;

        let (id, input_path, input_file) = self.claim_input(&request.input_extension).await?;
        let mut written = vec![input_path.clone()];

        match self.write_set(id, input_file, &request, &mut written).await {
            Ok((output_path, json_path, display_path, display_url)) => Ok(StoredArtifacts {
                id,
                input_path,
                output_path,
                json_path,
                display_path,
                display_url,
            }),
            Err(e) => {
                warn!("⚠️ Guardado de image{} incompleto, deshaciendo: {}", id, e);
                for path in &written {
                    if let Err(rm) = fs::remove_file(path).await {
                        warn!("No se pudo borrar {}: {}", path.display(), rm);
                    }
                }
                Err(e)
            }
        }
    }
}

/// JSON con sangría de 4 espacios.
pub fn records_to_json(records: &[DetectionRecord]) -> DomainResult<Vec<u8>> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    records
        .serialize(&mut ser)
        .map_err(|e| DomainError::Storage(format!("serializando JSON: {}", e)))?;
    Ok(buf)
}
