use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::adapters::http::state::HttpState;
use crate::application::dto::{ConfigResponse, ErrorResponse, Upload};
use crate::domain::errors::DomainError;

const UPLOAD_FIELD: &str = "file";

pub async fn index(State(st): State<HttpState>) -> Response {
    let path = st.site.templates_dir.join("index.html");
    match tokio::fs::read_to_string(&path).await {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            error!("❌ No se pudo leer {}: {}", path.display(), e);
            error_response(DomainError::NotFound(format!("plantilla {}", path.display())))
        }
    }
}

pub async fn get_config(State(st): State<HttpState>) -> impl IntoResponse {
    Json(ConfigResponse::from(st.inference.as_ref()))
}

pub async fn detect(State(st): State<HttpState>, mut multipart: Multipart) -> Response {
    let upload = match read_upload(&mut multipart).await {
        Ok(upload) => upload,
        Err(resp) => return resp,
    };

    match st.detection.detect(upload).await {
        Ok(result) => Json(result).into_response(),
        Err(e) => error_response(e),
    }
}

/// Toma el campo `file`; si no existe, el primer campo que traiga nombre de fichero.
async fn read_upload(multipart: &mut Multipart) -> Result<Upload, Response> {
    let mut fallback: Option<Upload> = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let is_upload_field = field.name() == Some(UPLOAD_FIELD);
        let filename = field.file_name().map(str::to_string);
        if !is_upload_field && (filename.is_none() || fallback.is_some()) {
            continue;
        }

        let bytes = field.bytes().await.map_err(multipart_error)?;
        let upload = Upload { filename, bytes: bytes.to_vec() };
        if is_upload_field {
            return Ok(upload);
        }
        fallback = Some(upload);
    }

    fallback.ok_or_else(|| {
        error_response(DomainError::InvalidInput(format!("falta el campo '{}'", UPLOAD_FIELD)))
    })
}

fn multipart_error(e: MultipartError) -> Response {
    warn!("Multipart inválido: {}", e.body_text());
    (e.status(), Json(ErrorResponse { error: e.body_text() })).into_response()
}

pub fn status_for(e: &DomainError) -> StatusCode {
    match e {
        DomainError::InvalidInput(_) | DomainError::Decode(_) => StatusCode::BAD_REQUEST,
        DomainError::NotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Inference(_) | DomainError::Storage(_) | DomainError::OperationFailed(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

pub fn error_response(e: DomainError) -> Response {
    let status = status_for(&e);
    if status.is_server_error() {
        error!("❌ {}", e);
    } else {
        warn!("{}", e);
    }
    (status, Json(ErrorResponse { error: e.to_string() })).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_errors_map_to_4xx() {
        assert_eq!(status_for(&DomainError::Decode("bad".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&DomainError::InvalidInput("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&DomainError::NotFound("x".into())), StatusCode::NOT_FOUND);
    }

    #[test]
    fn everything_else_is_a_server_error() {
        assert_eq!(status_for(&DomainError::Inference("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(status_for(&DomainError::Storage("x".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
