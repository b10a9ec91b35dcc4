use thiserror::Error;

#[derive(Debug, Error)]
pub enum DomainError {
    #[error("No encontrado: {0}")]
    NotFound(String),
    #[error("Entrada inválida: {0}")]
    InvalidInput(String),
    #[error("Imagen no decodificable: {0}")]
    Decode(String),
    #[error("Fallo de inferencia: {0}")]
    Inference(String),
    #[error("Error de almacenamiento: {0}")]
    Storage(String),
    #[error("Error de operación: {0}")]
    OperationFailed(String),
}

impl From<std::io::Error> for DomainError {
    fn from(e: std::io::Error) -> Self {
        DomainError::Storage(e.to_string())
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
