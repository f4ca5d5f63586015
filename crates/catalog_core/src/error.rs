use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("unauthorized: {0}")]
    Unauthorized(String),

    #[error("catalog API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("transport: {0}")]
    Transport(String),

    #[error("serialization: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl CatalogError {
    pub fn http_status(&self) -> u16 {
        match self {
            Self::NotFound(_) => 404,
            Self::Conflict(_) => 409,
            Self::Unauthorized(_) => 401,
            Self::Api { status, .. } => *status,
            Self::Transport(_) => 502,
            Self::Serialization(_) => 500,
        }
    }

    /// Map a non-success HTTP status onto the taxonomy.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::Unauthorized(message),
            404 => Self::NotFound(message),
            409 => Self::Conflict(message),
            _ => Self::Api { status, message },
        }
    }
}
