use thiserror::Error;

#[derive(Debug, Error)]
pub enum TabulationError {
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    #[error("{0}")]
    BadParams(String),

    #[error("retrieval failed: {0}")]
    Retrieval(#[from] rusqlite::Error),
}

impl TabulationError {
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }

    /// Stable machine-readable code carried in IPC error responses.
    pub fn code(&self) -> &'static str {
        match self {
            TabulationError::NotFound { .. } => "not_found",
            TabulationError::BadParams(_) => "bad_params",
            TabulationError::Retrieval(_) => "db_query_failed",
        }
    }
}

pub type TabulationResult<T> = Result<T, TabulationError>;
