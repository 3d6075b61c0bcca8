use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("{0}")]
    Validation(String),
    #[error("unsupported facet dimension `{0}`")]
    UnsupportedDimension(String),
    #[error("{0}")]
    NotFound(String),
    #[error("catalog storage is unavailable")]
    Unavailable(String),
    #[error("internal error: {0}")]
    Internal(String),
}

impl CatalogError {
    pub fn validation(message: impl Into<String>) -> Self {
        CatalogError::Validation(message.into())
    }

    /// Message returned to the client. Backend details stay in the logs.
    pub fn public_message(&self) -> String {
        match self {
            CatalogError::Internal(_) => "Something went wrong".to_string(),
            other => other.to_string(),
        }
    }
}

impl From<StoreError> for CatalogError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Unavailable(reason) => CatalogError::Unavailable(reason),
            StoreError::Query(reason) | StoreError::Fixture(reason) => {
                CatalogError::Internal(reason)
            }
        }
    }
}

impl ResponseError for CatalogError {
    fn status_code(&self) -> StatusCode {
        match self {
            CatalogError::Validation(_) | CatalogError::UnsupportedDimension(_) => {
                StatusCode::BAD_REQUEST
            }
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            CatalogError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            CatalogError::Unavailable(reason) | CatalogError::Internal(reason) => {
                tracing::error!("Catalog request failed: {}", reason);
            }
            other => tracing::info!("Rejected catalog request: {}", other),
        }
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.public_message()
        }))
    }
}
