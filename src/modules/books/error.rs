use bookshelf_http::AppError;
use serde_json::json;
use thiserror::Error;

/// Failures raised by the catalog store and service.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Vec<serde_json::Value>,
    },

    #[error("{message}")]
    Conflict {
        message: String,
        details: Vec<serde_json::Value>,
    },

    #[error("{message}")]
    NotFound { message: String },

    /// Classified failure carrying the operation's message and the cause.
    #[error("{message}: {details}")]
    Internal { message: String, details: String },

    /// Unclassified failure; rewrapped as `Internal` at the service boundary.
    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl CatalogError {
    pub fn missing_title_or_author(details: Vec<serde_json::Value>) -> Self {
        Self::Validation {
            message: "Title and author are required".to_string(),
            details,
        }
    }

    pub fn invalid_published_year(year: i32, max: i32) -> Self {
        Self::Validation {
            message: format!("Published year must be between 1000 and {max}"),
            details: vec![json!({ "field": "publishedYear", "value": year })],
        }
    }

    pub fn invalid_review(details: Vec<serde_json::Value>) -> Self {
        Self::Validation {
            message: "Invalid review data. Rating must be between 1-5 and reviewer name is required"
                .to_string(),
            details,
        }
    }

    pub fn duplicate_isbn(isbn: &str) -> Self {
        Self::Conflict {
            message: "Book with this ISBN already exists".to_string(),
            details: vec![json!({ "field": "isbn", "value": isbn })],
        }
    }

    pub fn book_not_found() -> Self {
        Self::NotFound {
            message: "Book not found".to_string(),
        }
    }

    /// HTTP-style status code for this failure.
    pub fn status(&self) -> u16 {
        match self {
            CatalogError::Validation { .. } => 400,
            CatalogError::Conflict { .. } => 409,
            CatalogError::NotFound { .. } => 404,
            CatalogError::Internal { .. } | CatalogError::Unexpected(_) => 500,
        }
    }

    /// Keep classified errors as they are; wrap anything else as `Internal`
    /// under the operation's `message`.
    pub fn at_boundary(self, message: &str) -> Self {
        match self {
            CatalogError::Unexpected(cause) => CatalogError::Internal {
                message: message.to_string(),
                details: format!("{cause:#}"),
            },
            other => other,
        }
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation { message, details } => AppError::validation(details, message),
            CatalogError::Conflict { message, details } => AppError::conflict(details, message),
            CatalogError::NotFound { message } => AppError::not_found(message),
            CatalogError::Internal { message, details } => AppError::internal(message, details),
            CatalogError::Unexpected(cause) => cause.into(),
        }
    }
}
