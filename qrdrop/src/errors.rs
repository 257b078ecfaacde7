use crate::archive::PackagingError;
use crate::db::errors::DbError;
use crate::share::ShareError;
use crate::storage::StorageError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error as ThisError;

#[derive(ThisError, Debug)]
pub enum Error {
    /// Invalid request data: no files, bad filename, missing query parameter
    #[error("{message}")]
    Validation { message: String },

    /// Requested resource not found
    #[error("{resource} with ID {id} not found")]
    NotFound { resource: String, id: String },

    /// Content store error
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Database operation error
    #[error(transparent)]
    Database(#[from] DbError),

    /// Archive could not be assembled
    #[error(transparent)]
    Packaging(#[from] PackagingError),

    /// Share code could not be generated
    #[error(transparent)]
    Share(#[from] ShareError),

    /// Unexpected error with full context chain
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Error::Validation { .. } => StatusCode::BAD_REQUEST,
            Error::NotFound { .. } => StatusCode::NOT_FOUND,
            Error::Storage(storage_err) => match storage_err {
                StorageError::NotFound { .. } => StatusCode::NOT_FOUND,
                StorageError::InvalidName { .. } => StatusCode::BAD_REQUEST,
                StorageError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Database(db_err) => match db_err {
                DbError::NotFound => StatusCode::NOT_FOUND,
                DbError::InvalidData { .. } => StatusCode::BAD_REQUEST,
                DbError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Error::Packaging(_) | Error::Share(_) | Error::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Returns a user-safe error message, without leaking internal implementation details
    pub fn user_message(&self) -> String {
        match self {
            Error::Validation { message } => message.clone(),
            Error::NotFound { resource, id } => format!("{resource} with ID {id} not found"),
            Error::Storage(storage_err) => match storage_err {
                StorageError::NotFound { .. } => "File not found".to_string(),
                StorageError::InvalidName { name, reason } => format!("Invalid filename '{name}': {reason}"),
                StorageError::Io(_) => "Internal server error".to_string(),
            },
            Error::Database(db_err) => match db_err {
                DbError::NotFound => "Resource not found".to_string(),
                DbError::InvalidData { message } => message.clone(),
                DbError::Other(_) => "Internal server error".to_string(),
            },
            Error::Packaging(e) => format!("Error creating zip file: {e}"),
            Error::Share(_) => "Error generating share code".to_string(),
            Error::Other(_) => "Internal server error".to_string(),
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        // Log full error details for debugging - different log levels based on severity
        match &self {
            Error::Database(DbError::Other(_))
            | Error::Storage(StorageError::Io(_))
            | Error::Packaging(_)
            | Error::Share(_)
            | Error::Other(_) => {
                tracing::error!("Internal service error: {:#}", self);
            }
            Error::Database(_) => {
                tracing::warn!("Database constraint error: {}", self);
            }
            Error::Validation { .. } | Error::NotFound { .. } | Error::Storage(_) => {
                tracing::debug!("Client error: {}", self);
            }
        }

        (self.status_code(), self.user_message()).into_response()
    }
}
