use std::io;

use axum::http::StatusCode;
use thiserror::Error;

use crate::common::response::ApiError;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Invalid upload: {0}")]
    InvalidUpload(String),

    #[error("Could not stage file: {0}")]
    Staging(#[source] io::Error),

    #[error("Error converting file: {0}")]
    Transcode(String),

    #[error("A conversion is already in progress")]
    Busy,

    #[error("No uploaded file to convert")]
    NothingStaged,

    #[error("No converted file available")]
    NothingToDownload,
}

impl ConvertError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ConvertError::InvalidUpload(_) | ConvertError::NothingStaged => StatusCode::BAD_REQUEST,
            ConvertError::Staging(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ConvertError::Transcode(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ConvertError::Busy => StatusCode::CONFLICT,
            ConvertError::NothingToDownload => StatusCode::NOT_FOUND,
        }
    }
}

impl From<ConvertError> for ApiError {
    fn from(err: ConvertError) -> Self {
        let status = err.status_code();
        ApiError(err.to_string(), status)
    }
}
