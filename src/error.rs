use crate::models::{ErrorDetail, ErrorResponse};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("No image file was uploaded")]
    MissingFile,

    #[error("Unsupported file type for '{filename}': only JPG, JPEG and PNG are accepted")]
    UnsupportedFileType { filename: String },

    #[error("Uploaded file '{filename}' is empty")]
    EmptyImage { filename: String },

    #[error("Malformed upload: {0}")]
    InvalidUpload(String),

    #[error("Failed to reach the model backend: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Model backend returned {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Unexpected response from the model backend: {0}")]
    InvalidResponse(String),
}

impl OcrError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OcrError::MissingFile
            | OcrError::UnsupportedFileType { .. }
            | OcrError::EmptyImage { .. }
            | OcrError::InvalidUpload(_) => StatusCode::BAD_REQUEST,
            OcrError::Transport(_) | OcrError::Upstream { .. } | OcrError::InvalidResponse(_) => {
                StatusCode::BAD_GATEWAY
            }
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            OcrError::MissingFile => "missing_file",
            OcrError::UnsupportedFileType { .. } => "unsupported_file_type",
            OcrError::EmptyImage { .. } => "empty_image",
            OcrError::InvalidUpload(_) => "invalid_upload",
            OcrError::Transport(_) => "backend_unreachable",
            OcrError::Upstream { .. } => "backend_error",
            OcrError::InvalidResponse(_) => "invalid_backend_response",
        }
    }

    pub fn is_upload_error(&self) -> bool {
        self.status_code() == StatusCode::BAD_REQUEST
    }

    pub fn to_error_response(&self) -> ErrorResponse {
        ErrorResponse {
            error: ErrorDetail {
                message: self.to_string(),
                r#type: if self.is_upload_error() {
                    "invalid_request_error".to_string()
                } else {
                    "api_error".to_string()
                },
                code: Some(self.code().to_string()),
            },
        }
    }
}

impl IntoResponse for OcrError {
    fn into_response(self) -> Response {
        (self.status_code(), Json(self.to_error_response())).into_response()
    }
}
