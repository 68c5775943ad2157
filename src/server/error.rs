use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use tracing::{error, warn};

use crate::error::DetectError;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Missing HTTP header: \"Content-Type\"")]
    MissingHeader,

    #[error("Unsupported content type: {0}")]
    UnsupportedMediaType(String),

    #[error("Error decoding image")]
    ImageDecode(#[source] image::ImageError),

    #[error("detection timed out")]
    Timeout,

    #[error("detection failed")]
    Detection(#[from] DetectError),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingHeader | Self::UnsupportedMediaType(_) | Self::ImageDecode(_) => {
                StatusCode::BAD_REQUEST
            }
            Self::Timeout | Self::Detection(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_client_error() {
            match &self {
                Self::ImageDecode(source) => warn!(error = %source, "rejected request: {}", self),
                _ => warn!("rejected request: {}", self),
            }
            let body = format!("{}\n", self);
            return (status, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], body).into_response();
        }

        error!(error = ?self, "face detection failed");
        status.into_response()
    }
}
