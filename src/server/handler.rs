use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use image::ImageFormat;
use tracing::info;

use super::error::ApiError;
use super::response::DetectionResponse;
use super::AppState;

/// Maps a `Content-Type` value to the image format it announces.
///
/// Media type parameters and letter case are ignored.
pub fn image_format(content_type: &str) -> Option<ImageFormat> {
    let media_type = content_type.split(';').next().unwrap_or("").trim().to_ascii_lowercase();
    match media_type.as_str() {
        "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
        "image/png" => Some(ImageFormat::Png),
        _ => None,
    }
}

/// `POST /face_detection`: the body is an encoded JPEG or PNG image, the
/// answer lists every face with its normalised box.
pub async fn detect_faces(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<DetectionResponse>, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .ok_or(ApiError::MissingHeader)?;
    let content_type = content_type
        .to_str()
        .map_err(|_| ApiError::UnsupportedMediaType(String::from_utf8_lossy(content_type.as_bytes()).into_owned()))?;
    let format = image_format(content_type)
        .ok_or_else(|| ApiError::UnsupportedMediaType(content_type.to_string()))?;

    let detector = Arc::clone(&state.detector);
    let task = tokio::task::spawn_blocking(move || {
        let image = image::load_from_memory_with_format(&body, format)
            .map_err(ApiError::ImageDecode)?
            .into_rgb8();

        info!(width = image.width(), height = image.height(), "detecting faces");
        let faces = detector.run(&image)?;
        info!("{} faces detected", faces.len());

        Ok::<_, ApiError>(DetectionResponse::from_faces(&faces, image.width(), image.height()))
    });

    let response = tokio::time::timeout(state.request_timeout, task)
        .await
        .map_err(|_| ApiError::Timeout)?
        .map_err(|err| ApiError::Internal(err.to_string()))??;

    Ok(Json(response))
}
