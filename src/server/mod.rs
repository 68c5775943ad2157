//! HTTP surface of the service: a single `POST /face_detection` route.

pub mod error;
pub mod handler;
pub mod response;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::face_detection::FaceDetectionModel;

pub use self::error::ApiError;
pub use self::response::{BoundingPoly, DetectedFace, DetectionResponse, Vertex};

pub const DETECTION_ROUTE: &str = "/face_detection";

// encoded images larger than this are refused before decoding
const MAX_IMAGE_BYTES: usize = 32 * 1024 * 1024;

/// State shared by all requests. The detector is loaded once at startup and
/// lives as long as the process.
pub struct AppState {
    pub detector: Arc<dyn FaceDetectionModel>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(detector: Arc<dyn FaceDetectionModel>, request_timeout: Duration) -> Self {
        Self {
            detector,
            request_timeout,
        }
    }
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route(DETECTION_ROUTE, post(handler::detect_faces))
        .layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
