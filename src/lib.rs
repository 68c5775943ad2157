pub mod config;
pub mod error;
pub mod face;
pub mod face_detection;
pub mod server;
pub mod utils;

pub use error::{DetectError, DetectResult};
pub use face::{Face, Landmark};
pub use face_detection::model_mtcnn::{MtcnnConfig, MtcnnDetector};
pub use face_detection::{Cascade, FaceDetectionModel, ScoringStage};
