use std::path::PathBuf;

use thiserror::Error;

/// Failures raised inside the detection pipeline or its scoring backend.
///
/// None of these are caused by the caller's input; they surface as internal
/// errors at the HTTP boundary.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("onnx runtime error: {0}")]
    Runtime(#[from] ort::OrtError),

    #[error("unexpected tensor shape: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("{stage} stage returned {got} results for a batch of {expected}")]
    BatchMismatch {
        stage: &'static str,
        expected: usize,
        got: usize,
    },

    #[error("{stage} stage did not produce {output}")]
    MissingOutput {
        stage: &'static str,
        output: &'static str,
    },

    #[error("{stage} stage produced a non-finite value")]
    NonFinite { stage: &'static str },

    #[error("model artifact not found: {}", .0.display())]
    MissingModel(PathBuf),

    #[error("scoring backend failed: {0}")]
    Backend(String),

    #[error("inference lock poisoned")]
    LockPoisoned,
}

pub type DetectResult<T> = Result<T, DetectError>;
