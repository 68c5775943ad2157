pub mod model_mtcnn;

use image::RgbImage;
use ndarray::prelude::*;

use crate::error::{DetectError, DetectResult};
use crate::face::Face;

/// Anything that turns an RGB image into a list of faces.
pub trait FaceDetectionModel: Send + Sync {
    fn run(&self, image: &RgbImage) -> DetectResult<Vec<Face>>;
}

// proposal window side and step, in pyramid level pixels
pub const PROPOSAL_CELL: usize = 12;
pub const PROPOSAL_STRIDE: usize = 2;

/// Per-patch result of a scoring stage.
///
/// Row `i` of every array belongs to patch `i` of the batch.
#[derive(Debug, Clone)]
pub struct StageOutput {
    /// Face confidence in `[0, 1]`, shape `(n,)`.
    pub scores: Array1<f32>,
    /// Box regression deltas `(dx0, dy0, dx1, dy1)` as fractions of the patch
    /// box size, shape `(n, 4)`.
    pub regression: Array2<f32>,
    /// Landmark offsets as fractions of the patch box size, five x values
    /// then five y values, shape `(n, 10)`. Only the output stage fills it.
    pub landmarks: Option<Array2<f32>>,
}

impl StageOutput {
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Checks that every array covers a batch of `expected` patches and holds
    /// only finite values.
    pub fn check_batch(&self, stage: &'static str, expected: usize) -> DetectResult<()> {
        let mismatch = |got| DetectError::BatchMismatch {
            stage,
            expected,
            got,
        };

        if self.scores.len() != expected {
            return Err(mismatch(self.scores.len()));
        }
        if self.regression.dim() != (expected, 4) {
            return Err(mismatch(self.regression.nrows()));
        }
        if let Some(landmarks) = &self.landmarks {
            if landmarks.dim() != (expected, 10) {
                return Err(mismatch(landmarks.nrows()));
            }
        }

        let values = self
            .scores
            .iter()
            .chain(self.regression.iter())
            .chain(self.landmarks.iter().flatten());
        check_finite(stage, values)
    }
}

/// Dense proposal result over one pyramid level: one entry per window
/// position, laid out on the `(rows, cols)` grid of window origins.
#[derive(Debug, Clone)]
pub struct ScoreMap {
    pub scores: Array2<f32>,
    /// Shape `(rows, cols, 4)`.
    pub regression: Array3<f32>,
}

impl ScoreMap {
    pub fn check_finite(&self, stage: &'static str) -> DetectResult<()> {
        check_finite(stage, self.scores.iter().chain(self.regression.iter()))
    }

    pub fn empty() -> Self {
        Self {
            scores: Array2::zeros((0, 0)),
            regression: Array3::zeros((0, 0, 4)),
        }
    }
}

fn check_finite<'a>(stage: &'static str, mut values: impl Iterator<Item = &'a f32>) -> DetectResult<()> {
    if values.all(|value| value.is_finite()) {
        Ok(())
    } else {
        Err(DetectError::NonFinite { stage })
    }
}

/// Opaque scoring function of one cascade stage.
///
/// Inputs are batches of square patches in NCHW layout, normalised with
/// [`crate::utils::normalize_pixel`]. Implementations must be deterministic
/// for the detector to be.
pub trait ScoringStage: Send + Sync {
    fn score(&self, patches: ArrayView4<f32>) -> DetectResult<StageOutput>;

    /// Scores every `PROPOSAL_CELL` window of a whole pyramid level, `level`
    /// being a normalised `(3, h, w)` tensor.
    ///
    /// The default slides the window with `PROPOSAL_STRIDE` and scores all
    /// windows as one batch. Fully convolutional backends override it.
    fn score_map(&self, level: ArrayView3<f32>) -> DetectResult<ScoreMap> {
        let (_, height, width) = level.dim();
        if height < PROPOSAL_CELL || width < PROPOSAL_CELL {
            return Ok(ScoreMap::empty());
        }

        let rows = (height - PROPOSAL_CELL) / PROPOSAL_STRIDE + 1;
        let cols = (width - PROPOSAL_CELL) / PROPOSAL_STRIDE + 1;

        let mut windows = Array4::zeros((rows * cols, 3, PROPOSAL_CELL, PROPOSAL_CELL));
        for row in 0..rows {
            for col in 0..cols {
                let y = row * PROPOSAL_STRIDE;
                let x = col * PROPOSAL_STRIDE;
                windows
                    .slice_mut(s![row * cols + col, .., .., ..])
                    .assign(&level.slice(s![.., y..y + PROPOSAL_CELL, x..x + PROPOSAL_CELL]));
            }
        }

        let output = self.score(windows.view())?;
        output.check_batch("proposal", rows * cols)?;

        Ok(ScoreMap {
            scores: output.scores.into_shape((rows, cols))?,
            regression: output
                .regression
                .as_standard_layout()
                .into_owned()
                .into_shape((rows, cols, 4))?,
        })
    }
}

/// The three scoring stages of a cascade, from coarse to fine.
pub struct Cascade {
    pub proposal: Box<dyn ScoringStage>,
    pub refine: Box<dyn ScoringStage>,
    pub output: Box<dyn ScoringStage>,
}
