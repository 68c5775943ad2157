#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use face_detection_service::face_detection::{Cascade, ScoreMap, ScoringStage, StageOutput};
use face_detection_service::{DetectError, DetectResult, MtcnnConfig, MtcnnDetector};
use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use ndarray::prelude::*;

pub const BLOB_CONFIDENCE: f32 = 0.95;
// margin added around the dark blob by the regression, per side, as a
// fraction of the blob size
const BLOB_MARGIN: f32 = 0.25;

// landmark positions inside the blob, x then y
const BLOB_LANDMARKS: [(f32, f32); 5] = [(0.3, 0.35), (0.7, 0.35), (0.5, 0.55), (0.35, 0.75), (0.65, 0.75)];

/// Stand-in for a trained stage: a "face" is a dark blob on a light
/// background that fits entirely inside the patch. The regression snaps the
/// box onto the blob plus a margin, landmarks sit at fixed spots in the blob.
pub struct DarkBlobStage {
    pub landmarks: bool,
}

impl ScoringStage for DarkBlobStage {
    fn score(&self, patches: ArrayView4<f32>) -> DetectResult<StageOutput> {
        let n = patches.shape()[0];
        let size = patches.shape()[2];

        let mut scores = Array1::zeros(n);
        let mut regression = Array2::zeros((n, 4));
        let mut landmarks = Array2::zeros((n, 10));

        for (i, patch) in patches.outer_iter().enumerate() {
            let luma = patch.index_axis(Axis(0), 0);
            let mut extent: Option<(usize, usize, usize, usize)> = None;
            for ((y, x), value) in luma.indexed_iter() {
                if *value < 0.0 {
                    extent = Some(match extent {
                        None => (x, y, x, y),
                        Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                    });
                }
            }

            let Some((x0, y0, x1, y1)) = extent else { continue };
            if x0 == 0 || y0 == 0 || x1 == size - 1 || y1 == size - 1 {
                continue;
            }

            let s = size as f32;
            let (fx0, fy0) = (x0 as f32 / s, y0 as f32 / s);
            let (fx1, fy1) = ((x1 + 1) as f32 / s, (y1 + 1) as f32 / s);
            let (dw, dh) = (fx1 - fx0, fy1 - fy0);

            scores[i] = BLOB_CONFIDENCE;
            regression[[i, 0]] = fx0 - BLOB_MARGIN * dw;
            regression[[i, 1]] = fy0 - BLOB_MARGIN * dh;
            regression[[i, 2]] = fx1 + BLOB_MARGIN * dw - 1.0;
            regression[[i, 3]] = fy1 + BLOB_MARGIN * dh - 1.0;
            for (k, (lx, ly)) in BLOB_LANDMARKS.iter().enumerate() {
                landmarks[[i, k]] = fx0 + lx * dw;
                landmarks[[i, k + 5]] = fy0 + ly * dh;
            }
        }

        Ok(StageOutput {
            scores,
            regression,
            landmarks: self.landmarks.then_some(landmarks),
        })
    }
}

/// Wraps a stage and counts every call into it.
pub struct CountingStage<S> {
    pub inner: S,
    pub calls: Arc<AtomicUsize>,
}

impl<S: ScoringStage> ScoringStage for CountingStage<S> {
    fn score(&self, patches: ArrayView4<f32>) -> DetectResult<StageOutput> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.score(patches)
    }

    fn score_map(&self, level: ArrayView3<f32>) -> DetectResult<ScoreMap> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.score_map(level)
    }
}

pub struct FailingStage;

impl ScoringStage for FailingStage {
    fn score(&self, _patches: ArrayView4<f32>) -> DetectResult<StageOutput> {
        Err(DetectError::Backend("device lost".to_string()))
    }
}

pub fn blob_cascade() -> Cascade {
    Cascade {
        proposal: Box::new(DarkBlobStage { landmarks: false }),
        refine: Box::new(DarkBlobStage { landmarks: false }),
        output: Box::new(DarkBlobStage { landmarks: true }),
    }
}

pub fn blob_detector() -> MtcnnDetector {
    MtcnnDetector::new(blob_cascade(), MtcnnConfig::default())
}

/// Returns a detector over counting blob stages and the shared call counter.
pub fn counting_detector(config: MtcnnConfig) -> (MtcnnDetector, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let stage = |landmarks| -> Box<dyn ScoringStage> {
        Box::new(CountingStage {
            inner: DarkBlobStage { landmarks },
            calls: Arc::clone(&calls),
        })
    };
    let cascade = Cascade {
        proposal: stage(false),
        refine: stage(false),
        output: stage(true),
    };
    (MtcnnDetector::new(cascade, config), calls)
}

pub fn blank_image(width: u32, height: u32, value: u8) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb([value, value, value]))
}

/// White image with a black square of side `side` whose top-left corner is
/// at `(x, y)`.
pub fn image_with_square(width: u32, height: u32, x: u32, y: u32, side: u32) -> RgbImage {
    let mut image = blank_image(width, height, 255);
    for py in y..y + side {
        for px in x..x + side {
            image.put_pixel(px, py, Rgb([0, 0, 0]));
        }
    }
    image
}

pub fn encode(image: &RgbImage, format: ImageOutputFormat) -> Vec<u8> {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(image.clone())
        .write_to(&mut Cursor::new(&mut bytes), format)
        .expect("encoding a test image");
    bytes
}
