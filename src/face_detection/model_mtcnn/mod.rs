//! Multi-task cascaded face detection: a proposal stage over an image
//! pyramid, followed by a refine and an output stage on crops of the
//! surviving candidates.

pub mod assemble;
pub mod bbox;
pub mod nms;
pub mod onnx;
pub mod output;
pub mod proposal;
pub mod pyramid;
pub mod refine;

use image::RgbImage;
use ndarray::prelude::*;
use rayon::prelude::*;
use tracing::debug;

use self::bbox::CandidateBox;
use crate::error::DetectResult;
use crate::face::Face;
use crate::face_detection::{Cascade, FaceDetectionModel};
use crate::utils::{crop_resized, to_chw_tensor};

/// Tuning of the cascade. Read-only once the detector is built.
#[derive(Debug, Clone, PartialEq)]
pub struct MtcnnConfig {
    /// Smallest face side, in pixels, the pyramid is built for.
    pub min_size: u32,
    /// Ratio between two consecutive pyramid scales.
    pub factor: f32,
    /// Score thresholds of the proposal, refine and output stages.
    pub thresholds: [f32; 3],
}

impl Default for MtcnnConfig {
    fn default() -> Self {
        Self {
            min_size: 20,
            factor: 0.709,
            thresholds: [0.6, 0.7, 0.7],
        }
    }
}

pub struct MtcnnDetector {
    cascade: Cascade,
    config: MtcnnConfig,
}

impl MtcnnDetector {
    pub fn new(cascade: Cascade, config: MtcnnConfig) -> Self {
        Self { cascade, config }
    }

    pub fn config(&self) -> &MtcnnConfig {
        &self.config
    }

    pub fn detect_faces(&self, image: &RgbImage) -> DetectResult<Vec<Face>> {
        let (width, height) = image.dimensions();
        let [proposal_threshold, refine_threshold, output_threshold] = self.config.thresholds;

        let scales = pyramid::pyramid_scales(width, height, self.config.min_size, self.config.factor);
        if scales.is_empty() {
            debug!(width, height, min_size = self.config.min_size, "no pyramid levels");
            return Ok(Vec::new());
        }

        let proposals = proposal::propose(
            self.cascade.proposal.as_ref(),
            image,
            &scales,
            proposal_threshold,
        )?;

        let refined = refine::refine(
            self.cascade.refine.as_ref(),
            image,
            &proposals,
            refine_threshold,
        )?;
        let refined: Vec<CandidateBox> = refined
            .into_iter()
            .filter(|candidate| !candidate.is_degenerate())
            .collect();

        let detections = output::finalize(
            self.cascade.output.as_ref(),
            image,
            &refined,
            output_threshold,
        )?;

        Ok(assemble::assemble(&detections))
    }
}

impl FaceDetectionModel for MtcnnDetector {
    fn run(&self, image: &RgbImage) -> DetectResult<Vec<Face>> {
        self.detect_faces(image)
    }
}

// crops, resizes and stacks the candidates into one NCHW batch
pub(crate) fn patch_batch(image: &RgbImage, candidates: &[CandidateBox], size: u32) -> Array4<f32> {
    let patches: Vec<Array3<f32>> = candidates
        .par_iter()
        .map(|candidate| {
            let (x0, y0, x1, y1) = candidate.crop_window();
            to_chw_tensor(&crop_resized(image, x0, y0, x1, y1, size))
        })
        .collect();

    let mut batch = Array4::zeros((patches.len(), 3, size as usize, size as usize));
    for (mut slot, patch) in batch.outer_iter_mut().zip(&patches) {
        slot.assign(patch);
    }
    batch
}
