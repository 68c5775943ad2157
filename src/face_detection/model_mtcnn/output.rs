use image::RgbImage;
use nalgebra::Point2;
use tracing::debug;

use super::bbox::{CandidateBox, Extent};
use super::nms::{nms, Overlap};
use super::patch_batch;
use crate::error::{DetectError, DetectResult};
use crate::face_detection::ScoringStage;

pub const OUTPUT_SIZE: u32 = 48;
const NMS_THRESHOLD: f32 = 0.7;

/// A calibrated face box together with its five landmarks, in original
/// image pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct FinalDetection {
    pub candidate: CandidateBox,
    pub landmarks: [Point2<f32>; 5],
}

/// Scores refine survivors on 48x48 crops, regresses landmarks and the final
/// boxes, and collapses near duplicates with a min-overlap suppression.
pub fn finalize(
    stage: &dyn ScoringStage,
    image: &RgbImage,
    candidates: &[CandidateBox],
    threshold: f32,
) -> DetectResult<Vec<FinalDetection>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let candidates: Vec<CandidateBox> = candidates.iter().map(CandidateBox::truncated).collect();
    let batch = patch_batch(image, &candidates, OUTPUT_SIZE);
    let output = stage.score(batch.view())?;
    output.check_batch("output", candidates.len())?;
    let offsets = output.landmarks.as_ref().ok_or(DetectError::MissingOutput {
        stage: "output",
        output: "landmarks",
    })?;

    let detections: Vec<FinalDetection> = candidates
        .iter()
        .enumerate()
        .filter(|&(i, _)| output.scores[i] > threshold)
        .map(|(i, candidate)| {
            let row = output.regression.row(i);
            let scored = candidate.rescored(output.scores[i], [row[0], row[1], row[2], row[3]]);

            // landmarks hang off the box the network saw, before regression
            let offsets = offsets.row(i);
            let landmarks =
                std::array::from_fn(|k| scored.project_point(offsets[k], offsets[k + 5]));

            FinalDetection {
                candidate: scored.calibrate(Extent::Pixels),
                landmarks,
            }
        })
        .collect();

    let boxes: Vec<CandidateBox> = detections.iter().map(|d| d.candidate).collect();
    let keep = nms(&boxes, NMS_THRESHOLD, Overlap::Min);
    debug!(
        input = candidates.len(),
        passed = detections.len(),
        kept = keep.len(),
        "output stage"
    );

    Ok(keep.into_iter().map(|i| detections[i].clone()).collect())
}
