use image::RgbImage;
use ndarray::prelude::*;
use rayon::prelude::*;
use tracing::{debug, trace};

use super::bbox::{CandidateBox, Extent};
use super::nms::{suppress, Overlap};
use super::pyramid::level_size;
use crate::error::DetectResult;
use crate::face_detection::{ScoreMap, ScoringStage, PROPOSAL_CELL, PROPOSAL_STRIDE};
use crate::utils::{resize_bilinear, to_chw_tensor};

const LEVEL_NMS_THRESHOLD: f32 = 0.5;
const MERGE_NMS_THRESHOLD: f32 = 0.7;

/// Runs the proposal stage over every pyramid level and returns squared,
/// calibrated candidates in original image coordinates.
pub fn propose(
    stage: &dyn ScoringStage,
    image: &RgbImage,
    scales: &[f32],
    threshold: f32,
) -> DetectResult<Vec<CandidateBox>> {
    let (width, height) = image.dimensions();

    // resizing is independent per level, scoring goes through the stage in order
    let levels: Vec<Array3<f32>> = scales
        .par_iter()
        .map(|&scale| {
            let (level_width, level_height) = level_size(width, height, scale);
            to_chw_tensor(&resize_bilinear(image, level_width, level_height))
        })
        .collect();

    let mut pooled = Vec::new();
    for (level, &scale) in levels.iter().zip(scales) {
        let map = stage.score_map(level.view())?;
        map.check_finite("proposal")?;
        let candidates = windows_above(&map, scale, threshold);
        let kept = suppress(&candidates, LEVEL_NMS_THRESHOLD, Overlap::Union);
        trace!(scale, raw = candidates.len(), kept = kept.len(), "proposal level");
        pooled.extend(kept);
    }

    if pooled.is_empty() {
        return Ok(pooled);
    }

    let merged = suppress(&pooled, MERGE_NMS_THRESHOLD, Overlap::Union);
    debug!(pooled = pooled.len(), merged = merged.len(), "proposal stage");

    Ok(merged
        .iter()
        .map(|candidate| candidate.calibrate(Extent::Span).to_square().truncated())
        .collect())
}

/// Maps every window scoring at least `threshold` back to original image
/// coordinates, as the inclusive pixel corners of the window.
pub fn windows_above(map: &ScoreMap, scale: f32, threshold: f32) -> Vec<CandidateBox> {
    let stride = PROPOSAL_STRIDE as f32;
    let cell = PROPOSAL_CELL as f32;

    map.scores
        .indexed_iter()
        .filter(|&(_, &score)| score >= threshold)
        .map(|((row, col), &score)| {
            let x = col as f32 * stride;
            let y = row as f32 * stride;
            let reg = [
                map.regression[[row, col, 0]],
                map.regression[[row, col, 1]],
                map.regression[[row, col, 2]],
                map.regression[[row, col, 3]],
            ];
            CandidateBox {
                x0: (x / scale).trunc(),
                y0: (y / scale).trunc(),
                x1: ((x + cell - 1.0) / scale).trunc(),
                y1: ((y + cell - 1.0) / scale).trunc(),
                score,
                reg,
            }
        })
        .collect()
}
