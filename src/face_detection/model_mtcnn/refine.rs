use image::RgbImage;
use tracing::debug;

use super::bbox::{CandidateBox, Extent};
use super::nms::{suppress, Overlap};
use super::patch_batch;
use crate::error::DetectResult;
use crate::face_detection::ScoringStage;

pub const REFINE_SIZE: u32 = 24;
const NMS_THRESHOLD: f32 = 0.7;

/// Re-scores proposal survivors on 24x24 crops, keeps those scoring above
/// `threshold`, suppresses duplicates and calibrates what is left.
pub fn refine(
    stage: &dyn ScoringStage,
    image: &RgbImage,
    candidates: &[CandidateBox],
    threshold: f32,
) -> DetectResult<Vec<CandidateBox>> {
    if candidates.is_empty() {
        return Ok(Vec::new());
    }

    let batch = patch_batch(image, candidates, REFINE_SIZE);
    let output = stage.score(batch.view())?;
    output.check_batch("refine", candidates.len())?;

    let passed: Vec<CandidateBox> = candidates
        .iter()
        .enumerate()
        .filter(|&(i, _)| output.scores[i] > threshold)
        .map(|(i, candidate)| {
            let row = output.regression.row(i);
            candidate.rescored(output.scores[i], [row[0], row[1], row[2], row[3]])
        })
        .collect();

    let kept = suppress(&passed, NMS_THRESHOLD, Overlap::Union);
    debug!(
        input = candidates.len(),
        passed = passed.len(),
        kept = kept.len(),
        "refine stage"
    );

    Ok(kept
        .iter()
        .map(|candidate| candidate.calibrate(Extent::Pixels).to_square())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face_detection::model_mtcnn::tests::ScriptedStage;

    #[test]
    fn scores_must_exceed_the_threshold() {
        let image = RgbImage::new(64, 64);
        let candidates = [
            CandidateBox::new(0.0, 0.0, 15.0, 15.0, 0.9),
            CandidateBox::new(30.0, 30.0, 45.0, 45.0, 0.9),
        ];
        let stage = ScriptedStage::still(&[0.7, 0.75]);

        let refined = refine(&stage, &image, &candidates, 0.7).unwrap();
        assert_eq!(refined.len(), 1);
        assert_eq!(refined[0].score, 0.75);
        assert!(refined.iter().all(|candidate| candidate.score > 0.7));
    }

    #[test]
    fn suppression_runs_before_calibration() {
        let image = RgbImage::new(64, 64);
        let candidates = [
            CandidateBox::new(0.0, 0.0, 19.0, 19.0, 0.6),
            CandidateBox::new(1.0, 1.0, 20.0, 20.0, 0.6),
        ];
        // the weaker box would move clear of the stronger one once calibrated
        let stage = ScriptedStage {
            scores: vec![0.9, 0.8],
            regression: vec![[0.25, 0.0, 0.25, 0.5], [1.0, 0.0, 1.0, 0.0]],
            landmarks: None,
        };

        let refined = refine(&stage, &image, &candidates, 0.7).unwrap();
        assert_eq!(refined.len(), 1);

        // pixel extent 20: (5, 0, 24, 29), then squared to a 29 px side
        let kept = refined[0];
        assert_eq!(kept.score, 0.9);
        assert_eq!((kept.x0, kept.y0, kept.x1, kept.y1), (0.0, 0.0, 29.0, 29.0));
        assert_eq!(kept.reg, [0.0; 4]);
    }

    #[test]
    fn nothing_to_refine_skips_the_stage() {
        let stage = ScriptedStage::still(&[]);
        let refined = refine(&stage, &RgbImage::new(8, 8), &[], 0.7).unwrap();
        assert!(refined.is_empty());
    }
}
