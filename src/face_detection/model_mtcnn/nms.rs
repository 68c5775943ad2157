use std::cmp::Ordering;

use super::bbox::CandidateBox;

/// How the overlap of two boxes is normalised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlap {
    /// Intersection over union.
    Union,
    /// Intersection over the smaller of the two areas.
    Min,
}

impl Overlap {
    pub fn measure(self, a: &CandidateBox, b: &CandidateBox) -> f32 {
        let w = (a.x1.min(b.x1) - a.x0.max(b.x0) + 1.0).max(0.0);
        let h = (a.y1.min(b.y1) - a.y0.max(b.y0) + 1.0).max(0.0);
        let inter = w * h;

        let denominator = match self {
            Overlap::Union => a.area() + b.area() - inter,
            Overlap::Min => a.area().min(b.area()),
        };
        if denominator <= 0.0 {
            return 0.0;
        }
        inter / denominator
    }
}

/// Greedy non-maximum suppression.
///
/// Returns the indices of the kept boxes, highest score first. A box is
/// dropped when its overlap with an already kept box exceeds `threshold`.
/// Equal scores are visited in input order, so the result is stable.
pub fn nms(boxes: &[CandidateBox], threshold: f32, method: Overlap) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| {
        boxes[b]
            .score
            .partial_cmp(&boxes[a].score)
            .unwrap_or(Ordering::Equal)
    });

    let mut suppressed = vec![false; boxes.len()];
    let mut keep = Vec::new();

    for (rank, &i) in order.iter().enumerate() {
        if suppressed[i] {
            continue;
        }
        keep.push(i);

        for &j in &order[rank + 1..] {
            if !suppressed[j] && method.measure(&boxes[i], &boxes[j]) > threshold {
                suppressed[j] = true;
            }
        }
    }
    keep
}

pub fn suppress(boxes: &[CandidateBox], threshold: f32, method: Overlap) -> Vec<CandidateBox> {
    nms(boxes, threshold, method)
        .into_iter()
        .map(|i| boxes[i])
        .collect()
}
