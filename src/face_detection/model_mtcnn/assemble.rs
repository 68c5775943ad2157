use nalgebra::Point2;

use super::output::FinalDetection;
use crate::face::{Face, PixelPoint};

// coordinates are truncated towards zero, like an integer cast
fn pixel(point: Point2<f32>) -> PixelPoint {
    PixelPoint::new(point.x as i32, point.y as i32)
}

/// Packages the output stage's detections into faces, keeping their order.
pub fn assemble(detections: &[FinalDetection]) -> Vec<Face> {
    detections
        .iter()
        .map(|detection| {
            let c = &detection.candidate;
            let [left_eye, right_eye, nose, mouth_left, mouth_right] = detection.landmarks.map(pixel);

            Face {
                bb_p1: pixel(Point2::new(c.x0, c.y0)),
                bb_p2: pixel(Point2::new(c.x1, c.y1)),
                bb_confidence: c.score,
                left_eye,
                right_eye,
                nose,
                mouth_left,
                mouth_right,
            }
        })
        .collect()
}
