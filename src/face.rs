use std::fmt;

use nalgebra::Point2;

pub type PixelPoint = Point2<i32>;

// the five facial keypoints regressed by the output stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landmark {
    LeftEye,
    RightEye,
    Nose,
    MouthLeft,
    MouthRight,
}

impl Landmark {
    pub const ALL: [Landmark; 5] = [
        Landmark::LeftEye,
        Landmark::RightEye,
        Landmark::Nose,
        Landmark::MouthLeft,
        Landmark::MouthRight,
    ];
}

/// A face found in an image: bounding box, detection confidence and five
/// landmark points, all in pixel coordinates of the original image.
///
/// Box corners are not clamped: a face near the border may have corners
/// outside the image. Use [`Face::clamped_box`] before normalising.
#[derive(Debug, Clone, PartialEq)]
pub struct Face {
    // upper left corner
    pub bb_p1: PixelPoint,
    // lower right corner
    pub bb_p2: PixelPoint,
    pub bb_confidence: f32,
    pub left_eye: PixelPoint,
    pub right_eye: PixelPoint,
    pub nose: PixelPoint,
    pub mouth_left: PixelPoint,
    pub mouth_right: PixelPoint,
}

impl Face {
    pub fn get_point(&self, point: Landmark) -> PixelPoint {
        match point {
            Landmark::LeftEye => self.left_eye,
            Landmark::RightEye => self.right_eye,
            Landmark::Nose => self.nose,
            Landmark::MouthLeft => self.mouth_left,
            Landmark::MouthRight => self.mouth_right,
        }
    }

    pub fn landmarks(&self) -> [PixelPoint; 5] {
        Landmark::ALL.map(|point| self.get_point(point))
    }

    /// Returns the box corners clamped to an image of the given size as
    /// `(x0, y0, x1, y1)`, with `0 <= x0 <= x1 <= width` and
    /// `0 <= y0 <= y1 <= height`.
    pub fn clamped_box(&self, width: u32, height: u32) -> (u32, u32, u32, u32) {
        let clamp = |value: i32, max: u32| value.clamp(0, max as i32) as u32;

        let x0 = clamp(self.bb_p1.x, width);
        let y0 = clamp(self.bb_p1.y, height);
        // a regressed box can come out inverted; collapse it instead
        let x1 = clamp(self.bb_p2.x, width).max(x0);
        let y1 = clamp(self.bb_p2.y, height).max(y0);

        (x0, y0, x1, y1)
    }
}

impl fmt::Display for Face {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = |point: PixelPoint| format!("({}, {})", point.x, point.y);
        write!(
            f,
            "Face[bb_p1={}, bb_p2={}, bb_confidence={:.6}, left_eye={}, right_eye={}, nose={}, mouth_left={}, mouth_right={}]",
            p(self.bb_p1),
            p(self.bb_p2),
            self.bb_confidence,
            p(self.left_eye),
            p(self.right_eye),
            p(self.nose),
            p(self.mouth_left),
            p(self.mouth_right),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn face(p1: (i32, i32), p2: (i32, i32)) -> Face {
        let origin = PixelPoint::new(0, 0);
        Face {
            bb_p1: PixelPoint::new(p1.0, p1.1),
            bb_p2: PixelPoint::new(p2.0, p2.1),
            bb_confidence: 0.9,
            left_eye: origin,
            right_eye: origin,
            nose: PixelPoint::new(5, 6),
            mouth_left: origin,
            mouth_right: origin,
        }
    }

    #[test]
    fn clamped_box_stays_inside_image() {
        let f = face((-10, -4), (130, 90));
        assert_eq!(f.clamped_box(100, 80), (0, 0, 100, 80));
    }

    #[test]
    fn clamped_box_never_inverts() {
        let f = face((120, 10), (90, 5));
        let (x0, y0, x1, y1) = f.clamped_box(100, 80);
        assert!(x0 <= x1 && y0 <= y1);
        assert_eq!((x0, x1), (100, 100));
    }

    #[test]
    fn landmarks_are_returned_in_canonical_order() {
        let f = face((0, 0), (10, 10));
        assert_eq!(f.landmarks()[2], PixelPoint::new(5, 6));
        assert_eq!(f.get_point(Landmark::Nose), f.nose);
    }

    #[test]
    fn display_lists_all_fields() {
        let text = face((1, 2), (3, 4)).to_string();
        assert!(text.starts_with("Face[bb_p1=(1, 2), bb_p2=(3, 4)"));
        assert!(text.contains("nose=(5, 6)"));
    }
}
