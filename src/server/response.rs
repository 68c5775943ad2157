use serde::{Deserialize, Serialize};

use crate::face::Face;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vertex {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoundingPoly {
    pub vertices: Vec<Vertex>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectedFace {
    pub bounding_poly: BoundingPoly,
    pub confidence: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionResponse {
    pub detected_faces: Vec<DetectedFace>,
}

impl DetectedFace {
    /// Normalises the face box by the image size.
    ///
    /// Vertices are emitted as top-left, bottom-left, top-right,
    /// bottom-right. Consumers depend on that order, it is not a contour.
    pub fn from_face(face: &Face, width: u32, height: u32) -> Self {
        let (x0, y0, x1, y1) = face.clamped_box(width, height);
        let (w, h) = (width as f32, height as f32);
        let (x0, y0, x1, y1) = (x0 as f32 / w, y0 as f32 / h, x1 as f32 / w, y1 as f32 / h);

        Self {
            bounding_poly: BoundingPoly {
                vertices: vec![
                    Vertex { x: x0, y: y0 },
                    Vertex { x: x0, y: y1 },
                    Vertex { x: x1, y: y0 },
                    Vertex { x: x1, y: y1 },
                ],
            },
            confidence: face.bb_confidence,
        }
    }
}

impl DetectionResponse {
    pub fn from_faces(faces: &[Face], width: u32, height: u32) -> Self {
        Self {
            detected_faces: faces
                .iter()
                .map(|face| DetectedFace::from_face(face, width, height))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::face::PixelPoint;

    fn face(p1: (i32, i32), p2: (i32, i32)) -> Face {
        let origin = PixelPoint::new(0, 0);
        Face {
            bb_p1: PixelPoint::new(p1.0, p1.1),
            bb_p2: PixelPoint::new(p2.0, p2.1),
            bb_confidence: 0.875,
            left_eye: origin,
            right_eye: origin,
            nose: origin,
            mouth_left: origin,
            mouth_right: origin,
        }
    }

    #[test]
    fn vertices_follow_corner_order() {
        let detected = DetectedFace::from_face(&face((20, 10), (60, 30)), 80, 40);
        let vertices: Vec<(f32, f32)> = detected
            .bounding_poly
            .vertices
            .iter()
            .map(|v| (v.x, v.y))
            .collect();

        assert_eq!(vertices, vec![(0.25, 0.25), (0.25, 0.75), (0.75, 0.25), (0.75, 0.75)]);
        assert_eq!(detected.confidence, 0.875);
    }

    #[test]
    fn vertices_stay_in_unit_square_for_boxes_past_the_border() {
        let detected = DetectedFace::from_face(&face((-15, -2), (95, 41)), 80, 40);
        for vertex in &detected.bounding_poly.vertices {
            assert!((0.0..=1.0).contains(&vertex.x));
            assert!((0.0..=1.0).contains(&vertex.y));
        }
    }

    #[test]
    fn serialises_with_camel_case_keys() {
        let response = DetectionResponse::from_faces(&[face((0, 0), (40, 20))], 80, 40);
        let json = serde_json::to_value(&response).unwrap();

        assert_eq!(json["detectedFaces"][0]["confidence"], 0.875);
        assert_eq!(json["detectedFaces"][0]["boundingPoly"]["vertices"][3]["x"], 0.5);
        assert_eq!(json["detectedFaces"][0]["boundingPoly"]["vertices"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn no_faces_serialise_to_empty_list() {
        let json = serde_json::to_string(&DetectionResponse::from_faces(&[], 10, 10)).unwrap();
        assert_eq!(json, r#"{"detectedFaces":[]}"#);
    }
}
