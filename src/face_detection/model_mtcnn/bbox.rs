use nalgebra::Point2;

/// How the size of a box is measured.
///
/// The proposal stage regresses against the plain corner distance, the later
/// stages against the number of covered pixels (corners inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extent {
    Span,
    Pixels,
}

impl Extent {
    fn offset(self) -> f32 {
        match self {
            Extent::Span => 0.0,
            Extent::Pixels => 1.0,
        }
    }
}

/// A face candidate in original image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidateBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
    pub score: f32,
    /// Regression deltas `(dx0, dy0, dx1, dy1)` from the stage that scored
    /// this box, not yet applied.
    pub reg: [f32; 4],
}

impl CandidateBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32, score: f32) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            score,
            reg: [0.0; 4],
        }
    }

    pub fn width(&self, extent: Extent) -> f32 {
        self.x1 - self.x0 + extent.offset()
    }

    pub fn height(&self, extent: Extent) -> f32 {
        self.y1 - self.y0 + extent.offset()
    }

    // pixel area, the measure used by the overlap tests
    pub fn area(&self) -> f32 {
        self.width(Extent::Pixels) * self.height(Extent::Pixels)
    }

    pub fn rescored(&self, score: f32, reg: [f32; 4]) -> Self {
        Self { score, reg, ..*self }
    }

    /// Applies the stored regression deltas, each scaled by the box size
    /// measured with `extent`. Zero deltas leave the box unchanged.
    pub fn calibrate(&self, extent: Extent) -> Self {
        let w = self.width(extent);
        let h = self.height(extent);
        let [dx0, dy0, dx1, dy1] = self.reg;

        Self {
            x0: self.x0 + dx0 * w,
            y0: self.y0 + dy0 * h,
            x1: self.x1 + dx1 * w,
            y1: self.y1 + dy1 * h,
            score: self.score,
            reg: [0.0; 4],
        }
    }

    /// Grows the shorter side so the box becomes a square around the same
    /// center.
    pub fn to_square(&self) -> Self {
        let w = self.x1 - self.x0;
        let h = self.y1 - self.y0;
        let side = w.max(h);

        let x0 = self.x0 + w * 0.5 - side * 0.5;
        let y0 = self.y0 + h * 0.5 - side * 0.5;

        Self {
            x0,
            y0,
            x1: x0 + side,
            y1: y0 + side,
            ..*self
        }
    }

    pub fn truncated(&self) -> Self {
        Self {
            x0: self.x0.trunc(),
            y0: self.y0.trunc(),
            x1: self.x1.trunc(),
            y1: self.y1.trunc(),
            ..*self
        }
    }

    // inclusive corners, saturating for boxes far outside the image
    pub fn crop_window(&self) -> (i64, i64, i64, i64) {
        (self.x0 as i64, self.y0 as i64, self.x1 as i64, self.y1 as i64)
    }

    pub fn is_degenerate(&self) -> bool {
        !(self.x1 >= self.x0 && self.y1 >= self.y0)
    }

    /// Maps offsets given as fractions of this box's pixel extent to
    /// absolute points.
    pub fn project_point(&self, fx: f32, fy: f32) -> Point2<f32> {
        Point2::new(
            self.x0 + fx * self.width(Extent::Pixels),
            self.y0 + fy * self.height(Extent::Pixels),
        )
    }
}
