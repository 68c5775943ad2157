use crate::face_detection::PROPOSAL_CELL;

/// Scale factors of the image pyramid, largest first.
///
/// The first scale maps a face of `min_size` pixels onto the proposal window;
/// each further level shrinks by `factor` until the shorter image side would
/// drop below the window. Empty when `min_size` exceeds the shorter side.
pub fn pyramid_scales(width: u32, height: u32, min_size: u32, factor: f32) -> Vec<f32> {
    let cell = PROPOSAL_CELL as f32;
    let base = cell / min_size as f32;

    let mut scales = Vec::new();
    let mut side = width.min(height) as f32 * base;
    let mut scale = base;
    while side >= cell {
        scales.push(scale);
        scale *= factor;
        side *= factor;
    }
    scales
}

/// Size `(width, height)` of the pyramid level for `scale`.
pub fn level_size(width: u32, height: u32, scale: f32) -> (u32, u32) {
    (
        (width as f32 * scale).ceil() as u32,
        (height as f32 * scale).ceil() as u32,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scales_are_decreasing_and_cover_the_short_side() {
        let scales = pyramid_scales(640, 480, 20, 0.709);
        assert!((scales[0] - 0.6).abs() < 1e-6);
        assert!(scales.windows(2).all(|w| w[1] < w[0]));

        let last = *scales.last().unwrap();
        assert!(480.0 * last >= 12.0);
        assert!(480.0 * last * 0.709 < 12.0);
    }

    #[test]
    fn scale_count_matches_geometric_series() {
        // 100 * 0.6 = 60 -> 42.5 -> 30.2 -> 21.4 -> 15.2 -> 10.8
        assert_eq!(pyramid_scales(100, 300, 20, 0.709).len(), 5);
    }

    #[test]
    fn oversized_min_size_yields_no_levels() {
        assert!(pyramid_scales(100, 80, 120, 0.709).is_empty());
    }

    #[test]
    fn min_size_equal_to_short_side_yields_one_level() {
        assert_eq!(pyramid_scales(100, 80, 80, 0.709), vec![0.15]);
    }

    #[test]
    fn level_size_rounds_up() {
        assert_eq!(level_size(101, 50, 0.5), (51, 25));
    }
}
