use crate::types::ScoredKeypoint;
use prodmatch_core::Keypoint;
use rayon::prelude::*;

/// Arc length of the FAST-9 segment test
const ARC_LENGTH: usize = 9;

/// Corner detection algorithms (FAST segment test and Harris scoring)
pub struct CornerDetector;

impl CornerDetector {
    /// Bresenham circle of radius 3, clockwise from 12 o'clock
    pub const FAST_OFFSETS: [(i32, i32); 16] = [
        (0, -3), (1, -3), (2, -2), (3, -1),
        (3, 0), (3, 1), (2, 2), (1, 3),
        (0, 3), (-1, 3), (-2, 2), (-3, 1),
        (-3, 0), (-3, -1), (-2, -2), (-1, -3),
    ];

    /// Run the segment test on every pixel at least `border` pixels from the edge.
    ///
    /// Rows are processed in parallel; the output is in raster order.
    pub fn detect_corners(
        img: &[u8],
        width: usize,
        height: usize,
        threshold: u8,
        border: usize,
    ) -> Vec<ScoredKeypoint> {
        let border = border.max(3);
        if width <= 2 * border || height <= 2 * border {
            return Vec::new();
        }

        (border..height - border)
            .into_par_iter()
            .flat_map_iter(|y| {
                let mut row_keypoints = Vec::new();
                for x in border..width - border {
                    let center_pixel = img[y * width + x];
                    if let Some(response) =
                        Self::segment_test(img, width, x, y, center_pixel, threshold)
                    {
                        row_keypoints.push(ScoredKeypoint {
                            keypoint: Keypoint::new(x as f32, y as f32),
                            response,
                        });
                    }
                }
                row_keypoints
            })
            .collect()
    }

    /// FAST-9: returns the corner score when 9 contiguous circle pixels are all
    /// brighter or all darker than the centre by more than `threshold`.
    fn segment_test(
        img: &[u8],
        width: usize,
        x: usize,
        y: usize,
        center_pixel: u8,
        threshold: u8,
    ) -> Option<f32> {
        let center = center_pixel as i32;
        let t = threshold as i32;

        // Cardinal pixels first: a 9-arc always covers at least two of them
        let mut cardinal_hits = 0;
        for &i in &[0usize, 4, 8, 12] {
            let (dx, dy) = Self::FAST_OFFSETS[i];
            let p = Self::circle_pixel(img, width, x, y, dx, dy);
            if p > center + t || p < center - t {
                cardinal_hits += 1;
            }
        }
        if cardinal_hits < 2 {
            return None;
        }

        let mut brighter: u16 = 0;
        let mut darker: u16 = 0;
        for (i, &(dx, dy)) in Self::FAST_OFFSETS.iter().enumerate() {
            let p = Self::circle_pixel(img, width, x, y, dx, dy);
            if p > center + t {
                brighter |= 1 << i;
            } else if p < center - t {
                darker |= 1 << i;
            }
        }

        if has_circular_run(brighter, ARC_LENGTH) || has_circular_run(darker, ARC_LENGTH) {
            Some(Self::intensity_response(img, width, x, y, center, t))
        } else {
            None
        }
    }

    #[inline]
    fn circle_pixel(img: &[u8], width: usize, x: usize, y: usize, dx: i32, dy: i32) -> i32 {
        let px = (x as i32 + dx) as usize;
        let py = (y as i32 + dy) as usize;
        img[py * width + px] as i32
    }

    /// Mean squared difference of the circle pixels that pass the threshold
    fn intensity_response(img: &[u8], width: usize, x: usize, y: usize, center: i32, t: i32) -> f32 {
        let mut sum_diff = 0.0f32;
        let mut count = 0;
        for &(dx, dy) in Self::FAST_OFFSETS.iter() {
            let diff = (Self::circle_pixel(img, width, x, y, dx, dy) - center).abs();
            if diff > t {
                sum_diff += (diff * diff) as f32;
                count += 1;
            }
        }
        if count > 0 {
            sum_diff / count as f32
        } else {
            0.0
        }
    }

    /// Harris corner response over a `(2 * radius + 1)²` window of Sobel gradients.
    ///
    /// Returns 0 for windows that would leave the image.
    pub fn harris_response(img: &[u8], width: usize, height: usize, x: usize, y: usize, radius: usize) -> f32 {
        if x < radius + 1 || y < radius + 1 || x + radius + 1 >= width || y + radius + 1 >= height {
            return 0.0;
        }

        let mut ixx = 0.0f64;
        let mut ixy = 0.0f64;
        let mut iyy = 0.0f64;

        for ny in y - radius..=y + radius {
            for nx in x - radius..=x + radius {
                let (gx, gy) = Self::sobel(img, width, nx, ny);
                ixx += (gx * gx) as f64;
                ixy += (gx * gy) as f64;
                iyy += (gy * gy) as f64;
            }
        }

        // Harris corner response: det(M) - k * trace(M)^2
        let k = 0.04f64;
        let det = ixx * iyy - ixy * ixy;
        let trace = ixx + iyy;
        (det - k * trace * trace) as f32
    }

    /// Sobel gradients, scaled to the intensity range. Caller guarantees a 1-pixel margin.
    fn sobel(img: &[u8], width: usize, x: usize, y: usize) -> (f32, f32) {
        let at = |xx: usize, yy: usize| img[yy * width + xx] as f32;

        let gx = at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1)
            - at(x - 1, y - 1) - 2.0 * at(x - 1, y) - at(x - 1, y + 1);
        let gy = at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1)
            - at(x - 1, y - 1) - 2.0 * at(x, y - 1) - at(x + 1, y - 1);

        (gx / 8.0, gy / 8.0)
    }
}

/// True when the 16-bit circular mask holds `min_count` consecutive set bits.
pub fn has_circular_run(mask: u16, min_count: usize) -> bool {
    if min_count == 0 || min_count > 16 {
        return false;
    }
    let mut run = mask;
    for i in 1..min_count as u32 {
        run &= mask.rotate_left(i);
        if run == 0 {
            return false;
        }
    }
    run != 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn mask_of(bits: impl IntoIterator<Item = usize>) -> u16 {
        bits.into_iter().fold(0u16, |m, i| m | (1 << i))
    }

    #[test]
    fn test_run_simple() {
        let mask = mask_of(0..9);
        assert!(has_circular_run(mask, 9));
        assert!(!has_circular_run(mask, 10));
    }

    #[test]
    fn test_run_wraps_around() {
        let mask = mask_of((12..16).chain(0..5));
        assert!(has_circular_run(mask, 9));
    }

    #[test]
    fn test_scattered_bits_are_not_a_run() {
        let mask = mask_of((0..16).step_by(2));
        assert_eq!(mask.count_ones(), 8);
        assert!(!has_circular_run(mask, 2));
        // Enough bits in total, but split into two arcs of 6
        let mask = mask_of((0..6).chain(8..14));
        assert!(!has_circular_run(mask, 9));
    }

    fn square_image(width: usize, height: usize) -> Vec<u8> {
        let mut img = vec![50u8; width * height];
        for y in height / 2 - 4..height / 2 + 4 {
            for x in width / 2 - 4..width / 2 + 4 {
                img[y * width + x] = 220;
            }
        }
        img
    }

    #[test]
    fn test_uniform_image_has_no_corners() {
        let img = vec![128u8; 40 * 40];
        assert!(CornerDetector::detect_corners(&img, 40, 40, 20, 3).is_empty());
    }

    #[test]
    fn test_square_corners_detected() {
        let img = square_image(40, 40);
        let corners = CornerDetector::detect_corners(&img, 40, 40, 20, 3);
        assert!(!corners.is_empty());
        for c in &corners {
            assert!(c.response > 0.0);
            // Every corner sits near the square's outline
            assert!((c.keypoint.x - 20.0).abs() <= 8.0);
            assert!((c.keypoint.y - 20.0).abs() <= 8.0);
        }
    }

    #[test]
    fn test_straight_edge_is_not_a_corner() {
        let (w, h) = (40, 40);
        let img: Vec<u8> = (0..w * h).map(|i| if i % w < w / 2 { 30 } else { 200 }).collect();
        assert!(CornerDetector::detect_corners(&img, w, h, 20, 3).is_empty());
    }

    #[test]
    fn test_harris_prefers_corners_over_edges() {
        let img = square_image(40, 40);
        let corner = CornerDetector::harris_response(&img, 40, 40, 16, 16, 3);
        let edge = CornerDetector::harris_response(&img, 40, 40, 20, 16, 3);
        assert!(corner > edge);
        assert_eq!(CornerDetector::harris_response(&img, 40, 40, 1, 1, 3), 0.0);
    }

    /// Longest run of set bits, walking the circle twice
    fn longest_run(mask: u16) -> usize {
        let mut best = 0;
        let mut run = 0;
        for i in 0..32 {
            if mask & (1 << (i % 16)) != 0 {
                run += 1;
                best = best.max(run);
            } else {
                run = 0;
            }
        }
        best.min(16)
    }

    proptest! {
        #[test]
        fn prop_circular_run_matches_scan(mask in any::<u16>(), n in 1usize..=16) {
            prop_assert_eq!(has_circular_run(mask, n), longest_run(mask) >= n);
        }
    }
}
