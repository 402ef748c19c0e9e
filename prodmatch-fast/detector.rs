use prodmatch_core::{Keypoint, OrbConfig};
use crate::corner_detection::CornerDetector;
use crate::error::{FastError, FastResult};
use crate::pyramid::ImagePyramid;
use crate::refinement::KeypointRefinement;
use crate::types::{LevelKeypoints, ScaleLevel};
use log::trace;
use rayon::prelude::*;

/// Half-width of the Harris window used to rank FAST corners
const HARRIS_RADIUS: usize = 3;

/// Multi-scale FAST detector: segment test, 3×3 suppression, Harris ranking and
/// intensity-centroid orientation on every pyramid level.
pub struct FastDetector {
    cfg: OrbConfig,
    w: usize,
    h: usize,
    border: usize,
    scale_levels: Vec<ScaleLevel>,
}

impl FastDetector {
    /// Creates a new FAST detector with validation
    pub fn new(cfg: OrbConfig, width: usize, height: usize) -> FastResult<Self> {
        if width == 0 || height == 0 {
            return Err(FastError::InvalidImageSize { width, height });
        }

        // 3-pixel circle on each side
        const MIN_SIZE: usize = 7;
        if width < MIN_SIZE || height < MIN_SIZE {
            return Err(FastError::ImageTooSmall { width, height, min_size: MIN_SIZE });
        }

        if cfg.threshold == 0 || cfg.threshold > 127 {
            return Err(FastError::InvalidThreshold(cfg.threshold));
        }

        let min_dim = width.min(height);
        if cfg.patch_size % 2 == 0 || cfg.patch_size >= min_dim {
            return Err(FastError::InvalidPatchSize {
                patch_size: cfg.patch_size,
                min_image_dim: min_dim,
            });
        }

        if cfg.n_levels == 0 || !(cfg.scale_factor > 1.0) {
            return Err(FastError::InvalidPyramid {
                n_levels: cfg.n_levels,
                scale_factor: cfg.scale_factor,
            });
        }

        let border = (cfg.patch_size / 2 + 1).max(3);
        let scale_levels =
            ImagePyramid::generate_scale_levels(width, height, cfg.n_levels, cfg.scale_factor, 2 * border + 1);

        Ok(Self {
            cfg,
            w: width,
            h: height,
            border,
            scale_levels,
        })
    }

    pub fn config(&self) -> &OrbConfig {
        &self.cfg
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.w, self.h)
    }

    pub fn scale_levels(&self) -> &[ScaleLevel] {
        &self.scale_levels
    }

    fn validate_image(&self, img: &[u8]) -> FastResult<()> {
        let expected_len = self.w * self.h;
        if img.len() != expected_len {
            return Err(FastError::InvalidImageData {
                expected_len,
                actual_len: img.len(),
            });
        }
        Ok(())
    }

    /// Detect keypoints on every pyramid level, keeping at most `max_keypoints`
    /// in total. Coordinates stay in each level's own pixel grid.
    pub fn detect_levels(&self, img: &[u8], max_keypoints: usize) -> FastResult<Vec<LevelKeypoints>> {
        self.validate_image(img)?;

        let pyramid = ImagePyramid::build_image_pyramid(img, self.w, self.h, &self.scale_levels);
        let quotas = ImagePyramid::feature_quotas(max_keypoints, self.scale_levels.len(), self.cfg.scale_factor);

        let levels = self
            .scale_levels
            .par_iter()
            .zip(pyramid.into_par_iter())
            .zip(quotas.into_par_iter())
            .map(|((level, image), quota)| {
                let keypoints = self.detect_at_level(&image, level, quota);
                trace!(
                    "level {} ({}x{}): kept {} of quota {}",
                    level.level,
                    level.width,
                    level.height,
                    keypoints.len(),
                    quota
                );
                LevelKeypoints {
                    level: *level,
                    image,
                    keypoints,
                }
            })
            .collect();

        Ok(levels)
    }

    /// Detect keypoints across all levels, in level-0 coordinates.
    pub fn detect_keypoints(&self, img: &[u8], max_keypoints: usize) -> FastResult<Vec<Keypoint>> {
        let levels = self.detect_levels(img, max_keypoints)?;
        Ok(levels
            .into_iter()
            .flat_map(|lk| {
                let scale = lk.level.scale;
                lk.keypoints.into_iter().map(move |kp| Keypoint {
                    x: kp.x * scale,
                    y: kp.y * scale,
                    ..kp
                })
            })
            .collect())
    }

    fn detect_at_level(&self, img: &[u8], level: &ScaleLevel, quota: usize) -> Vec<Keypoint> {
        if quota == 0 {
            return Vec::new();
        }
        let (w, h) = (level.width, level.height);

        let corners = CornerDetector::detect_corners(img, w, h, self.cfg.threshold, self.border);
        let mut survivors = KeypointRefinement::non_maximum_suppression(&corners, w, h);
        for sk in survivors.iter_mut() {
            sk.response = CornerDetector::harris_response(
                img,
                w,
                h,
                sk.keypoint.x as usize,
                sk.keypoint.y as usize,
                HARRIS_RADIUS,
            );
        }

        let half = (self.cfg.patch_size / 2) as i32;
        KeypointRefinement::retain_best(survivors, quota)
            .into_iter()
            .map(|sk| Keypoint {
                x: sk.keypoint.x,
                y: sk.keypoint.y,
                angle: KeypointRefinement::compute_orientation(img, w, h, sk.keypoint.x, sk.keypoint.y, half),
                response: sk.response,
                octave: level.level as u8,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodmatch_core::Image;

    fn create_test_config() -> OrbConfig {
        OrbConfig {
            threshold: 20,
            patch_size: 15,
            n_levels: 4,
            scale_factor: 1.2,
            n_threads: 1,
        }
    }

    fn create_small_test_config() -> OrbConfig {
        OrbConfig {
            patch_size: 5,
            n_levels: 1,
            ..create_test_config()
        }
    }

    fn create_corner_image(width: usize, height: usize) -> Image {
        let mut img = vec![50; width * height];
        let (cx, cy) = (width / 2, height / 2);
        for y in cy - 2..=cy + 2 {
            for x in cx - 2..=cx + 2 {
                img[y * width + x] = 255;
            }
        }
        img
    }

    /// Scattered bright squares of varying sizes on a dark background
    fn create_textured_image(width: usize, height: usize) -> Image {
        let mut img = vec![40u8; width * height];
        for i in 0..12 {
            let cx = 20 + (i * 37) % (width - 40);
            let cy = 20 + (i * 53) % (height - 40);
            let r = 3 + i % 5;
            for y in cy - r..=cy + r {
                for x in cx - r..=cx + r {
                    img[y * width + x] = 200 + (i as u8 % 4) * 10;
                }
            }
        }
        img
    }

    #[test]
    fn test_valid_constructor() {
        let detector = FastDetector::new(create_test_config(), 100, 100).unwrap();
        assert_eq!(detector.dimensions(), (100, 100));
        assert_eq!(detector.scale_levels().len(), 4);
    }

    #[test]
    fn test_invalid_dimensions() {
        let result = FastDetector::new(create_test_config(), 0, 100);
        assert!(matches!(result, Err(FastError::InvalidImageSize { .. })));

        let result = FastDetector::new(create_test_config(), 100, 0);
        assert!(matches!(result, Err(FastError::InvalidImageSize { .. })));
    }

    #[test]
    fn test_too_small_image() {
        let result = FastDetector::new(create_test_config(), 6, 6);
        assert!(matches!(result, Err(FastError::ImageTooSmall { .. })));
    }

    #[test]
    fn test_invalid_threshold() {
        let mut cfg = create_test_config();

        cfg.threshold = 0;
        let result = FastDetector::new(cfg.clone(), 100, 100);
        assert!(matches!(result, Err(FastError::InvalidThreshold(0))));

        cfg.threshold = 200;
        let result = FastDetector::new(cfg, 100, 100);
        assert!(matches!(result, Err(FastError::InvalidThreshold(200))));
    }

    #[test]
    fn test_invalid_patch_size() {
        let mut cfg = create_test_config();

        cfg.patch_size = 16;
        let result = FastDetector::new(cfg.clone(), 100, 100);
        assert!(matches!(result, Err(FastError::InvalidPatchSize { .. })));

        cfg.patch_size = 101;
        let result = FastDetector::new(cfg, 100, 100);
        assert!(matches!(result, Err(FastError::InvalidPatchSize { .. })));
    }

    #[test]
    fn test_invalid_pyramid() {
        let mut cfg = create_test_config();
        cfg.scale_factor = 1.0;
        let result = FastDetector::new(cfg.clone(), 100, 100);
        assert!(matches!(result, Err(FastError::InvalidPyramid { .. })));

        cfg.scale_factor = 1.2;
        cfg.n_levels = 0;
        let result = FastDetector::new(cfg, 100, 100);
        assert!(matches!(result, Err(FastError::InvalidPyramid { .. })));
    }

    #[test]
    fn test_invalid_image_data() {
        let detector = FastDetector::new(create_small_test_config(), 10, 10).unwrap();
        let img = vec![0; 50];
        let result = detector.detect_keypoints(&img, 100);
        assert!(matches!(result, Err(FastError::InvalidImageData { .. })));
    }

    #[test]
    fn test_uniform_image_has_no_keypoints() {
        let detector = FastDetector::new(create_small_test_config(), 10, 10).unwrap();
        let img = vec![128; 100];
        assert!(detector.detect_keypoints(&img, 100).unwrap().is_empty());
    }

    #[test]
    fn test_corner_detection() {
        let detector = FastDetector::new(create_small_test_config(), 20, 20).unwrap();
        let img = create_corner_image(20, 20);
        let keypoints = detector.detect_keypoints(&img, 100).unwrap();
        assert!(!keypoints.is_empty());
        for kp in &keypoints {
            assert_eq!(kp.octave, 0);
            assert!(kp.angle.is_finite());
        }
    }

    #[test]
    fn test_total_keypoints_respect_limit() {
        let (w, h) = (160, 120);
        let img = create_textured_image(w, h);
        let detector = FastDetector::new(create_test_config(), w, h).unwrap();

        let all = detector.detect_keypoints(&img, 5000).unwrap();
        assert!(all.len() > 10);

        let limited = detector.detect_keypoints(&img, 10).unwrap();
        assert!(limited.len() <= 10);
    }

    #[test]
    fn test_level_coordinates_scale_to_base() {
        let (w, h) = (160, 120);
        let img = create_textured_image(w, h);
        let detector = FastDetector::new(create_test_config(), w, h).unwrap();

        let levels = detector.detect_levels(&img, 5000).unwrap();
        let flat = detector.detect_keypoints(&img, 5000).unwrap();
        assert_eq!(levels.iter().map(|l| l.keypoints.len()).sum::<usize>(), flat.len());

        let mut flat_iter = flat.iter();
        for lk in &levels {
            assert_eq!(lk.image.len(), lk.level.width * lk.level.height);
            for kp in &lk.keypoints {
                let base = flat_iter.next().unwrap();
                assert_eq!(base.octave as usize, lk.level.level);
                assert!((base.x - kp.x * lk.level.scale).abs() < 1e-4);
                assert!(base.x < w as f32 && base.y < h as f32);
            }
        }
    }

    #[test]
    fn test_detection_is_deterministic() {
        let (w, h) = (160, 120);
        let img = create_textured_image(w, h);
        let detector = FastDetector::new(create_test_config(), w, h).unwrap();
        assert_eq!(
            detector.detect_keypoints(&img, 500).unwrap(),
            detector.detect_keypoints(&img, 500).unwrap()
        );
    }
}
