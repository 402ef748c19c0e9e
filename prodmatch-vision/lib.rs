//! Image operations the product matching pipeline is built on.
//!
//! [`VisionPrimitives`] is the seam between the pipeline and any image
//! library; [`NativeVision`] implements it on top of the workspace's own
//! FAST/BRIEF crates and the `image` buffer types.

pub mod filter;
pub mod hog;
pub mod homography;
pub mod orb;
pub mod warp;

pub use homography::HomographyEstimator;
pub use image::{DynamicImage, GrayImage};
pub use orb::OrbExtractor;

use log::debug;
use prodmatch_brief::BruteForceMatcher;
use prodmatch_core::{
    Correspondence, Homography, HomographyFit, HogConfig, KeypointSet, MatchResult, Point2, VisionConfig,
};
use prodmatch_fast::ImagePreprocessing;

/// Stateless image operations used by alignment, preprocessing and scoring.
pub trait VisionPrimitives: Send + Sync {
    fn to_grayscale(&self, img: &DynamicImage) -> GrayImage;

    /// Tile-based local contrast equalization
    fn equalize_contrast(&self, img: &GrayImage) -> GrayImage;

    fn detect_and_describe(&self, img: &GrayImage, max_keypoints: usize) -> KeypointSet;

    /// Nearest-neighbour matching of `query` against `train`, best first. With
    /// `symmetric` only mutual nearest neighbours survive.
    fn match_descriptors(&self, query: &KeypointSet, train: &KeypointSet, symmetric: bool) -> Vec<Correspondence>;

    fn estimate_homography(&self, correspondences: &[Correspondence], tolerance: f64) -> Option<HomographyFit>;

    fn warp(&self, img: &GrayImage, homography: &Homography, width: u32, height: u32) -> GrayImage;

    fn dense_gradient_descriptor(&self, img: &GrayImage, cfg: &HogConfig) -> MatchResult<Vec<f32>>;

    fn gaussian_blur(&self, img: &GrayImage, kernel_size: usize) -> GrayImage;

    /// Area-averaging resize
    fn resize(&self, img: &GrayImage, width: u32, height: u32) -> GrayImage;
}

/// Pure-Rust backend.
pub struct NativeVision {
    config: VisionConfig,
    orb: OrbExtractor,
    ransac: HomographyEstimator,
}

impl NativeVision {
    pub fn new(config: VisionConfig) -> Self {
        let orb = OrbExtractor::new(config.orb.clone());
        let ransac = HomographyEstimator::new(config.ransac);
        Self { config, orb, ransac }
    }

    pub fn config(&self) -> &VisionConfig {
        &self.config
    }
}

impl Default for NativeVision {
    fn default() -> Self {
        Self::new(VisionConfig::default())
    }
}

impl VisionPrimitives for NativeVision {
    fn to_grayscale(&self, img: &DynamicImage) -> GrayImage {
        img.to_luma8()
    }

    fn equalize_contrast(&self, img: &GrayImage) -> GrayImage {
        let (w, h) = img.dimensions();
        let clahe = &self.config.clahe;
        match ImagePreprocessing::apply_clahe(img.as_raw(), w as usize, h as usize, clahe.clip_limit, clahe.tile_grid) {
            Ok(data) => GrayImage::from_raw(w, h, data).unwrap_or_else(|| img.clone()),
            Err(e) => {
                debug!("contrast equalization skipped: {}", e);
                img.clone()
            }
        }
    }

    fn detect_and_describe(&self, img: &GrayImage, max_keypoints: usize) -> KeypointSet {
        self.orb.detect_and_describe(img, max_keypoints)
    }

    fn match_descriptors(&self, query: &KeypointSet, train: &KeypointSet, symmetric: bool) -> Vec<Correspondence> {
        BruteForceMatcher::new(symmetric)
            .match_descriptors(&query.descriptors, &train.descriptors)
            .into_iter()
            .map(|m| {
                let q = &query.keypoints[m.query_idx];
                let t = &train.keypoints[m.train_idx];
                Correspondence {
                    source: Point2::new(q.x, q.y),
                    reference: Point2::new(t.x, t.y),
                    distance: m.distance,
                }
            })
            .collect()
    }

    fn estimate_homography(&self, correspondences: &[Correspondence], tolerance: f64) -> Option<HomographyFit> {
        self.ransac.estimate(correspondences, tolerance)
    }

    fn warp(&self, img: &GrayImage, homography: &Homography, width: u32, height: u32) -> GrayImage {
        warp::warp_perspective(img, homography, width, height)
    }

    fn dense_gradient_descriptor(&self, img: &GrayImage, cfg: &HogConfig) -> MatchResult<Vec<f32>> {
        hog::compute_hog(img, cfg)
    }

    fn gaussian_blur(&self, img: &GrayImage, kernel_size: usize) -> GrayImage {
        filter::gaussian_blur(img, kernel_size)
    }

    fn resize(&self, img: &GrayImage, width: u32, height: u32) -> GrayImage {
        filter::resize_area(img, width, height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};

    fn scene(w: u32, h: u32) -> GrayImage {
        GrayImage::from_fn(w, h, |x, y| {
            let block = (x / 10) * 31 + (y / 10) * 17;
            let base = if block.wrapping_mul(2_246_822_519) % 5 < 2 { 200 } else { 40 };
            image::Luma([base + ((x + y) % 9) as u8])
        })
    }

    #[test]
    fn test_grayscale_uses_luma() {
        let vision = NativeVision::default();
        let rgb = RgbImage::from_pixel(4, 4, Rgb([255, 255, 255]));
        let gray = vision.to_grayscale(&DynamicImage::ImageRgb8(rgb));
        assert_eq!(gray.dimensions(), (4, 4));
        assert!(gray.pixels().all(|p| p[0] == 255));
    }

    #[test]
    fn test_equalize_keeps_dimensions() {
        let vision = NativeVision::default();
        let img = scene(64, 48);
        assert_eq!(vision.equalize_contrast(&img).dimensions(), (64, 48));
        assert_eq!(vision.equalize_contrast(&GrayImage::new(0, 0)).dimensions(), (0, 0));
    }

    #[test]
    fn test_self_matching_is_one_to_one() {
        let vision = NativeVision::default();
        let img = scene(240, 200);
        let set = vision.detect_and_describe(&img, 1000);
        assert!(set.len() > 20);

        let matches = vision.match_descriptors(&set, &set, true);
        assert!(matches.len() >= set.len() / 2);
        for pair in matches.windows(2) {
            assert!(pair[0].distance <= pair[1].distance);
        }
        assert!(matches.iter().filter(|c| c.distance == 0).count() > 0);
    }

    #[test]
    fn test_translation_is_recovered() {
        let vision = NativeVision::default();
        let reference = scene(240, 200);
        let shift = Homography::from_rows([[1.0, 0.0, -6.0], [0.0, 1.0, -4.0], [0.0, 0.0, 1.0]]);
        let source = vision.warp(&reference, &shift.inverse().unwrap(), 240, 200);

        let src_set = vision.detect_and_describe(&source, 2000);
        let ref_set = vision.detect_and_describe(&reference, 2000);
        let corr = vision.match_descriptors(&src_set, &ref_set, true);
        assert!(corr.len() >= 11);

        let fit = vision.estimate_homography(&corr, 5.0).unwrap();
        assert!(fit.inlier_count() > 25);
        let (x, y) = fit.homography.project(100.0, 100.0).unwrap();
        assert!((x - 94.0).abs() < 1.5 && (y - 96.0).abs() < 1.5, "({}, {})", x, y);
    }
}
