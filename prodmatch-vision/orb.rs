use crate::filter::gaussian_blur_buffer;
use image::GrayImage;
use log::debug;
use prodmatch_brief::BriefGenerator;
use prodmatch_core::{Keypoint, KeypointSet, OrbConfig};
use prodmatch_fast::FastDetector;

/// Smoothing applied to each level image before sampling descriptor pairs
const DESCRIPTOR_BLUR_KERNEL: usize = 7;

/// ORB: multi-scale FAST keypoints with steered BRIEF descriptors.
pub struct OrbExtractor {
    config: OrbConfig,
    brief: BriefGenerator,
}

impl OrbExtractor {
    pub fn new(config: OrbConfig) -> Self {
        let brief = BriefGenerator::new(config.patch_size);
        Self { config, brief }
    }

    pub fn config(&self) -> &OrbConfig {
        &self.config
    }

    /// Up to `max_keypoints` keypoints in level-0 coordinates, each with its descriptor.
    /// Images the detector cannot handle yield an empty set.
    pub fn detect_and_describe(&self, img: &GrayImage, max_keypoints: usize) -> KeypointSet {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let detector = match FastDetector::new(self.config.clone(), w, h) {
            Ok(detector) => detector,
            Err(e) => {
                debug!("orb: no keypoints for {}x{} image: {}", w, h, e);
                return KeypointSet::default();
            }
        };
        let levels = match detector.detect_levels(img.as_raw(), max_keypoints) {
            Ok(levels) => levels,
            Err(e) => {
                debug!("orb: detection failed: {}", e);
                return KeypointSet::default();
            }
        };

        let mut keypoints = Vec::new();
        let mut descriptors = Vec::new();
        for lk in levels.into_iter().filter(|lk| !lk.keypoints.is_empty()) {
            let (lw, lh) = (lk.level.width, lk.level.height);
            let smoothed = gaussian_blur_buffer(&lk.image, lw, lh, DESCRIPTOR_BLUR_KERNEL);
            descriptors.extend(self.brief.generate_descriptors(&smoothed, lw, lh, &lk.keypoints));

            let scale = lk.level.scale;
            keypoints.extend(lk.keypoints.into_iter().map(|kp| Keypoint {
                x: kp.x * scale,
                y: kp.y * scale,
                ..kp
            }));
        }

        debug!("orb: {} keypoints on {}x{} image", keypoints.len(), w, h);
        KeypointSet::new(keypoints, descriptors)
    }
}
