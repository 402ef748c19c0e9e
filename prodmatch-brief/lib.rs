//! Steered BRIEF descriptors and brute-force Hamming matching.

pub mod matcher;

pub use matcher::{hamming_distance, BruteForceMatcher};

use log::trace;
use prodmatch_core::{Descriptor, Keypoint};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

const DESCRIPTOR_SIZE: usize = 32;
const PAIR_COUNT: usize = DESCRIPTOR_SIZE * 8;

/// Seed for the sampling pattern; descriptors are only comparable when both
/// sides were built from the same pattern.
pub const DEFAULT_PATTERN_SEED: u64 = 0x0B5E_55ED;

/// Offset pair `(x1, y1, x2, y2)` relative to the keypoint, before steering
pub type SamplePair = (f32, f32, f32, f32);

pub struct BriefGenerator {
    pairs: Vec<SamplePair>,
    patch_size: usize,
}

impl BriefGenerator {
    pub fn new(patch_size: usize) -> Self {
        Self::with_seed(patch_size, DEFAULT_PATTERN_SEED)
    }

    /// 256 point pairs drawn uniformly from the disc of radius `patch_size / 2`.
    pub fn with_seed(patch_size: usize, seed: u64) -> Self {
        let half = (patch_size / 2).max(1) as i32;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut point = || loop {
            let dx = rng.random_range(-half..=half);
            let dy = rng.random_range(-half..=half);
            if dx * dx + dy * dy <= half * half {
                return (dx as f32, dy as f32);
            }
        };

        let pairs = (0..PAIR_COUNT)
            .map(|_| {
                let (x1, y1) = point();
                let (x2, y2) = point();
                (x1, y1, x2, y2)
            })
            .collect();

        Self { pairs, patch_size }
    }

    pub fn patch_size(&self) -> usize {
        self.patch_size
    }

    pub fn pairs(&self) -> &[SamplePair] {
        &self.pairs
    }

    /// One descriptor per keypoint. Keypoints are in the pixel grid of `img`;
    /// the sampling pattern is rotated by each keypoint's angle.
    pub fn generate_descriptors(&self, img: &[u8], width: usize, height: usize, kps: &[Keypoint]) -> Vec<Descriptor> {
        debug_assert_eq!(img.len(), width * height);
        trace!("brief: describing {} keypoints on {}x{} level", kps.len(), width, height);
        kps.par_iter()
            .map(|kp| {
                let (s, c) = kp.angle.sin_cos();
                let mut d = [0u8; DESCRIPTOR_SIZE];

                for (i, &(x1, y1, x2, y2)) in self.pairs.iter().enumerate() {
                    let (rx1, ry1) = (kp.x + c * x1 - s * y1, kp.y + s * x1 + c * y1);
                    let (rx2, ry2) = (kp.x + c * x2 - s * y2, kp.y + s * x2 + c * y2);

                    let val1 = bilinear_sample(img, width, height, rx1, ry1);
                    let val2 = bilinear_sample(img, width, height, rx2, ry2);

                    d[i / 8] |= ((val1 < val2) as u8) << (i % 8);
                }
                d
            })
            .collect()
    }
}

/// Bilinear interpolation, clamping samples that fall outside the image
fn bilinear_sample(img: &[u8], width: usize, height: usize, x: f32, y: f32) -> f32 {
    let x = x.clamp(0.0, (width - 1) as f32);
    let y = y.clamp(0.0, (height - 1) as f32);

    let x0 = x.floor() as usize;
    let y0 = y.floor() as usize;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let dx = x - x0 as f32;
    let dy = y - y0 as f32;

    let p00 = img[y0 * width + x0] as f32;
    let p10 = img[y0 * width + x1] as f32;
    let p01 = img[y1 * width + x0] as f32;
    let p11 = img[y1 * width + x1] as f32;

    let top = p00 * (1.0 - dx) + p10 * dx;
    let bottom = p01 * (1.0 - dx) + p11 * dx;
    top * (1.0 - dy) + bottom * dy
}
