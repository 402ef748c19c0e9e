use image::GrayImage;
use log::warn;
use prodmatch_core::{MatchError, MatchResult, ScorerConfig, ScorerStrategy};
use prodmatch_vision::VisionPrimitives;

/// Distance between two preprocessed images of identical size. 0.0 means identical.
pub fn distance<V: VisionPrimitives + ?Sized>(
    vision: &V,
    a: &GrayImage,
    b: &GrayImage,
    cfg: &ScorerConfig,
) -> MatchResult<f64> {
    if a.dimensions() != b.dimensions() {
        return Err(MatchError::DimensionMismatch {
            left: a.dimensions(),
            right: b.dimensions(),
        });
    }

    match cfg.strategy {
        ScorerStrategy::RawPixelDistance => Ok(raw_pixel_distance(a, b)),
        ScorerStrategy::GradientDescriptorDistance => {
            let fa = feature_vector(&vision.dense_gradient_descriptor(a, &cfg.hog)?, cfg.epsilon);
            let fb = feature_vector(&vision.dense_gradient_descriptor(b, &cfg.hog)?, cfg.epsilon);
            Ok(euclidean(&fa, &fb))
        }
    }
}

/// `v / (‖v‖ + epsilon)`. A result with any non-finite component is replaced
/// by the zero vector.
pub fn feature_vector(raw: &[f32], epsilon: f64) -> Vec<f64> {
    let norm = raw.iter().map(|&v| (v as f64) * (v as f64)).sum::<f64>().sqrt();
    let scale = 1.0 / (norm + epsilon);
    let normalized: Vec<f64> = raw.iter().map(|&v| v as f64 * scale).collect();

    if normalized.iter().all(|v| v.is_finite()) {
        normalized
    } else {
        warn!("non-finite feature vector (norm {}), substituting zeros", norm);
        vec![0.0; raw.len()]
    }
}

/// L2 norm of the element-wise difference
pub fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum::<f64>().sqrt()
}

/// Legacy scorer: L2 norm of the raw intensity difference, unnormalized.
pub fn raw_pixel_distance(a: &GrayImage, b: &GrayImage) -> f64 {
    a.as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(&x, &y)| {
            let d = x as f64 - y as f64;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}
