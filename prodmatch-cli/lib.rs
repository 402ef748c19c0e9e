//! Decides whether two product photographs show the same product.
//!
//! The source image is aligned onto the reference with ORB features and a
//! RANSAC homography, both images are brought to a canonical size and
//! smoothed, and a normalized gradient-histogram distance is compared against
//! a threshold.

pub mod align;
pub mod error;
pub mod preprocess;
pub mod render;
pub mod run_config;
pub mod scorer;
pub mod verdict;

pub use align::{AlignmentReport, AlignmentStatus, align, align_with_report};
pub use error::{PipelineError, PipelineResult};
pub use preprocess::{preprocess, preprocess_with_report};
pub use run_config::RunConfig;
pub use scorer::{distance, feature_vector, raw_pixel_distance};
pub use verdict::classify;

pub use prodmatch_core::{self, ComparisonResult, MatchError, MatchResult, PipelineConfig, ScorerStrategy};
pub use prodmatch_vision::{self, NativeVision, VisionPrimitives};

use image::{DynamicImage, GrayImage};
use log::info;
use std::path::Path;

/// Everything one comparison produced, for callers that want more than the verdict.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub result: ComparisonResult,
    pub alignment: AlignmentReport,
    /// Preprocessed source and reference, as scored
    pub images: (GrayImage, GrayImage),
}

/// Size the global worker pool. Fails once the pool has been built, which
/// happens implicitly on the first parallel call.
pub fn configure_threads(n_threads: usize) -> PipelineResult<()> {
    prodmatch_core::init_thread_pool(n_threads)?;
    info!("worker pool sized to {} threads", n_threads);
    Ok(())
}

/// Compare with default settings and the bundled vision backend.
pub fn compare_images(source: &DynamicImage, reference: &DynamicImage, threshold: f64) -> MatchResult<ComparisonResult> {
    let cfg = PipelineConfig::default().with_threshold(threshold);
    let vision = NativeVision::new(cfg.vision.clone());
    compare_images_with(&vision, source, reference, &cfg)
}

/// The full pipeline: validate, preprocess, score, classify.
pub fn compare_images_with<V: VisionPrimitives + ?Sized>(
    vision: &V,
    source: &DynamicImage,
    reference: &DynamicImage,
    cfg: &PipelineConfig,
) -> MatchResult<ComparisonResult> {
    compare_detailed(vision, source, reference, cfg).map(|c| c.result)
}

pub fn compare_detailed<V: VisionPrimitives + ?Sized>(
    vision: &V,
    source: &DynamicImage,
    reference: &DynamicImage,
    cfg: &PipelineConfig,
) -> MatchResult<Comparison> {
    cfg.validate()?;
    ensure_not_empty(source, "source")?;
    ensure_not_empty(reference, "reference")?;

    let (a, b, alignment) = preprocess_with_report(vision, source, reference, cfg);
    let d = distance(vision, &a, &b, &cfg.scorer)?;
    let result = ComparisonResult {
        distance: d,
        threshold: cfg.threshold,
        same: classify(d, cfg.threshold),
    };
    info!("distance {:.4} vs threshold {:.4}, alignment {}", d, cfg.threshold, alignment.status);

    Ok(Comparison {
        result,
        alignment,
        images: (a, b),
    })
}

fn ensure_not_empty(img: &DynamicImage, role: &'static str) -> MatchResult<()> {
    if img.width() == 0 || img.height() == 0 {
        Err(MatchError::EmptyImage { role })
    } else {
        Ok(())
    }
}

/// Reusable comparison handle: a validated configuration plus a vision backend.
pub struct ProductMatcher<V: VisionPrimitives = NativeVision> {
    config: PipelineConfig,
    vision: V,
}

impl ProductMatcher<NativeVision> {
    pub fn new(config: PipelineConfig) -> MatchResult<Self> {
        let vision = NativeVision::new(config.vision.clone());
        Self::with_vision(config, vision)
    }
}

impl<V: VisionPrimitives> ProductMatcher<V> {
    pub fn with_vision(config: PipelineConfig, vision: V) -> MatchResult<Self> {
        config.validate()?;
        Ok(Self { config, vision })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn vision(&self) -> &V {
        &self.vision
    }

    pub fn compare(&self, source: &DynamicImage, reference: &DynamicImage) -> MatchResult<ComparisonResult> {
        compare_images_with(&self.vision, source, reference, &self.config)
    }

    pub fn compare_detailed(&self, source: &DynamicImage, reference: &DynamicImage) -> MatchResult<Comparison> {
        compare_detailed(&self.vision, source, reference, &self.config)
    }

    /// Decode both files and compare them
    pub fn compare_paths<P: AsRef<Path>, Q: AsRef<Path>>(&self, source: P, reference: Q) -> PipelineResult<Comparison> {
        let source = image::open(source)?;
        let reference = image::open(reference)?;
        Ok(self.compare_detailed(&source, &reference)?)
    }

    pub fn preprocess(&self, source: &DynamicImage, reference: &DynamicImage) -> (GrayImage, GrayImage) {
        preprocess(&self.vision, source, reference, &self.config)
    }
}
