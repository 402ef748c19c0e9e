use crate::error::{MatchError, MatchResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// ORB keypoint extraction settings
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct OrbConfig {
    /// FAST intensity threshold (1-127)
    pub threshold: u8,
    /// Patch used for orientation and BRIEF sampling (odd)
    pub patch_size: usize,
    pub n_levels: usize,
    pub scale_factor: f32,
    pub n_threads: usize,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            patch_size: 31,
            n_levels: 8,
            scale_factor: 1.2,
            n_threads: num_cpus::get().max(1),
        }
    }
}

impl OrbConfig {
    pub fn validate(&self) -> MatchResult<()> {
        if self.threshold == 0 || self.threshold > 127 {
            return Err(MatchError::InvalidFastThreshold(self.threshold));
        }
        if self.patch_size < 3 || self.patch_size % 2 == 0 {
            return Err(MatchError::InvalidPatchSize(self.patch_size));
        }
        if self.n_levels == 0 || !(self.scale_factor > 1.0) || !self.scale_factor.is_finite() {
            return Err(MatchError::InvalidPyramid {
                n_levels: self.n_levels,
                scale_factor: self.scale_factor,
            });
        }
        Ok(())
    }
}

/// Tile-based contrast equalization (CLAHE)
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClaheConfig {
    /// Multiplier on the uniform bin height
    pub clip_limit: f32,
    /// Number of tiles along each axis
    pub tile_grid: usize,
}

impl Default for ClaheConfig {
    fn default() -> Self {
        Self {
            clip_limit: 2.0,
            tile_grid: 8,
        }
    }
}

impl ClaheConfig {
    pub fn validate(&self) -> MatchResult<()> {
        if self.tile_grid == 0 || !(self.clip_limit > 0.0) || !self.clip_limit.is_finite() {
            return Err(MatchError::InvalidClahe {
                clip_limit: self.clip_limit,
                tile_grid: self.tile_grid,
            });
        }
        Ok(())
    }
}

/// Robust homography estimator settings
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct RansacConfig {
    pub max_iterations: usize,
    pub confidence: f64,
    /// `None` draws a fresh seed per fit.
    pub seed: Option<u64>,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            confidence: 0.995,
            seed: Some(0x5EED_0F_A11C),
        }
    }
}

impl RansacConfig {
    pub fn validate(&self) -> MatchResult<()> {
        if self.max_iterations == 0 {
            return Err(MatchError::InvalidRansacIterations(self.max_iterations));
        }
        if !(self.confidence > 0.0 && self.confidence < 1.0) {
            return Err(MatchError::InvalidRansacConfidence(self.confidence));
        }
        Ok(())
    }
}

/// Settings for the bundled vision backend
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VisionConfig {
    pub orb: OrbConfig,
    pub clahe: ClaheConfig,
    pub ransac: RansacConfig,
}

impl VisionConfig {
    pub fn validate(&self) -> MatchResult<()> {
        self.orb.validate()?;
        self.clahe.validate()?;
        self.ransac.validate()
    }
}

/// Quality gates for the alignment stage.
///
/// The numbers are hand-tuned; every one of them can be overridden.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AlignmentConfig {
    pub enabled: bool,
    pub max_keypoints: usize,
    /// Alignment is skipped below this many correspondences
    pub min_correspondences: usize,
    /// RANSAC reprojection tolerance in pixels
    pub reprojection_tolerance: f64,
    /// A fit needs strictly more inliers than this
    pub min_inliers_exclusive: usize,
    /// |det| of the upper-left 2×2 block must strictly exceed this
    pub min_abs_determinant: f64,
}

impl Default for AlignmentConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_keypoints: 5000,
            min_correspondences: 11,
            reprojection_tolerance: 5.0,
            min_inliers_exclusive: 25,
            min_abs_determinant: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PreprocessConfig {
    /// Canonical width both images are resized to
    pub width: u32,
    pub height: u32,
    /// Gaussian kernel side; sigma is derived from it
    pub blur_kernel_size: usize,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
            blur_kernel_size: 5,
        }
    }
}

/// Dense gradient-histogram layout, in pixels
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct HogConfig {
    pub block_size: u32,
    pub block_stride: u32,
    pub cell_size: u32,
    pub bins: usize,
}

impl Default for HogConfig {
    fn default() -> Self {
        Self {
            block_size: 16,
            block_stride: 8,
            cell_size: 8,
            bins: 9,
        }
    }
}

impl HogConfig {
    /// Number of blocks along each axis for a window, if the layout tiles it exactly.
    pub fn blocks_for(&self, width: u32, height: u32) -> Option<(usize, usize)> {
        if self.cell_size == 0
            || self.block_stride == 0
            || self.bins == 0
            || self.block_size < self.cell_size
            || self.block_size % self.cell_size != 0
            || self.block_stride % self.cell_size != 0
            || width < self.block_size
            || height < self.block_size
            || (width - self.block_size) % self.block_stride != 0
            || (height - self.block_size) % self.block_stride != 0
        {
            return None;
        }
        let bx = ((width - self.block_size) / self.block_stride + 1) as usize;
        let by = ((height - self.block_size) / self.block_stride + 1) as usize;
        Some((bx, by))
    }

    /// Length of the flattened descriptor for a window
    pub fn descriptor_len(&self, width: u32, height: u32) -> Option<usize> {
        let (bx, by) = self.blocks_for(width, height)?;
        let cells = (self.block_size / self.cell_size) as usize;
        Some(bx * by * cells * cells * self.bins)
    }

    pub fn validate_for(&self, width: u32, height: u32) -> MatchResult<()> {
        match self.blocks_for(width, height) {
            Some(_) => Ok(()),
            None => Err(MatchError::InvalidDescriptorLayout {
                width,
                height,
                block_size: self.block_size,
                block_stride: self.block_stride,
                cell_size: self.cell_size,
                bins: self.bins,
            }),
        }
    }
}

/// Which distance the similarity scorer computes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScorerStrategy {
    /// Legacy: L2 norm of the raw intensity difference
    RawPixelDistance,
    #[default]
    GradientDescriptorDistance,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ScorerConfig {
    pub strategy: ScorerStrategy,
    pub hog: HogConfig,
    /// Added to the vector norm before dividing
    pub epsilon: f64,
}

impl Default for ScorerConfig {
    fn default() -> Self {
        Self {
            strategy: ScorerStrategy::default(),
            hog: HogConfig::default(),
            epsilon: 1e-9,
        }
    }
}

/// Complete comparison configuration
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PipelineConfig {
    /// Distances strictly below this mean "same product"
    pub threshold: f64,
    pub alignment: AlignmentConfig,
    pub preprocess: PreprocessConfig,
    pub scorer: ScorerConfig,
    pub vision: VisionConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            threshold: 0.8,
            alignment: AlignmentConfig::default(),
            preprocess: PreprocessConfig::default(),
            scorer: ScorerConfig::default(),
            vision: VisionConfig::default(),
        }
    }
}

impl PipelineConfig {
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn with_canonical_size(mut self, width: u32, height: u32) -> Self {
        self.preprocess.width = width;
        self.preprocess.height = height;
        self
    }

    pub fn with_strategy(mut self, strategy: ScorerStrategy) -> Self {
        self.scorer.strategy = strategy;
        self
    }

    pub fn without_alignment(mut self) -> Self {
        self.alignment.enabled = false;
        self
    }

    /// Generate human-readable summary
    pub fn summary(&self) -> String {
        format!(
            "PipelineConfig: {}x{}, threshold={}, scorer={:?}, align={} [matches>={}, inliers>{}, |det|>{}, tol={}px]",
            self.preprocess.width,
            self.preprocess.height,
            self.threshold,
            self.scorer.strategy,
            self.alignment.enabled,
            self.alignment.min_correspondences,
            self.alignment.min_inliers_exclusive,
            self.alignment.min_abs_determinant,
            self.alignment.reprojection_tolerance,
        )
    }

    /// Validate configuration parameters
    pub fn validate(&self) -> MatchResult<()> {
        if !self.threshold.is_finite() {
            return Err(MatchError::InvalidThreshold(self.threshold));
        }
        let PreprocessConfig {
            width,
            height,
            blur_kernel_size,
        } = self.preprocess;
        if width == 0 || height == 0 {
            return Err(MatchError::InvalidCanonicalSize { width, height });
        }
        if blur_kernel_size == 0 || blur_kernel_size % 2 == 0 {
            return Err(MatchError::InvalidKernelSize(blur_kernel_size));
        }
        if self.scorer.strategy == ScorerStrategy::GradientDescriptorDistance {
            self.scorer.hog.validate_for(width, height)?;
        }
        let tol = self.alignment.reprojection_tolerance;
        if !(tol.is_finite() && tol > 0.0) {
            return Err(MatchError::InvalidTolerance(tol));
        }
        self.vision.validate()
    }

    /// Save configuration to JSON file
    #[cfg(feature = "serde")]
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }

    /// Load configuration from JSON file
    #[cfg(feature = "serde")]
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Save configuration to TOML file
    #[cfg(feature = "serde")]
    pub fn save_toml<P: AsRef<std::path::Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    /// Load configuration from TOML file
    #[cfg(feature = "serde")]
    pub fn load_toml<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Load from a `.json` or `.toml` file, picked by extension
    #[cfg(feature = "serde")]
    pub fn load<P: AsRef<std::path::Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::load_toml(path),
            _ => Self::load_json(path),
        }
    }

    #[cfg(feature = "serde")]
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_json(json: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(feature = "serde")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    #[cfg(feature = "serde")]
    pub fn from_toml(toml_str: &str) -> Result<Self, Box<dyn std::error::Error>> {
        let config: Self = toml::from_str(toml_str)?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let cfg = PipelineConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.threshold, 0.8);
        assert_eq!(cfg.alignment.min_correspondences, 11);
        assert_eq!(cfg.alignment.min_inliers_exclusive, 25);
        assert_eq!(cfg.alignment.max_keypoints, 5000);
        assert_eq!(cfg.preprocess.width, 256);
        assert_eq!(cfg.scorer.strategy, ScorerStrategy::GradientDescriptorDistance);
    }

    #[test]
    fn test_descriptor_len_default_window() {
        let hog = HogConfig::default();
        // 31x31 blocks, 2x2 cells of 9 bins each
        assert_eq!(hog.descriptor_len(256, 256), Some(31 * 31 * 4 * 9));
        assert_eq!(hog.descriptor_len(64, 128), Some(7 * 15 * 36));
    }

    #[test]
    fn test_layout_must_tile_window() {
        let hog = HogConfig::default();
        assert!(hog.blocks_for(250, 256).is_none());
        assert!(hog.blocks_for(8, 8).is_none());

        let cfg = PipelineConfig::default().with_canonical_size(100, 100);
        assert!(matches!(cfg.validate(), Err(MatchError::InvalidDescriptorLayout { .. })));

        // The raw pixel scorer has no layout constraint
        let cfg = cfg.with_strategy(ScorerStrategy::RawPixelDistance);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_invalid_values() {
        let mut cfg = PipelineConfig::default();
        cfg.preprocess.blur_kernel_size = 4;
        assert_eq!(cfg.validate(), Err(MatchError::InvalidKernelSize(4)));

        let cfg = PipelineConfig::default().with_threshold(f64::NAN);
        assert!(matches!(cfg.validate(), Err(MatchError::InvalidThreshold(_))));

        let cfg = PipelineConfig::default().with_canonical_size(0, 256);
        assert!(matches!(cfg.validate(), Err(MatchError::InvalidCanonicalSize { .. })));

        let mut cfg = PipelineConfig::default();
        cfg.alignment.reprojection_tolerance = 0.0;
        assert!(matches!(cfg.validate(), Err(MatchError::InvalidTolerance(_))));

        let mut cfg = PipelineConfig::default();
        cfg.vision.ransac.confidence = 1.0;
        assert!(matches!(cfg.validate(), Err(MatchError::InvalidRansacConfidence(_))));
    }

    #[test]
    fn test_vision_settings_are_validated() {
        fn with_orb(f: fn(&mut OrbConfig)) -> MatchResult<()> {
            let mut cfg = PipelineConfig::default();
            f(&mut cfg.vision.orb);
            cfg.validate()
        }
        assert_eq!(with_orb(|o| o.threshold = 0), Err(MatchError::InvalidFastThreshold(0)));
        assert_eq!(with_orb(|o| o.threshold = 128), Err(MatchError::InvalidFastThreshold(128)));
        assert!(with_orb(|o| o.threshold = 127).is_ok());
        assert_eq!(with_orb(|o| o.patch_size = 32), Err(MatchError::InvalidPatchSize(32)));
        assert_eq!(with_orb(|o| o.patch_size = 1), Err(MatchError::InvalidPatchSize(1)));
        assert!(matches!(with_orb(|o| o.n_levels = 0), Err(MatchError::InvalidPyramid { n_levels: 0, .. })));
        assert!(matches!(with_orb(|o| o.scale_factor = 1.0), Err(MatchError::InvalidPyramid { .. })));
        assert!(matches!(with_orb(|o| o.scale_factor = f32::NAN), Err(MatchError::InvalidPyramid { .. })));

        let mut cfg = PipelineConfig::default();
        cfg.vision.clahe.tile_grid = 0;
        assert!(matches!(cfg.validate(), Err(MatchError::InvalidClahe { tile_grid: 0, .. })));

        let mut cfg = PipelineConfig::default();
        cfg.vision.clahe.clip_limit = 0.0;
        assert!(matches!(cfg.validate(), Err(MatchError::InvalidClahe { .. })));

        let mut cfg = PipelineConfig::default();
        cfg.vision.ransac.max_iterations = 0;
        assert_eq!(cfg.validate(), Err(MatchError::InvalidRansacIterations(0)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_toml_uses_defaults() {
        let cfg = PipelineConfig::from_toml(
            "threshold = 0.5\n[alignment]\nmin_inliers_exclusive = 40\n[scorer]\nstrategy = \"raw_pixel_distance\"\n",
        )
        .unwrap();
        assert_eq!(cfg.threshold, 0.5);
        assert_eq!(cfg.alignment.min_inliers_exclusive, 40);
        assert_eq!(cfg.alignment.min_correspondences, 11);
        assert_eq!(cfg.scorer.strategy, ScorerStrategy::RawPixelDistance);
        assert_eq!(cfg.preprocess, PreprocessConfig::default());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_json_rejects_invalid_config() {
        let result = PipelineConfig::from_json(r#"{"preprocess": {"blur_kernel_size": 6}}"#);
        assert!(result.is_err());
    }
}
