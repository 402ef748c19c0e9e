#[derive(Debug, Clone, PartialEq)]
pub enum MatchError {
    EmptyImage { role: &'static str },
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },
    InvalidCanonicalSize { width: u32, height: u32 },
    InvalidKernelSize(usize),
    InvalidDescriptorLayout {
        width: u32,
        height: u32,
        block_size: u32,
        block_stride: u32,
        cell_size: u32,
        bins: usize,
    },
    InvalidThreshold(f64),
    InvalidTolerance(f64),
    InvalidRansacConfidence(f64),
    InvalidRansacIterations(usize),
    /// FAST intensity threshold outside 1-127
    InvalidFastThreshold(u8),
    InvalidPatchSize(usize),
    InvalidPyramid { n_levels: usize, scale_factor: f32 },
    InvalidClahe { clip_limit: f32, tile_grid: usize },
}

impl std::fmt::Display for MatchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchError::EmptyImage { role } => {
                write!(f, "The {} image is empty", role)
            }
            MatchError::DimensionMismatch { left, right } => {
                write!(
                    f,
                    "Image dimensions differ: {}x{} vs {}x{}",
                    left.0, left.1, right.0, right.1
                )
            }
            MatchError::InvalidCanonicalSize { width, height } => {
                write!(f, "Invalid canonical size: {}x{} (must be > 0)", width, height)
            }
            MatchError::InvalidKernelSize(k) => {
                write!(f, "Invalid blur kernel size: {} (must be odd and > 0)", k)
            }
            MatchError::InvalidDescriptorLayout {
                width,
                height,
                block_size,
                block_stride,
                cell_size,
                bins,
            } => {
                write!(
                    f,
                    "Gradient descriptor layout (block {}, stride {}, cell {}, bins {}) does not tile a {}x{} window",
                    block_size, block_stride, cell_size, bins, width, height
                )
            }
            MatchError::InvalidThreshold(t) => {
                write!(f, "Invalid threshold: {} (must be finite)", t)
            }
            MatchError::InvalidTolerance(t) => {
                write!(f, "Invalid reprojection tolerance: {} (must be > 0)", t)
            }
            MatchError::InvalidRansacConfidence(c) => {
                write!(f, "Invalid RANSAC confidence: {} (must be in (0, 1))", c)
            }
            MatchError::InvalidRansacIterations(n) => {
                write!(f, "Invalid RANSAC iteration limit: {} (must be > 0)", n)
            }
            MatchError::InvalidFastThreshold(t) => {
                write!(f, "Invalid FAST threshold: {} (must be 1-127)", t)
            }
            MatchError::InvalidPatchSize(p) => {
                write!(f, "Invalid ORB patch size: {} (must be odd and >= 3)", p)
            }
            MatchError::InvalidPyramid { n_levels, scale_factor } => {
                write!(
                    f,
                    "Invalid pyramid: {} levels, scale factor {} (need >= 1 level and factor > 1)",
                    n_levels, scale_factor
                )
            }
            MatchError::InvalidClahe { clip_limit, tile_grid } => {
                write!(
                    f,
                    "Invalid contrast equalization: clip limit {}, tile grid {} (both must be > 0)",
                    clip_limit, tile_grid
                )
            }
        }
    }
}

impl std::error::Error for MatchError {}

pub type MatchResult<T> = Result<T, MatchError>;
