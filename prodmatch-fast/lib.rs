//! Multi-scale FAST keypoint detection for product image alignment.
//!
//! Corners are found with the FAST-9 segment test on every level of a
//! bilinear image pyramid, thinned by 3×3 non-maximum suppression, ranked by
//! Harris response and oriented by the intensity centroid of their patch.

pub mod corner_detection;
pub mod detector;
pub mod error;
pub mod preprocessing;
pub mod pyramid;
pub mod refinement;
pub mod types;

pub use corner_detection::{has_circular_run, CornerDetector};
pub use detector::FastDetector;
pub use error::{FastError, FastResult};
pub use preprocessing::ImagePreprocessing;
pub use pyramid::ImagePyramid;
pub use refinement::KeypointRefinement;
pub use types::{LevelKeypoints, ScaleLevel, ScoredKeypoint};
