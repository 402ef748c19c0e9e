use image::GrayImage;
use log::debug;
use prodmatch_core::{AlignmentConfig, Correspondence, Homography};
use prodmatch_vision::VisionPrimitives;

/// Why the alignment stage did or did not warp the source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AlignmentStatus {
    Applied { inliers: usize, determinant: f64 },
    /// One of the images produced no descriptors
    NoDescriptors,
    TooFewCorrespondences(usize),
    FitFailed,
    TooFewInliers(usize),
    /// Determinant of the linear part of the fitted transform
    DegenerateTransform(f64),
    Disabled,
}

impl AlignmentStatus {
    pub fn is_applied(&self) -> bool {
        matches!(self, AlignmentStatus::Applied { .. })
    }
}

impl std::fmt::Display for AlignmentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlignmentStatus::Applied { inliers, determinant } => {
                write!(f, "applied ({} inliers, det {:.3})", inliers, determinant)
            }
            AlignmentStatus::NoDescriptors => write!(f, "skipped: no descriptors"),
            AlignmentStatus::TooFewCorrespondences(n) => write!(f, "skipped: only {} correspondences", n),
            AlignmentStatus::FitFailed => write!(f, "skipped: no homography"),
            AlignmentStatus::TooFewInliers(n) => write!(f, "skipped: only {} inliers", n),
            AlignmentStatus::DegenerateTransform(det) => write!(f, "skipped: degenerate transform (det {:.4})", det),
            AlignmentStatus::Disabled => write!(f, "disabled"),
        }
    }
}

/// Diagnostics for one alignment attempt
#[derive(Debug, Clone, PartialEq)]
pub struct AlignmentReport {
    pub status: AlignmentStatus,
    /// Keypoints found on the source and reference
    pub keypoints: (usize, usize),
    pub correspondences: usize,
    /// Set only when the transform was applied
    pub homography: Option<Homography>,
    /// Inlier correspondences of the applied transform
    pub inliers: Vec<Correspondence>,
}

impl AlignmentReport {
    fn skipped(status: AlignmentStatus, keypoints: (usize, usize), correspondences: usize) -> Self {
        Self {
            status,
            keypoints,
            correspondences,
            homography: None,
            inliers: Vec::new(),
        }
    }
}

/// Warp `source` into the frame of `reference`, or return it unchanged when
/// the evidence for a transform is too weak.
pub fn align<V: VisionPrimitives + ?Sized>(
    vision: &V,
    source: &GrayImage,
    reference: &GrayImage,
    cfg: &AlignmentConfig,
) -> GrayImage {
    align_with_report(vision, source, reference, cfg).0
}

pub fn align_with_report<V: VisionPrimitives + ?Sized>(
    vision: &V,
    source: &GrayImage,
    reference: &GrayImage,
    cfg: &AlignmentConfig,
) -> (GrayImage, AlignmentReport) {
    if !cfg.enabled {
        return (source.clone(), AlignmentReport::skipped(AlignmentStatus::Disabled, (0, 0), 0));
    }

    // Equalized copies are only used for detection
    let source_eq = vision.equalize_contrast(source);
    let reference_eq = vision.equalize_contrast(reference);
    let source_set = vision.detect_and_describe(&source_eq, cfg.max_keypoints);
    let reference_set = vision.detect_and_describe(&reference_eq, cfg.max_keypoints);
    let keypoints = (source_set.len(), reference_set.len());

    if source_set.is_empty() || reference_set.is_empty() {
        debug!("align: no descriptors (source {}, reference {})", keypoints.0, keypoints.1);
        return (source.clone(), AlignmentReport::skipped(AlignmentStatus::NoDescriptors, keypoints, 0));
    }

    let mut correspondences = vision.match_descriptors(&source_set, &reference_set, true);
    correspondences.sort_by_key(|c| c.distance);
    let n = correspondences.len();
    if n < cfg.min_correspondences {
        debug!("align: {} correspondences, need {}", n, cfg.min_correspondences);
        return (
            source.clone(),
            AlignmentReport::skipped(AlignmentStatus::TooFewCorrespondences(n), keypoints, n),
        );
    }

    let Some(fit) = vision.estimate_homography(&correspondences, cfg.reprojection_tolerance) else {
        debug!("align: homography fit failed on {} correspondences", n);
        return (source.clone(), AlignmentReport::skipped(AlignmentStatus::FitFailed, keypoints, n));
    };

    let inliers = fit.inlier_count();
    if inliers <= cfg.min_inliers_exclusive {
        debug!("align: {} inliers, need more than {}", inliers, cfg.min_inliers_exclusive);
        return (
            source.clone(),
            AlignmentReport::skipped(AlignmentStatus::TooFewInliers(inliers), keypoints, n),
        );
    }

    let determinant = fit.homography.upper_left_determinant();
    if !(determinant.abs() > cfg.min_abs_determinant) {
        debug!("align: |det| = {:.4} not above {}", determinant.abs(), cfg.min_abs_determinant);
        return (
            source.clone(),
            AlignmentReport::skipped(AlignmentStatus::DegenerateTransform(determinant), keypoints, n),
        );
    }

    let (width, height) = reference.dimensions();
    let warped = vision.warp(source, &fit.homography, width, height);
    debug!("align: applied with {} inliers of {}, det {:.3}", inliers, n, determinant);

    let inlier_correspondences = correspondences
        .iter()
        .zip(&fit.inliers)
        .filter(|&(_, &keep)| keep)
        .map(|(c, _)| *c)
        .collect();

    (
        warped,
        AlignmentReport {
            status: AlignmentStatus::Applied { inliers, determinant },
            keypoints,
            correspondences: n,
            homography: Some(fit.homography),
            inliers: inlier_correspondences,
        },
    )
}
