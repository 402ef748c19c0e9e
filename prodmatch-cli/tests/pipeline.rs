mod common;

use common::{dynamic, init_logger, product_label, scale_brightness, stripes};
use image::{DynamicImage, GrayImage, Luma};
use prodmatch_cli::prodmatch_core::Homography;
use prodmatch_cli::{
    AlignmentStatus, MatchError, NativeVision, PipelineConfig, PipelineError, ProductMatcher, ScorerStrategy,
    VisionPrimitives, compare_images,
};

fn matcher() -> ProductMatcher {
    init_logger();
    ProductMatcher::new(PipelineConfig::default()).unwrap()
}

#[test]
fn test_identical_images_are_the_same_product() {
    let img = dynamic(product_label(320, 240, 3));
    let comparison = matcher().compare_detailed(&img, &img).unwrap();
    assert!(comparison.result.distance < 1e-3, "distance = {}", comparison.result.distance);
    assert!(comparison.result.same);
    assert_eq!(comparison.images.0.dimensions(), (256, 256));
    assert_eq!(comparison.images.1.dimensions(), (256, 256));
}

#[test]
fn test_orthogonal_stripes_are_different_products() {
    let a = dynamic(stripes(256, 256, 16, true));
    let b = dynamic(stripes(256, 256, 16, false));
    let comparison = matcher().compare_detailed(&a, &b).unwrap();

    // Plain stripes carry no corners to align on
    assert_eq!(comparison.alignment.status, AlignmentStatus::NoDescriptors);
    assert!(comparison.result.distance > 1.3, "distance = {}", comparison.result.distance);
    assert!(!comparison.result.same);
}

#[test]
fn test_dimmer_photo_of_same_product_matches() {
    let reference = product_label(320, 240, 11);
    let source = scale_brightness(&reference, 0.8);
    let result = matcher().compare(&dynamic(source), &dynamic(reference)).unwrap();
    assert!(result.distance < 0.5, "distance = {}", result.distance);
    assert!(result.same);
}

#[test]
fn test_warped_photo_is_aligned_back_onto_reference() {
    let reference = product_label(400, 300, 7);
    let skew = Homography::from_rows([[0.99, 0.02, 4.0], [-0.02, 0.99, -3.0], [0.0, 0.0, 1.0]]);
    let source = NativeVision::default().warp(&reference, &skew, 400, 300);

    let comparison = matcher().compare_detailed(&dynamic(source), &dynamic(reference)).unwrap();
    match comparison.alignment.status {
        AlignmentStatus::Applied { inliers, determinant } => {
            assert!(inliers > 25, "inliers = {}", inliers);
            assert!(determinant.abs() > 0.1);
        }
        other => panic!("alignment not applied: {}", other),
    }
    assert!(comparison.alignment.homography.is_some());
    assert!(comparison.result.distance < 0.3, "distance = {}", comparison.result.distance);
    assert!(comparison.result.same);
}

#[test]
fn test_low_texture_source_still_scores() {
    let flat = GrayImage::from_fn(200, 150, |x, _| Luma([100 + (x / 50) as u8]));
    let reference = product_label(320, 240, 5);
    let comparison = matcher().compare_detailed(&dynamic(flat), &dynamic(reference)).unwrap();
    assert!(!comparison.alignment.status.is_applied());
    assert!(comparison.result.distance.is_finite());
}

#[test]
fn test_blank_pair_scores_zero() {
    let blank = DynamicImage::ImageLuma8(GrayImage::from_pixel(128, 96, Luma([180])));
    let result = matcher().compare(&blank, &blank).unwrap();
    assert_eq!(result.distance, 0.0);
    assert!(result.same);
}

#[test]
fn test_empty_image_is_rejected() {
    let empty = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
    let img = dynamic(product_label(64, 64, 1));

    let err = matcher().compare(&empty, &img).unwrap_err();
    assert_eq!(err, MatchError::EmptyImage { role: "source" });

    let err = matcher().compare(&img, &empty).unwrap_err();
    assert_eq!(err, MatchError::EmptyImage { role: "reference" });
}

#[test]
fn test_invalid_configuration_is_rejected() {
    init_logger();
    let img = dynamic(product_label(64, 64, 1));
    assert!(matches!(
        compare_images(&img, &img, f64::NAN),
        Err(MatchError::InvalidThreshold(_))
    ));

    // 100x100 is not tiled by 16px blocks on an 8px stride
    let cfg = PipelineConfig::default().with_canonical_size(100, 100);
    assert!(matches!(
        ProductMatcher::new(cfg),
        Err(MatchError::InvalidDescriptorLayout { .. })
    ));
}

#[test]
fn test_verdict_is_symmetric_for_distinct_inputs() {
    let m = matcher();
    let pairs = [
        (stripes(256, 256, 16, true), stripes(256, 256, 16, false)),
        (product_label(256, 256, 2), product_label(256, 256, 2)),
    ];
    for (a, b) in pairs {
        let (a, b) = (dynamic(a), dynamic(b));
        let forward = m.compare(&a, &b).unwrap();
        let backward = m.compare(&b, &a).unwrap();
        assert_eq!(forward.same, backward.same);
    }
}

#[test]
fn test_raw_strategy_without_alignment() {
    init_logger();
    let cfg = PipelineConfig::default()
        .with_strategy(ScorerStrategy::RawPixelDistance)
        .without_alignment()
        .with_threshold(1.0);
    let m = ProductMatcher::new(cfg).unwrap();

    let img = dynamic(product_label(200, 160, 9));
    let comparison = m.compare_detailed(&img, &img).unwrap();
    assert_eq!(comparison.alignment.status, AlignmentStatus::Disabled);
    assert_eq!(comparison.result.distance, 0.0);

    let dim = dynamic(scale_brightness(&product_label(200, 160, 9), 0.5));
    let result = m.compare(&dim, &img).unwrap();
    // Unnormalized intensity difference dwarfs any useful threshold
    assert!(result.distance > 100.0);
    assert!(!result.same);
}

#[test]
fn test_compare_paths_reads_files() {
    let dir = std::env::temp_dir().join(format!("prodmatch-pipeline-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let a = dir.join("a.png");
    let b = dir.join("b.png");
    product_label(160, 120, 4).save(&a).unwrap();
    product_label(160, 120, 4).save(&b).unwrap();

    let m = matcher();
    let comparison = m.compare_paths(&a, &b).unwrap();
    assert!(comparison.result.same);

    let missing = dir.join("missing.png");
    assert!(matches!(m.compare_paths(&a, &missing), Err(PipelineError::Image(_))));

    std::fs::remove_dir_all(&dir).unwrap();
}
