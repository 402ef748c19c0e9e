use crate::align::{AlignmentReport, align_with_report};
use image::{DynamicImage, GrayImage};
use prodmatch_core::PipelineConfig;
use prodmatch_vision::VisionPrimitives;

/// Grayscale, align the source onto the reference, resize both to the
/// canonical size and smooth them.
pub fn preprocess<V: VisionPrimitives + ?Sized>(
    vision: &V,
    source: &DynamicImage,
    reference: &DynamicImage,
    cfg: &PipelineConfig,
) -> (GrayImage, GrayImage) {
    let (source, reference, _) = preprocess_with_report(vision, source, reference, cfg);
    (source, reference)
}

pub fn preprocess_with_report<V: VisionPrimitives + ?Sized>(
    vision: &V,
    source: &DynamicImage,
    reference: &DynamicImage,
    cfg: &PipelineConfig,
) -> (GrayImage, GrayImage, AlignmentReport) {
    let source = vision.to_grayscale(source);
    let reference = vision.to_grayscale(reference);

    let (aligned, report) = align_with_report(vision, &source, &reference, &cfg.alignment);

    let (width, height, kernel) = (cfg.preprocess.width, cfg.preprocess.height, cfg.preprocess.blur_kernel_size);
    let finish = |img: &GrayImage| vision.gaussian_blur(&vision.resize(img, width, height), kernel);

    (finish(&aligned), finish(&reference), report)
}
