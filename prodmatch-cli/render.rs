use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_circle_mut, draw_line_segment_mut};
use prodmatch_core::Correspondence;

/// Two images next to each other, left one first; the shorter is padded with black.
pub fn side_by_side(left: &GrayImage, right: &GrayImage) -> GrayImage {
    let height = left.height().max(right.height());
    let mut canvas = GrayImage::new(left.width() + right.width(), height);
    image::imageops::replace(&mut canvas, left, 0, 0);
    image::imageops::replace(&mut canvas, right, left.width() as i64, 0);
    canvas
}

/// Source and reference side by side with every correspondence drawn as a
/// line between its two keypoints.
pub fn draw_correspondences(source: &GrayImage, reference: &GrayImage, correspondences: &[Correspondence]) -> RgbImage {
    let joined = side_by_side(source, reference);
    let mut canvas = image::DynamicImage::ImageLuma8(joined).into_rgb8();
    let offset = source.width() as f32;

    for (i, c) in correspondences.iter().enumerate() {
        let color = palette(i);
        let from = (c.source.x, c.source.y);
        let to = (c.reference.x + offset, c.reference.y);
        draw_line_segment_mut(&mut canvas, from, to, color);
        draw_hollow_circle_mut(&mut canvas, (from.0 as i32, from.1 as i32), 3, color);
        draw_hollow_circle_mut(&mut canvas, (to.0 as i32, to.1 as i32), 3, color);
    }

    canvas
}

fn palette(i: usize) -> Rgb<u8> {
    const COLORS: [[u8; 3]; 6] = [
        [255, 0, 0],
        [0, 200, 0],
        [0, 120, 255],
        [255, 200, 0],
        [255, 0, 200],
        [0, 220, 220],
    ];
    Rgb(COLORS[i % COLORS.len()])
}
