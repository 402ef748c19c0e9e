#![allow(dead_code)]

use image::{DynamicImage, GrayImage, Luma};

/// Label-like texture: hashed bright and dark blocks of several sizes over a
/// soft gradient, with fine print in between.
pub fn product_label(width: u32, height: u32, seed: u32) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let coarse = ((x / 16) * 73 + (y / 16) * 151 + seed).wrapping_mul(2_654_435_761) >> 13;
        let fine = ((x / 5) * 31 + (y / 7) * 17 + seed * 7).wrapping_mul(2_246_822_519) >> 11;
        let base = 60 + (x + y) * 40 / (width + height);
        let value = match (coarse % 4, fine % 3) {
            (0, _) => 215,
            (1, 0) => 30,
            (1, _) => 170,
            (_, 0) => base + 90,
            _ => base,
        };
        Luma([value as u8])
    })
}

pub fn stripes(width: u32, height: u32, period: u32, vertical: bool) -> GrayImage {
    GrayImage::from_fn(width, height, |x, y| {
        let t = if vertical { x } else { y };
        Luma([if (t / (period / 2)) % 2 == 0 { 40 } else { 210 }])
    })
}

pub fn scale_brightness(img: &GrayImage, factor: f32) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| {
        Luma([(img.get_pixel(x, y)[0] as f32 * factor).round().clamp(0.0, 255.0) as u8])
    })
}

pub fn dynamic(img: GrayImage) -> DynamicImage {
    DynamicImage::ImageLuma8(img)
}

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}
