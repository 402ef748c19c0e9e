use image::GrayImage;
use log::debug;
use prodmatch_core::Homography;
use rayon::prelude::*;

/// Perspective warp of `img` into a `width`×`height` frame.
///
/// Every output pixel is mapped back through the inverse transform and sampled
/// bilinearly; samples outside the source read as 0.
pub fn warp_perspective(img: &GrayImage, homography: &Homography, width: u32, height: u32) -> GrayImage {
    let mut warped = GrayImage::new(width, height);
    if width == 0 || height == 0 {
        return warped;
    }
    let Some(inverse) = homography.inverse() else {
        debug!("warp: singular transform, output left blank");
        return warped;
    };

    let (src_w, src_h) = img.dimensions();
    let src = img.as_raw();
    let fetch = |x: i64, y: i64| -> f64 {
        if x < 0 || y < 0 || x >= src_w as i64 || y >= src_h as i64 {
            0.0
        } else {
            src[y as usize * src_w as usize + x as usize] as f64
        }
    };

    let buffer: &mut [u8] = &mut warped;
    buffer
        .par_chunks_mut(width as usize)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let Some((sx, sy)) = inverse.project(x as f64, y as f64) else {
                    continue;
                };
                if sx <= -1.0 || sy <= -1.0 || sx >= src_w as f64 || sy >= src_h as f64 {
                    continue;
                }

                let (x0, y0) = (sx.floor(), sy.floor());
                let (fx, fy) = (sx - x0, sy - y0);
                let (x0, y0) = (x0 as i64, y0 as i64);

                let top = fetch(x0, y0) * (1.0 - fx) + fetch(x0 + 1, y0) * fx;
                let bottom = fetch(x0, y0 + 1) * (1.0 - fx) + fetch(x0 + 1, y0 + 1) * fx;
                *out = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
            }
        });

    warped
}
