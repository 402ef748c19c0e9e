use image::GrayImage;
use rayon::prelude::*;

/// Fixed kernels for the small odd sizes; larger kernels use the sigma formula.
const SMALL_KERNELS: [&[f32]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
];

/// Normalized 1-D Gaussian with the standard deviation derived from its size.
pub fn gaussian_kernel(size: usize) -> Vec<f32> {
    let size = size.max(1) | 1;
    if size <= 7 {
        return SMALL_KERNELS[size / 2].to_vec();
    }

    let sigma = 0.3 * ((size as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f64;
    let weights: Vec<f64> = (0..size)
        .map(|i| {
            let d = i as f64 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = weights.iter().sum();
    weights.iter().map(|w| (w / sum) as f32).collect()
}

/// Mirror an out-of-range index back inside `0..len` without repeating the edge pixel
#[inline]
fn reflect_101(mut i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let last = len as isize - 1;
    while i < 0 || i > last {
        i = if i < 0 { -i } else { 2 * last - i };
    }
    i as usize
}

/// Separable Gaussian smoothing of a raw buffer. Even sizes are bumped to the next odd size.
pub fn gaussian_blur_buffer(data: &[u8], width: usize, height: usize, kernel_size: usize) -> Vec<u8> {
    if width == 0 || height == 0 {
        return Vec::new();
    }
    let kernel = gaussian_kernel(kernel_size);
    let radius = (kernel.len() / 2) as isize;

    let mut horizontal = vec![0.0f32; width * height];
    horizontal
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            let src = &data[y * width..(y + 1) * width];
            for (x, out) in row.iter_mut().enumerate() {
                *out = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * src[reflect_101(x as isize + k as isize - radius, width)] as f32)
                    .sum();
            }
        });

    let mut blurred = vec![0u8; width * height];
    blurred
        .par_chunks_mut(width)
        .enumerate()
        .for_each(|(y, row)| {
            for (x, out) in row.iter_mut().enumerate() {
                let value: f32 = kernel
                    .iter()
                    .enumerate()
                    .map(|(k, w)| w * horizontal[reflect_101(y as isize + k as isize - radius, height) * width + x])
                    .sum();
                *out = value.round().clamp(0.0, 255.0) as u8;
            }
        });

    blurred
}

pub fn gaussian_blur(img: &GrayImage, kernel_size: usize) -> GrayImage {
    let (w, h) = img.dimensions();
    let data = gaussian_blur_buffer(img.as_raw(), w as usize, h as usize, kernel_size);
    GrayImage::from_raw(w, h, data).unwrap_or_else(|| img.clone())
}

/// For every destination index along one axis, the source indices it covers
/// and their coverage weights (summing to one).
fn area_weights(src_len: usize, dst_len: usize) -> Vec<Vec<(usize, f32)>> {
    let scale = src_len as f64 / dst_len as f64;
    (0..dst_len)
        .map(|d| {
            let start = d as f64 * scale;
            let end = ((d + 1) as f64 * scale).min(src_len as f64);
            let first = start.floor() as usize;
            let last = (end.ceil() as usize).min(src_len);

            let mut weights = Vec::with_capacity(last - first);
            for s in first..last {
                let overlap = (end.min((s + 1) as f64) - start.max(s as f64)).max(0.0);
                if overlap > 0.0 {
                    weights.push((s, (overlap / (end - start)) as f32));
                }
            }
            weights
        })
        .collect()
}

/// Area-averaging resize: each destination pixel is the coverage-weighted mean
/// of the source pixels under its footprint.
pub fn resize_area(img: &GrayImage, width: u32, height: u32) -> GrayImage {
    let (src_w, src_h) = img.dimensions();
    if (src_w, src_h) == (width, height) {
        return img.clone();
    }
    if width == 0 || height == 0 || src_w == 0 || src_h == 0 {
        return GrayImage::new(width, height);
    }

    let (src_w, src_h) = (src_w as usize, src_h as usize);
    let (dst_w, dst_h) = (width as usize, height as usize);
    let x_weights = area_weights(src_w, dst_w);
    let y_weights = area_weights(src_h, dst_h);
    let src = img.as_raw();

    // Columns first, one source row at a time
    let mut columns = vec![0.0f32; src_h * dst_w];
    columns
        .par_chunks_mut(dst_w)
        .enumerate()
        .for_each(|(y, row)| {
            let line = &src[y * src_w..(y + 1) * src_w];
            for (out, weights) in row.iter_mut().zip(&x_weights) {
                *out = weights.iter().map(|&(s, w)| w * line[s] as f32).sum();
            }
        });

    let mut resized = vec![0u8; dst_w * dst_h];
    resized
        .par_chunks_mut(dst_w)
        .zip(y_weights.par_iter())
        .for_each(|(row, weights)| {
            for (x, out) in row.iter_mut().enumerate() {
                let value: f32 = weights.iter().map(|&(s, w)| w * columns[s * dst_w + x]).sum();
                *out = value.round().clamp(0.0, 255.0) as u8;
            }
        });

    GrayImage::from_raw(width, height, resized).unwrap_or_else(|| GrayImage::new(width, height))
}
