use prodmatch_core::Image;
use crate::error::{FastError, FastResult};
use rayon::prelude::*;

/// Tile geometry shared by the histogram and interpolation passes
#[derive(Debug, Clone, Copy)]
struct TileGrid {
    tile_w: usize,
    tile_h: usize,
    tiles_x: usize,
    tiles_y: usize,
}

impl TileGrid {
    fn new(width: usize, height: usize, tile_grid: usize) -> Self {
        let tile_w = width.div_ceil(tile_grid.min(width));
        let tile_h = height.div_ceil(tile_grid.min(height));
        Self {
            tile_w,
            tile_h,
            tiles_x: width.div_ceil(tile_w),
            tiles_y: height.div_ceil(tile_h),
        }
    }
}

/// Image preprocessing ahead of keypoint detection
pub struct ImagePreprocessing;

impl ImagePreprocessing {
    /// Contrast Limited Adaptive Histogram Equalization.
    ///
    /// The image is split into a `tile_grid`×`tile_grid` grid; each tile gets a
    /// clipped-histogram lookup table and every pixel blends the tables of its
    /// four nearest tile centres.
    pub fn apply_clahe(img: &[u8], width: usize, height: usize, clip_limit: f32, tile_grid: usize) -> FastResult<Image> {
        if width == 0 || height == 0 {
            return Err(FastError::InvalidImageSize { width, height });
        }
        if img.len() != width * height {
            return Err(FastError::InvalidImageData {
                expected_len: width * height,
                actual_len: img.len(),
            });
        }
        if tile_grid == 0 || !(clip_limit > 0.0) {
            return Err(FastError::InvalidClahe { clip_limit, tile_grid });
        }

        let grid = TileGrid::new(width, height, tile_grid);
        let histograms = Self::compute_tile_histograms(img, width, height, &grid);
        let luts: Vec<[u8; 256]> = histograms
            .iter()
            .map(|(hist, area)| Self::clipped_lut(hist, *area, clip_limit))
            .collect();

        Ok(Self::interpolate(img, width, &grid, &luts))
    }

    /// Compute histograms for each tile, with the tile's pixel count
    fn compute_tile_histograms(img: &[u8], width: usize, height: usize, grid: &TileGrid) -> Vec<([u32; 256], usize)> {
        let mut histograms = Vec::with_capacity(grid.tiles_x * grid.tiles_y);

        for tile_y in 0..grid.tiles_y {
            for tile_x in 0..grid.tiles_x {
                let mut histogram = [0u32; 256];

                let start_x = tile_x * grid.tile_w;
                let end_x = ((tile_x + 1) * grid.tile_w).min(width);
                let start_y = tile_y * grid.tile_h;
                let end_y = ((tile_y + 1) * grid.tile_h).min(height);

                for y in start_y..end_y {
                    for &pixel in &img[y * width + start_x..y * width + end_x] {
                        histogram[pixel as usize] += 1;
                    }
                }

                histograms.push((histogram, (end_x - start_x) * (end_y - start_y)));
            }
        }

        histograms
    }

    /// Clip the histogram, redistribute the excess uniformly and build the CDF lookup table
    fn clipped_lut(histogram: &[u32; 256], area: usize, clip_limit: f32) -> [u8; 256] {
        let clip_threshold = ((clip_limit * area as f32 / 256.0) as u32).max(1);

        let mut limited = *histogram;
        let mut excess = 0u32;
        for count in limited.iter_mut() {
            if *count > clip_threshold {
                excess += *count - clip_threshold;
                *count = clip_threshold;
            }
        }

        let redistribution = excess / 256;
        let remainder = (excess % 256) as usize;
        for count in limited.iter_mut() {
            *count += redistribution;
        }
        if remainder > 0 {
            let step = (256 / remainder).max(1);
            for i in (0..256).step_by(step).take(remainder) {
                limited[i] += 1;
            }
        }

        let mut lut = [0u8; 256];
        let scale = 255.0 / area.max(1) as f32;
        let mut cumulative = 0u32;
        for (value, &count) in lut.iter_mut().zip(limited.iter()) {
            cumulative += count;
            *value = (cumulative as f32 * scale).round().clamp(0.0, 255.0) as u8;
        }
        lut
    }

    /// Bilinear blend between the lookup tables of the surrounding tile centres
    fn interpolate(img: &[u8], width: usize, grid: &TileGrid, luts: &[[u8; 256]]) -> Image {
        let mut equalized = vec![0u8; img.len()];

        let axis = |pos: usize, tile: usize, tiles: usize| -> (usize, usize, f32) {
            let t = (pos as f32 + 0.5) / tile as f32 - 0.5;
            if t <= 0.0 {
                return (0, 0, 0.0);
            }
            let t0 = t.floor() as usize;
            if t0 + 1 >= tiles {
                return (tiles - 1, tiles - 1, 0.0);
            }
            (t0, t0 + 1, t - t0 as f32)
        };

        equalized
            .par_chunks_mut(width)
            .enumerate()
            .for_each(|(y, row)| {
                let (ty0, ty1, ay) = axis(y, grid.tile_h, grid.tiles_y);
                for (x, out) in row.iter_mut().enumerate() {
                    let (tx0, tx1, ax) = axis(x, grid.tile_w, grid.tiles_x);
                    let pixel = img[y * width + x] as usize;

                    let v00 = luts[ty0 * grid.tiles_x + tx0][pixel] as f32;
                    let v01 = luts[ty0 * grid.tiles_x + tx1][pixel] as f32;
                    let v10 = luts[ty1 * grid.tiles_x + tx0][pixel] as f32;
                    let v11 = luts[ty1 * grid.tiles_x + tx1][pixel] as f32;

                    let top = v00 * (1.0 - ax) + v01 * ax;
                    let bottom = v10 * (1.0 - ax) + v11 * ax;
                    *out = (top * (1.0 - ay) + bottom * ay).round().clamp(0.0, 255.0) as u8;
                }
            });

        equalized
    }
}
