use image::GrayImage;
use prodmatch_core::{HogConfig, MatchResult};
use rayon::prelude::*;

const L2_HYS_CLIP: f32 = 0.2;

/// Histogram of oriented gradients over the whole image used as a single window.
///
/// Blocks are visited row by row, cells inside a block row by row, and each
/// cell contributes `bins` values. Every block is L2-Hys normalized.
pub fn compute_hog(img: &GrayImage, cfg: &HogConfig) -> MatchResult<Vec<f32>> {
    let (width, height) = img.dimensions();
    cfg.validate_for(width, height)?;
    let (blocks_x, blocks_y) = cfg.blocks_for(width, height).unwrap_or_default();

    let cells = cell_histograms(img, cfg);
    let cells_x = (width / cfg.cell_size) as usize;
    let cells_per_block = (cfg.block_size / cfg.cell_size) as usize;
    let cell_step = (cfg.block_stride / cfg.cell_size) as usize;
    let block_len = cells_per_block * cells_per_block * cfg.bins;

    let descriptor = (0..blocks_x * blocks_y)
        .into_par_iter()
        .flat_map_iter(|block| {
            let (bx, by) = (block % blocks_x, block / blocks_x);
            let mut values = Vec::with_capacity(block_len);
            for cy in 0..cells_per_block {
                for cx in 0..cells_per_block {
                    let cell = (by * cell_step + cy) * cells_x + bx * cell_step + cx;
                    values.extend_from_slice(&cells[cell * cfg.bins..(cell + 1) * cfg.bins]);
                }
            }
            normalize_l2_hys(&mut values);
            values
        })
        .collect();

    Ok(descriptor)
}

/// Per-cell orientation histograms, cells in row-major order.
fn cell_histograms(img: &GrayImage, cfg: &HogConfig) -> Vec<f32> {
    let (width, height) = img.dimensions();
    let (w, h) = (width as usize, height as usize);
    let cell = cfg.cell_size as usize;
    let (cells_x, cells_y) = (w / cell, h / cell);
    let bins = cfg.bins;
    let bin_width = 180.0 / bins as f32;
    let data = img.as_raw();
    let at = |x: usize, y: usize| data[y * w + x] as f32;

    let mut histograms = vec![0.0f32; cells_x * cells_y * bins];
    histograms
        .par_chunks_mut(cells_x * bins)
        .enumerate()
        .for_each(|(cy, row)| {
            for y in cy * cell..(cy + 1) * cell {
                let (up, down) = (y.saturating_sub(1), (y + 1).min(h - 1));
                for x in 0..cells_x * cell {
                    let (left, right) = (x.saturating_sub(1), (x + 1).min(w - 1));
                    let gx = at(right, y) - at(left, y);
                    let gy = at(x, down) - at(x, up);
                    let magnitude = (gx * gx + gy * gy).sqrt();
                    if magnitude == 0.0 {
                        continue;
                    }

                    let mut angle = gy.atan2(gx).to_degrees();
                    if angle < 0.0 {
                        angle += 180.0;
                    }
                    if angle >= 180.0 {
                        angle -= 180.0;
                    }

                    // Split the vote between the two nearest bin centres
                    let pos = angle / bin_width - 0.5;
                    let lower = pos.floor();
                    let frac = pos - lower;
                    let b0 = (lower as isize).rem_euclid(bins as isize) as usize;
                    let b1 = (b0 + 1) % bins;

                    let base = (x / cell) * bins;
                    row[base + b0] += magnitude * (1.0 - frac);
                    row[base + b1] += magnitude * frac;
                }
            }
        });

    histograms
}

/// L2 normalize, clip, renormalize
fn normalize_l2_hys(values: &mut [f32]) {
    let norm = |v: &[f32]| v.iter().map(|x| x * x).sum::<f32>().sqrt();

    let scale = 1.0 / (norm(values) + 0.1 * values.len() as f32);
    for v in values.iter_mut() {
        *v = (*v * scale).min(L2_HYS_CLIP);
    }

    let scale = 1.0 / (norm(values) + 1e-3);
    for v in values.iter_mut() {
        *v *= scale;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prodmatch_core::MatchError;

    fn cfg() -> HogConfig {
        HogConfig::default()
    }

    #[test]
    fn test_descriptor_length_for_default_window() {
        let img = GrayImage::from_fn(256, 256, |x, y| image::Luma([((x * 3 + y * 5) % 256) as u8]));
        let hog = compute_hog(&img, &cfg()).unwrap();
        assert_eq!(hog.len(), 31 * 31 * 4 * 9);
        assert_eq!(Some(hog.len()), cfg().descriptor_len(256, 256));
        assert!(hog.iter().all(|v| v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn test_uniform_image_gives_zero_descriptor() {
        let img = GrayImage::from_pixel(32, 32, image::Luma([120]));
        let hog = compute_hog(&img, &cfg()).unwrap();
        assert_eq!(hog.len(), 3 * 3 * 4 * 9);
        assert!(hog.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_rejects_layout_that_does_not_tile() {
        let img = GrayImage::new(30, 32);
        assert!(matches!(
            compute_hog(&img, &cfg()),
            Err(MatchError::InvalidDescriptorLayout { .. })
        ));
    }

    #[test]
    fn test_vertical_edge_votes_for_horizontal_gradient_bins() {
        // Intensity changes along x only: gradient angle 0°, shared by bins 0 and 8
        let img = GrayImage::from_fn(16, 16, |x, _| image::Luma([if x < 8 { 20 } else { 220 }]));
        let hog = compute_hog(&img, &cfg()).unwrap();
        assert_eq!(hog.len(), 36);
        for cell in hog.chunks(9) {
            for (bin, &v) in cell.iter().enumerate() {
                if bin != 0 && bin != 8 {
                    assert_eq!(v, 0.0);
                }
            }
            assert!((cell[0] - cell[8]).abs() < 1e-6);
        }
        assert!(hog[0] > 0.0);
    }

    #[test]
    fn test_block_values_are_clipped_then_renormalized() {
        let img = GrayImage::from_fn(16, 16, |x, y| image::Luma([((x * 17) ^ (y * 29)) as u8]));
        let hog = compute_hog(&img, &cfg()).unwrap();
        let norm: f32 = hog.iter().map(|v| v * v).sum::<f32>().sqrt();
        assert!(norm <= 1.0 + 1e-4);
        assert!(norm > 0.5);
    }
}
