use log::trace;
use nalgebra::{Matrix3, SMatrix, SymmetricEigen, Vector3};
use prodmatch_core::{Correspondence, Homography, HomographyFit, RansacConfig};
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;

const SAMPLE_SIZE: usize = 4;
/// Twice the triangle area below which three sample points count as collinear
const COLLINEAR_EPS: f64 = 1e-6;

type Pt = (f64, f64);

/// RANSAC homography estimation with a normalized-DLT refit on the consensus set.
#[derive(Debug, Clone, Copy)]
pub struct HomographyEstimator {
    config: RansacConfig,
}

impl HomographyEstimator {
    pub fn new(config: RansacConfig) -> Self {
        Self { config }
    }

    /// Fit a source→reference homography. Correspondence `i` is an inlier when
    /// its reprojection error is below `tolerance` pixels.
    pub fn estimate(&self, correspondences: &[Correspondence], tolerance: f64) -> Option<HomographyFit> {
        let n = correspondences.len();
        if n < SAMPLE_SIZE || !(tolerance > 0.0) {
            return None;
        }

        let src: Vec<Pt> = correspondences
            .iter()
            .map(|c| (c.source.x as f64, c.source.y as f64))
            .collect();
        let dst: Vec<Pt> = correspondences
            .iter()
            .map(|c| (c.reference.x as f64, c.reference.y as f64))
            .collect();

        let mut rng = match self.config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let mut best: Option<(Homography, Vec<bool>, usize)> = None;
        let mut max_iterations = self.config.max_iterations;
        let mut iteration = 0;

        while iteration < max_iterations {
            iteration += 1;

            let sample = index::sample(&mut rng, n, SAMPLE_SIZE).into_vec();
            let s_src: Vec<Pt> = sample.iter().map(|&i| src[i]).collect();
            let s_dst: Vec<Pt> = sample.iter().map(|&i| dst[i]).collect();
            if has_collinear_triple(&s_src) || has_collinear_triple(&s_dst) {
                continue;
            }

            let Some(model) = fit_dlt(&s_src, &s_dst) else {
                continue;
            };
            let (mask, count) = score(&model, &src, &dst, tolerance);

            if best.as_ref().is_none_or(|(_, _, best_count)| count > *best_count) {
                max_iterations = adaptive_iterations(count, n, self.config.confidence, max_iterations);
                trace!("ransac iteration {}: {} inliers, budget {}", iteration, count, max_iterations);
                best = Some((model, mask, count));
            }
        }

        let (mut homography, mut inliers, count) = best?;

        // Least-squares refit on the consensus set, kept only if it holds on to every inlier
        if count >= SAMPLE_SIZE {
            let in_src: Vec<Pt> = src.iter().zip(&inliers).filter(|&(_, &m)| m).map(|(p, _)| *p).collect();
            let in_dst: Vec<Pt> = dst.iter().zip(&inliers).filter(|&(_, &m)| m).map(|(p, _)| *p).collect();
            if let Some(refit) = fit_dlt(&in_src, &in_dst) {
                let (mask, refit_count) = score(&refit, &src, &dst, tolerance);
                if refit_count >= count {
                    homography = refit;
                    inliers = mask;
                }
            }
        }

        Some(HomographyFit { homography, inliers })
    }
}

/// RANSAC iteration budget for the given inlier ratio, never above `current`.
pub fn adaptive_iterations(inliers: usize, total: usize, confidence: f64, current: usize) -> usize {
    if total == 0 {
        return current;
    }
    let outlier_ratio = 1.0 - inliers as f64 / total as f64;
    let num = (1.0 - confidence).max(f64::MIN_POSITIVE).ln();
    let denom = (1.0 - (1.0 - outlier_ratio).powi(SAMPLE_SIZE as i32)).ln();

    if !denom.is_finite() || denom >= 0.0 {
        // every point is an inlier (or none is)
        return if outlier_ratio <= 0.0 { 1.min(current) } else { current };
    }
    if -num >= current as f64 * -denom {
        return current;
    }
    (num / denom).ceil().max(1.0) as usize
}

fn has_collinear_triple(pts: &[Pt]) -> bool {
    for i in 0..pts.len() {
        for j in i + 1..pts.len() {
            for k in j + 1..pts.len() {
                let (a, b, c) = (pts[i], pts[j], pts[k]);
                let cross = (b.0 - a.0) * (c.1 - a.1) - (b.1 - a.1) * (c.0 - a.0);
                if cross.abs() <= COLLINEAR_EPS {
                    return true;
                }
            }
        }
    }
    false
}

fn score(model: &Homography, src: &[Pt], dst: &[Pt], tolerance: f64) -> (Vec<bool>, usize) {
    let tol2 = tolerance * tolerance;
    let mask: Vec<bool> = src
        .iter()
        .zip(dst)
        .map(|(&(x, y), &(u, v))| match model.project(x, y) {
            Some((px, py)) => (px - u) * (px - u) + (py - v) * (py - v) < tol2,
            None => false,
        })
        .collect();
    let count = mask.iter().filter(|&&m| m).count();
    (mask, count)
}

/// Hartley normalization: centroid to the origin, mean distance √2.
fn normalization(pts: &[Pt]) -> Option<Matrix3<f64>> {
    let n = pts.len() as f64;
    let mx = pts.iter().map(|p| p.0).sum::<f64>() / n;
    let my = pts.iter().map(|p| p.1).sum::<f64>() / n;
    let mean_dist = pts
        .iter()
        .map(|p| ((p.0 - mx).powi(2) + (p.1 - my).powi(2)).sqrt())
        .sum::<f64>()
        / n;
    if mean_dist <= 1e-12 {
        return None;
    }
    let s = std::f64::consts::SQRT_2 / mean_dist;
    Some(Matrix3::new(s, 0.0, -s * mx, 0.0, s, -s * my, 0.0, 0.0, 1.0))
}

/// Direct linear transform on normalized points. The solution is the
/// eigenvector of AᵀA with the smallest eigenvalue.
fn fit_dlt(src: &[Pt], dst: &[Pt]) -> Option<Homography> {
    if src.len() < SAMPLE_SIZE || src.len() != dst.len() {
        return None;
    }
    let t_src = normalization(src)?;
    let t_dst = normalization(dst)?;

    let mut ata = SMatrix::<f64, 9, 9>::zeros();
    for (&(x, y), &(u, v)) in src.iter().zip(dst) {
        let p = t_src * Vector3::new(x, y, 1.0);
        let q = t_dst * Vector3::new(u, v, 1.0);
        let (x, y, u, v) = (p.x, p.y, q.x, q.y);

        let rows = [
            [-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u],
            [0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v],
        ];
        for r in &rows {
            for i in 0..9 {
                for j in 0..9 {
                    ata[(i, j)] += r[i] * r[j];
                }
            }
        }
    }

    let eigen = SymmetricEigen::new(ata);
    let (min_idx, _) = eigen
        .eigenvalues
        .iter()
        .enumerate()
        .min_by(|a, b| a.1.total_cmp(b.1))?;
    let h = eigen.eigenvectors.column(min_idx);
    let normalized = Matrix3::new(h[0], h[1], h[2], h[3], h[4], h[5], h[6], h[7], h[8]);

    let full = t_dst.try_inverse()? * normalized * t_src;
    let scale = full[(2, 2)];
    if !scale.is_finite() || scale.abs() < 1e-12 {
        return None;
    }
    let full = full / scale;
    if full.iter().any(|v| !v.is_finite()) {
        return None;
    }

    let homography = Homography::new(full);
    if homography.determinant().abs() < 1e-12 {
        return None;
    }
    Some(homography)
}
