use crate::types::ScoredKeypoint;

/// Non-maximum suppression and orientation assignment
pub struct KeypointRefinement;

impl KeypointRefinement {
    /// 3×3 non-maximum suppression on the corner score.
    ///
    /// A candidate survives when no 8-neighbour scores higher; on ties the
    /// candidate earliest in raster order wins.
    pub fn non_maximum_suppression(keypoints: &[ScoredKeypoint], width: usize, height: usize) -> Vec<ScoredKeypoint> {
        if keypoints.is_empty() {
            return Vec::new();
        }

        let mut scores = vec![0.0f32; width * height];
        for sk in keypoints {
            let idx = sk.keypoint.y as usize * width + sk.keypoint.x as usize;
            scores[idx] = sk.response;
        }

        keypoints
            .iter()
            .filter(|sk| {
                let x = sk.keypoint.x as usize;
                let y = sk.keypoint.y as usize;
                let idx = y * width + x;
                for ny in y.saturating_sub(1)..=(y + 1).min(height - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(width - 1) {
                        let n_idx = ny * width + nx;
                        if n_idx == idx {
                            continue;
                        }
                        let beaten = if n_idx < idx {
                            scores[n_idx] >= sk.response
                        } else {
                            scores[n_idx] > sk.response
                        };
                        if beaten {
                            return false;
                        }
                    }
                }
                true
            })
            .copied()
            .collect()
    }

    /// Keep the `limit` strongest keypoints, ordered by descending response.
    pub fn retain_best(mut keypoints: Vec<ScoredKeypoint>, limit: usize) -> Vec<ScoredKeypoint> {
        keypoints.sort_by(|a, b| b.response.total_cmp(&a.response));
        keypoints.truncate(limit);
        keypoints
    }

    /// Orientation by intensity centroid over a circular patch of radius `half`.
    pub fn compute_orientation(img: &[u8], width: usize, height: usize, x: f32, y: f32, half: i32) -> f32 {
        let cx = x.round() as i32;
        let cy = y.round() as i32;
        let r2 = half * half;
        let mut m10 = 0i64;
        let mut m01 = 0i64;

        for dy in -half..=half {
            let v = cy + dy;
            if v < 0 || v >= height as i32 {
                continue;
            }
            let row = v as usize * width;
            for dx in -half..=half {
                if dx * dx + dy * dy > r2 {
                    continue;
                }
                let u = cx + dx;
                if u < 0 || u >= width as i32 {
                    continue;
                }
                let pixel = img[row + u as usize] as i64;
                m10 += pixel * dx as i64;
                m01 += pixel * dy as i64;
            }
        }

        if m10 == 0 && m01 == 0 {
            0.0
        } else {
            (m01 as f32).atan2(m10 as f32)
        }
    }
}
