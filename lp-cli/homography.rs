//! Homography estimation: normalized DLT plus a seeded RANSAC wrapper.

use nalgebra::{DMatrix, Matrix3, Vector3};
use rand::{Rng, SeedableRng};

/// Reprojection threshold used by the benchmark, in pixels.
pub const RANSAC_THRESHOLD: f64 = 3.0;

/// Fixed seed so repeated runs sample identically.
pub const RNG_SEED: u64 = 12345;

/// Correspondences needed for a homography.
pub const MIN_CORRESPONDENCES: usize = 4;

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum HomographyError {
    #[error("too few points: need {needed}, got {got}")]
    TooFewPoints { needed: usize, got: usize },

    #[error("point count mismatch: {src} source vs {dst} destination")]
    LengthMismatch { src: usize, dst: usize },

    #[error("numerical failure: {0}")]
    NumericalFailure(String),

    #[error("insufficient inliers: need {needed}, found {found}")]
    InsufficientInliers { needed: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RansacConfig {
    /// Maximum number of RANSAC iterations.
    pub max_iters: usize,
    /// Inlier threshold (reprojection error in pixels).
    pub threshold: f64,
    /// Minimum number of inliers for a valid model.
    pub min_inliers: usize,
    pub seed: u64,
}

impl Default for RansacConfig {
    fn default() -> Self {
        Self {
            max_iters: 2000,
            threshold: RANSAC_THRESHOLD,
            min_inliers: MIN_CORRESPONDENCES,
            seed: RNG_SEED,
        }
    }
}

#[derive(Debug, Clone)]
pub struct HomographyEstimate {
    /// Maps source points onto destination points, normalized so `h[(2, 2)] == 1` when possible.
    pub h: Matrix3<f64>,
    pub inlier_mask: Vec<bool>,
    pub n_inliers: usize,
    /// Mean reprojection error over inliers, in pixels.
    pub mean_error: f64,
}

/// Project a 2D point through a 3×3 homography: H * [x, y, 1]^T → [u, v].
pub fn project(h: &Matrix3<f64>, x: f64, y: f64) -> [f64; 2] {
    let p = h * Vector3::new(x, y, 1.0);
    if p[2].abs() < 1e-15 {
        return [f64::NAN, f64::NAN];
    }
    [p[0] / p[2], p[1] / p[2]]
}

/// Reprojection error: ||project(H, src) - dst||.
pub fn reprojection_error(h: &Matrix3<f64>, src: &[f64; 2], dst: &[f64; 2]) -> f64 {
    let p = project(h, src[0], src[1]);
    let dx = p[0] - dst[0];
    let dy = p[1] - dst[1];
    (dx * dx + dy * dy).sqrt()
}

/// Frobenius distance between two homographies after scaling both to `h33 = 1`.
pub fn homography_delta(h: &Matrix3<f64>, baseline: &Matrix3<f64>) -> f64 {
    let scale = |m: &Matrix3<f64>| {
        let s = m[(2, 2)];
        if s.abs() < 1e-15 {
            *m
        } else {
            m / s
        }
    };
    (scale(h) - scale(baseline)).norm()
}

/// Translate the centroid to the origin and scale the mean distance to sqrt(2).
fn normalize_points(pts: &[[f64; 2]]) -> (Matrix3<f64>, Vec<[f64; 2]>) {
    let n = pts.len() as f64;
    let cx: f64 = pts.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy: f64 = pts.iter().map(|p| p[1]).sum::<f64>() / n;

    let mean_dist: f64 = pts
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    let s = if mean_dist > 1e-15 {
        std::f64::consts::SQRT_2 / mean_dist
    } else {
        1.0
    };

    let t = Matrix3::new(s, 0.0, -s * cx, 0.0, s, -s * cy, 0.0, 0.0, 1.0);
    let normalized = pts.iter().map(|p| [s * (p[0] - cx), s * (p[1] - cy)]).collect();
    (t, normalized)
}

/// Estimate H with dst ≈ project(H, src) from four or more correspondences.
pub fn estimate_homography_dlt(src: &[[f64; 2]], dst: &[[f64; 2]]) -> Result<Matrix3<f64>, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::LengthMismatch {
            src: src.len(),
            dst: dst.len(),
        });
    }
    let n = src.len();
    if n < MIN_CORRESPONDENCES {
        return Err(HomographyError::TooFewPoints {
            needed: MIN_CORRESPONDENCES,
            got: n,
        });
    }

    let (t_src, src_n) = normalize_points(src);
    let (t_dst, dst_n) = normalize_points(dst);

    let mut a = DMatrix::zeros(2 * n, 9);
    for i in 0..n {
        let (sx, sy) = (src_n[i][0], src_n[i][1]);
        let (dx, dy) = (dst_n[i][0], dst_n[i][1]);

        a[(2 * i, 3)] = -sx;
        a[(2 * i, 4)] = -sy;
        a[(2 * i, 5)] = -1.0;
        a[(2 * i, 6)] = dy * sx;
        a[(2 * i, 7)] = dy * sy;
        a[(2 * i, 8)] = dy;

        a[(2 * i + 1, 0)] = sx;
        a[(2 * i + 1, 1)] = sy;
        a[(2 * i + 1, 2)] = 1.0;
        a[(2 * i + 1, 6)] = -dx * sx;
        a[(2 * i + 1, 7)] = -dx * sy;
        a[(2 * i + 1, 8)] = -dx;
    }

    // Null vector of A: eigenvector of A^T A with the smallest eigenvalue.
    let ata = a.transpose() * &a;
    let eig = nalgebra::SymmetricEigen::new(ata);
    let mut min_idx = 0;
    let mut min_val = eig.eigenvalues[0].abs();
    for i in 1..9 {
        let v = eig.eigenvalues[i].abs();
        if v < min_val {
            min_val = v;
            min_idx = i;
        }
    }
    let e = eig.eigenvectors.column(min_idx);
    let h_norm = Matrix3::new(e[0], e[1], e[2], e[3], e[4], e[5], e[6], e[7], e[8]);

    let t_dst_inv = t_dst
        .try_inverse()
        .ok_or_else(|| HomographyError::NumericalFailure("T_dst not invertible".into()))?;
    let h = t_dst_inv * h_norm * t_src;

    if h.iter().any(|v| !v.is_finite()) {
        return Err(HomographyError::NumericalFailure("non-finite homography".into()));
    }
    let scale = h[(2, 2)];
    if scale.abs() < 1e-15 {
        Ok(h)
    } else {
        Ok(h / scale)
    }
}

/// True when any three of the sampled points are (nearly) collinear.
fn is_degenerate_sample(pts: &[[f64; 2]; 4]) -> bool {
    const TRIPLES: [(usize, usize, usize); 4] = [(0, 1, 2), (0, 1, 3), (0, 2, 3), (1, 2, 3)];
    TRIPLES.iter().any(|&(i, j, k)| {
        let (a, b, c) = (pts[i], pts[j], pts[k]);
        let cross = (b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0]);
        cross.abs() < 1e-6
    })
}

fn inlier_mask(h: &Matrix3<f64>, src: &[[f64; 2]], dst: &[[f64; 2]], threshold: f64) -> (Vec<bool>, usize) {
    let mask: Vec<bool> = src
        .iter()
        .zip(dst.iter())
        .map(|(s, d)| reprojection_error(h, s, d) < threshold)
        .collect();
    let count = mask.iter().filter(|&&m| m).count();
    (mask, count)
}

/// Fit a homography robustly.
///
/// Samples of four distinct correspondences are drawn from a `StdRng` seeded
/// with `config.seed`; samples with three collinear points on either side are
/// skipped. The best model is refit on all of its inliers.
pub fn estimate_homography_ransac(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
    config: &RansacConfig,
) -> Result<HomographyEstimate, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::LengthMismatch {
            src: src.len(),
            dst: dst.len(),
        });
    }
    let n = src.len();
    if n < MIN_CORRESPONDENCES {
        return Err(HomographyError::TooFewPoints {
            needed: MIN_CORRESPONDENCES,
            got: n,
        });
    }

    let mut rng = rand::rngs::StdRng::seed_from_u64(config.seed);

    let mut best_inliers = 0usize;
    let mut best_mask: Vec<bool> = vec![false; n];
    let mut best_h: Option<Matrix3<f64>> = None;

    for _ in 0..config.max_iters {
        let mut indices = [0usize; 4];
        let mut filled = 0;
        while filled < 4 {
            let idx = rng.gen_range(0..n);
            if !indices[..filled].contains(&idx) {
                indices[filled] = idx;
                filled += 1;
            }
        }

        let s4 = indices.map(|i| src[i]);
        let d4 = indices.map(|i| dst[i]);
        if is_degenerate_sample(&s4) || is_degenerate_sample(&d4) {
            continue;
        }

        let h = match estimate_homography_dlt(&s4, &d4) {
            Ok(h) => h,
            Err(_) => continue,
        };

        let (mask, count) = inlier_mask(&h, src, dst, config.threshold);
        if count > best_inliers {
            best_inliers = count;
            best_mask = mask;
            best_h = Some(h);

            // Early exit if >90% inliers
            if count * 10 > n * 9 {
                break;
            }
        }
    }

    let best_h = match best_h {
        Some(h) if best_inliers >= config.min_inliers => h,
        _ => {
            return Err(HomographyError::InsufficientInliers {
                needed: config.min_inliers,
                found: best_inliers,
            })
        }
    };

    let inlier_src: Vec<[f64; 2]> = (0..n).filter(|&i| best_mask[i]).map(|i| src[i]).collect();
    let inlier_dst: Vec<[f64; 2]> = (0..n).filter(|&i| best_mask[i]).map(|i| dst[i]).collect();
    let h = estimate_homography_dlt(&inlier_src, &inlier_dst).unwrap_or(best_h);

    let (mut mask, mut n_inliers) = inlier_mask(&h, src, dst, config.threshold);
    let h = if n_inliers < best_inliers {
        // The refit drifted; keep the sampled model.
        let (m, c) = inlier_mask(&best_h, src, dst, config.threshold);
        mask = m;
        n_inliers = c;
        best_h
    } else {
        h
    };

    let mean_error = if n_inliers == 0 {
        0.0
    } else {
        (0..n)
            .filter(|&i| mask[i])
            .map(|i| reprojection_error(&h, &src[i], &dst[i]))
            .sum::<f64>()
            / n_inliers as f64
    };

    Ok(HomographyEstimate {
        h,
        inlier_mask: mask,
        n_inliers,
        mean_error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn make_test_homography() -> Matrix3<f64> {
        Matrix3::new(1.02, 0.05, 12.0, -0.03, 0.98, -7.0, 1e-5, -2e-5, 1.0)
    }

    fn grid_points() -> Vec<[f64; 2]> {
        let mut pts = Vec::new();
        for i in 0..6 {
            for j in 0..5 {
                pts.push([20.0 + i as f64 * 37.0, 15.0 + j as f64 * 41.0 + i as f64 * 3.0]);
            }
        }
        pts
    }

    #[test]
    fn test_dlt_recovers_exact_homography() {
        let h_true = make_test_homography();
        let src = grid_points();
        let dst: Vec<[f64; 2]> = src.iter().map(|p| project(&h_true, p[0], p[1])).collect();

        let h = estimate_homography_dlt(&src, &dst).unwrap();
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(h[(i, j)], h_true[(i, j)], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_dlt_rejects_too_few_points() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        assert_eq!(
            estimate_homography_dlt(&pts, &pts),
            Err(HomographyError::TooFewPoints { needed: 4, got: 3 })
        );
        assert!(matches!(
            estimate_homography_dlt(&pts, &pts[..2]),
            Err(HomographyError::LengthMismatch { .. })
        ));
    }

    #[test]
    fn test_ransac_with_outliers() {
        let h_true = make_test_homography();
        let src = grid_points();
        let mut dst: Vec<[f64; 2]> = src.iter().map(|p| project(&h_true, p[0], p[1])).collect();
        // Corrupt every fifth correspondence
        for i in (0..dst.len()).step_by(5) {
            dst[i][0] += 40.0 + i as f64;
            dst[i][1] -= 25.0;
        }

        let est = estimate_homography_ransac(&src, &dst, &RansacConfig::default()).unwrap();
        assert_eq!(est.n_inliers, 24);
        for i in (0..dst.len()).step_by(5) {
            assert!(!est.inlier_mask[i]);
        }
        assert!(est.mean_error < 1e-6);
        let p = project(&est.h, 100.0, 100.0);
        let q = project(&h_true, 100.0, 100.0);
        assert!((p[0] - q[0]).abs() < 1e-6 && (p[1] - q[1]).abs() < 1e-6);
    }

    #[test]
    fn test_ransac_is_deterministic() {
        let src = grid_points();
        let dst: Vec<[f64; 2]> = src
            .iter()
            .enumerate()
            .map(|(i, p)| [p[0] + 10.0 + (i % 3) as f64 * 0.5, p[1] + 5.0])
            .collect();
        let a = estimate_homography_ransac(&src, &dst, &RansacConfig::default()).unwrap();
        let b = estimate_homography_ransac(&src, &dst, &RansacConfig::default()).unwrap();
        assert_eq!(a.h, b.h);
        assert_eq!(a.inlier_mask, b.inlier_mask);
    }

    #[test]
    fn test_ransac_fails_on_collinear_points() {
        let src: Vec<[f64; 2]> = (0..10).map(|i| [i as f64, 2.0 * i as f64]).collect();
        let dst = src.clone();
        let err = estimate_homography_ransac(&src, &dst, &RansacConfig::default()).unwrap_err();
        assert_eq!(err, HomographyError::InsufficientInliers { needed: 4, found: 0 });
    }

    #[test]
    fn test_homography_delta() {
        let h = make_test_homography();
        assert_eq!(homography_delta(&h, &h), 0.0);
        assert_relative_eq!(homography_delta(&(h * 2.0), &h), 0.0, epsilon = 1e-12);
        let shifted = Matrix3::new(1.0, 0.0, 3.0, 0.0, 1.0, 4.0, 0.0, 0.0, 1.0);
        assert_relative_eq!(homography_delta(&shifted, &Matrix3::identity()), 5.0, epsilon = 1e-12);
    }

    #[test]
    fn test_project_at_infinity_is_nan() {
        let h = Matrix3::new(1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.0, 0.0);
        let p = project(&h, 0.0, 5.0);
        assert!(p[0].is_nan() && p[1].is_nan());
    }
}
