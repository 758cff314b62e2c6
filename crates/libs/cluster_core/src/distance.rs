use crate::error::{ClusterError, Result};
use half::f16;
use rayon::prelude::*;

/// Computes cosine distance between a batch of new centroids and the pool's
/// current centroids (which already include the new ones, per the caller's
/// contract), tiled over the pool dimension to bound peak memory.
///
/// Returns an `M x pool.len()` matrix stored in half precision.
pub fn batch_distances(
    new: &[Vec<f32>],
    pool: &[Vec<f32>],
    block_size: usize,
    dim: usize,
) -> Result<Vec<Vec<f16>>> {
    for v in new.iter().chain(pool.iter()) {
        if v.len() != dim {
            return Err(ClusterError::DimensionMismatch {
                expected: dim,
                actual: v.len(),
            });
        }
    }

    let new_norm: Vec<Vec<f32>> = new.iter().map(|v| normalize(v)).collect();
    let pool_norm: Vec<Vec<f32>> = pool.iter().map(|v| normalize(v)).collect();

    let n_pool = pool_norm.len();
    let block_size = block_size.max(1);

    let rows: Vec<Vec<f16>> = new_norm
        .par_iter()
        .map(|nv| {
            let mut row = vec![f16::from_f32(0.0); n_pool];
            let mut start = 0;
            while start < n_pool {
                let end = (start + block_size).min(n_pool);
                for (j, pv) in pool_norm[start..end].iter().enumerate() {
                    let sim = dot(nv, pv);
                    let dist = (1.0 - sim).clamp(0.0, 1.0);
                    row[start + j] = f16::from_f32(dist);
                }
                start = end;
            }
            row
        })
        .collect();

    Ok(rows)
}

/// Cosine distance between two raw (not necessarily unit) vectors.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let an = normalize(a);
    let bn = normalize(b);
    (1.0 - dot(&an, &bn)).clamp(0.0, 1.0)
}

fn normalize(v: &[f32]) -> Vec<f32> {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm <= f32::EPSILON {
        // A zero vector is treated as orthogonal to everything: leave it
        // as all-zeros so every dot product with it is zero.
        return vec![0.0; v.len()];
    }
    v.iter().map(|x| x / norm).collect()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_vectors_have_zero_distance() {
        let d = cosine_distance(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!(d.abs() < 1e-6, "expected ~0, got {d}");
    }

    #[test]
    fn orthogonal_vectors_have_distance_one() {
        let d = cosine_distance(&[1.0, 0.0], &[0.0, 1.0]);
        assert!((d - 1.0).abs() < 1e-6, "expected ~1, got {d}");
    }

    #[test]
    fn zero_vector_is_orthogonal_to_everything() {
        let d = cosine_distance(&[0.0, 0.0], &[1.0, 1.0]);
        assert!((d - 1.0).abs() < 1e-6);
    }

    #[test]
    fn distances_stay_in_unit_range() {
        let new = vec![vec![1.0, -1.0, 0.5], vec![-2.0, 3.0, 0.1]];
        let pool = vec![
            vec![1.0, -1.0, 0.5],
            vec![-2.0, 3.0, 0.1],
            vec![0.0, 0.0, 1.0],
        ];
        let rows = batch_distances(&new, &pool, 2, 3).unwrap();
        for row in &rows {
            for d in row {
                let d = d.to_f32();
                assert!((0.0..=1.0).contains(&d), "distance {d} out of range");
            }
        }
    }

    #[test]
    fn rejects_dimension_mismatch() {
        let new = vec![vec![1.0, 0.0]];
        let pool = vec![vec![1.0, 0.0, 0.0]];
        let err = batch_distances(&new, &pool, 120, 2).unwrap_err();
        assert!(matches!(err, ClusterError::DimensionMismatch { .. }));
    }
}
