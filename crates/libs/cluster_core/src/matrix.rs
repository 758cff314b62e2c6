use half::f16;
use rayon::prelude::*;

/// Pool size above which row assembly uses a parallel sort.
const PARALLEL_SORT_THRESHOLD: usize = 15_000;

/// A dense, fully-materialized symmetric distance matrix. Used while the
/// pool is small enough that an `n x n` table is cheap.
#[derive(Debug, Clone)]
pub struct DenseMatrix {
    rows: Vec<Vec<f32>>,
}

impl DenseMatrix {
    pub fn from_full(rows: Vec<Vec<f32>>) -> Self {
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Neighbors of `i` within `eps`, excluding `i` itself.
    pub fn neighbors(&self, i: usize, eps: f32) -> Vec<(usize, f32)> {
        self.rows[i]
            .iter()
            .enumerate()
            .filter(|&(j, &d)| j != i && d <= eps)
            .map(|(j, &d)| (j, d))
            .collect()
    }

    pub fn is_symmetric(&self) -> bool {
        let n = self.len();
        for i in 0..n {
            for j in 0..n {
                if (self.rows[i][j] - self.rows[j][i]).abs() > 1e-4 {
                    return false;
                }
            }
        }
        true
    }
}

/// A sparse symmetric distance matrix stored as sorted-by-column adjacency
/// rows. Entries absent from a row are treated as infinite distance (never
/// neighbors) by DBSCAN. Rows below `old_size` at assembly time only carry
/// entries mirrored from the newly added rows; true prior-to-prior
/// distances are never recomputed, since any clustering decision between
/// two already-resolved slots was settled in an earlier step.
#[derive(Debug, Clone)]
pub struct SparseMatrix {
    rows: Vec<Vec<(usize, f32)>>,
}

impl SparseMatrix {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn neighbors(&self, i: usize, eps: f32) -> Vec<(usize, f32)> {
        self.rows[i]
            .iter()
            .filter(|&&(_, d)| d <= eps)
            .copied()
            .collect()
    }

    pub fn is_symmetric(&self) -> bool {
        for (i, row) in self.rows.iter().enumerate() {
            for &(j, d) in row {
                let found = self.rows[j].iter().any(|&(k, dj)| k == i && (dj - d).abs() < 1e-3);
                if !found {
                    return false;
                }
            }
        }
        true
    }

    /// Materializes a full dense matrix, filling every entry absent from a
    /// sparse row with infinity (never a DBSCAN neighbor).
    pub fn densify(&self) -> DenseMatrix {
        let n = self.len();
        let mut rows = vec![vec![f32::INFINITY; n]; n];
        for (i, row) in rows.iter_mut().enumerate() {
            row[i] = 0.0;
        }
        for (i, sparse_row) in self.rows.iter().enumerate() {
            for &(j, d) in sparse_row {
                rows[i][j] = d;
            }
        }
        DenseMatrix::from_full(rows)
    }
}

/// Assembles an `(old_size + add_rows.len())`-sized sparse matrix from an
/// `M x (old_size + M)` dense block of distances between the new rows and
/// the full (post-append) pool.
pub fn assemble_sparse(add_rows: &[Vec<f16>], old_size: usize) -> SparseMatrix {
    let m = add_rows.len();
    let total = old_size + m;
    let mut rows: Vec<Vec<(usize, f32)>> = vec![Vec::new(); total];

    for (i, new_row) in add_rows.iter().enumerate() {
        let global_row = old_size + i;
        for (col, dist) in new_row.iter().enumerate() {
            if col == global_row {
                continue;
            }
            let dist = dist.to_f32();
            rows[global_row].push((col, dist));
            if col < old_size {
                rows[col].push((global_row, dist));
            }
        }
    }

    if old_size >= PARALLEL_SORT_THRESHOLD {
        rows.par_iter_mut().for_each(|r| r.sort_by_key(|&(c, _)| c));
    } else {
        rows.iter_mut().for_each(|r| r.sort_by_key(|&(c, _)| c));
    }

    SparseMatrix { rows }
}

/// Hides the dense/sparse distinction from DBSCAN.
#[derive(Debug, Clone)]
pub enum DistanceMatrix {
    Dense(DenseMatrix),
    Sparse(SparseMatrix),
}

impl DistanceMatrix {
    pub fn len(&self) -> usize {
        match self {
            Self::Dense(d) => d.len(),
            Self::Sparse(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn neighbors(&self, i: usize, eps: f32) -> Vec<(usize, f32)> {
        match self {
            Self::Dense(d) => d.neighbors(i, eps),
            Self::Sparse(s) => s.neighbors(i, eps),
        }
    }

    pub fn is_symmetric(&self) -> bool {
        match self {
            Self::Dense(d) => d.is_symmetric(),
            Self::Sparse(s) => s.is_symmetric(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block(values: Vec<Vec<f32>>) -> Vec<Vec<f16>> {
        values
            .into_iter()
            .map(|row| row.into_iter().map(f16::from_f32).collect())
            .collect()
    }

    #[test]
    fn sparse_assembly_is_symmetric() {
        // 2 priors, 1 new row, distances to both priors and to itself (0).
        let add_rows = block(vec![vec![0.3, 0.4, 0.0]]);
        let sparse = assemble_sparse(&add_rows, 2);
        assert_eq!(sparse.len(), 3);
        assert!(sparse.is_symmetric());
        let neighbors_of_new = sparse.neighbors(2, 1.0);
        assert_eq!(neighbors_of_new.len(), 2);
        let neighbors_of_prior0 = sparse.neighbors(0, 1.0);
        assert_eq!(neighbors_of_prior0, vec![(2, 0.3)]);
    }

    #[test]
    fn prior_to_prior_entries_are_absent() {
        let add_rows = block(vec![
            vec![0.1, 0.1, 0.0, 0.05],
            vec![0.2, 0.2, 0.05, 0.0],
        ]);
        let sparse = assemble_sparse(&add_rows, 2);
        // row 0 (a prior) should only ever mention the two new rows (2, 3),
        // never row 1 (the other prior).
        let entries: Vec<usize> = sparse.neighbors(0, 1.0).into_iter().map(|(j, _)| j).collect();
        assert!(!entries.contains(&1));
    }
}
