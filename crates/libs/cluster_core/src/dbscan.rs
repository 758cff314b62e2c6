use crate::matrix::DistanceMatrix;

/// Label assigned to a noise point (not part of any dense region).
pub const NOISE: i64 = -1;

/// Density-based clustering over a precomputed distance matrix.
///
/// Standard DBSCAN: a point is a core point if it has at least
/// `min_samples` points (including itself) within `eps`. Clusters grow by
/// transitively absorbing neighbors of core points; points reachable only
/// from a non-core point stay noise.
pub fn fit(matrix: &DistanceMatrix, eps: f32, min_samples: usize) -> Vec<i64> {
    let n = matrix.len();
    let mut labels = vec![NOISE; n];
    let mut visited = vec![false; n];
    let mut next_label: i64 = 0;

    for i in 0..n {
        if visited[i] {
            continue;
        }
        visited[i] = true;

        let mut neighbors = matrix.neighbors(i, eps);
        if neighbors.len() + 1 < min_samples {
            // Stays noise for now; may still be absorbed later as a
            // border point of someone else's cluster.
            continue;
        }

        let label = next_label;
        next_label += 1;
        labels[i] = label;

        let mut seeds: Vec<usize> = neighbors.drain(..).map(|(j, _)| j).collect();
        let mut idx = 0;
        while idx < seeds.len() {
            let q = seeds[idx];
            idx += 1;

            if labels[q] == NOISE {
                labels[q] = label;
            }
            if visited[q] {
                continue;
            }
            visited[q] = true;

            let q_neighbors = matrix.neighbors(q, eps);
            if q_neighbors.len() + 1 >= min_samples {
                for (r, _) in q_neighbors {
                    if !seeds.contains(&r) {
                        seeds.push(r);
                    }
                    if labels[r] == NOISE {
                        labels[r] = label;
                    }
                }
            }
        }
    }

    labels
}
