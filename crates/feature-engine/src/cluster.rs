//! K-Means Clustering
//!
//! Lloyd iterations from k-means++ seeds, restarted `n_init` times with
//! seeds `seed, seed + 1, ...`; the run with the lowest inertia wins.

use crate::FeatureError;
use ndarray::{Array1, Array2, ArrayView1};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use sensor_table::SensorTable;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Column holding the cluster id of each row
pub const CLUSTER_COLUMN: &str = "cluster";

/// Clustering parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Columns clustered on
    pub columns: Vec<String>,
    /// Number of clusters
    pub k: usize,
    /// Independent restarts
    pub n_init: usize,
    /// Lloyd iterations per restart
    pub max_iter: usize,
    /// Stop once no centroid moves further than this
    pub tolerance: f64,
    pub seed: u64,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            columns: vec!["acc_x".to_string(), "acc_y".to_string(), "acc_z".to_string()],
            k: 5,
            n_init: 20,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 0,
        }
    }
}

/// K-means estimator
#[derive(Debug, Clone)]
pub struct KMeans {
    k: usize,
    n_init: usize,
    max_iter: usize,
    tolerance: f64,
    seed: u64,
}

/// Fitted centroids
#[derive(Debug, Clone)]
pub struct KMeansModel {
    /// `k x features`
    pub centroids: Array2<f64>,
    /// Sum of squared distances of the training rows to their centroid
    pub inertia: f64,
}

impl KMeans {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            n_init: 10,
            max_iter: 300,
            tolerance: 1e-4,
            seed: 0,
        }
    }

    pub fn from_config(config: &ClusterConfig) -> Self {
        Self {
            k: config.k,
            n_init: config.n_init,
            max_iter: config.max_iter,
            tolerance: config.tolerance,
            seed: config.seed,
        }
    }

    pub fn with_n_init(mut self, n_init: usize) -> Self {
        self.n_init = n_init;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Fit on a `samples x features` matrix without missing values
    pub fn fit(&self, data: &Array2<f64>) -> Result<KMeansModel, FeatureError> {
        if self.k == 0 {
            return Err(FeatureError::InvalidParameter("k must be at least 1".to_string()));
        }
        if data.nrows() < self.k {
            return Err(FeatureError::NotEnoughRows {
                needed: self.k,
                actual: data.nrows(),
            });
        }
        if data.iter().any(|v| !v.is_finite()) {
            return Err(FeatureError::InvalidParameter(
                "k-means input contains missing or infinite values".to_string(),
            ));
        }

        let mut best: Option<KMeansModel> = None;
        for init in 0..self.n_init.max(1) {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed.wrapping_add(init as u64));
            let model = self.run_once(data, &mut rng);
            debug!("k-means restart {}: inertia {:.4}", init, model.inertia);

            if best.as_ref().map_or(true, |b| model.inertia < b.inertia) {
                best = Some(model);
            }
        }

        best.ok_or_else(|| FeatureError::InvalidParameter("k-means produced no model".to_string()))
    }

    fn run_once(&self, data: &Array2<f64>, rng: &mut ChaCha8Rng) -> KMeansModel {
        let mut centroids = plus_plus_seeds(data, self.k, rng);
        let mut assignments = vec![0usize; data.nrows()];

        for iteration in 0..self.max_iter {
            for (i, row) in data.rows().into_iter().enumerate() {
                assignments[i] = nearest(&centroids, row).0;
            }

            let mut sums = Array2::<f64>::zeros(centroids.dim());
            let mut counts = vec![0usize; self.k];
            for (row, &cluster) in data.rows().into_iter().zip(&assignments) {
                let mut sum = sums.row_mut(cluster);
                sum += &row;
                counts[cluster] += 1;
            }

            let mut shift = 0.0f64;
            for (cluster, &count) in counts.iter().enumerate() {
                // empty clusters keep their previous centroid
                if count == 0 {
                    continue;
                }
                let updated: Array1<f64> = sums.row(cluster).mapv(|v| v / count as f64);
                shift = shift.max(squared_distance(centroids.row(cluster), updated.view()).sqrt());
                centroids.row_mut(cluster).assign(&updated);
            }

            if shift <= self.tolerance {
                debug!("k-means converged after {} iterations", iteration + 1);
                break;
            }
        }

        let inertia = data.rows().into_iter().map(|row| nearest(&centroids, row).1).sum();
        KMeansModel { centroids, inertia }
    }
}

impl KMeansModel {
    /// Nearest centroid of every row
    pub fn predict(&self, data: &Array2<f64>) -> Vec<usize> {
        data.rows()
            .into_iter()
            .map(|row| nearest(&self.centroids, row).0)
            .collect()
    }

    pub fn k(&self) -> usize {
        self.centroids.nrows()
    }
}

fn squared_distance(a: ArrayView1<f64>, b: ArrayView1<f64>) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

/// Index of and squared distance to the closest centroid
fn nearest(centroids: &Array2<f64>, row: ArrayView1<f64>) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (j, centroid) in centroids.rows().into_iter().enumerate() {
        let dist = squared_distance(row, centroid);
        if dist < best.1 {
            best = (j, dist);
        }
    }
    best
}

/// k-means++ seeding: each further seed is drawn with probability proportional
/// to its squared distance from the closest seed chosen so far
fn plus_plus_seeds(data: &Array2<f64>, k: usize, rng: &mut ChaCha8Rng) -> Array2<f64> {
    let n = data.nrows();
    let mut centroids = Array2::<f64>::zeros((k, data.ncols()));
    centroids.row_mut(0).assign(&data.row(rng.gen_range(0..n)));

    let mut closest: Vec<f64> = data
        .rows()
        .into_iter()
        .map(|row| squared_distance(row, centroids.row(0)))
        .collect();

    for c in 1..k {
        let total: f64 = closest.iter().sum();
        let chosen = if total > 0.0 {
            let mut target = rng.gen::<f64>() * total;
            let mut pick = n - 1;
            for (i, d) in closest.iter().enumerate() {
                if target < *d {
                    pick = i;
                    break;
                }
                target -= d;
            }
            pick
        } else {
            rng.gen_range(0..n)
        };

        centroids.row_mut(c).assign(&data.row(chosen));
        for (i, row) in data.rows().into_iter().enumerate() {
            closest[i] = closest[i].min(squared_distance(row, centroids.row(c)));
        }
    }
    centroids
}

/// Return a copy of `table` with the cluster id of every row in [`CLUSTER_COLUMN`]
pub fn add_cluster_column(table: &SensorTable, config: &ClusterConfig) -> Result<SensorTable, FeatureError> {
    let data = table.to_matrix(&config.columns)?;
    let model = KMeans::from_config(config).fit(&data)?;
    let labels = model.predict(&data);

    let mut out = table.clone();
    out.insert_column(CLUSTER_COLUMN, labels.into_iter().map(|l| l as f64).collect())?;

    info!(
        "Clustered {} rows into {} clusters on {:?} (inertia {:.3})",
        table.len(),
        config.k,
        config.columns,
        model.inertia
    );
    Ok(out)
}

/// Inertia for each `k` in `ks` (for elbow inspection)
pub fn inertia_curve(
    table: &SensorTable,
    ks: &[usize],
    config: &ClusterConfig,
) -> Result<Vec<(usize, f64)>, FeatureError> {
    let data = table.to_matrix(&config.columns)?;
    ks.iter()
        .map(|&k| {
            let model = KMeans::from_config(&ClusterConfig {
                k,
                ..config.clone()
            })
            .fit(&data)?;
            Ok((k, model.inertia))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::synthetic_table;
    use ndarray::array;

    fn blobs() -> Array2<f64> {
        let mut rows = Vec::new();
        for (cx, cy) in [(0.0, 0.0), (10.0, 10.0), (-10.0, 10.0)] {
            for i in 0..20 {
                let jitter = (i as f64 * 0.37).sin() * 0.5;
                rows.push([cx + jitter, cy - jitter]);
            }
        }
        Array2::from_shape_fn((rows.len(), 2), |(r, c)| rows[r][c])
    }

    #[test]
    fn test_separates_blobs() {
        let data = blobs();
        let model = KMeans::new(3).with_seed(0).fit(&data).unwrap();
        let labels = model.predict(&data);

        for blob in 0..3 {
            let first = labels[blob * 20];
            assert!(labels[blob * 20..(blob + 1) * 20].iter().all(|l| *l == first));
        }
        assert_ne!(labels[0], labels[20]);
        assert_ne!(labels[20], labels[40]);
    }

    #[test]
    fn test_same_seed_same_result() {
        let data = blobs();
        let a = KMeans::new(3).with_seed(7).fit(&data).unwrap();
        let b = KMeans::new(3).with_seed(7).fit(&data).unwrap();
        assert_eq!(a.centroids, b.centroids);
        assert_eq!(a.inertia, b.inertia);
    }

    #[test]
    fn test_duplicate_points() {
        let data = array![[1.0, 1.0], [1.0, 1.0], [1.0, 1.0]];
        let model = KMeans::new(2).with_n_init(3).fit(&data).unwrap();
        assert_eq!(model.inertia, 0.0);
    }

    #[test]
    fn test_too_few_rows() {
        let data = array![[1.0], [2.0]];
        assert!(matches!(
            KMeans::new(3).fit(&data),
            Err(FeatureError::NotEnoughRows { needed: 3, actual: 2 })
        ));
    }

    #[test]
    fn test_inertia_curve_drops_from_single_cluster() {
        let table = synthetic_table(2, 40);
        let config = ClusterConfig {
            n_init: 5,
            ..Default::default()
        };
        let curve = inertia_curve(&table, &[1, 2, 4, 8], &config).unwrap();

        assert_eq!(curve.len(), 4);
        assert_eq!(curve[0].0, 1);
        assert!(curve[3].1 < curve[0].1);
    }

    #[test]
    fn test_cluster_column_ids_in_range() {
        let table = synthetic_table(2, 30);
        let out = add_cluster_column(
            &table,
            &ClusterConfig {
                n_init: 3,
                ..Default::default()
            },
        )
        .unwrap();

        let ids = out.column(CLUSTER_COLUMN).unwrap();
        assert_eq!(ids.len(), table.len());
        assert!(ids.iter().all(|id| *id >= 0.0 && *id < 5.0 && id.fract() == 0.0));
    }
}
