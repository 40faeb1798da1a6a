//! Principal Component Analysis
//!
//! Columns are z-score standardised (population standard deviation) before
//! the covariance matrix is eigen-decomposed with cyclic Jacobi rotations.
//! Component signs are arbitrary and may flip between datasets.

use crate::FeatureError;
use ndarray::{Array1, Array2, Axis};
use sensor_table::SensorTable;
use tracing::{debug, info};

/// Prefix of the projected columns (`pca_1`, `pca_2`, ...)
pub const PCA_PREFIX: &str = "pca_";

/// Maximum number of Jacobi sweeps
const MAX_SWEEPS: usize = 100;

/// Standard deviations below this are treated as constant columns
const MIN_SCALE: f64 = 1e-12;

/// Fitted standardisation and principal axes
#[derive(Debug, Clone)]
pub struct PrincipalComponents {
    means: Array1<f64>,
    scales: Array1<f64>,
    /// Eigenvalues of the covariance matrix, descending
    eigenvalues: Array1<f64>,
    /// Unit eigenvectors as columns, same order as `eigenvalues`
    components: Array2<f64>,
}

impl PrincipalComponents {
    /// Fit on the named table columns
    pub fn fit<S: AsRef<str>>(table: &SensorTable, columns: &[S]) -> Result<Self, FeatureError> {
        for name in columns {
            let count = table.missing_count(name.as_ref())?;
            if count > 0 {
                return Err(FeatureError::MissingValues {
                    column: name.as_ref().to_string(),
                    count,
                });
            }
        }
        Self::fit_matrix(&table.to_matrix(columns)?)
    }

    /// Fit on a `samples x features` matrix
    pub fn fit_matrix(data: &Array2<f64>) -> Result<Self, FeatureError> {
        let (n, p) = data.dim();
        if p == 0 {
            return Err(FeatureError::InvalidParameter("PCA needs at least one column".to_string()));
        }
        if n < 2 {
            return Err(FeatureError::NotEnoughRows { needed: 2, actual: n });
        }

        let means = data.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
        let scales = data
            .std_axis(Axis(0), 0.0)
            .mapv(|s| if s > MIN_SCALE { s } else { 1.0 });

        let standardized = (data - &means) / &scales;
        let covariance = standardized.t().dot(&standardized) / (n as f64 - 1.0);

        let (eigenvalues, components) = symmetric_eigen(&covariance);
        debug!("PCA eigenvalues: {:?}", eigenvalues);

        Ok(Self {
            means,
            scales,
            eigenvalues,
            components,
        })
    }

    /// Number of input columns
    pub fn n_features(&self) -> usize {
        self.means.len()
    }

    /// Share of total variance per component, descending, one entry per input column
    pub fn explained_variance_ratio(&self) -> Vec<f64> {
        let clipped = self.eigenvalues.mapv(|v| v.max(0.0));
        let total = clipped.sum();
        if total <= 0.0 {
            return vec![0.0; clipped.len()];
        }
        clipped.iter().map(|v| v / total).collect()
    }

    /// Apply the fitted standardisation
    pub fn standardize(&self, data: &Array2<f64>) -> Array2<f64> {
        (data - &self.means) / &self.scales
    }

    /// Project onto the top-`k` components
    pub fn transform(&self, data: &Array2<f64>, k: usize) -> Result<Array2<f64>, FeatureError> {
        self.check_k(k)?;
        if data.ncols() != self.n_features() {
            return Err(FeatureError::InvalidParameter(format!(
                "expected {} columns, got {}",
                self.n_features(),
                data.ncols()
            )));
        }
        let basis = self.components.slice(ndarray::s![.., ..k]);
        Ok(self.standardize(data).dot(&basis))
    }

    /// Map top-`k` scores back to the standardised input space
    pub fn reconstruct(&self, scores: &Array2<f64>) -> Result<Array2<f64>, FeatureError> {
        let k = scores.ncols();
        self.check_k(k)?;
        let basis = self.components.slice(ndarray::s![.., ..k]);
        Ok(scores.dot(&basis.t()))
    }

    fn check_k(&self, k: usize) -> Result<(), FeatureError> {
        if k == 0 || k > self.n_features() {
            return Err(FeatureError::InvalidParameter(format!(
                "component count {} must be in 1..={}",
                k,
                self.n_features()
            )));
        }
        Ok(())
    }
}

/// Explained-variance ratios of the standardised columns (for elbow inspection)
pub fn explained_variance<S: AsRef<str>>(table: &SensorTable, columns: &[S]) -> Result<Vec<f64>, FeatureError> {
    let pca = PrincipalComponents::fit(table, columns)?;
    let ratios = pca.explained_variance_ratio();
    info!("Explained variance ratios: {:?}", ratios);
    Ok(ratios)
}

/// Return a copy of `table` with `pca_1..pca_k` appended
pub fn apply_pca<S: AsRef<str>>(table: &SensorTable, columns: &[S], k: usize) -> Result<SensorTable, FeatureError> {
    let pca = PrincipalComponents::fit(table, columns)?;
    let scores = pca.transform(&table.to_matrix(columns)?, k)?;

    let mut out = table.clone();
    for (i, component) in scores.columns().into_iter().enumerate() {
        out.insert_column(format!("{}{}", PCA_PREFIX, i + 1), component.to_vec())?;
    }

    info!("Projected {} columns onto {} principal components", columns.len(), k);
    Ok(out)
}

/// Eigen-decomposition of a symmetric matrix, eigenvalues sorted descending
fn symmetric_eigen(matrix: &Array2<f64>) -> (Array1<f64>, Array2<f64>) {
    let n = matrix.nrows();
    let mut s = matrix.clone();
    let mut v = Array2::<f64>::eye(n);
    let tol = f64::EPSILON * 100.0;

    for _ in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for i in 0..n {
            for j in (i + 1)..n {
                off += s[[i, j]] * s[[i, j]];
            }
        }
        if off.sqrt() < tol {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = s[[p, q]];
                if apq.abs() < tol {
                    continue;
                }
                let app = s[[p, p]];
                let aqq = s[[q, q]];

                let theta = (aqq - app) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let sn = t * c;

                s[[p, p]] = app - t * apq;
                s[[q, q]] = aqq + t * apq;
                s[[p, q]] = 0.0;
                s[[q, p]] = 0.0;

                for r in 0..n {
                    if r == p || r == q {
                        continue;
                    }
                    let srp = s[[r, p]];
                    let srq = s[[r, q]];
                    s[[r, p]] = c * srp - sn * srq;
                    s[[p, r]] = s[[r, p]];
                    s[[r, q]] = sn * srp + c * srq;
                    s[[q, r]] = s[[r, q]];
                }

                for r in 0..n {
                    let vp = v[[r, p]];
                    let vq = v[[r, q]];
                    v[[r, p]] = c * vp - sn * vq;
                    v[[r, q]] = sn * vp + c * vq;
                }
            }
        }
    }

    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| s[[b, b]].partial_cmp(&s[[a, a]]).unwrap_or(std::cmp::Ordering::Equal));

    let eigenvalues = Array1::from_iter(order.iter().map(|&i| s[[i, i]]));
    let mut eigenvectors = Array2::zeros((n, n));
    for (new_col, &old_col) in order.iter().enumerate() {
        eigenvectors.column_mut(new_col).assign(&v.column(old_col));
    }
    (eigenvalues, eigenvectors)
}
