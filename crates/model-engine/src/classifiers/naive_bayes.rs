//! Gaussian Naive Bayes Classifier

use super::{argmax, check_training_data, check_width, Classifier};
use crate::{Dataset, ModelError};
use ndarray::{Array1, Array2, Axis};
use std::f64::consts::PI;

/// Per-class independent Gaussians over every feature
#[derive(Debug, Clone)]
pub struct GaussianNaiveBayes {
    /// Share of the largest feature variance added to every variance
    var_smoothing: f64,
    /// `classes x features`
    means: Option<Array2<f64>>,
    variances: Array2<f64>,
    /// Log prior per class (`-inf` for classes absent from training)
    log_priors: Vec<f64>,
}

impl GaussianNaiveBayes {
    pub fn new(var_smoothing: f64) -> Self {
        Self {
            var_smoothing,
            means: None,
            variances: Array2::zeros((0, 0)),
            log_priors: Vec::new(),
        }
    }

    fn joint_log_likelihood(&self, means: &Array2<f64>, row: ndarray::ArrayView1<f64>) -> Vec<f64> {
        self.log_priors
            .iter()
            .enumerate()
            .map(|(class, &prior)| {
                if prior == f64::NEG_INFINITY {
                    return prior;
                }
                let mut ll = prior;
                for ((x, mean), var) in row.iter().zip(means.row(class)).zip(self.variances.row(class)) {
                    ll -= 0.5 * (2.0 * PI * var).ln() + (x - mean) * (x - mean) / (2.0 * var);
                }
                ll
            })
            .collect()
    }
}

impl Default for GaussianNaiveBayes {
    fn default() -> Self {
        Self::new(1e-9)
    }
}

impl Classifier for GaussianNaiveBayes {
    fn name(&self) -> &'static str {
        "GaussianNaiveBayes"
    }

    fn fit(&mut self, data: &Dataset) -> Result<(), ModelError> {
        check_training_data(data)?;
        let (n, p) = data.features.dim();
        let k = data.n_classes();

        let overall_var = data.features.var_axis(Axis(0), 0.0);
        let epsilon = self.var_smoothing * overall_var.fold(0.0f64, |m, v| m.max(*v));

        let mut means = Array2::zeros((k, p));
        let mut variances = Array2::zeros((k, p));
        let counts = data.class_counts();

        for class in 0..k {
            if counts[class] == 0 {
                continue;
            }
            let rows: Vec<usize> = (0..n).filter(|&r| data.targets[r] == class).collect();
            let subset = data.features.select(Axis(0), &rows);
            let mean: Array1<f64> = subset.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(p));
            let var = subset.var_axis(Axis(0), 0.0);
            means.row_mut(class).assign(&mean);
            variances.row_mut(class).assign(&var.mapv(|v| v + epsilon));
        }

        // a constant feature would give a zero variance
        variances.mapv_inplace(|v| if v > 0.0 { v } else { f64::MIN_POSITIVE.sqrt() });

        self.log_priors = counts
            .iter()
            .map(|&c| {
                if c == 0 {
                    f64::NEG_INFINITY
                } else {
                    (c as f64 / n as f64).ln()
                }
            })
            .collect();
        self.means = Some(means);
        self.variances = variances;
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>, ModelError> {
        let means = self
            .means
            .as_ref()
            .ok_or(ModelError::NotFitted("GaussianNaiveBayes"))?;
        check_width(means.ncols(), features)?;

        Ok(features
            .rows()
            .into_iter()
            .map(|row| argmax(&self.joint_log_likelihood(means, row)))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accuracy;
    use crate::test_support::{blobs, toy_dataset};

    #[test]
    fn test_separates_blobs() {
        let data = blobs(25, 4);
        let (train, test) = data.train_test_split(0.25, 1).unwrap();
        let mut nb = GaussianNaiveBayes::default();
        nb.fit(&train).unwrap();
        let predicted = nb.predict(&test.features).unwrap();
        assert_eq!(accuracy(&test.targets, &predicted).unwrap(), 1.0);
    }

    #[test]
    fn test_constant_feature_is_harmless() {
        let mut data = toy_dataset(40, 6);
        data.features.column_mut(1).fill(3.0);
        let mut nb = GaussianNaiveBayes::default();
        nb.fit(&data).unwrap();
        let predicted = nb.predict(&data.features).unwrap();
        assert!(accuracy(&data.targets, &predicted).unwrap() > 0.95);
    }

    #[test]
    fn test_unfitted() {
        let nb = GaussianNaiveBayes::default();
        assert!(nb.predict(&Array2::zeros((2, 2))).is_err());
    }
}
