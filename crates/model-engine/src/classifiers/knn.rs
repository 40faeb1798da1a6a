//! K-Nearest Neighbours Classifier

use super::{check_training_data, check_width, Classifier};
use crate::{Dataset, ModelError};
use ndarray::Array2;
use rayon::prelude::*;

/// Uniform-vote k-nearest-neighbours on Euclidean distance.
///
/// Vote ties go to the lowest class index.
#[derive(Debug, Clone)]
pub struct KNearestNeighbors {
    k: usize,
    features: Option<Array2<f64>>,
    targets: Vec<usize>,
    n_classes: usize,
}

impl KNearestNeighbors {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            features: None,
            targets: Vec::new(),
            n_classes: 0,
        }
    }

    pub fn k(&self) -> usize {
        self.k
    }
}

impl Default for KNearestNeighbors {
    fn default() -> Self {
        Self::new(5)
    }
}

impl Classifier for KNearestNeighbors {
    fn name(&self) -> &'static str {
        "KNearestNeighbors"
    }

    fn fit(&mut self, data: &Dataset) -> Result<(), ModelError> {
        check_training_data(data)?;
        if self.k == 0 || self.k > data.n_samples() {
            return Err(ModelError::InvalidParameter(format!(
                "k = {} must be in 1..={}",
                self.k,
                data.n_samples()
            )));
        }
        self.features = Some(data.features.clone());
        self.targets = data.targets.clone();
        self.n_classes = data.n_classes();
        Ok(())
    }

    fn predict(&self, features: &Array2<f64>) -> Result<Vec<usize>, ModelError> {
        let train = self
            .features
            .as_ref()
            .ok_or(ModelError::NotFitted("KNearestNeighbors"))?;
        check_width(train.ncols(), features)?;

        let predictions = (0..features.nrows())
            .into_par_iter()
            .map(|r| {
                let query = features.row(r);
                let mut distances: Vec<(f64, usize)> = train
                    .rows()
                    .into_iter()
                    .zip(&self.targets)
                    .map(|(row, &target)| {
                        let d: f64 = row.iter().zip(query.iter()).map(|(a, b)| (a - b) * (a - b)).sum();
                        (d, target)
                    })
                    .collect();

                let k = self.k;
                distances.select_nth_unstable_by(k - 1, |a, b| a.0.total_cmp(&b.0));

                let mut votes = vec![0usize; self.n_classes];
                for (_, target) in &distances[..k] {
                    votes[*target] += 1;
                }
                let mut best = 0;
                for (class, &count) in votes.iter().enumerate() {
                    if count > votes[best] {
                        best = class;
                    }
                }
                best
            })
            .collect();
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::accuracy;
    use crate::test_support::blobs;
    use ndarray::array;

    #[test]
    fn test_one_neighbour_memorises_training_data() {
        let data = blobs(15, 2);
        let mut knn = KNearestNeighbors::new(1);
        knn.fit(&data).unwrap();
        let predicted = knn.predict(&data.features).unwrap();
        assert_eq!(accuracy(&data.targets, &predicted).unwrap(), 1.0);
    }

    #[test]
    fn test_majority_vote() {
        let data = Dataset {
            feature_names: vec!["x".to_string()],
            features: array![[0.0], [0.1], [0.2], [5.0]],
            targets: vec![0, 0, 1, 1],
            classes: vec!["a".to_string(), "b".to_string()],
        };
        let mut knn = KNearestNeighbors::new(3);
        knn.fit(&data).unwrap();
        assert_eq!(knn.predict(&array![[0.05], [4.0]]).unwrap(), vec![0, 1]);
    }

    #[test]
    fn test_invalid_k() {
        let data = blobs(2, 1);
        assert!(KNearestNeighbors::new(0).fit(&data).is_err());
        assert!(KNearestNeighbors::new(7).fit(&data).is_err());
        assert!(KNearestNeighbors::new(6).fit(&data).is_ok());
    }
}
