//! Feature Engineering Engine
//!
//! Derives classifier inputs from cleaned sensor tables: vector magnitudes,
//! principal components, rolling temporal aggregates, windowed frequency
//! features and k-means cluster ids, plus the named feature sets built from
//! them.

mod cluster;
mod error;
mod feature_sets;
mod frequency;
mod magnitude;
mod pca;
mod temporal;

#[cfg(test)]
pub(crate) mod test_support;

pub use cluster::{add_cluster_column, inertia_curve, ClusterConfig, KMeans, KMeansModel, CLUSTER_COLUMN};
pub use error::FeatureError;
pub use feature_sets::{
    cumulative_feature_sets, FeatureGroups, FeatureSet, FeatureSetConfig, SELECTED_SET_NAME,
};
pub use frequency::{add_frequency_features, format_frequency, FourierAnalyzer, FrequencyConfig, SpectralFeatures};
pub use magnitude::{add_magnitudes, MagnitudeGroup};
pub use pca::{apply_pca, explained_variance, PrincipalComponents, PCA_PREFIX};
pub use temporal::{add_temporal_features, temporal_column_name, Aggregation, TemporalConfig};
