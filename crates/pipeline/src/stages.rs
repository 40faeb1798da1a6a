//! Feature engineering stages
//!
//! Every stage takes a table and returns a new one. The order follows the
//! data flow: impute, durations, low-pass, PCA, magnitudes, rolling window
//! features, frequency features, drop incomplete rows and subsample, cluster.

use crate::{PipelineConfig, PipelineError};
use feature_engine::{
    add_cluster_column, add_frequency_features, add_magnitudes, add_temporal_features, apply_pca,
    explained_variance, inertia_curve,
};
use sensor_table::SensorTable;
use signal_cleaning::{annotate_durations, apply_lowpass, impute, rep_durations, set_durations, CategoryDuration, SetDuration};
use tracing::info;

/// Engineered table plus the diagnostics gathered on the way
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub table: SensorTable,
    pub set_durations: Vec<SetDuration>,
    pub rep_durations: Vec<CategoryDuration>,
    /// Explained variance ratio per principal component
    pub explained_variance: Vec<f64>,
    /// `(k, inertia)` pairs for elbow inspection
    pub inertia: Vec<(usize, f64)>,
}

/// Clean the raw table and derive every feature column
pub fn prepare_features(raw: &SensorTable, config: &PipelineConfig) -> Result<PreparedData, PipelineError> {
    let predictors = &config.data.predictors;
    raw.require_columns(predictors)?;
    info!("Preparing features for {} rows, {} sets", raw.len(), raw.set_groups().len());

    let imputed = impute(raw, predictors)?;

    let annotated = annotate_durations(&imputed)?;
    let set_durations = set_durations(&annotated);
    let rep_durations = rep_durations(&annotated, &config.data.expected_reps)?;
    for category in &rep_durations {
        info!(
            "Category {}: mean set {:.1}s, per repetition {:?}",
            category.category, category.mean_set_seconds, category.rep_seconds
        );
    }

    let filtered = apply_lowpass(&annotated, predictors, config.lowpass)?;

    let explained_variance = explained_variance(&filtered, predictors)?;
    let with_pca = apply_pca(&filtered, predictors, config.pca.components)?;

    let with_magnitudes = add_magnitudes(&with_pca, &config.magnitudes)?;

    let window_columns = config.window_columns();
    let with_temporal = add_temporal_features(&with_magnitudes, &window_columns, &config.temporal)?;
    let with_frequency = add_frequency_features(&with_temporal, &window_columns, config.frequency)?;

    let complete = with_frequency.drop_missing();
    let subsampled = complete.step_rows(config.subsample_step);
    info!(
        "Kept {} of {} rows after dropping incomplete windows and subsampling by {}",
        subsampled.len(),
        with_frequency.len(),
        config.subsample_step
    );

    let inertia = inertia_curve(&subsampled, &config.cluster.inertia_ks, &config.cluster.kmeans)?;
    let table = add_cluster_column(&subsampled, &config.cluster.kmeans)?;

    info!("Feature table ready: {} rows, {} numeric columns", table.len(), table.column_names().len());
    Ok(PreparedData {
        table,
        set_durations,
        rep_durations,
        explained_variance,
        inertia,
    })
}
