//! Temporal Abstraction
//!
//! Rolling-window aggregates computed independently within each set. A row
//! gets a value only once its set has produced `window` samples and none of
//! them is missing.

use crate::FeatureError;
use sensor_table::SensorTable;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Aggregation applied to each rolling window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregation {
    Mean,
    /// Sample standard deviation (n - 1)
    Std,
    Min,
    Max,
    Median,
    /// Least-squares slope per sample
    Slope,
}

impl Aggregation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Aggregation::Mean => "mean",
            Aggregation::Std => "std",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Median => "median",
            Aggregation::Slope => "slope",
        }
    }

    /// Aggregate a window with no missing values
    pub fn compute(&self, values: &[f64]) -> f64 {
        if values.is_empty() {
            return f64::NAN;
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;

        match self {
            Aggregation::Mean => mean,
            Aggregation::Std => {
                if values.len() < 2 {
                    return f64::NAN;
                }
                let m2: f64 = values.iter().map(|v| (v - mean) * (v - mean)).sum();
                (m2 / (n - 1.0)).sqrt()
            }
            Aggregation::Min => values.iter().cloned().fold(f64::INFINITY, f64::min),
            Aggregation::Max => values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            Aggregation::Median => {
                let mut sorted = values.to_vec();
                sorted.sort_by(|a, b| a.total_cmp(b));
                let mid = sorted.len() / 2;
                if sorted.len() % 2 == 0 {
                    (sorted[mid - 1] + sorted[mid]) / 2.0
                } else {
                    sorted[mid]
                }
            }
            Aggregation::Slope => {
                if values.len() < 2 {
                    return 0.0;
                }
                let x_mean = (n - 1.0) / 2.0;
                let mut num = 0.0;
                let mut den = 0.0;
                for (i, v) in values.iter().enumerate() {
                    let dx = i as f64 - x_mean;
                    num += dx * (v - mean);
                    den += dx * dx;
                }
                num / den
            }
        }
    }
}

impl std::fmt::Display for Aggregation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rolling window configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TemporalConfig {
    /// Window size in samples
    pub window: usize,
    pub aggregations: Vec<Aggregation>,
}

impl Default for TemporalConfig {
    fn default() -> Self {
        Self {
            // one second at 200 ms per sample
            window: 1000 / 200,
            aggregations: vec![Aggregation::Mean, Aggregation::Std],
        }
    }
}

/// `{column}_temp_{aggregation}_ws_{window}`
pub fn temporal_column_name(column: &str, aggregation: Aggregation, window: usize) -> String {
    format!("{}_temp_{}_ws_{}", column, aggregation, window)
}

/// Return a copy of `table` with one rolling aggregate column per input column and aggregation
pub fn add_temporal_features<S: AsRef<str>>(
    table: &SensorTable,
    columns: &[S],
    config: &TemporalConfig,
) -> Result<SensorTable, FeatureError> {
    if config.window == 0 {
        return Err(FeatureError::InvalidParameter("temporal window must be at least 1".to_string()));
    }
    if config.aggregations.is_empty() {
        return Err(FeatureError::InvalidParameter("no temporal aggregations configured".to_string()));
    }
    if config.window < 2 && config.aggregations.contains(&Aggregation::Std) {
        return Err(FeatureError::InvalidParameter(
            "std aggregation needs a temporal window of at least 2".to_string(),
        ));
    }
    table.require_columns(columns)?;

    let groups = table.set_groups();
    let mut out = table.clone();
    let ws = config.window;

    for name in columns {
        let name = name.as_ref();
        let values = table.column(name)?;
        let mut outputs = vec![vec![f64::NAN; table.len()]; config.aggregations.len()];

        for group in &groups {
            let series: Vec<f64> = group.rows.iter().map(|&r| values[r]).collect();
            if series.len() < ws {
                debug!("Set {} has {} rows, shorter than window {}", group.set, series.len(), ws);
                continue;
            }

            for (end, window) in series.windows(ws).enumerate() {
                if window.iter().any(|v| v.is_nan()) {
                    continue;
                }
                let row = group.rows[end + ws - 1];
                for (agg, output) in config.aggregations.iter().zip(outputs.iter_mut()) {
                    output[row] = agg.compute(window);
                }
            }
        }

        for (agg, output) in config.aggregations.iter().zip(outputs) {
            out.insert_column(temporal_column_name(name, *agg, ws), output)?;
        }
    }

    info!(
        "Added {} temporal columns (window {})",
        columns.len() * config.aggregations.len(),
        ws
    );
    Ok(out)
}
