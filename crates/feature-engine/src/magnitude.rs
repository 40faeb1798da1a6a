//! Vector Magnitude Features

use crate::FeatureError;
use sensor_table::SensorTable;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Axes combined into one Euclidean magnitude column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MagnitudeGroup {
    /// Output column name
    pub name: String,
    /// Input axis columns
    pub axes: Vec<String>,
}

impl MagnitudeGroup {
    pub fn new(name: &str, axes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            axes: axes.iter().map(|a| a.to_string()).collect(),
        }
    }

    /// `acc_r` and `gyr_r` from the accelerometer and gyroscope axes
    pub fn defaults() -> Vec<MagnitudeGroup> {
        vec![
            Self::new("acc_r", &["acc_x", "acc_y", "acc_z"]),
            Self::new("gyr_r", &["gyr_x", "gyr_y", "gyr_z"]),
        ]
    }
}

/// Return a copy of `table` with one `sqrt(x² + y² + z²)` column per group
pub fn add_magnitudes(table: &SensorTable, groups: &[MagnitudeGroup]) -> Result<SensorTable, FeatureError> {
    let mut out = table.clone();

    for group in groups {
        if group.axes.is_empty() {
            return Err(FeatureError::InvalidParameter(format!(
                "magnitude group {} has no axes",
                group.name
            )));
        }

        let axes = group
            .axes
            .iter()
            .map(|a| table.column(a))
            .collect::<Result<Vec<_>, _>>()?;

        let magnitude: Vec<f64> = (0..table.len())
            .map(|row| axes.iter().map(|axis| axis[row] * axis[row]).sum::<f64>().sqrt())
            .collect();

        out.insert_column(group.name.clone(), magnitude)?;
    }

    info!("Added {} magnitude columns", groups.len());
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::synthetic_table;

    #[test]
    fn test_magnitude_values() {
        let table = synthetic_table(1, 10);
        let out = add_magnitudes(&table, &MagnitudeGroup::defaults()).unwrap();

        let (x, y, z) = (
            table.column("acc_x").unwrap(),
            table.column("acc_y").unwrap(),
            table.column("acc_z").unwrap(),
        );
        let r = out.column("acc_r").unwrap();
        for i in 0..table.len() {
            let expected = (x[i] * x[i] + y[i] * y[i] + z[i] * z[i]).sqrt();
            assert!((r[i] - expected).abs() < 1e-12);
        }
        assert!(out.has_column("gyr_r"));
    }

    #[test]
    fn test_missing_axis() {
        let table = synthetic_table(1, 4);
        let groups = vec![MagnitudeGroup::new("mag_r", &["mag_x"])];
        assert!(matches!(add_magnitudes(&table, &groups), Err(FeatureError::Table(_))));
    }
}
