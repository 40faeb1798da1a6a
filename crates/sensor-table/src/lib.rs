//! Sensor Table
//!
//! Column-oriented in-memory table of timestamped accelerometer/gyroscope
//! samples, with CSV loading and versioned binary snapshots.

mod error;
mod loader;
mod snapshot;
mod table;

pub use error::TableError;
pub use loader::{read_csv, read_csv_from};
pub use snapshot::{load_snapshot, save_snapshot, SNAPSHOT_VERSION};
pub use table::{NumericColumn, SensorTable, SetGroup};

/// Default sensor channels (3 accelerometer + 3 gyroscope axes)
pub const SENSOR_COLUMNS: [&str; 6] = ["acc_x", "acc_y", "acc_z", "gyr_x", "gyr_y", "gyr_z"];

/// Categorical columns that are never used as predictors
pub const CATEGORICAL_COLUMNS: [&str; 4] = ["set", "category", "label", "participant"];
