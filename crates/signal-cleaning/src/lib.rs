//! Signal Cleaning
//!
//! Prepares raw sensor tables for feature extraction: fills missing samples,
//! annotates set durations and suppresses high-frequency noise.

mod duration;
mod error;
mod imputer;
mod lowpass;

pub use duration::{annotate_durations, rep_durations, set_durations, CategoryDuration, SetDuration};
pub use error::CleaningError;
pub use imputer::{impute, interpolate_linear};
pub use lowpass::{apply_lowpass, ButterworthLowPass, LowPassConfig};

/// Name of the per-set duration column
pub const DURATION_COLUMN: &str = "duration";
