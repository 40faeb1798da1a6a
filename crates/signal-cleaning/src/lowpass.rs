//! Zero-Phase Butterworth Low-Pass Filter
//!
//! The filter is designed as a cascade of second-order sections using the
//! bilinear transform with frequency pre-warping, then run forward and
//! backward over the whole column so no phase shift is introduced.

use crate::CleaningError;
use sensor_table::SensorTable;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, info};

/// Low-pass filter parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LowPassConfig {
    /// Sampling frequency (Hz)
    pub sampling_hz: f64,
    /// Cutoff frequency (Hz)
    pub cutoff_hz: f64,
    /// Filter order
    pub order: usize,
}

impl Default for LowPassConfig {
    fn default() -> Self {
        Self {
            // one sample every 200 ms
            sampling_hz: 1000.0 / 200.0,
            cutoff_hz: 1.3,
            order: 5,
        }
    }
}

/// Second-order section in transposed direct form II (`a[0]` is normalised to 1)
#[derive(Debug, Clone, Copy)]
struct Section {
    b: [f64; 3],
    a: [f64; 3],
}

impl Section {
    fn dc_gain(&self) -> f64 {
        (self.b[0] + self.b[1] + self.b[2]) / (1.0 + self.a[1] + self.a[2])
    }

    /// Filter in place, starting from the steady state for the first sample
    fn run(&self, signal: &mut [f64]) {
        let Some(&x0) = signal.first() else {
            return;
        };
        let [b0, b1, b2] = self.b;
        let [_, a1, a2] = self.a;
        let gain = self.dc_gain();

        let mut z1 = (gain - b0) * x0;
        let mut z2 = (b2 - a2 * gain) * x0;

        for x in signal.iter_mut() {
            let input = *x;
            let y = b0 * input + z1;
            z1 = b1 * input - a1 * y + z2;
            z2 = b2 * input - a2 * y;
            *x = y;
        }
    }
}

/// Butterworth low-pass filter of arbitrary order
#[derive(Debug, Clone)]
pub struct ButterworthLowPass {
    sections: Vec<Section>,
}

impl ButterworthLowPass {
    /// Design the filter
    pub fn new(config: LowPassConfig) -> Result<Self, CleaningError> {
        let LowPassConfig {
            sampling_hz,
            cutoff_hz,
            order,
        } = config;

        if order == 0 {
            return Err(CleaningError::InvalidFilter("order must be at least 1".to_string()));
        }
        if !(sampling_hz.is_finite() && sampling_hz > 0.0) {
            return Err(CleaningError::InvalidFilter(format!(
                "sampling frequency must be positive, got {}",
                sampling_hz
            )));
        }
        let nyquist = sampling_hz / 2.0;
        if !(cutoff_hz > 0.0 && cutoff_hz < nyquist) {
            return Err(CleaningError::InvalidFilter(format!(
                "cutoff {} Hz must lie in (0, {}) Hz",
                cutoff_hz, nyquist
            )));
        }

        // Pre-warped analog cutoff
        let k = (PI * cutoff_hz / sampling_hz).tan();
        let k2 = k * k;
        let mut sections = Vec::with_capacity(order.div_ceil(2));

        // Conjugate pole pairs, angle measured from the negative real axis
        for pair in 0..order / 2 {
            let psi = PI * (order - 1 - 2 * pair) as f64 / (2 * order) as f64;
            let q = 1.0 / (2.0 * psi.cos());
            let norm = 1.0 / (1.0 + k / q + k2);
            let b0 = k2 * norm;
            sections.push(Section {
                b: [b0, 2.0 * b0, b0],
                a: [1.0, 2.0 * (k2 - 1.0) * norm, (1.0 - k / q + k2) * norm],
            });
        }

        // Real pole for odd orders
        if order % 2 == 1 {
            let norm = 1.0 / (1.0 + k);
            sections.push(Section {
                b: [k * norm, k * norm, 0.0],
                a: [1.0, (k - 1.0) * norm, 0.0],
            });
        }

        debug!(
            "Designed order-{} Butterworth low-pass: cutoff={} Hz, fs={} Hz, {} sections",
            order,
            cutoff_hz,
            sampling_hz,
            sections.len()
        );
        Ok(Self { sections })
    }

    /// Causal single pass through all sections
    pub fn filter_forward(&self, signal: &[f64]) -> Vec<f64> {
        let mut out = signal.to_vec();
        self.run_cascade(&mut out);
        out
    }

    /// Zero-phase forward-backward filtering with odd-reflection padding
    pub fn filtfilt(&self, signal: &[f64]) -> Vec<f64> {
        let n = signal.len();
        if n < 2 {
            return signal.to_vec();
        }

        let pad = (3 * (2 * self.sections.len() + 1)).min(n - 1);
        let (first, last) = (signal[0], signal[n - 1]);

        let mut extended = Vec::with_capacity(n + 2 * pad);
        extended.extend((1..=pad).rev().map(|i| 2.0 * first - signal[i]));
        extended.extend_from_slice(signal);
        extended.extend((1..=pad).map(|i| 2.0 * last - signal[n - 1 - i]));

        self.run_cascade(&mut extended);
        extended.reverse();
        self.run_cascade(&mut extended);
        extended.reverse();

        extended[pad..pad + n].to_vec()
    }

    fn run_cascade(&self, signal: &mut [f64]) {
        for section in &self.sections {
            section.run(signal);
        }
    }
}

/// Return a copy of `table` with each column replaced by its low-pass filtered version.
///
/// Each column is filtered as one continuous sequence; set boundaries are ignored.
pub fn apply_lowpass<S: AsRef<str>>(
    table: &SensorTable,
    columns: &[S],
    config: LowPassConfig,
) -> Result<SensorTable, CleaningError> {
    table.require_columns(columns)?;
    let filter = ButterworthLowPass::new(config)?;

    let mut filtered = table.clone();
    for name in columns {
        let name = name.as_ref();
        let values = table.column(name)?;

        let count = values.iter().filter(|v| v.is_nan()).count();
        if count > 0 {
            return Err(CleaningError::MissingValues {
                column: name.to_string(),
                count,
            });
        }

        filtered.insert_column(name, filter.filtfilt(values))?;
    }

    info!(
        "Applied low-pass filter (order={}, cutoff={} Hz) to {} columns",
        config.order,
        config.cutoff_hz,
        columns.len()
    );
    Ok(filtered)
}
