//! FFT-based Frequency Abstraction
//!
//! For every row, the last `window` samples of its set are transformed and
//! summarised by the dominant frequency, the amplitude-weighted mean
//! frequency, the power spectral entropy and the amplitude of every bin.

use crate::FeatureError;
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use sensor_table::SensorTable;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Window and sampling parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FrequencyConfig {
    /// Sampling frequency (Hz)
    pub sampling_hz: f64,
    /// Window size in samples
    pub window: usize,
}

impl Default for FrequencyConfig {
    fn default() -> Self {
        Self {
            sampling_hz: 1000.0 / 200.0,
            // 2.8 s at 200 ms per sample
            window: 2800 / 200,
        }
    }
}

/// Spectral summary of one window
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpectralFeatures {
    /// Amplitude per non-negative frequency bin
    pub amplitudes: Vec<f64>,
    /// Frequency of the largest amplitude (Hz)
    pub max_freq: f64,
    /// Amplitude-weighted mean frequency (Hz)
    pub freq_weighted: f64,
    /// Power spectral entropy
    pub pse: f64,
}

/// Fixed-size forward FFT planned once and reused for every window
pub struct FourierAnalyzer {
    fft: Arc<dyn Fft<f64>>,
    window: usize,
    /// Bin frequencies `k * fs / window` for `k = 0..=window / 2`
    frequencies: Vec<f64>,
}

impl FourierAnalyzer {
    pub fn new(config: FrequencyConfig) -> Result<Self, FeatureError> {
        if config.window < 2 {
            return Err(FeatureError::InvalidParameter(format!(
                "frequency window must be at least 2, got {}",
                config.window
            )));
        }
        if !(config.sampling_hz.is_finite() && config.sampling_hz > 0.0) {
            return Err(FeatureError::InvalidParameter(format!(
                "sampling frequency must be positive, got {}",
                config.sampling_hz
            )));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(config.window);
        let frequencies = (0..=config.window / 2)
            .map(|k| k as f64 * config.sampling_hz / config.window as f64)
            .collect();

        Ok(Self {
            fft,
            window: config.window,
            frequencies,
        })
    }

    pub fn frequencies(&self) -> &[f64] {
        &self.frequencies
    }

    /// Transform one window of exactly `window` samples
    pub fn analyze(&self, signal: &[f64]) -> Result<SpectralFeatures, FeatureError> {
        if signal.len() != self.window {
            return Err(FeatureError::InvalidParameter(format!(
                "expected {} samples, got {}",
                self.window,
                signal.len()
            )));
        }

        let mut buffer: Vec<Complex<f64>> = signal.iter().map(|&v| Complex::new(v, 0.0)).collect();
        self.fft.process(&mut buffer);

        let amplitudes: Vec<f64> = buffer
            .iter()
            .take(self.frequencies.len())
            .map(|c| c.norm())
            .collect();

        let mut max_idx = 0;
        for (i, &a) in amplitudes.iter().enumerate() {
            if a > amplitudes[max_idx] {
                max_idx = i;
            }
        }

        let total_amplitude: f64 = amplitudes.iter().sum();
        let freq_weighted = if total_amplitude > 0.0 {
            self.frequencies
                .iter()
                .zip(&amplitudes)
                .map(|(f, a)| f * a)
                .sum::<f64>()
                / total_amplitude
        } else {
            0.0
        };

        // Normalised power spectral density
        let psd: Vec<f64> = amplitudes
            .iter()
            .map(|a| a * a / self.window as f64)
            .collect();
        let total_power: f64 = psd.iter().sum();
        let pse = if total_power > 0.0 {
            -psd.iter()
                .map(|p| p / total_power)
                .filter(|p| *p > 0.0)
                .map(|p| p * p.ln())
                .sum::<f64>()
        } else {
            0.0
        };

        Ok(SpectralFeatures {
            max_freq: self.frequencies[max_idx],
            freq_weighted,
            pse,
            amplitudes,
        })
    }
}

/// Round to three decimals and always print a fractional part (`0.0`, `0.357`, `2.5`)
pub fn format_frequency(freq: f64) -> String {
    let rounded = (freq * 1000.0).round() / 1000.0;
    let text = format!("{}", rounded);
    if text.contains('.') {
        text
    } else {
        format!("{}.0", text)
    }
}

/// Return a copy of `table` with the frequency features of every input column.
///
/// Columns per input: `{col}_max_freq`, `{col}_freq_weighted`, `{col}_pse`,
/// then `{col}_freq_{f}_Hz_ws_{window}` for every bin.
pub fn add_frequency_features<S: AsRef<str>>(
    table: &SensorTable,
    columns: &[S],
    config: FrequencyConfig,
) -> Result<SensorTable, FeatureError> {
    table.require_columns(columns)?;
    let analyzer = FourierAnalyzer::new(config)?;
    let ws = config.window;
    let bins = analyzer.frequencies().len();

    let groups = table.set_groups();
    let mut out = table.clone();

    for name in columns {
        let name = name.as_ref();
        let values = table.column(name)?;

        let mut max_freq = vec![f64::NAN; table.len()];
        let mut freq_weighted = vec![f64::NAN; table.len()];
        let mut pse = vec![f64::NAN; table.len()];
        let mut amplitudes = vec![vec![f64::NAN; table.len()]; bins];

        for group in &groups {
            let series: Vec<f64> = group.rows.iter().map(|&r| values[r]).collect();
            if series.len() < ws {
                debug!("Set {} has {} rows, shorter than window {}", group.set, series.len(), ws);
                continue;
            }

            for (start, window) in series.windows(ws).enumerate() {
                if window.iter().any(|v| v.is_nan()) {
                    continue;
                }
                let row = group.rows[start + ws - 1];
                let features = analyzer.analyze(window)?;

                max_freq[row] = features.max_freq;
                freq_weighted[row] = features.freq_weighted;
                pse[row] = features.pse;
                for (bin, amplitude) in features.amplitudes.into_iter().enumerate() {
                    amplitudes[bin][row] = amplitude;
                }
            }
        }

        out.insert_column(format!("{}_max_freq", name), max_freq)?;
        out.insert_column(format!("{}_freq_weighted", name), freq_weighted)?;
        out.insert_column(format!("{}_pse", name), pse)?;
        for (freq, column) in analyzer.frequencies().iter().zip(amplitudes) {
            out.insert_column(
                format!("{}_freq_{}_Hz_ws_{}", name, format_frequency(*freq), ws),
                column,
            )?;
        }
    }

    info!(
        "Added {} frequency columns (window {}, fs {} Hz)",
        columns.len() * (bins + 3),
        ws,
        config.sampling_hz
    );
    Ok(out)
}
