//! Missing Value Imputation

use crate::CleaningError;
use sensor_table::SensorTable;
use tracing::{debug, info, warn};

/// Fill missing values by linear interpolation over row position.
///
/// Gaps before the first or after the last known value take that value.
/// A slice with no known values is returned unchanged.
pub fn interpolate_linear(values: &[f64]) -> Vec<f64> {
    let known: Vec<usize> = values
        .iter()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .map(|(i, _)| i)
        .collect();

    let (first, last) = match (known.first(), known.last()) {
        (Some(&first), Some(&last)) => (first, last),
        _ => return values.to_vec(),
    };

    let mut filled = values.to_vec();
    for v in filled.iter_mut().take(first) {
        *v = values[first];
    }
    for v in filled.iter_mut().skip(last + 1) {
        *v = values[last];
    }

    for pair in known.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a < 2 {
            continue;
        }
        let (va, vb) = (values[a], values[b]);
        let span = (b - a) as f64;
        for i in (a + 1)..b {
            filled[i] = va + (vb - va) * (i - a) as f64 / span;
        }
    }

    filled
}

/// Return a copy of `table` with the given columns interpolated.
///
/// Columns outside `columns` are left untouched.
pub fn impute<S: AsRef<str>>(table: &SensorTable, columns: &[S]) -> Result<SensorTable, CleaningError> {
    table.require_columns(columns)?;

    let mut imputed = table.clone();
    let mut total_filled = 0;

    for name in columns {
        let name = name.as_ref();
        let values = table.column(name)?;
        let missing = values.iter().filter(|v| v.is_nan()).count();

        if missing == 0 {
            continue;
        }
        if missing == values.len() {
            warn!("Column {} has no known values, leaving it unfilled", name);
            continue;
        }

        debug!("Interpolating {} missing values in {}", missing, name);
        imputed.insert_column(name, interpolate_linear(values))?;
        total_filled += missing;
    }

    info!(
        "Imputed {} missing values across {} columns",
        total_filled,
        columns.len()
    );
    Ok(imputed)
}
