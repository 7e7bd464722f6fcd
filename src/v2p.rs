//! Remapping of (T, V) fields onto a (T, P) grid.

use crate::error::{QhaError, Result};
use crate::tools::{find_nearest, lagrange4, row_to_vec};
use nalgebra::DMatrix;
use rayon::prelude::*;

/// Append the point four positions in at both ends of a row.
fn pad(row: &[f64]) -> Vec<f64> {
    let n = row.len();
    let mut padded = Vec::with_capacity(n + 2);
    padded.push(row[3]);
    padded.extend_from_slice(row);
    padded.push(row[n - 4]);
    padded
}

/// Evaluate `field` (T × V) at `desired_pressures` for every temperature.
///
/// `pressures` is the companion P(T, V); each row must increase along the
/// volume axis. The result is T × desired pressures, obtained from a
/// four-point Lagrange interpolant around the bracketing pressures.
pub fn v2p(
    field: &DMatrix<f64>,
    pressures: &DMatrix<f64>,
    desired_pressures: &[f64],
) -> Result<DMatrix<f64>> {
    if field.shape() != pressures.shape() {
        return Err(QhaError::shape(
            format!("{:?} pressures", field.shape()),
            format!("{:?} pressures", pressures.shape()),
        ));
    }
    if field.ncols() < 4 {
        return Err(QhaError::InvalidInput(format!(
            "at least 4 volumes are needed to interpolate onto pressures, got {}",
            field.ncols()
        )));
    }

    let rows: Vec<Vec<f64>> = (0..field.nrows())
        .into_par_iter()
        .map(|i| {
            let f = pad(&row_to_vec(field, i));
            let p = pad(&row_to_vec(pressures, i));
            let last_window = p.len() - 3;
            desired_pressures
                .iter()
                .map(|&target| {
                    let k = find_nearest(&p, target).clamp(1, last_window);
                    lagrange4(target, &p[k - 1..k + 3], &f[k - 1..k + 3])
                })
                .collect()
        })
        .collect();

    Ok(DMatrix::from_fn(field.nrows(), desired_pressures.len(), |i, j| rows[i][j]))
}
