//! Small numerical helpers shared across the pipeline.

use crate::error::{QhaError, Result};
use nalgebra::DMatrix;

/// `num` evenly spaced values starting at `start`.
pub fn arange(start: f64, num: usize, step: f64) -> Vec<f64> {
    (0..num).map(|n| start + step * n as f64).collect()
}

/// True when no element is larger than the one before it.
pub fn is_monotonic_decreasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[1] - w[0] <= 0.0)
}

pub fn is_monotonic_increasing(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[1] - w[0] >= 0.0)
}

/// Index `j` with `values[j] <= value < values[j + 1]` on an increasing slice.
///
/// Out-of-range lookups are clamped to the first or last interval, so the
/// result always lies in `0..=len - 2`. The slice needs at least two elements.
pub fn find_nearest(values: &[f64], value: f64) -> usize {
    let n = values.len();
    if value <= values[0] {
        return 0;
    }
    if value >= values[n - 1] {
        return n - 2;
    }
    let (mut low, mut high) = (0, n - 1);
    while high - low > 1 {
        let mid = (low + high) / 2;
        if value >= values[mid] {
            low = mid;
        } else {
            high = mid;
        }
    }
    low
}

/// Second-order Lagrange interpolant through three points.
pub fn lagrange3(xs: [f64; 3], ys: [f64; 3]) -> Result<impl Fn(f64) -> f64> {
    let [x0, x1, x2] = xs;
    if x0 == x1 || x0 == x2 || x1 == x2 {
        return Err(QhaError::InvalidInput(
            "interpolation nodes must be distinct".to_string(),
        ));
    }
    let [y0, y1, y2] = ys;
    Ok(move |x: f64| {
        (x - x1) * (x - x2) / (x0 - x1) / (x0 - x2) * y0
            + (x - x0) * (x - x2) / (x1 - x0) / (x1 - x2) * y1
            + (x - x0) * (x - x1) / (x2 - x0) / (x2 - x1) * y2
    })
}

/// Third-order Lagrange polynomial through four points, evaluated at `x`.
pub fn lagrange4(x: f64, xs: &[f64], ys: &[f64]) -> f64 {
    let (x0, x1, x2, x3) = (xs[0], xs[1], xs[2], xs[3]);
    let (y0, y1, y2, y3) = (ys[0], ys[1], ys[2], ys[3]);
    (x - x1) * (x - x2) * (x - x3) / (x0 - x1) / (x0 - x2) / (x0 - x3) * y0
        + (x - x0) * (x - x2) * (x - x3) / (x1 - x0) / (x1 - x2) / (x1 - x3) * y1
        + (x - x0) * (x - x1) * (x - x3) / (x2 - x0) / (x2 - x1) / (x2 - x3) * y2
        + (x - x0) * (x - x1) * (x - x2) / (x3 - x0) / (x3 - x1) / (x3 - x2) * y3
}

/// Finite differences with unit spacing: central inside, one-sided at the ends.
pub fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    if n < 2 {
        return vec![0.0; n];
    }
    (0..n)
        .map(|i| match i {
            0 => values[1] - values[0],
            i if i == n - 1 => values[n - 1] - values[n - 2],
            i => (values[i + 1] - values[i - 1]) / 2.0,
        })
        .collect()
}

/// df/dx as gradient(f) / gradient(x).
pub fn derivative(f: &[f64], x: &[f64]) -> Vec<f64> {
    gradient(f)
        .into_iter()
        .zip(gradient(x))
        .map(|(df, dx)| df / dx)
        .collect()
}

/// Direction of differentiation on a matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    /// Down each column, i.e. along the row index (temperature).
    Rows,
    /// Along each row, i.e. along the column index (volume or pressure).
    Columns,
}

/// Derivative of every line of `f` along `axis` with respect to `x`.
pub fn matrix_derivative(f: &DMatrix<f64>, x: &[f64], axis: Axis) -> DMatrix<f64> {
    let mut result = DMatrix::zeros(f.nrows(), f.ncols());
    match axis {
        Axis::Rows => {
            for j in 0..f.ncols() {
                let column: Vec<f64> = f.column(j).iter().copied().collect();
                for (i, d) in derivative(&column, x).into_iter().enumerate() {
                    result[(i, j)] = d;
                }
            }
        }
        Axis::Columns => {
            for i in 0..f.nrows() {
                let row = row_to_vec(f, i);
                for (j, d) in derivative(&row, x).into_iter().enumerate() {
                    result[(i, j)] = d;
                }
            }
        }
    }
    result
}

pub fn row_to_vec(matrix: &DMatrix<f64>, i: usize) -> Vec<f64> {
    matrix.row(i).iter().copied().collect()
}

/// Stack equally long rows into a matrix.
pub fn matrix_from_rows(rows: &[Vec<f64>]) -> Result<DMatrix<f64>> {
    let ncols = rows.first().map_or(0, Vec::len);
    if let Some(bad) = rows.iter().find(|r| r.len() != ncols) {
        return Err(QhaError::shape(
            format!("rows of length {ncols}"),
            format!("a row of length {}", bad.len()),
        ));
    }
    Ok(DMatrix::from_fn(rows.len(), ncols, |i, j| rows[i][j]))
}
