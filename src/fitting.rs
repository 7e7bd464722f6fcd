//! Least-squares polynomial fitting in Eulerian strain.
//!
//! The finite-strain (Birch--Murnaghan) equation of state used here is a
//! polynomial of order 3, 4 or 5 in strain. Fits are ordinary least squares
//! on an increasing-power Vandermonde matrix, solved through a QR
//! factorisation.

use crate::error::{QhaError, Result};
use crate::strain::StrainTransform;
use nalgebra::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order of the finite-strain equation of state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum EosOrder {
    #[default]
    Third,
    Fourth,
    Fifth,
}

impl EosOrder {
    pub fn degree(self) -> usize {
        match self {
            EosOrder::Third => 3,
            EosOrder::Fourth => 4,
            EosOrder::Fifth => 5,
        }
    }
}

impl TryFrom<u8> for EosOrder {
    type Error = QhaError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            3 => Ok(EosOrder::Third),
            4 => Ok(EosOrder::Fourth),
            5 => Ok(EosOrder::Fifth),
            other => Err(QhaError::InvalidInput(format!(
                "equation of state order must be 3, 4 or 5, got {}",
                other
            ))),
        }
    }
}

impl From<EosOrder> for u8 {
    fn from(order: EosOrder) -> u8 {
        order.degree() as u8
    }
}

impl fmt::Display for EosOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.degree())
    }
}

/// Coefficients of a least-squares polynomial, lowest power first.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialFit {
    coefficients: DVector<f64>,
}

impl PolynomialFit {
    pub fn fit(x: &[f64], y: &[f64], degree: usize) -> Result<Self> {
        if x.len() != y.len() {
            return Err(QhaError::shape(
                format!("{} ordinates", x.len()),
                format!("{} ordinates", y.len()),
            ));
        }
        let columns = degree + 1;
        if x.len() < columns {
            return Err(QhaError::InvalidInput(format!(
                "a degree {} fit needs at least {} points, got {}",
                degree,
                columns,
                x.len()
            )));
        }

        let mut distinct = x.to_vec();
        distinct.sort_by(f64::total_cmp);
        distinct.dedup();
        if distinct.len() < columns {
            return Err(QhaError::SingularFit(format!(
                "a degree {} fit needs {} distinct strains, got {}",
                degree,
                columns,
                distinct.len()
            )));
        }

        let design = DMatrix::from_fn(x.len(), columns, |i, j| x[i].powi(j as i32));
        let rhs = DVector::from_column_slice(y);

        let qr = design.qr();
        let qty = qr.q().transpose() * rhs;
        let coefficients = qr
            .r()
            .solve_upper_triangular(&qty)
            .ok_or_else(|| QhaError::SingularFit("design matrix is rank deficient".to_string()))?;

        if coefficients.iter().any(|c| !c.is_finite()) {
            return Err(QhaError::SingularFit(
                "non-finite coefficients, are some strains duplicated?".to_string(),
            ));
        }

        Ok(PolynomialFit { coefficients })
    }

    pub fn coefficients(&self) -> &[f64] {
        self.coefficients.as_slice()
    }

    pub fn degree(&self) -> usize {
        self.coefficients.len() - 1
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |acc, &c| acc * x + c)
    }

    pub fn evaluate_many(&self, xs: &[f64]) -> Vec<f64> {
        xs.iter().map(|&x| self.evaluate(x)).collect()
    }
}

/// Fit `y(x)` with a polynomial of `degree` and evaluate it on `new_x`.
pub fn polynomial_least_square_fitting(
    x: &[f64],
    y: &[f64],
    new_x: &[f64],
    degree: usize,
) -> Result<(PolynomialFit, Vec<f64>)> {
    let fit = PolynomialFit::fit(x, y, degree)?;
    let new_y = fit.evaluate_many(new_x);
    Ok((fit, new_y))
}

/// A finite-strain equation of state F(f) = A + Bf + Cf² + Df³ + Ef⁴ + Gf⁵.
///
/// Terms above the configured order are identically zero.
#[derive(Debug, Clone, PartialEq)]
pub struct EosFit {
    order: EosOrder,
    coefficients: [f64; 6],
}

impl EosFit {
    pub fn fit(strains: &[f64], free_energies: &[f64], order: EosOrder) -> Result<Self> {
        let polynomial = PolynomialFit::fit(strains, free_energies, order.degree())?;
        let mut coefficients = [0.0; 6];
        coefficients[..polynomial.coefficients().len()].copy_from_slice(polynomial.coefficients());
        Ok(EosFit {
            order,
            coefficients,
        })
    }

    pub fn order(&self) -> EosOrder {
        self.order
    }

    pub fn coefficients(&self) -> &[f64; 6] {
        &self.coefficients
    }

    pub fn evaluate(&self, strain: f64) -> f64 {
        self.coefficients
            .iter()
            .rev()
            .fold(0.0, |acc, &c| acc * strain + c)
    }

    pub fn evaluate_many(&self, strains: &[f64]) -> Vec<f64> {
        strains.iter().map(|&f| self.evaluate(f)).collect()
    }
}

/// Fit every temperature row of `free_energies` (T × sparse V) in strain and
/// evaluate it on `dense_strains`, giving a T × dense V matrix.
pub fn birch_murnaghan_finite_strain_fitting(
    sparse_strains: &[f64],
    free_energies: &DMatrix<f64>,
    dense_strains: &[f64],
    order: EosOrder,
) -> Result<DMatrix<f64>> {
    if free_energies.ncols() != sparse_strains.len() {
        return Err(QhaError::shape(
            format!("{} volumes per temperature", sparse_strains.len()),
            format!("{} volumes per temperature", free_energies.ncols()),
        ));
    }

    let rows = (0..free_energies.nrows())
        .into_par_iter()
        .map(|i| {
            let row: Vec<f64> = free_energies.row(i).iter().copied().collect();
            let fit = EosFit::fit(sparse_strains, &row, order)?;
            Ok(fit.evaluate_many(dense_strains))
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(DMatrix::from_fn(rows.len(), dense_strains.len(), |i, j| {
        rows[i][j]
    }))
}

/// Bring the energies of every configuration (rows) onto the volumes of the
/// first configuration.
///
/// Independent calculations rarely share exactly the same volumes, so each
/// configuration is fitted in its own strain coordinate and re-evaluated at the
/// reference volumes.
pub fn calibrate_energy_on_reference(
    volumes: &DMatrix<f64>,
    energies: &DMatrix<f64>,
    order: EosOrder,
) -> Result<DMatrix<f64>> {
    if volumes.shape() != energies.shape() {
        return Err(QhaError::shape(
            format!("{:?} energies", volumes.shape()),
            format!("{:?} energies", energies.shape()),
        ));
    }
    if volumes.nrows() == 0 || volumes.ncols() == 0 {
        return Err(QhaError::InvalidInput(
            "no configurations to calibrate".to_string(),
        ));
    }

    let reference_volumes: Vec<f64> = volumes.row(0).iter().copied().collect();
    let mut calibrated = DMatrix::zeros(volumes.nrows(), volumes.ncols());

    for i in 0..volumes.nrows() {
        let own_volumes: Vec<f64> = volumes.row(i).iter().copied().collect();
        let own_energies: Vec<f64> = energies.row(i).iter().copied().collect();
        if same_volumes(&own_volumes, &reference_volumes) {
            calibrated.row_mut(i).copy_from(&energies.row(i));
            continue;
        }
        let transform = StrainTransform::new(own_volumes[0]);
        let strains_before = transform.strains(&own_volumes);
        let strains_after = transform.strains(&reference_volumes);
        let (_, values) = polynomial_least_square_fitting(
            &strains_before,
            &own_energies,
            &strains_after,
            order.degree(),
        )?;
        for (j, value) in values.into_iter().enumerate() {
            calibrated[(i, j)] = value;
        }
    }

    Ok(calibrated)
}

fn same_volumes(a: &[f64], b: &[f64]) -> bool {
    a.iter()
        .zip(b)
        .all(|(x, y)| (x - y).abs() <= 1e-12 * x.abs().max(y.abs()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn cubic(x: f64) -> f64 {
        -10.0 + 0.5 * x + 30.0 * x * x - 120.0 * x * x * x
    }

    #[test]
    fn test_fit_passes_through_minimal_points() {
        let x = [-0.02, 0.0, 0.015, 0.04];
        let y = [-9.1, -10.0, -9.8, -9.5];
        let (_, fitted) = polynomial_least_square_fitting(&x, &y, &x, 3).unwrap();
        for (a, b) in fitted.iter().zip(y.iter()) {
            assert_relative_eq!(a, b, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_fit_recovers_exact_polynomial() {
        let x: Vec<f64> = (0..9).map(|i| -0.03 + 0.01 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&v| cubic(v)).collect();
        let fit = PolynomialFit::fit(&x, &y, 3).unwrap();
        let expected = [-10.0, 0.5, 30.0, -120.0];
        for (c, e) in fit.coefficients().iter().zip(expected.iter()) {
            assert_relative_eq!(c, e, epsilon = 1e-6, max_relative = 1e-6);
        }
        assert_relative_eq!(fit.evaluate(0.123), cubic(0.123), epsilon = 1e-8);
    }

    #[test]
    fn test_too_few_points() {
        let x = [0.0, 0.1, 0.2];
        let y = [1.0, 2.0, 3.0];
        assert!(matches!(
            PolynomialFit::fit(&x, &y, 3),
            Err(QhaError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_repeated_strains_are_singular() {
        let x = [0.0, 0.1, 0.1, 0.2, 0.2, 0.0];
        let y = [1.0, 2.0, 2.1, 3.0, 3.2, 0.9];
        assert!(matches!(
            PolynomialFit::fit(&x, &y, 3),
            Err(QhaError::SingularFit(_))
        ));
        assert!(matches!(
            EosFit::fit(&[0.05; 5], &[1.0; 5], EosOrder::Third),
            Err(QhaError::SingularFit(_))
        ));
        assert!(PolynomialFit::fit(&x, &y, 2).is_ok());
    }

    #[test]
    fn test_mismatched_lengths() {
        assert!(matches!(
            PolynomialFit::fit(&[0.0, 0.1], &[1.0], 1),
            Err(QhaError::Shape { .. })
        ));
    }

    #[test]
    fn test_eos_order_limits_terms() {
        let x: Vec<f64> = (0..8).map(|i| -0.2 + 0.1 * i as f64).collect();
        let y: Vec<f64> = x.iter().map(|&v| cubic(v) + 500.0 * v.powi(5)).collect();

        let third = EosFit::fit(&x, &y, EosOrder::Third).unwrap();
        assert_eq!(third.coefficients()[4], 0.0);
        assert_eq!(third.coefficients()[5], 0.0);

        let fifth = EosFit::fit(&x, &y, EosOrder::Fifth).unwrap();
        assert_relative_eq!(fifth.coefficients()[5], 500.0, max_relative = 1e-5);
        assert_relative_eq!(fifth.evaluate(x[3]), y[3], epsilon = 1e-9);
    }

    #[test]
    fn test_eos_order_parsing() {
        assert_eq!(EosOrder::try_from(4).unwrap(), EosOrder::Fourth);
        assert!(EosOrder::try_from(2).is_err());
        assert!(EosOrder::try_from(6).is_err());
        let order: EosOrder = serde_yml::from_str("5").unwrap();
        assert_eq!(order, EosOrder::Fifth);
        assert!(serde_yml::from_str::<EosOrder>("7").is_err());
    }

    #[test]
    fn test_row_wise_fitting() {
        let strains = [0.0, 0.01, 0.02, 0.03, 0.04];
        let energies = DMatrix::from_fn(3, 5, |i, j| cubic(strains[j]) + i as f64);
        let dense: Vec<f64> = (0..11).map(|k| 0.004 * k as f64).collect();
        let fitted =
            birch_murnaghan_finite_strain_fitting(&strains, &energies, &dense, EosOrder::Third)
                .unwrap();
        assert_eq!(fitted.shape(), (3, 11));
        for i in 0..3 {
            for (j, &f) in dense.iter().enumerate() {
                assert_relative_eq!(fitted[(i, j)], cubic(f) + i as f64, epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_calibration_on_shared_volumes_is_identity() {
        let volumes = DMatrix::from_row_slice(2, 5, &[
            320.0, 310.0, 300.0, 290.0, 280.0,
            320.0, 310.0, 300.0, 290.0, 280.0,
        ]);
        let transform = StrainTransform::new(320.0);
        let energies = DMatrix::from_fn(2, 5, |i, j| {
            cubic(transform.to_strain(volumes[(i, j)])) + 0.1 * i as f64
        });
        let calibrated =
            calibrate_energy_on_reference(&volumes, &energies, EosOrder::Third).unwrap();
        for i in 0..2 {
            for j in 0..5 {
                assert_relative_eq!(calibrated[(i, j)], energies[(i, j)], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_calibration_copies_matching_rows_and_refits_others() {
        let reference = [320.0, 310.0, 300.0, 290.0, 280.0];
        let volumes = DMatrix::from_fn(3, 5, |i, j| match i {
            1 => reference[j] * (1.0 + 1e-14),
            2 => reference[j] + 0.5,
            _ => reference[j],
        });
        let energy_of = |v: f64| cubic(StrainTransform::new(330.0).to_strain(v));
        let energies = DMatrix::from_fn(3, 5, |i, j| energy_of(volumes[(i, j)]) + 1e-3 * i as f64);
        let calibrated =
            calibrate_energy_on_reference(&volumes, &energies, EosOrder::Third).unwrap();
        for j in 0..5 {
            assert_eq!(calibrated[(0, j)], energies[(0, j)]);
            assert_eq!(calibrated[(1, j)], energies[(1, j)]);
            assert_ne!(calibrated[(2, j)], energies[(2, j)]);
            assert_relative_eq!(
                calibrated[(2, j)],
                energy_of(reference[j]) + 2e-3,
                epsilon = 1e-4
            );
        }
    }

    #[test]
    fn test_calibration_moves_to_reference_volumes() {
        let volumes = DMatrix::from_row_slice(2, 5, &[
            320.0, 310.0, 300.0, 290.0, 280.0,
            321.0, 311.5, 299.0, 289.5, 281.0,
        ]);
        let energy_of = |v: f64| cubic(StrainTransform::new(330.0).to_strain(v));
        let energies = DMatrix::from_fn(2, 5, |i, j| energy_of(volumes[(i, j)]));
        let calibrated =
            calibrate_energy_on_reference(&volumes, &energies, EosOrder::Third).unwrap();
        for j in 0..5 {
            assert_relative_eq!(calibrated[(1, j)], energy_of(volumes[(0, j)]), epsilon = 1e-4);
        }
    }
}
