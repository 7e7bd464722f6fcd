//! Thermodynamic properties derived from F(T, V) by finite differences.
//!
//! Matrices are indexed (temperature, volume) or (temperature, pressure).
//! Every derivative is gradient(f) / gradient(x), central in the interior
//! and one-sided at the borders.

use crate::error::Result;
use crate::tools::{matrix_derivative, Axis};
use crate::v2p::v2p;
use nalgebra::DMatrix;

/// P = −(∂F/∂V)_T
pub fn pressure(volumes: &[f64], free_energies: &DMatrix<f64>) -> DMatrix<f64> {
    -matrix_derivative(free_energies, volumes, Axis::Columns)
}

/// S = −(∂F/∂T)_V
pub fn entropy(temperatures: &[f64], free_energies: &DMatrix<f64>) -> DMatrix<f64> {
    -matrix_derivative(free_energies, temperatures, Axis::Rows)
}

/// U, H and G on the (T, V) grid.
#[derive(Debug, Clone)]
pub struct ThermodynamicPotentials {
    pub internal_energy: DMatrix<f64>,
    pub enthalpy: DMatrix<f64>,
    pub gibbs: DMatrix<f64>,
}

/// U = F + TS, H = U + PV, G = F + PV.
pub fn thermodynamic_potentials(
    temperatures: &[f64],
    volumes: &[f64],
    free_energies: &DMatrix<f64>,
    pressures: &DMatrix<f64>,
) -> ThermodynamicPotentials {
    let s = entropy(temperatures, free_energies);
    let pv = DMatrix::from_fn(pressures.nrows(), pressures.ncols(), |i, j| {
        pressures[(i, j)] * volumes[j]
    });
    let ts = DMatrix::from_fn(s.nrows(), s.ncols(), |i, j| temperatures[i] * s[(i, j)]);

    let internal_energy = free_energies + ts;
    let enthalpy = &internal_energy + &pv;
    let gibbs = free_energies + pv;
    ThermodynamicPotentials {
        internal_energy,
        enthalpy,
        gibbs,
    }
}

/// V(T, P) from the volume axis and P(T, V).
pub fn volume(
    volumes: &[f64],
    desired_pressures: &[f64],
    pressures: &DMatrix<f64>,
) -> Result<DMatrix<f64>> {
    let broadcast = DMatrix::from_fn(pressures.nrows(), volumes.len(), |_, j| volumes[j]);
    v2p(&broadcast, pressures, desired_pressures)
}

/// α = (1/V)(∂V/∂T)_P
pub fn thermal_expansion_coefficient(
    temperatures: &[f64],
    volumes: &DMatrix<f64>,
) -> DMatrix<f64> {
    matrix_derivative(volumes, temperatures, Axis::Rows).component_div(volumes)
}

/// γ = α B_T V / C_V, with the lowest temperature row set to 0.
pub fn gruneisen_parameter(
    volumes: &DMatrix<f64>,
    bulk_modulus: &DMatrix<f64>,
    alpha: &DMatrix<f64>,
    cv: &DMatrix<f64>,
) -> DMatrix<f64> {
    DMatrix::from_fn(volumes.nrows(), volumes.ncols(), |i, j| {
        if i == 0 {
            0.0
        } else {
            volumes[(i, j)] * bulk_modulus[(i, j)] * alpha[(i, j)] / cv[(i, j)]
        }
    })
}

/// B_T = −V (∂P/∂V)_T
pub fn isothermal_bulk_modulus(volumes: &[f64], pressures: &DMatrix<f64>) -> DMatrix<f64> {
    let dp_dv = matrix_derivative(pressures, volumes, Axis::Columns);
    DMatrix::from_fn(dp_dv.nrows(), dp_dv.ncols(), |i, j| {
        -dp_dv[(i, j)] * volumes[j]
    })
}

fn scale_by_one_plus_alpha_gamma_t(
    base: &DMatrix<f64>,
    alpha: &DMatrix<f64>,
    gamma: &DMatrix<f64>,
    temperatures: &[f64],
) -> DMatrix<f64> {
    DMatrix::from_fn(base.nrows(), base.ncols(), |i, j| {
        base[(i, j)] * (1.0 + alpha[(i, j)] * gamma[(i, j)] * temperatures[i])
    })
}

/// B_S = B_T (1 + αγT)
pub fn adiabatic_bulk_modulus(
    bulk_modulus: &DMatrix<f64>,
    alpha: &DMatrix<f64>,
    gamma: &DMatrix<f64>,
    temperatures: &[f64],
) -> DMatrix<f64> {
    scale_by_one_plus_alpha_gamma_t(bulk_modulus, alpha, gamma, temperatures)
}

/// B_T' = (∂B_T/∂P)_T on the (T, P) grid.
pub fn bulk_modulus_derivative(pressures: &[f64], bulk_modulus: &DMatrix<f64>) -> DMatrix<f64> {
    matrix_derivative(bulk_modulus, pressures, Axis::Columns)
}

/// C_P = C_V (1 + αγT)
pub fn isobaric_heat_capacity(
    cv: &DMatrix<f64>,
    alpha: &DMatrix<f64>,
    gamma: &DMatrix<f64>,
    temperatures: &[f64],
) -> DMatrix<f64> {
    scale_by_one_plus_alpha_gamma_t(cv, alpha, gamma, temperatures)
}

/// C_V = (∂U/∂T)_V
pub fn volumetric_heat_capacity(
    temperatures: &[f64],
    internal_energies: &DMatrix<f64>,
) -> DMatrix<f64> {
    matrix_derivative(internal_energies, temperatures, Axis::Rows)
}
