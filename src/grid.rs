//! Refinement of the sparse volume grid onto a dense one.
//!
//! Every temperature row of F(T, V) is fitted with the finite-strain EOS and
//! re-evaluated on a dense grid that is evenly spaced in strain. The dense
//! grid may extend beyond the sparse one so that low pressures, which
//! correspond to large volumes, stay reachable.

use crate::error::{QhaError, Result};
use crate::fitting::{birch_murnaghan_finite_strain_fitting, polynomial_least_square_fitting, EosOrder};
use crate::strain::StrainTransform;
use crate::tools::{derivative, is_monotonic_decreasing, row_to_vec};
use crate::units::EnergyUnit;
use nalgebra::DMatrix;
use tracing::{debug, info};

/// Generous first guess for the expansion ratio search.
pub const INITIAL_RATIO: f64 = 1.45;

/// Strains and volumes of `count` points spanning `[v_min / ratio, v_max · ratio]`.
///
/// The points are evenly spaced in strain relative to `v_max`, ordered from
/// the largest volume to the smallest.
pub fn interpolate_volumes(volumes: &[f64], count: usize, ratio: f64) -> (Vec<f64>, Vec<f64>) {
    let v_min = volumes.iter().copied().fold(f64::INFINITY, f64::min);
    let v_max = volumes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let transform = StrainTransform::new(v_max);
    let s_smallest = transform.to_strain(v_max * ratio);
    let s_largest = transform.to_strain(v_min / ratio);

    let strains: Vec<f64> = match count {
        0 => Vec::new(),
        1 => vec![s_smallest],
        _ => {
            let step = (s_largest - s_smallest) / (count - 1) as f64;
            (0..count).map(|i| s_smallest + step * i as f64).collect()
        }
    };
    let dense_volumes = transform.volumes(&strains);
    (strains, dense_volumes)
}

/// Dense volumes and the free energy evaluated on them.
#[derive(Debug, Clone)]
pub struct RefinedGrid {
    pub volumes: Vec<f64>,
    pub strains: Vec<f64>,
    /// Temperatures × dense volumes.
    pub free_energies: DMatrix<f64>,
    pub ratio: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct RefineGrid {
    desired_min_pressure: f64,
    dense_count: usize,
    order: EosOrder,
}

impl RefineGrid {
    /// `desired_min_pressure_gpa` is the lowest pressure the dense grid must reach.
    pub fn new(
        desired_min_pressure_gpa: f64,
        dense_count: usize,
        order: EosOrder,
        unit: EnergyUnit,
    ) -> Self {
        RefineGrid {
            desired_min_pressure: unit.gpa_to_energy_per_bohr3(desired_min_pressure_gpa),
            dense_count,
            order,
        }
    }

    /// Ratio at which the fitted pressure of one F(V) curve first reaches the desired minimum.
    ///
    /// When no trial point reaches it the first (largest) trial volume is used.
    pub fn approach_to_best_ratio(
        &self,
        volumes: &[f64],
        free_energies: &[f64],
        initial_ratio: f64,
    ) -> Result<f64> {
        if volumes.len() < 2 {
            return Err(QhaError::InvalidInput(format!(
                "at least two volumes are needed to search for a ratio, got {}",
                volumes.len()
            )));
        }
        if free_energies.len() != volumes.len() {
            return Err(QhaError::shape(
                format!("{} free energies", volumes.len()),
                format!("{} free energies", free_energies.len()),
            ));
        }
        let (trial_strains, trial_volumes) =
            interpolate_volumes(volumes, self.dense_count, initial_ratio);
        let sparse_strains = StrainTransform::new(volumes[0]).strains(volumes);
        let (_, trial_free_energies) = polynomial_least_square_fitting(
            &sparse_strains,
            free_energies,
            &trial_strains,
            self.order.degree(),
        )?;

        let pressures: Vec<f64> = derivative(&trial_free_energies, &trial_volumes)
            .into_iter()
            .map(|d| -d)
            .collect();
        let index = pressures
            .iter()
            .position(|&p| p >= self.desired_min_pressure)
            .unwrap_or(0);
        let v_max = volumes.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        debug!(
            "trial grid reaches the desired pressure at index {} (V = {:.4})",
            index, trial_volumes[index]
        );
        Ok(trial_volumes[index] / v_max)
    }

    /// Fit every temperature row of `free_energies` (T × sparse V) onto the dense grid.
    ///
    /// Without an explicit `ratio` one is searched for on the highest
    /// temperature row and never allowed below 1.
    pub fn refine(
        &self,
        volumes: &[f64],
        free_energies: &DMatrix<f64>,
        ratio: Option<f64>,
    ) -> Result<RefinedGrid> {
        if volumes.len() < 2 || !is_monotonic_decreasing(volumes) {
            return Err(QhaError::InvalidInput(
                "volumes must be given in decreasing order".to_string(),
            ));
        }
        if free_energies.nrows() == 0 || free_energies.ncols() != volumes.len() {
            return Err(QhaError::shape(
                format!("temperatures x {} volumes", volumes.len()),
                format!("{} x {}", free_energies.nrows(), free_energies.ncols()),
            ));
        }
        if self.dense_count < 2 {
            return Err(QhaError::InvalidInput(
                "the dense volume grid needs at least two points".to_string(),
            ));
        }

        let ratio = match ratio {
            Some(r) if r.is_finite() && r >= 1.0 => {
                info!("using the configured volume ratio {:.6}", r);
                r
            }
            Some(r) => {
                return Err(QhaError::InvalidInput(format!(
                    "volume ratio must be at least 1, got {r}"
                )))
            }
            None => {
                let hottest = row_to_vec(free_energies, free_energies.nrows() - 1);
                let found = self.approach_to_best_ratio(volumes, &hottest, INITIAL_RATIO)?;
                if found < 1.0 {
                    info!(
                        "input volumes already reach the desired pressure (ratio {:.6}), keeping 1.0",
                        found
                    );
                    1.0
                } else {
                    info!("volume ratio found: {:.6}", found);
                    found
                }
            }
        };

        let sparse_strains = StrainTransform::new(volumes[0]).strains(volumes);
        let (strains, dense_volumes) = interpolate_volumes(volumes, self.dense_count, ratio);
        let fitted = birch_murnaghan_finite_strain_fitting(
            &sparse_strains,
            free_energies,
            &strains,
            self.order,
        )?;

        Ok(RefinedGrid {
            volumes: dense_volumes,
            strains,
            free_energies: fitted,
            ratio,
        })
    }
}
