//! Free energy of systems made of several configurations
//!
//! A disordered or mixed system is described by a set of configurations,
//! each with its own static energies, phonon frequencies and a degeneracy
//! g_j. Their effective free energy follows from the summed partition
//! function:
//!
//! F(T, V) = −k_BT ln Σ_j g_j exp(−F_j(T, V) / k_BT)
//!
//! Free-energy spreads of many hundreds of k_BT are common, so the sum is
//! evaluated with arbitrary-precision floats (see [`partition`]).
//!
//! Two variants are provided:
//! - [`DifferentPhononDos`]: every configuration has its own phonons. Each
//!   free-energy curve is computed independently, calibrated onto the
//!   volumes of the first configuration and then combined.
//! - [`SamePhononDos`]: all configurations share q-weights and frequencies,
//!   so only the static energies are combined and the harmonic part is
//!   added once.

pub mod different_phonon_dos;
pub mod partition;
pub mod same_phonon_dos;
#[cfg(test)]
mod tests;

pub use different_phonon_dos::DifferentPhononDos;
pub use partition::{BigFloatContext, DEFAULT_PRECISION};
pub use same_phonon_dos::SamePhononDos;

use crate::error::{QhaError, Result};
use crate::frequencies::FrequencyArray;
use crate::tools::{is_monotonic_decreasing, matrix_from_rows};
use nalgebra::DMatrix;

/// Temperatures below this are raised to it before k_BT is formed when the
/// configurations share their phonons.
pub const TEMPERATURE_FLOOR: f64 = 1e-6;

pub(crate) fn effective_temperature(temperature: f64) -> f64 {
    temperature.max(TEMPERATURE_FLOOR)
}

/// One physical configuration of a multi-configuration system.
#[derive(Debug, Clone)]
pub struct Configuration {
    pub volumes: Vec<f64>,
    pub static_energies: Vec<f64>,
    pub frequencies: FrequencyArray,
    pub q_weights: Vec<f64>,
    pub degeneracy: f64,
}

impl Configuration {
    fn validate(&self, index: usize) -> Result<()> {
        if !(self.degeneracy >= 0.0 && self.degeneracy.is_finite()) {
            return Err(QhaError::InvalidInput(format!(
                "degeneracy of configuration {index} should be greater or equal to 0, got {}",
                self.degeneracy
            )));
        }
        if self.q_weights.iter().any(|&w| w < 0.0) {
            return Err(QhaError::InvalidInput(format!(
                "q-point weights of configuration {index} should all be greater or equal to 0"
            )));
        }
        if self.static_energies.len() != self.volumes.len()
            || self.frequencies.volumes() != self.volumes.len()
        {
            return Err(QhaError::shape(
                format!("{} volumes in configuration {index}", self.volumes.len()),
                format!(
                    "{} static energies and {} frequency volumes",
                    self.static_energies.len(),
                    self.frequencies.volumes()
                ),
            ));
        }
        if self.frequencies.q_points() != self.q_weights.len() {
            return Err(QhaError::shape(
                format!("{} q-points in configuration {index}", self.q_weights.len()),
                format!("{} q-points of frequencies", self.frequencies.q_points()),
            ));
        }
        if !is_monotonic_decreasing(&self.volumes) {
            return Err(QhaError::InvalidInput(format!(
                "volumes of configuration {index} are not in decreasing order"
            )));
        }
        Ok(())
    }
}

/// Validated collection of configurations sharing the same number of volumes.
#[derive(Debug, Clone)]
pub struct ConfigurationSet {
    configurations: Vec<Configuration>,
}

impl ConfigurationSet {
    pub fn new(configurations: Vec<Configuration>) -> Result<Self> {
        let first = configurations.first().ok_or_else(|| {
            QhaError::InvalidInput("at least one configuration is required".to_string())
        })?;
        let volume_count = first.volumes.len();
        for (i, configuration) in configurations.iter().enumerate() {
            configuration.validate(i)?;
            if configuration.volumes.len() != volume_count {
                return Err(QhaError::InvalidInput(format!(
                    "configuration {i} has {} volumes, configuration 0 has {volume_count}",
                    configuration.volumes.len()
                )));
            }
        }
        if configurations.iter().all(|c| c.degeneracy == 0.0) {
            return Err(QhaError::InvalidInput(
                "degeneracies are all zero".to_string(),
            ));
        }
        Ok(ConfigurationSet { configurations })
    }

    pub fn len(&self) -> usize {
        self.configurations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.configurations.is_empty()
    }

    pub fn configurations(&self) -> &[Configuration] {
        &self.configurations
    }

    pub fn degeneracies(&self) -> Vec<f64> {
        self.configurations.iter().map(|c| c.degeneracy).collect()
    }

    /// Volumes of the first configuration, onto which everything is calibrated.
    pub fn reference_volumes(&self) -> &[f64] {
        &self.configurations[0].volumes
    }

    /// Configurations × volumes.
    pub fn volume_matrix(&self) -> Result<DMatrix<f64>> {
        let rows: Vec<Vec<f64>> = self.configurations.iter().map(|c| c.volumes.clone()).collect();
        matrix_from_rows(&rows)
    }

    /// Configurations × volumes.
    pub fn static_energy_matrix(&self) -> Result<DMatrix<f64>> {
        let rows: Vec<Vec<f64>> = self
            .configurations
            .iter()
            .map(|c| c.static_energies.clone())
            .collect();
        matrix_from_rows(&rows)
    }
}
