use super::{effective_temperature, BigFloatContext, ConfigurationSet};
use crate::error::{QhaError, Result};
use crate::fitting::{calibrate_energy_on_reference, EosOrder};
use crate::free_energy::{
    log_vibrational_partition_function, normalized_weights, vibrational_free_energy,
};
use crate::frequencies::FrequencyArray;
use crate::statmech::HarmonicOscillator;
use crate::units::EnergyUnit;
use nalgebra::DMatrix;
use tracing::warn;

/// Configurations that differ only in their static energies.
///
/// The q-weights and frequencies of the first configuration are used for
/// the whole set.
#[derive(Debug, Clone)]
pub struct SamePhononDos<'a> {
    configurations: &'a ConfigurationSet,
    oscillator: HarmonicOscillator,
    static_only: bool,
    context: BigFloatContext,
    scaled_q_weights: Vec<f64>,
    calibrated_static_energies: DMatrix<f64>,
}

impl<'a> SamePhononDos<'a> {
    pub fn new(
        configurations: &'a ConfigurationSet,
        unit: EnergyUnit,
        order: EosOrder,
        static_only: bool,
        context: BigFloatContext,
    ) -> Result<Self> {
        let shared = &configurations.configurations()[0];
        for (i, c) in configurations.configurations().iter().enumerate().skip(1) {
            if c.frequencies.shape() != shared.frequencies.shape()
                || c.q_weights.len() != shared.q_weights.len()
            {
                return Err(QhaError::shape(
                    format!(
                        "frequencies {:?} shared by all configurations",
                        shared.frequencies.shape()
                    ),
                    format!("{:?} in configuration {i}", c.frequencies.shape()),
                ));
            }
            if c.frequencies != shared.frequencies || c.q_weights != shared.q_weights {
                warn!(
                    "configuration {} has its own phonons; those of configuration 0 are used",
                    i
                );
            }
        }

        // Static energies do not depend on temperature: calibrate once.
        let calibrated_static_energies = calibrate_energy_on_reference(
            &configurations.volume_matrix()?,
            &configurations.static_energy_matrix()?,
            order,
        )?;

        Ok(SamePhononDos {
            configurations,
            oscillator: HarmonicOscillator::new(unit),
            static_only,
            context,
            scaled_q_weights: normalized_weights(&shared.q_weights)?,
            calibrated_static_energies,
        })
    }

    /// Volumes of the first configuration, on which results are given.
    pub fn reference_volumes(&self) -> &'a [f64] {
        self.configurations.reference_volumes()
    }

    fn shared_frequencies(&self) -> &FrequencyArray {
        &self.configurations.configurations()[0].frequencies
    }

    fn static_column(&self, j: usize) -> Vec<f64> {
        self.calibrated_static_energies
            .column(j)
            .iter()
            .copied()
            .collect()
    }

    /// −k_BT ln Σ_j g_j exp(−E_j(V) / k_BT) on the reference volumes.
    pub fn static_part(&self, temperature: f64) -> Result<Vec<f64>> {
        let kt = self.oscillator.boltzmann() * effective_temperature(temperature);
        let degeneracies = self.configurations.degeneracies();
        (0..self.calibrated_static_energies.ncols())
            .map(|j| {
                self.context
                    .combine_free_energies(kt, &self.static_column(j), &degeneracies)
            })
            .collect()
    }

    pub fn harmonic_part(&self, temperature: f64) -> Vec<f64> {
        vibrational_free_energy(
            effective_temperature(temperature),
            &self.scaled_q_weights,
            self.shared_frequencies(),
            &self.oscillator,
        )
    }

    /// Static part plus harmonic part, or the static part alone when static-only.
    pub fn free_energy(&self, temperature: f64) -> Result<Vec<f64>> {
        let static_part = self.static_part(temperature)?;
        if self.static_only {
            return Ok(static_part);
        }
        Ok(static_part
            .into_iter()
            .zip(self.harmonic_part(temperature))
            .map(|(s, h)| s + h)
            .collect())
    }

    /// The same free energy obtained as −k_BT ln Z from the full partition function.
    pub fn free_energy_from_partition_function(&self, temperature: f64) -> Result<Vec<f64>> {
        let temperature = effective_temperature(temperature);
        let kt = self.oscillator.boltzmann() * temperature;
        let degeneracies = self.configurations.degeneracies();
        let log_harmonic = log_vibrational_partition_function(
            temperature,
            &self.scaled_q_weights,
            self.shared_frequencies(),
            &self.oscillator,
        );
        log_harmonic
            .iter()
            .enumerate()
            .map(|(j, &log_h)| {
                self.context.free_energy_from_partition(
                    kt,
                    &self.static_column(j),
                    &degeneracies,
                    log_h,
                )
            })
            .collect()
    }
}
