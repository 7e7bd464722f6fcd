use super::{BigFloatContext, ConfigurationSet};
use crate::error::Result;
use crate::fitting::{calibrate_energy_on_reference, EosOrder};
use crate::free_energy::free_energy;
use crate::statmech::HarmonicOscillator;
use crate::tools::matrix_from_rows;
use crate::units::EnergyUnit;
use nalgebra::DMatrix;

/// Temperatures below this are evaluated at [`LOW_TEMPERATURE_SUBSTITUTE`].
///
/// Each configuration is fitted and calibrated separately, and near 0 K the
/// combined curve is dominated by fitting noise rather than by k_BT.
pub const LOW_TEMPERATURE_CUTOFF: f64 = 0.1;
pub const LOW_TEMPERATURE_SUBSTITUTE: f64 = 1.0;

pub(crate) fn evaluation_temperature(temperature: f64) -> f64 {
    if temperature < LOW_TEMPERATURE_CUTOFF {
        LOW_TEMPERATURE_SUBSTITUTE
    } else {
        temperature
    }
}

/// Configurations that each carry their own phonon density of states.
#[derive(Debug, Clone)]
pub struct DifferentPhononDos<'a> {
    configurations: &'a ConfigurationSet,
    oscillator: HarmonicOscillator,
    order: EosOrder,
    static_only: bool,
    context: BigFloatContext,
}

impl<'a> DifferentPhononDos<'a> {
    pub fn new(
        configurations: &'a ConfigurationSet,
        unit: EnergyUnit,
        order: EosOrder,
        static_only: bool,
        context: BigFloatContext,
    ) -> Self {
        DifferentPhononDos {
            configurations,
            oscillator: HarmonicOscillator::new(unit),
            order,
            static_only,
            context,
        }
    }

    /// Volumes of the first configuration, on which results are given.
    pub fn reference_volumes(&self) -> &'a [f64] {
        self.configurations.reference_volumes()
    }

    /// Free energy of every configuration on its own volumes (configurations × volumes).
    pub fn configuration_free_energies(&self, temperature: f64) -> Result<DMatrix<f64>> {
        let rows = self
            .configurations
            .configurations()
            .iter()
            .map(|c| {
                free_energy(
                    temperature,
                    &c.q_weights,
                    &c.static_energies,
                    &c.frequencies,
                    self.static_only,
                    &self.oscillator,
                )
            })
            .collect::<Result<Vec<_>>>()?;
        matrix_from_rows(&rows)
    }

    /// Effective free energy on the reference volumes at `temperature`.
    pub fn free_energy(&self, temperature: f64) -> Result<Vec<f64>> {
        let temperature = evaluation_temperature(temperature);
        let kt = self.oscillator.boltzmann() * temperature;

        let per_configuration = self.configuration_free_energies(temperature)?;
        let calibrated = calibrate_energy_on_reference(
            &self.configurations.volume_matrix()?,
            &per_configuration,
            self.order,
        )?;

        let degeneracies = self.configurations.degeneracies();
        (0..calibrated.ncols())
            .map(|j| {
                let column: Vec<f64> = calibrated.column(j).iter().copied().collect();
                self.context
                    .combine_free_energies(kt, &column, &degeneracies)
            })
            .collect()
    }
}
