//! The full calculation, from free energies on the input volumes to
//! properties on the desired pressures.
//!
//! [`TemperatureVolumeField`] owns everything defined on the (T, V) grid and
//! [`TemperaturePressureField`] everything remapped onto (T, P). Each field
//! is computed exactly once, in dependency order, and only exposed through
//! shared references afterwards.

use crate::error::{QhaError, Result};
use crate::fitting::EosOrder;
use crate::free_energy::free_energy;
use crate::frequencies::FrequencyArray;
use crate::grid::RefineGrid;
use crate::multi_config::{Configuration, DifferentPhononDos, SamePhononDos};
use crate::statmech::HarmonicOscillator;
use crate::thermodynamics::{
    adiabatic_bulk_modulus, bulk_modulus_derivative, entropy, gruneisen_parameter,
    isobaric_heat_capacity, isothermal_bulk_modulus, pressure, thermal_expansion_coefficient,
    thermodynamic_potentials, volume, volumetric_heat_capacity,
};
use crate::tools::{arange, matrix_from_rows};
use crate::units::EnergyUnit;
use crate::v2p::v2p;
use nalgebra::DMatrix;
use rayon::prelude::*;
use tracing::{info, warn};

/// Extra temperatures appended past the requested range and dropped on output.
///
/// Derivatives with respect to temperature are one-sided at the last points,
/// which makes C_P unreliable there.
pub const TEMPERATURE_PADDING: usize = 4;

/// Anything able to produce F(V) at a given temperature on a fixed volume axis.
pub trait HelmholtzCalculator: Sync {
    /// Volumes on which [`HelmholtzCalculator::free_energy`] is evaluated, decreasing.
    fn volumes(&self) -> &[f64];

    fn free_energy(&self, temperature: f64) -> Result<Vec<f64>>;

    /// Temperatures × volumes, one row per temperature, evaluated in parallel.
    fn free_energy_field(&self, temperatures: &[f64]) -> Result<DMatrix<f64>> {
        let rows = temperatures
            .par_iter()
            .map(|&t| self.free_energy(t))
            .collect::<Result<Vec<_>>>()?;
        matrix_from_rows(&rows)
    }
}

/// A single configuration without any degeneracy.
#[derive(Debug, Clone)]
pub struct SingleConfiguration<'a> {
    configuration: &'a Configuration,
    oscillator: HarmonicOscillator,
    static_only: bool,
}

impl<'a> SingleConfiguration<'a> {
    pub fn new(configuration: &'a Configuration, unit: EnergyUnit, static_only: bool) -> Self {
        SingleConfiguration {
            configuration,
            oscillator: HarmonicOscillator::new(unit),
            static_only,
        }
    }
}

impl HelmholtzCalculator for SingleConfiguration<'_> {
    fn volumes(&self) -> &[f64] {
        &self.configuration.volumes
    }

    fn free_energy(&self, temperature: f64) -> Result<Vec<f64>> {
        free_energy(
            temperature,
            &self.configuration.q_weights,
            &self.configuration.static_energies,
            &self.configuration.frequencies,
            self.static_only,
            &self.oscillator,
        )
    }
}

impl HelmholtzCalculator for SamePhononDos<'_> {
    fn volumes(&self) -> &[f64] {
        self.reference_volumes()
    }

    fn free_energy(&self, temperature: f64) -> Result<Vec<f64>> {
        SamePhononDos::free_energy(self, temperature)
    }
}

impl HelmholtzCalculator for DifferentPhononDos<'_> {
    fn volumes(&self) -> &[f64] {
        self.reference_volumes()
    }

    fn free_energy(&self, temperature: f64) -> Result<Vec<f64>> {
        DifferentPhononDos::free_energy(self, temperature)
    }
}

/// Log a warning for every negative frequency; they are skipped by the oscillator sums.
pub fn find_negative_frequencies(label: &str, frequencies: &FrequencyArray) -> usize {
    let locations = frequencies.negative_locations();
    for (v, q, m) in &locations {
        warn!(
            "{}: negative frequency {:.4} at volume {}, q-point {}, mode {}",
            label,
            frequencies.get(*v, *q, *m),
            v,
            q,
            m
        );
    }
    locations.len()
}

/// Grid and fitting parameters of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub energy_unit: EnergyUnit,
    pub temperature_min: f64,
    pub temperature_step: f64,
    pub temperature_count: usize,
    /// GPa
    pub pressure_min: f64,
    /// GPa
    pub pressure_step: f64,
    /// Number of desired pressures, also the size of the dense volume grid.
    pub pressure_count: usize,
    /// GPa subtracted from `pressure_min` when sizing the dense volume grid.
    pub pressure_min_modifier: f64,
    pub order: EosOrder,
    pub volume_ratio: Option<f64>,
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<()> {
        if self.temperature_count == 0 || !(self.temperature_step > 0.0) {
            return Err(QhaError::InvalidInput(
                "temperature count and step must be positive".to_string(),
            ));
        }
        if self.temperature_min < 0.0 {
            return Err(QhaError::InvalidInput(
                "temperatures must not be negative".to_string(),
            ));
        }
        if self.pressure_count < 4 || !(self.pressure_step > 0.0) {
            return Err(QhaError::InvalidInput(
                "at least 4 pressures with a positive step are required".to_string(),
            ));
        }
        Ok(())
    }

    /// Requested temperatures followed by the padding points.
    pub fn temperature_axis(&self) -> Vec<f64> {
        arange(
            self.temperature_min,
            self.temperature_count + TEMPERATURE_PADDING,
            self.temperature_step,
        )
    }

    pub fn desired_pressures_gpa(&self) -> Vec<f64> {
        arange(self.pressure_min, self.pressure_count, self.pressure_step)
    }

    /// Desired pressures in energy unit per bohr³.
    pub fn desired_pressures(&self) -> Vec<f64> {
        self.desired_pressures_gpa()
            .into_iter()
            .map(|p| self.energy_unit.gpa_to_energy_per_bohr3(p))
            .collect()
    }
}

/// Every quantity on the (temperature, dense volume) grid.
#[derive(Debug, Clone)]
pub struct TemperatureVolumeField {
    temperatures: Vec<f64>,
    sparse_volumes: Vec<f64>,
    sparse_free_energies: DMatrix<f64>,
    volumes: Vec<f64>,
    ratio: f64,
    free_energies: DMatrix<f64>,
    pressures: DMatrix<f64>,
    entropy: DMatrix<f64>,
    internal_energy: DMatrix<f64>,
    enthalpy: DMatrix<f64>,
    gibbs: DMatrix<f64>,
    bulk_modulus: DMatrix<f64>,
    heat_capacity: DMatrix<f64>,
}

impl TemperatureVolumeField {
    pub fn compute(
        settings: &PipelineSettings,
        calculator: &dyn HelmholtzCalculator,
    ) -> Result<Self> {
        settings.validate()?;
        let temperatures = settings.temperature_axis();
        let sparse_volumes = calculator.volumes().to_vec();

        info!(
            "evaluating free energies at {} temperatures on {} volumes",
            temperatures.len(),
            sparse_volumes.len()
        );
        let sparse_free_energies = calculator.free_energy_field(&temperatures)?;

        let grid = RefineGrid::new(
            settings.pressure_min - settings.pressure_min_modifier,
            settings.pressure_count,
            settings.order,
            settings.energy_unit,
        );
        let refined = grid.refine(&sparse_volumes, &sparse_free_energies, settings.volume_ratio)?;
        info!(
            "dense grid: {} volumes from {:.4} to {:.4} bohr^3 (ratio {:.6})",
            refined.volumes.len(),
            refined.volumes[0],
            refined.volumes[refined.volumes.len() - 1],
            refined.ratio
        );

        let volumes = refined.volumes;
        let free_energies = refined.free_energies;
        let pressures = pressure(&volumes, &free_energies);
        let entropy = entropy(&temperatures, &free_energies);
        let potentials = thermodynamic_potentials(&temperatures, &volumes, &free_energies, &pressures);
        let bulk_modulus = isothermal_bulk_modulus(&volumes, &pressures);
        let heat_capacity = volumetric_heat_capacity(&temperatures, &potentials.internal_energy);

        Ok(TemperatureVolumeField {
            temperatures,
            sparse_volumes,
            sparse_free_energies,
            volumes,
            ratio: refined.ratio,
            free_energies,
            pressures,
            entropy,
            internal_energy: potentials.internal_energy,
            enthalpy: potentials.enthalpy,
            gibbs: potentials.gibbs,
            bulk_modulus,
            heat_capacity,
        })
    }

    /// Including the padding temperatures.
    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    pub fn sparse_volumes(&self) -> &[f64] {
        &self.sparse_volumes
    }

    /// F(T, V) on the input volumes, before fitting.
    pub fn sparse_free_energies(&self) -> &DMatrix<f64> {
        &self.sparse_free_energies
    }

    pub fn volumes(&self) -> &[f64] {
        &self.volumes
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn free_energies(&self) -> &DMatrix<f64> {
        &self.free_energies
    }

    pub fn pressures(&self) -> &DMatrix<f64> {
        &self.pressures
    }

    pub fn entropy(&self) -> &DMatrix<f64> {
        &self.entropy
    }

    pub fn internal_energy(&self) -> &DMatrix<f64> {
        &self.internal_energy
    }

    pub fn enthalpy(&self) -> &DMatrix<f64> {
        &self.enthalpy
    }

    pub fn gibbs(&self) -> &DMatrix<f64> {
        &self.gibbs
    }

    pub fn bulk_modulus(&self) -> &DMatrix<f64> {
        &self.bulk_modulus
    }

    pub fn heat_capacity(&self) -> &DMatrix<f64> {
        &self.heat_capacity
    }

    /// (highest pressure at the largest volume, lowest pressure at the smallest volume)
    /// over all temperatures, in the native pressure unit.
    pub fn reachable_pressures(&self) -> (f64, f64) {
        let last = self.pressures.ncols() - 1;
        let floor = self
            .pressures
            .column(0)
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let ceiling = self
            .pressures
            .column(last)
            .iter()
            .copied()
            .fold(f64::INFINITY, f64::min);
        (floor, ceiling)
    }
}

/// Check that every desired pressure lies inside what the dense grid reaches.
pub fn check_pressure_range(
    tv: &TemperatureVolumeField,
    settings: &PipelineSettings,
) -> Result<()> {
    let unit = settings.energy_unit;
    let (floor, ceiling) = tv.reachable_pressures();
    let (floor_gpa, ceiling_gpa) = (
        unit.energy_per_bohr3_to_gpa(floor),
        unit.energy_per_bohr3_to_gpa(ceiling),
    );
    info!(
        "the pressure range can be dealt with: [{:.2}, {:.2}] GPa",
        floor_gpa, ceiling_gpa
    );

    let desired = settings.desired_pressures_gpa();
    let lowest = desired.iter().copied().fold(f64::INFINITY, f64::min);
    let highest = desired.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if ceiling_gpa < highest {
        let suggested = ((ceiling_gpa - lowest) / settings.pressure_step).max(0.0) as usize;
        return Err(QhaError::PressureRangeTooHigh {
            ceiling_gpa,
            requested_gpa: highest,
            suggested_max_count: suggested,
        });
    }
    if floor_gpa > lowest {
        return Err(QhaError::PressureRangeTooLow {
            floor_gpa,
            requested_gpa: lowest,
        });
    }
    Ok(())
}

/// Every quantity on the (temperature, desired pressure) grid.
#[derive(Debug, Clone)]
pub struct TemperaturePressureField {
    temperatures: Vec<f64>,
    pressures: Vec<f64>,
    pressures_gpa: Vec<f64>,
    free_energy: DMatrix<f64>,
    gibbs: DMatrix<f64>,
    enthalpy: DMatrix<f64>,
    internal_energy: DMatrix<f64>,
    entropy: DMatrix<f64>,
    volume: DMatrix<f64>,
    bulk_modulus: DMatrix<f64>,
    heat_capacity_v: DMatrix<f64>,
    thermal_expansion: DMatrix<f64>,
    gruneisen: DMatrix<f64>,
    adiabatic_bulk_modulus: DMatrix<f64>,
    heat_capacity_p: DMatrix<f64>,
    bulk_modulus_derivative: DMatrix<f64>,
}

impl TemperaturePressureField {
    pub fn compute(tv: &TemperatureVolumeField, settings: &PipelineSettings) -> Result<Self> {
        check_pressure_range(tv, settings)?;

        let temperatures = tv.temperatures().to_vec();
        let pressures = settings.desired_pressures();
        let p_tv = tv.pressures();
        let remap = |field: &DMatrix<f64>| v2p(field, p_tv, &pressures);

        let free_energy = remap(tv.free_energies())?;
        let gibbs = remap(tv.gibbs())?;
        let enthalpy = remap(tv.enthalpy())?;
        let internal_energy = remap(tv.internal_energy())?;
        let entropy = remap(tv.entropy())?;
        let bulk_modulus = remap(tv.bulk_modulus())?;
        let heat_capacity_v = remap(tv.heat_capacity())?;
        let volume = volume(tv.volumes(), &pressures, p_tv)?;

        let thermal_expansion = thermal_expansion_coefficient(&temperatures, &volume);
        let gruneisen =
            gruneisen_parameter(&volume, &bulk_modulus, &thermal_expansion, &heat_capacity_v);
        let adiabatic_bulk_modulus =
            adiabatic_bulk_modulus(&bulk_modulus, &thermal_expansion, &gruneisen, &temperatures);
        let heat_capacity_p =
            isobaric_heat_capacity(&heat_capacity_v, &thermal_expansion, &gruneisen, &temperatures);
        let bulk_modulus_derivative = bulk_modulus_derivative(&pressures, &bulk_modulus);

        info!(
            "remapped onto {} pressures from {:.2} GPa",
            pressures.len(),
            settings.pressure_min
        );

        Ok(TemperaturePressureField {
            temperatures,
            pressures_gpa: settings.desired_pressures_gpa(),
            pressures,
            free_energy,
            gibbs,
            enthalpy,
            internal_energy,
            entropy,
            volume,
            bulk_modulus,
            heat_capacity_v,
            thermal_expansion,
            gruneisen,
            adiabatic_bulk_modulus,
            heat_capacity_p,
            bulk_modulus_derivative,
        })
    }

    pub fn temperatures(&self) -> &[f64] {
        &self.temperatures
    }

    /// Desired pressures in energy unit per bohr³.
    pub fn pressures(&self) -> &[f64] {
        &self.pressures
    }

    pub fn pressures_gpa(&self) -> &[f64] {
        &self.pressures_gpa
    }

    pub fn free_energy(&self) -> &DMatrix<f64> {
        &self.free_energy
    }

    pub fn gibbs(&self) -> &DMatrix<f64> {
        &self.gibbs
    }

    pub fn enthalpy(&self) -> &DMatrix<f64> {
        &self.enthalpy
    }

    pub fn internal_energy(&self) -> &DMatrix<f64> {
        &self.internal_energy
    }

    pub fn entropy(&self) -> &DMatrix<f64> {
        &self.entropy
    }

    pub fn volume(&self) -> &DMatrix<f64> {
        &self.volume
    }

    pub fn bulk_modulus(&self) -> &DMatrix<f64> {
        &self.bulk_modulus
    }

    pub fn heat_capacity_v(&self) -> &DMatrix<f64> {
        &self.heat_capacity_v
    }

    pub fn thermal_expansion(&self) -> &DMatrix<f64> {
        &self.thermal_expansion
    }

    pub fn gruneisen(&self) -> &DMatrix<f64> {
        &self.gruneisen
    }

    pub fn adiabatic_bulk_modulus(&self) -> &DMatrix<f64> {
        &self.adiabatic_bulk_modulus
    }

    pub fn heat_capacity_p(&self) -> &DMatrix<f64> {
        &self.heat_capacity_p
    }

    pub fn bulk_modulus_derivative(&self) -> &DMatrix<f64> {
        &self.bulk_modulus_derivative
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> PipelineSettings {
        PipelineSettings {
            energy_unit: EnergyUnit::Ry,
            temperature_min: 0.0,
            temperature_step: 10.0,
            temperature_count: 5,
            pressure_min: 0.0,
            pressure_step: 0.5,
            pressure_count: 10,
            pressure_min_modifier: 1.0,
            order: EosOrder::Third,
            volume_ratio: None,
        }
    }

    #[test]
    fn test_temperature_axis_is_padded() {
        let t = settings().temperature_axis();
        assert_eq!(t.len(), 5 + TEMPERATURE_PADDING);
        assert_eq!(t[8], 80.0);
    }

    #[test]
    fn test_desired_pressures() {
        let s = settings();
        let gpa = s.desired_pressures_gpa();
        assert_eq!(gpa.len(), 10);
        assert_eq!(gpa[3], 1.5);
        let native = s.desired_pressures();
        approx::assert_relative_eq!(
            EnergyUnit::Ry.energy_per_bohr3_to_gpa(native[3]),
            1.5,
            max_relative = 1e-12
        );
    }

    // Third-order Birch-Murnaghan crystal: V0 = 360 bohr³, B0 = 100 GPa, B0' = 4.
    fn crystal() -> Configuration {
        let volumes: Vec<f64> = (0..6).map(|i| 420.0 - 24.0 * i as f64).collect();
        let b0 = EnergyUnit::Ry.gpa_to_energy_per_bohr3(100.0);
        let static_energies = volumes
            .iter()
            .map(|&v| {
                let x: f64 = (360.0 / v).powf(2.0 / 3.0);
                -100.0
                    + 9.0 * 360.0 * b0 / 16.0
                        * (4.0 * (x - 1.0).powi(3) + (x - 1.0).powi(2) * (6.0 - 4.0 * x))
            })
            .collect();
        let frequencies = FrequencyArray::from_fn(6, 1, 3, |v, _, m| {
            (150.0 + 100.0 * m as f64) * (360.0 / volumes[v]).powf(1.5)
        });
        Configuration {
            volumes,
            static_energies,
            frequencies,
            q_weights: vec![1.0],
            degeneracy: 1.0,
        }
    }

    fn crystal_field(settings: &PipelineSettings) -> TemperatureVolumeField {
        let configuration = crystal();
        let calculator = SingleConfiguration::new(&configuration, EnergyUnit::Ry, false);
        TemperatureVolumeField::compute(settings, &calculator).unwrap()
    }

    #[test]
    fn test_pressure_range_checks_both_ends() {
        let mut s = settings();
        s.pressure_count = 41;
        s.volume_ratio = Some(1.0);
        let tv = crystal_field(&s);
        let (floor, ceiling) = tv.reachable_pressures();
        let floor_gpa = EnergyUnit::Ry.energy_per_bohr3_to_gpa(floor);
        let ceiling_gpa = EnergyUnit::Ry.energy_per_bohr3_to_gpa(ceiling);
        // Roughly -11 GPa at 420 bohr³ and 26 GPa at 300 bohr³.
        assert!(floor_gpa < -5.0 && floor_gpa > -15.0, "floor {floor_gpa}");
        assert!(ceiling_gpa > 20.0 && ceiling_gpa < 30.0, "ceiling {ceiling_gpa}");
        check_pressure_range(&tv, &s).unwrap();

        let mut below = s.clone();
        below.pressure_min = -50.0;
        match check_pressure_range(&tv, &below) {
            Err(QhaError::PressureRangeTooLow {
                floor_gpa: reported,
                requested_gpa,
            }) => {
                assert_eq!(requested_gpa, -50.0);
                approx::assert_relative_eq!(reported, floor_gpa, max_relative = 1e-12);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert!(TemperaturePressureField::compute(&tv, &below)
            .unwrap_err()
            .is_configuration_range());

        let mut above = s.clone();
        above.pressure_min = 25.0;
        match check_pressure_range(&tv, &above) {
            Err(QhaError::PressureRangeTooHigh {
                suggested_max_count,
                ..
            }) => {
                assert_eq!(
                    suggested_max_count,
                    ((ceiling_gpa - 25.0) / 0.5).floor() as usize
                );
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_invalid_settings() {
        let mut s = settings();
        s.pressure_count = 3;
        assert!(s.validate().is_err());
        let mut s = settings();
        s.temperature_step = 0.0;
        assert!(s.validate().is_err());
    }
}
