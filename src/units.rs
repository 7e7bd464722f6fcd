//! Energy units and the physical constants they imply.
//!
//! Volumes are always bohr³ inside the pipeline; energies are in the unit
//! selected by [`EnergyUnit`]. Constants are CODATA 2018.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Boltzmann constant in eV/K.
pub const BOLTZMANN_EV: f64 = 8.617333262e-5;
pub const HARTREE_EV: f64 = 27.211386245988;
pub const RYDBERG_EV: f64 = 13.605693122994;
/// Electron volt to inverse meter relationship.
pub const EV_INVERSE_METER: f64 = 806554.3937349212;
pub const EV_JOULE: f64 = 1.602176634e-19;
pub const BOHR_METER: f64 = 5.29177210903e-11;
pub const BOHR_ANGSTROM: f64 = 0.529177210903;
pub const AVOGADRO: f64 = 6.02214076e23;

/// The energy unit of static energies and of every derived energy field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnergyUnit {
    #[default]
    Ry,
    Ha,
    Ev,
}

impl EnergyUnit {
    /// Size of one unit in electron volts.
    pub fn to_ev(self) -> f64 {
        match self {
            EnergyUnit::Ry => RYDBERG_EV,
            EnergyUnit::Ha => HARTREE_EV,
            EnergyUnit::Ev => 1.0,
        }
    }

    pub fn to_joule(self) -> f64 {
        self.to_ev() * EV_JOULE
    }

    /// k_B in this unit per kelvin.
    pub fn boltzmann(self) -> f64 {
        BOLTZMANN_EV / self.to_ev()
    }

    /// ħ scaled so that `hbar() * ω` is an energy in this unit for ω in cm⁻¹.
    pub fn hbar(self) -> f64 {
        100.0 / EV_INVERSE_METER / self.to_ev()
    }

    pub fn gpa_to_energy_per_bohr3(self, pressure: f64) -> f64 {
        pressure * 1e9 * BOHR_METER.powi(3) / self.to_joule()
    }

    pub fn energy_per_bohr3_to_gpa(self, pressure: f64) -> f64 {
        pressure * self.to_joule() / BOHR_METER.powi(3) / 1e9
    }

    pub fn energy_to_ev(self, energy: f64) -> f64 {
        energy * self.to_ev()
    }

    /// Energy per cell to J/mol of cells.
    pub fn energy_to_j_mol(self, energy: f64) -> f64 {
        energy * self.to_joule() * AVOGADRO
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EnergyUnit::Ry => "ry",
            EnergyUnit::Ha => "ha",
            EnergyUnit::Ev => "ev",
        }
    }
}

impl fmt::Display for EnergyUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn bohr3_to_angstrom3(volume: f64) -> f64 {
    volume * BOHR_ANGSTROM.powi(3)
}

pub fn angstrom3_to_bohr3(volume: f64) -> f64 {
    volume / BOHR_ANGSTROM.powi(3)
}
