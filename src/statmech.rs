//! Statistical mechanics of a single harmonic oscillator.

use crate::units::EnergyUnit;

/// Harmonic-oscillator formulas with k_B and ħ fixed by an energy unit.
///
/// Frequencies are in cm⁻¹ and temperatures in kelvin. Non-positive
/// frequencies (acoustic modes at Γ, unstable modes) contribute nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HarmonicOscillator {
    boltzmann: f64,
    hbar: f64,
}

impl HarmonicOscillator {
    pub fn new(unit: EnergyUnit) -> Self {
        HarmonicOscillator {
            boltzmann: unit.boltzmann(),
            hbar: unit.hbar(),
        }
    }

    pub fn boltzmann(&self) -> f64 {
        self.boltzmann
    }

    pub fn hbar(&self) -> f64 {
        self.hbar
    }

    /// ½ħω + k_BT ln(1 − e^(−ħω/k_BT)); zero-temperature is allowed.
    pub fn free_energy(&self, temperature: f64, frequency: f64) -> f64 {
        if frequency <= 0.0 {
            return 0.0;
        }
        let hw = self.hbar * frequency;
        let kt = self.boltzmann * temperature;
        // 1 - exp(-x) computed as -expm1(-x) keeps precision when ħω ≪ k_BT
        0.5 * hw + kt * (-(-hw / kt).exp_m1()).ln()
    }

    /// ln[e^(−ħω/2k_BT) / (1 − e^(−ħω/k_BT))]
    pub fn log_partition_function(&self, temperature: f64, frequency: f64) -> f64 {
        if frequency <= 0.0 {
            return 0.0;
        }
        let x = -self.hbar * frequency / (self.boltzmann * temperature);
        x / 2.0 - (-x.exp_m1()).ln()
    }
}
