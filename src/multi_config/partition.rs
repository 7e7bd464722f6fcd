//! Arbitrary-precision reduction of configuration partition functions.

use crate::error::{QhaError, Result};
use rug::Float;

/// Working precision in bits used when none is configured.
pub const DEFAULT_PRECISION: u32 = 500;

/// Big-float settings shared by every combination within one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BigFloatContext {
    precision: u32,
}

impl Default for BigFloatContext {
    fn default() -> Self {
        BigFloatContext {
            precision: DEFAULT_PRECISION,
        }
    }
}

impl BigFloatContext {
    pub fn new(precision: u32) -> Result<Self> {
        let (min, max) = (rug::float::prec_min(), rug::float::prec_max());
        if precision < min || precision > max {
            return Err(QhaError::NumericPrecision(format!(
                "precision of {precision} bits is outside the supported range {min}..={max}"
            )));
        }
        Ok(BigFloatContext { precision })
    }

    pub fn precision(&self) -> u32 {
        self.precision
    }

    /// −k_BT ln Σ_j g_j exp(−E_j / k_BT)
    pub fn combine_free_energies(
        &self,
        kt: f64,
        energies: &[f64],
        degeneracies: &[f64],
    ) -> Result<f64> {
        let (e_min, sum) = self.shifted_sum(kt, energies, degeneracies)?;
        let log_sum = sum.ln().to_f64();
        Ok(e_min - kt * log_sum)
    }

    /// −k_BT ln Z with Z = [Σ_j g_j exp(−E_j / k_BT)] · exp(`log_harmonic`).
    ///
    /// `log_harmonic` is the logarithm of the vibrational partition function
    /// shared by every configuration.
    pub fn free_energy_from_partition(
        &self,
        kt: f64,
        static_energies: &[f64],
        degeneracies: &[f64],
        log_harmonic: f64,
    ) -> Result<f64> {
        let (e_min, sum) = self.shifted_sum(kt, static_energies, degeneracies)?;
        let mut log_z = sum.ln();
        log_z += Float::with_val(self.precision, -e_min / kt);
        log_z += log_harmonic;
        let free_energy = (log_z * -kt).to_f64();
        if !free_energy.is_finite() {
            return Err(QhaError::NumericPrecision(format!(
                "partition function could not be represented at {} bits",
                self.precision
            )));
        }
        Ok(free_energy)
    }

    /// Lowest energy among populated configurations and
    /// Σ_j g_j exp((E_min − E_j) / k_BT), which lies in [g_min, Σ g].
    fn shifted_sum(&self, kt: f64, energies: &[f64], degeneracies: &[f64]) -> Result<(f64, Float)> {
        if energies.len() != degeneracies.len() {
            return Err(QhaError::shape(
                format!("{} energies, one per degeneracy", degeneracies.len()),
                format!("{} energies", energies.len()),
            ));
        }
        if degeneracies.iter().any(|&g| g < 0.0) {
            return Err(QhaError::InvalidInput(
                "degeneracies should all be greater or equal to 0".to_string(),
            ));
        }
        let e_min = energies
            .iter()
            .zip(degeneracies)
            .filter(|&(_, &g)| g > 0.0)
            .map(|(&e, _)| e)
            .fold(f64::INFINITY, f64::min);
        if !e_min.is_finite() {
            return Err(QhaError::InvalidInput(
                "no configuration carries a positive degeneracy".to_string(),
            ));
        }

        let mut sum = Float::with_val(self.precision, 0.0);
        for (&e, &g) in energies.iter().zip(degeneracies) {
            if g == 0.0 {
                continue;
            }
            let exponent = (Float::with_val(self.precision, e_min) - e) / kt;
            sum += exponent.exp() * g;
        }
        Ok((e_min, sum))
    }
}
