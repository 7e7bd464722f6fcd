//! Helmholtz free energy of a single configuration.
//!
//! F(T, V) = E_static(V) + Σ_q w_q Σ_s f_HO(T, ω_qs(V)), with the q-point
//! weights normalised to sum to one.

use crate::error::{QhaError, Result};
use crate::frequencies::FrequencyArray;
use crate::statmech::HarmonicOscillator;

/// Reject negative weights and return them normalised to unit sum.
pub fn normalized_weights(q_weights: &[f64]) -> Result<Vec<f64>> {
    if q_weights.iter().any(|&w| w < 0.0 || !w.is_finite()) {
        return Err(QhaError::InvalidInput(
            "q-point weights should all be greater or equal to 0".to_string(),
        ));
    }
    let total: f64 = q_weights.iter().sum();
    if total <= 0.0 {
        return Err(QhaError::InvalidInput(
            "q-point weights sum to zero".to_string(),
        ));
    }
    Ok(q_weights.iter().map(|w| w / total).collect())
}

/// Vibrational free energy on every volume, given already normalised weights.
pub fn vibrational_free_energy(
    temperature: f64,
    scaled_q_weights: &[f64],
    frequencies: &FrequencyArray,
    oscillator: &HarmonicOscillator,
) -> Vec<f64> {
    (0..frequencies.volumes())
        .map(|v| {
            scaled_q_weights
                .iter()
                .enumerate()
                .map(|(q, w)| {
                    let per_q: f64 = frequencies
                        .modes_at(v, q)
                        .iter()
                        .map(|&omega| oscillator.free_energy(temperature, omega))
                        .sum();
                    w * per_q
                })
                .sum::<f64>()
        })
        .collect()
}

/// Σ_q w_q Σ_s ln z_HO on every volume, given already normalised weights.
pub fn log_vibrational_partition_function(
    temperature: f64,
    scaled_q_weights: &[f64],
    frequencies: &FrequencyArray,
    oscillator: &HarmonicOscillator,
) -> Vec<f64> {
    (0..frequencies.volumes())
        .map(|v| {
            scaled_q_weights
                .iter()
                .enumerate()
                .map(|(q, w)| {
                    let per_q: f64 = frequencies
                        .modes_at(v, q)
                        .iter()
                        .map(|&omega| oscillator.log_partition_function(temperature, omega))
                        .sum();
                    w * per_q
                })
                .sum::<f64>()
        })
        .collect()
}

pub(crate) fn check_shapes(
    q_weights: &[f64],
    static_energies: &[f64],
    frequencies: &FrequencyArray,
) -> Result<()> {
    if frequencies.volumes() != static_energies.len() {
        return Err(QhaError::shape(
            format!("{} volumes of frequencies", static_energies.len()),
            format!("{} volumes of frequencies", frequencies.volumes()),
        ));
    }
    if frequencies.q_points() != q_weights.len() {
        return Err(QhaError::shape(
            format!("{} q-points of frequencies", q_weights.len()),
            format!("{} q-points of frequencies", frequencies.q_points()),
        ));
    }
    Ok(())
}

/// Total free energy of one configuration on each of its volumes at `temperature`.
///
/// With `static_only` the static energies are returned untouched and no
/// vibrational term is evaluated at all.
pub fn free_energy(
    temperature: f64,
    q_weights: &[f64],
    static_energies: &[f64],
    frequencies: &FrequencyArray,
    static_only: bool,
    oscillator: &HarmonicOscillator,
) -> Result<Vec<f64>> {
    let scaled_q_weights = normalized_weights(q_weights)?;
    check_shapes(q_weights, static_energies, frequencies)?;

    if static_only {
        return Ok(static_energies.to_vec());
    }

    let vibrational =
        vibrational_free_energy(temperature, &scaled_q_weights, frequencies, oscillator);
    Ok(static_energies
        .iter()
        .zip(vibrational)
        .map(|(e, f)| e + f)
        .collect())
}
