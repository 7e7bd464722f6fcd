use super::*;
use crate::fitting::EosOrder;
use crate::free_energy::free_energy;
use crate::statmech::HarmonicOscillator;
use crate::units::EnergyUnit;
use approx::assert_relative_eq;

const VOLUMES: [f64; 6] = [320.5, 311.5, 302.6, 293.8, 285.2, 276.7];

fn configuration(energy_shift: f64, degeneracy: f64) -> Configuration {
    let static_energies = VOLUMES
        .iter()
        .map(|v| -10.0 + 2.0e-4 * (v - 300.0).powi(2) + energy_shift)
        .collect();
    let frequencies = FrequencyArray::from_fn(VOLUMES.len(), 3, 4, |v, q, m| {
        if q == 0 && m < 2 {
            0.0
        } else {
            150.0 + 12.0 * v as f64 + 35.0 * q as f64 + 80.0 * m as f64
        }
    });
    Configuration {
        volumes: VOLUMES.to_vec(),
        static_energies,
        frequencies,
        q_weights: vec![1.0, 6.0, 12.0],
        degeneracy,
    }
}

fn duplicated(n: usize) -> ConfigurationSet {
    let g = 1.0 / n as f64;
    ConfigurationSet::new((0..n).map(|_| configuration(0.0, g)).collect()).unwrap()
}

fn single_reference(temperature: f64, static_only: bool) -> Vec<f64> {
    let c = configuration(0.0, 1.0);
    free_energy(
        temperature,
        &c.q_weights,
        &c.static_energies,
        &c.frequencies,
        static_only,
        &HarmonicOscillator::new(EnergyUnit::Ry),
    )
    .unwrap()
}

#[test]
fn test_different_dos_duplicates_reproduce_single_configuration() {
    for n in [1, 3, 7] {
        let set = duplicated(n);
        let combiner = DifferentPhononDos::new(
            &set,
            EnergyUnit::Ry,
            EosOrder::Third,
            false,
            BigFloatContext::default(),
        );
        for &t in &[10.0, 300.0, 2000.0] {
            let combined = combiner.free_energy(t).unwrap();
            let single = single_reference(t, false);
            for (c, s) in combined.iter().zip(single.iter()) {
                assert_relative_eq!(c, s, max_relative = 1e-12);
            }
        }
    }
}

#[test]
fn test_same_dos_duplicates_reproduce_single_configuration() {
    let set = duplicated(4);
    let combiner = SamePhononDos::new(
        &set,
        EnergyUnit::Ry,
        EosOrder::Third,
        false,
        BigFloatContext::default(),
    )
    .unwrap();
    for &t in &[10.0, 300.0, 2000.0] {
        let single = single_reference(t, false);
        let direct = combiner.free_energy(t).unwrap();
        let from_z = combiner.free_energy_from_partition_function(t).unwrap();
        for j in 0..single.len() {
            assert_relative_eq!(direct[j], single[j], max_relative = 1e-12);
            assert_relative_eq!(from_z[j], single[j], max_relative = 1e-10);
        }
    }
}

#[test]
fn test_same_dos_static_only_skips_harmonic_part() {
    let set = duplicated(2);
    let combiner = SamePhononDos::new(
        &set,
        EnergyUnit::Ry,
        EosOrder::Third,
        true,
        BigFloatContext::default(),
    )
    .unwrap();
    let static_energies = configuration(0.0, 1.0).static_energies;
    for &t in &[0.0, 1.0, 2.0] {
        let f = combiner.free_energy(t).unwrap();
        for (a, b) in f.iter().zip(static_energies.iter()) {
            assert_relative_eq!(a, b, max_relative = 1e-12);
        }
    }
}

#[test]
fn test_large_energy_spread_stays_finite() {
    // Separated by far more than 700 k_BT at 10 K.
    let set = ConfigurationSet::new(vec![configuration(0.0, 1.0), configuration(5.0, 3.0)])
        .unwrap();
    let combiner = DifferentPhononDos::new(
        &set,
        EnergyUnit::Ry,
        EosOrder::Third,
        false,
        BigFloatContext::default(),
    );
    let combined = combiner.free_energy(10.0).unwrap();
    let lowest = single_reference(10.0, false);
    for (c, s) in combined.iter().zip(lowest.iter()) {
        assert!(c.is_finite());
        assert_relative_eq!(c, s, max_relative = 1e-12);
    }
}

#[test]
fn test_different_dos_near_zero_kelvin_uses_one_kelvin() {
    // The k_BT ln 2 of the ground configuration makes the result depend on T.
    let set = ConfigurationSet::new(vec![configuration(0.0, 2.0), configuration(1e-3, 1.0)])
        .unwrap();
    let combiner = DifferentPhononDos::new(
        &set,
        EnergyUnit::Ry,
        EosOrder::Third,
        false,
        BigFloatContext::default(),
    );
    let at_one_kelvin = combiner.free_energy(1.0).unwrap();
    for &t in &[0.0, 0.05, 0.0999] {
        let f = combiner.free_energy(t).unwrap();
        assert_eq!(f, at_one_kelvin);
    }
    assert!(at_one_kelvin.iter().all(|f| f.is_finite()));
    assert_ne!(combiner.free_energy(0.1).unwrap(), at_one_kelvin);
}

#[test]
fn test_same_dos_keeps_tiny_temperatures() {
    let set = ConfigurationSet::new(vec![configuration(0.0, 1.0), configuration(1e-3, 2.0)])
        .unwrap();
    let combiner = SamePhononDos::new(
        &set,
        EnergyUnit::Ry,
        EosOrder::Third,
        true,
        BigFloatContext::default(),
    )
    .unwrap();
    // At 1e-6 K the excited configuration is frozen out and the degeneracy term is negligible.
    let at_zero = combiner.free_energy(0.0).unwrap();
    assert_eq!(at_zero, combiner.free_energy(TEMPERATURE_FLOOR).unwrap());
    for (f, e) in at_zero.iter().zip(configuration(0.0, 1.0).static_energies.iter()) {
        assert_relative_eq!(f, e, max_relative = 1e-12);
    }
}

#[test]
fn test_degeneracy_lowers_free_energy_by_entropy() {
    let set = ConfigurationSet::new(vec![configuration(0.0, 2.0), configuration(0.0, 2.0)])
        .unwrap();
    let combiner = DifferentPhononDos::new(
        &set,
        EnergyUnit::Ry,
        EosOrder::Third,
        false,
        BigFloatContext::default(),
    );
    let t = 500.0;
    let kt = EnergyUnit::Ry.boltzmann() * t;
    let combined = combiner.free_energy(t).unwrap();
    let single = single_reference(t, false);
    for (c, s) in combined.iter().zip(single.iter()) {
        assert_relative_eq!(*c, s - kt * 4.0_f64.ln(), max_relative = 1e-12);
    }
}

#[test]
fn test_negative_degeneracy_rejected() {
    let result = ConfigurationSet::new(vec![configuration(0.0, 1.0), configuration(0.1, -1.0)]);
    assert!(matches!(result, Err(QhaError::InvalidInput(_))));
}

#[test]
fn test_all_zero_degeneracies_rejected() {
    let result = ConfigurationSet::new(vec![configuration(0.0, 0.0), configuration(0.1, 0.0)]);
    assert!(matches!(result, Err(QhaError::InvalidInput(_))));
}

#[test]
fn test_negative_weights_rejected() {
    let mut c = configuration(0.0, 1.0);
    c.q_weights[1] = -2.0;
    assert!(matches!(
        ConfigurationSet::new(vec![c]),
        Err(QhaError::InvalidInput(_))
    ));
}

#[test]
fn test_mismatched_frequency_volumes_rejected() {
    let mut c = configuration(0.0, 1.0);
    c.static_energies.pop();
    assert!(matches!(
        ConfigurationSet::new(vec![c]),
        Err(QhaError::Shape { .. })
    ));
}

#[test]
fn test_same_dos_rejects_different_frequency_shapes() {
    let mut other = configuration(0.1, 1.0);
    other.frequencies = FrequencyArray::from_fn(VOLUMES.len(), 3, 5, |_, _, _| 200.0);
    let set = ConfigurationSet::new(vec![configuration(0.0, 1.0), other]).unwrap();
    let result = SamePhononDos::new(
        &set,
        EnergyUnit::Ry,
        EosOrder::Third,
        false,
        BigFloatContext::default(),
    );
    assert!(matches!(result, Err(QhaError::Shape { .. })));
}

#[test]
fn test_precision_outside_backend_range() {
    assert!(matches!(
        BigFloatContext::new(0),
        Err(QhaError::NumericPrecision(_))
    ));
    assert_eq!(BigFloatContext::new(128).unwrap().precision(), 128);
    assert_eq!(BigFloatContext::default().precision(), DEFAULT_PRECISION);
}
