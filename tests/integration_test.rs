//! End-to-end runs on the synthetic crystal under `demos/`
//!
//! Static energies follow a third-order Birch-Murnaghan EOS with V0 = 360 bohr^3,
//! B0 = 100 GPa and B0' = 4, so the low-temperature results can be checked
//! against those parameters.

use std::path::PathBuf;

#[cfg(test)]
mod integration_tests {
    use super::*;
    use qha::app::{compute_temperature_volume_field, load_inputs};
    use qha::config::Config;
    use qha::io::{read_input, ResultsWriter};
    use qha::pipeline::{TemperaturePressureField, TemperatureVolumeField, TEMPERATURE_PADDING};
    use qha::units::EnergyUnit;
    use qha::QhaError;

    fn demo_path(filename: &str) -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("demos")
            .join(filename)
    }

    fn demo_config(filename: &str) -> Config {
        let text = std::fs::read_to_string(demo_path(filename)).unwrap();
        let config = serde_yml::from_str::<Config>(&text).unwrap().with_defaults();
        config.validate().unwrap();
        config
    }

    fn run(config: &Config) -> (TemperatureVolumeField, TemperaturePressureField) {
        let input = load_inputs(config).unwrap();
        let tv = compute_temperature_volume_field(config, &input).unwrap();
        let tp = TemperaturePressureField::compute(&tv, &config.pipeline_settings()).unwrap();
        (tv, tp)
    }

    #[test]
    fn test_demo_input_file() {
        let data = read_input(&demo_path("input.txt")).unwrap();
        assert_eq!(data.formula_unit_number, 1);
        assert_eq!(data.volumes.len(), 6);
        assert_eq!(data.frequencies.shape(), (6, 2, 3));
        assert_eq!(data.q_weights, vec![0.25, 0.75]);
        assert!(data.volumes.windows(2).all(|w| w[0] > w[1]));
    }

    #[test]
    fn test_single_configuration_recovers_eos() {
        let config = demo_config("settings.yaml");
        let (tv, tp) = run(&config);

        assert_eq!(tv.temperatures().len(), 31 + TEMPERATURE_PADDING);
        assert_eq!(tp.pressures_gpa().len(), 101);
        assert!(tv.ratio() >= 1.0);

        // Zero-point motion shifts V0 and B0 only slightly.
        let v0 = tp.volume()[(0, 0)];
        assert!((v0 - 360.0).abs() / 360.0 < 0.02, "V0 = {v0}");
        let b0 = EnergyUnit::Ry.energy_per_bohr3_to_gpa(tp.bulk_modulus()[(0, 0)]);
        assert!((b0 - 100.0).abs() < 10.0, "B0 = {b0}");

        // Positive Gruneisen parameter: the crystal expands on heating.
        let last = 30;
        for i in 5..=last {
            assert!(tp.volume()[(i, 0)] >= tp.volume()[(i - 1, 0)]);
        }
        assert!(tp.thermal_expansion()[(15, 0)] > 0.0);
        assert!(tp.heat_capacity_p()[(15, 0)] >= tp.heat_capacity_v()[(15, 0)]);

        // Compression at fixed temperature.
        for j in 1..tp.pressures_gpa().len() {
            assert!(tp.volume()[(10, j)] < tp.volume()[(10, j - 1)]);
        }
    }

    #[test]
    fn test_duplicated_configurations_keep_volumes() {
        let single = demo_config("settings.yaml");
        let multi = demo_config("settings_multi.yaml");
        let (_, tp_single) = run(&single);
        let (tv_multi, tp_multi) = run(&multi);

        let kt_ln2 = EnergyUnit::Ry.boltzmann() * 200.0 * 2f64.ln();
        let row = 20;
        assert!((tv_multi.temperatures()[row] - 200.0).abs() < 1e-9);
        for j in (0..101).step_by(10) {
            let (vs, vm) = (tp_single.volume()[(row, j)], tp_multi.volume()[(row, j)]);
            assert!((vs - vm).abs() / vs < 1e-6, "{vs} != {vm}");
            let shift = tp_single.gibbs()[(row, j)] - tp_multi.gibbs()[(row, j)];
            assert!((shift - kt_ln2).abs() < 1e-7, "shift = {shift}");
        }
    }

    #[test]
    fn test_unreachable_pressure_is_reported() {
        let mut config = demo_config("settings.yaml");
        config.pressure.count = 2000;
        let input = load_inputs(&config).unwrap();
        let tv = compute_temperature_volume_field(&config, &input).unwrap();
        let err = TemperaturePressureField::compute(&tv, &config.pipeline_settings()).unwrap_err();
        assert!(err.is_configuration_range());
        match err {
            QhaError::PressureRangeTooHigh {
                suggested_max_count,
                ..
            } => assert!(suggested_max_count < 2000),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_results_are_written() {
        let config = demo_config("settings.yaml");
        let (tv, tp) = run(&config);
        let dir = std::env::temp_dir().join(format!("qha-integration-{}", std::process::id()));
        let writer = ResultsWriter::new(&dir, EnergyUnit::Ry, 1, 5, 10).unwrap();

        let mut written = writer.write_tv(&tv).unwrap();
        written.extend(writer.write_tp(&tp, &config.properties()).unwrap());
        for path in &written {
            assert!(path.exists(), "{} missing", path.display());
        }

        let v_table = std::fs::read_to_string(dir.join("v_tp_ang3.txt")).unwrap();
        let lines: Vec<&str> = v_table.lines().collect();
        // Header and one row per temperature, padding dropped.
        assert_eq!(lines.len(), 1 + 31);
        // Temperature column plus every tenth pressure.
        assert_eq!(lines[1].split_whitespace().count(), 1 + 11);

        let f_table = std::fs::read_to_string(dir.join("f_tv_fitted_ev_ang3.txt")).unwrap();
        // Rows 0, 50, ..., 300 K.
        assert_eq!(f_table.lines().count(), 1 + 7);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
