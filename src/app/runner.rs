use crate::config::{CalculationKind, Config, InputSource};
use crate::io::{read_input, InputData};
use crate::multi_config::{BigFloatContext, ConfigurationSet, DifferentPhononDos, SamePhononDos};
use crate::pipeline::{
    find_negative_frequencies, HelmholtzCalculator, SingleConfiguration, TemperatureVolumeField,
};
use color_eyre::eyre::{eyre, Result, WrapErr};
use std::path::Path;
use tracing::info;

/// Parsed inputs of a run, one configuration per input file.
pub struct LoadedInput {
    pub formula_unit_number: usize,
    pub configurations: ConfigurationSet,
}

fn read_one(path: &Path) -> Result<InputData> {
    info!("Reading input file: {}", path.display());
    read_input(path).wrap_err_with(|| format!("Unable to read input file: {}", path.display()))
}

pub fn load_inputs(config: &Config) -> Result<LoadedInput> {
    let entries: Vec<(&Path, f64)> = match &config.input {
        InputSource::Single(path) => vec![(path.as_path(), 1.0)],
        InputSource::Configurations(list) => list
            .iter()
            .map(|c| (c.path.as_path(), c.degeneracy))
            .collect(),
    };

    let mut formula_unit_number = None;
    let mut configurations = Vec::with_capacity(entries.len());
    for (path, degeneracy) in entries {
        let data = read_one(path)?;
        match formula_unit_number {
            None => formula_unit_number = Some(data.formula_unit_number),
            Some(nm) if nm != data.formula_unit_number => {
                return Err(eyre!(
                    "{} declares {} formula units, previous inputs declare {}",
                    path.display(),
                    data.formula_unit_number,
                    nm
                ));
            }
            Some(_) => {}
        }
        let label = path.display().to_string();
        let negatives = find_negative_frequencies(&label, &data.frequencies);
        if negatives > 0 {
            info!(
                "{} negative frequencies in {} are treated as zero",
                negatives, label
            );
        }
        configurations.push(data.into_configuration(degeneracy));
    }

    let configurations =
        ConfigurationSet::new(configurations).wrap_err("Inconsistent input configurations")?;
    Ok(LoadedInput {
        formula_unit_number: formula_unit_number.unwrap_or(1),
        configurations,
    })
}

/// Free energies, dense grid and every (T, V) property for the configured calculation.
pub fn compute_temperature_volume_field(
    config: &Config,
    input: &LoadedInput,
) -> Result<TemperatureVolumeField> {
    let settings = config.pipeline_settings();
    let unit = config.energy_unit();
    let order = config.order();
    let static_only = config.static_only();

    let field = match config.calculation() {
        CalculationKind::Single => {
            info!("Single-configuration calculation");
            let calculator = SingleConfiguration::new(
                &input.configurations.configurations()[0],
                unit,
                static_only,
            );
            compute_with(&settings, &calculator)
        }
        CalculationKind::SamePhononDos => {
            info!(
                "Multi-configuration calculation with the same phonon DOS ({} configurations)",
                input.configurations.len()
            );
            let context = BigFloatContext::new(config.precision())?;
            let calculator =
                SamePhononDos::new(&input.configurations, unit, order, static_only, context)?;
            compute_with(&settings, &calculator)
        }
        CalculationKind::DifferentPhononDos => {
            info!(
                "Multi-configuration calculation with different phonon DOS ({} configurations)",
                input.configurations.len()
            );
            let context = BigFloatContext::new(config.precision())?;
            let calculator =
                DifferentPhononDos::new(&input.configurations, unit, order, static_only, context);
            compute_with(&settings, &calculator)
        }
    };
    field.wrap_err("Free energy calculation failed")
}

fn compute_with(
    settings: &crate::pipeline::PipelineSettings,
    calculator: &dyn HelmholtzCalculator,
) -> crate::Result<TemperatureVolumeField> {
    TemperatureVolumeField::compute(settings, calculator)
}
