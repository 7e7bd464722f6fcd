mod report;
mod runner;

pub use runner::{compute_temperature_volume_field, load_inputs, LoadedInput};

use self::report::report_summary;
use crate::config::{Args, Config};
use crate::io::{init_logging, sample_stride, ResultsWriter, RunSummary};
use crate::pipeline::{TemperaturePressureField, TEMPERATURE_PADDING};
use crate::QhaError;
use clap::Parser;
use color_eyre::eyre::{Result, WrapErr};
use std::fs;
use std::path::Path;
use std::time::Instant;
use tracing::info;

pub struct QhaApplication {
    args: Args,
    config: Config,
}

impl QhaApplication {
    pub fn from_cli() -> Result<Self> {
        let args = Args::parse();
        let config = load_config(&args)?;
        Ok(Self { args, config })
    }

    pub fn run(self) -> Result<()> {
        init_logging(self.args.output.as_deref().map(Path::new));
        let started = Instant::now();
        let config = &self.config;
        let settings = config.pipeline_settings();

        let directory = config.output_directory();
        fs::create_dir_all(&directory).wrap_err_with(|| {
            format!("Unable to create output directory: {}", directory.display())
        })?;
        let mut summary = RunSummary::create(&directory.join("output.txt"))?;

        let temperatures = settings.temperature_axis();
        let pressures = settings.desired_pressures_gpa();
        let last_temperature = temperatures.len() - 1 - TEMPERATURE_PADDING;
        summary.ranges(
            (temperatures[0], temperatures[last_temperature]),
            (pressures[0], pressures[pressures.len() - 1]),
        )?;

        let input = load_inputs(config)?;
        let tv = compute_temperature_volume_field(config, &input)?;
        if config.high_verbosity() {
            summary.line(&format!(
                "The volume range used in this calculation expanded x {:6.4}",
                tv.ratio()
            ))?;
            let (floor, ceiling) = tv.reachable_pressures();
            let unit = settings.energy_unit;
            summary.line(&format!(
                "The pressure range can be dealt with: [{:6.2} to {:6.2}] GPa",
                unit.energy_per_bohr3_to_gpa(floor),
                unit.energy_per_bohr3_to_gpa(ceiling)
            ))?;
        }

        let tp = match TemperaturePressureField::compute(&tv, &settings) {
            Ok(tp) => tp,
            Err(err) => {
                if let QhaError::PressureRangeTooHigh {
                    suggested_max_count,
                    ..
                } = &err
                {
                    summary.line(&format!(
                        "!!!ATTENTION!!! DESIRED PRESSURE is too high, try a pressure count below {}",
                        suggested_max_count
                    ))?;
                } else if err.is_configuration_range() {
                    summary.line("!!!ATTENTION!!! DESIRED PRESSURE is below the volume grid")?;
                }
                return Err(err).wrap_err("Desired pressures cannot be reached");
            }
        };
        summary.line("DESIRED PRESSURE setting is okay!")?;

        let writer = ResultsWriter::new(
            &directory,
            settings.energy_unit,
            input.formula_unit_number,
            sample_stride(config.temperature_sample_step(), settings.temperature_step),
            sample_stride(config.pressure_sample_step(), settings.pressure_step),
        )?;
        let mut written = writer.write_tv(&tv)?;
        written.extend(writer.write_tp(&tp, &config.properties())?);
        info!(
            "Wrote {} result files to {}",
            written.len(),
            writer.directory().display()
        );

        report_summary(&tv, &tp, settings.energy_unit);
        summary.finish(started.elapsed().as_secs_f64())?;
        Ok(())
    }
}

fn load_config(args: &Args) -> Result<Config> {
    let config_content = fs::read_to_string(&args.config_file)
        .wrap_err_with(|| format!("Unable to read configuration file: {}", args.config_file))?;

    let config = serde_yml::from_str::<Config>(&config_content)
        .wrap_err("Failed to parse configuration file")?
        .with_defaults()
        .apply_args(args)?;
    config.validate().wrap_err("Invalid configuration")?;

    Ok(config)
}
