//! Settings of a QHA run
//!
//! Settings are read from a versioned YAML document. Every section rejects
//! unknown keys; optional values are filled by `with_defaults()`.

mod args;

pub use args::Args;

use crate::error::{QhaError, Result};
use crate::fitting::EosOrder;
use crate::multi_config::DEFAULT_PRECISION;
use crate::pipeline::PipelineSettings;
use crate::units::EnergyUnit;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// The only settings layout understood by this version.
pub const CONFIG_VERSION: u32 = 1;

/// Main settings structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub version: u32,
    pub calculation: Option<CalculationKind>,
    pub input: InputSource,
    pub energy_unit: Option<EnergyUnit>,
    pub static_only: Option<bool>,
    /// Bits of the arbitrary-precision floats used for configuration sums
    pub precision: Option<u32>,
    pub temperature: TemperatureParams,
    pub pressure: PressureParams,
    pub eos: Option<EosParams>,
    pub output: Option<OutputParams>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CalculationKind {
    #[default]
    Single,
    SamePhononDos,
    DifferentPhononDos,
}

/// One input file, or one file per configuration with its degeneracy
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum InputSource {
    Single(PathBuf),
    Configurations(Vec<ConfigurationInput>),
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigurationInput {
    pub path: PathBuf,
    pub degeneracy: f64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TemperatureParams {
    pub min: Option<f64>,
    pub step: f64,
    pub count: usize,
    pub sample_step: Option<f64>,
}

impl TemperatureParams {
    pub fn with_defaults(mut self) -> Self {
        if self.min.is_none() {
            self.min = Some(0.0);
        }
        if self.sample_step.is_none() {
            self.sample_step = Some(10.0);
        }
        self
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PressureParams {
    pub min: f64,
    pub step: Option<f64>,
    /// Number of pressures, also the number of points of the dense volume grid
    pub count: usize,
    pub sample_step: Option<f64>,
    pub min_modifier: Option<f64>,
}

impl PressureParams {
    pub fn with_defaults(mut self) -> Self {
        if self.step.is_none() {
            self.step = Some(0.1);
        }
        if self.sample_step.is_none() {
            self.sample_step = Some(1.0);
        }
        if self.min_modifier.is_none() {
            self.min_modifier = Some(1.0);
        }
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EosParams {
    pub order: Option<EosOrder>,
    pub volume_ratio: Option<f64>,
}

impl EosParams {
    pub fn with_defaults(mut self) -> Self {
        if self.order.is_none() {
            self.order = Some(EosOrder::Third);
        }
        self
    }
}

/// Tables that can be written on the (T, P) grid
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum Property {
    F,
    G,
    H,
    U,
    V,
    Cv,
    Cp,
    Bt,
    Btp,
    Bs,
    #[serde(rename = "alpha")]
    Alpha,
    #[serde(rename = "gamma")]
    Gamma,
}

impl Property {
    pub const ALL: [Property; 12] = [
        Property::F,
        Property::G,
        Property::H,
        Property::U,
        Property::V,
        Property::Cv,
        Property::Cp,
        Property::Bt,
        Property::Btp,
        Property::Bs,
        Property::Alpha,
        Property::Gamma,
    ];
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct OutputParams {
    pub directory: Option<PathBuf>,
    pub properties: Option<Vec<Property>>,
    pub high_verbosity: Option<bool>,
}

impl OutputParams {
    pub fn with_defaults(mut self) -> Self {
        if self.directory.is_none() {
            self.directory = Some(PathBuf::from("./results"));
        }
        if self.properties.is_none() {
            self.properties = Some(Property::ALL.to_vec());
        }
        if self.high_verbosity.is_none() {
            self.high_verbosity = Some(false);
        }
        self
    }
}

impl Config {
    /// Apply default values to any missing parameters
    pub fn with_defaults(mut self) -> Self {
        if self.calculation.is_none() {
            self.calculation = Some(CalculationKind::default());
        }
        if self.energy_unit.is_none() {
            self.energy_unit = Some(EnergyUnit::default());
        }
        if self.static_only.is_none() {
            self.static_only = Some(false);
        }
        if self.precision.is_none() {
            self.precision = Some(DEFAULT_PRECISION);
        }
        self.temperature = self.temperature.with_defaults();
        self.pressure = self.pressure.with_defaults();
        self.eos = Some(self.eos.unwrap_or_default().with_defaults());
        self.output = Some(self.output.unwrap_or_default().with_defaults());
        self
    }

    /// Override settings with the ones given on the command line
    pub fn apply_args(mut self, args: &Args) -> Result<Self> {
        if args.static_only {
            self.static_only = Some(true);
        }
        let mut eos = self.eos.take().unwrap_or_default();
        if let Some(order) = args.order {
            eos.order = Some(EosOrder::try_from(order)?);
        }
        if args.volume_ratio.is_some() {
            eos.volume_ratio = args.volume_ratio;
        }
        self.eos = Some(eos);
        if let Some(directory) = &args.output_directory {
            let mut output = self.output.take().unwrap_or_default();
            output.directory = Some(PathBuf::from(directory));
            self.output = Some(output);
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<()> {
        if self.version != CONFIG_VERSION {
            return Err(QhaError::InvalidInput(format!(
                "unsupported settings version {}, expected {CONFIG_VERSION}",
                self.version
            )));
        }
        let single_input = matches!(self.input, InputSource::Single(_));
        if single_input != (self.calculation() == CalculationKind::Single) {
            return Err(QhaError::InvalidInput(
                "single calculations take one input path, multi-configuration ones a list of {path, degeneracy}"
                    .to_string(),
            ));
        }
        if self.temperature_sample_step() <= 0.0 || self.pressure_sample_step() <= 0.0 {
            return Err(QhaError::InvalidInput(
                "sample steps must be positive".to_string(),
            ));
        }
        self.pipeline_settings().validate()
    }

    pub fn calculation(&self) -> CalculationKind {
        self.calculation.unwrap_or_default()
    }

    pub fn energy_unit(&self) -> EnergyUnit {
        self.energy_unit.unwrap_or_default()
    }

    pub fn static_only(&self) -> bool {
        self.static_only.unwrap_or(false)
    }

    pub fn precision(&self) -> u32 {
        self.precision.unwrap_or(DEFAULT_PRECISION)
    }

    pub fn order(&self) -> EosOrder {
        self.eos.as_ref().and_then(|e| e.order).unwrap_or_default()
    }

    pub fn volume_ratio(&self) -> Option<f64> {
        self.eos.as_ref().and_then(|e| e.volume_ratio)
    }

    pub fn temperature_sample_step(&self) -> f64 {
        self.temperature.sample_step.unwrap_or(10.0)
    }

    pub fn pressure_step(&self) -> f64 {
        self.pressure.step.unwrap_or(0.1)
    }

    pub fn pressure_sample_step(&self) -> f64 {
        self.pressure.sample_step.unwrap_or(1.0)
    }

    pub fn output_directory(&self) -> PathBuf {
        self.output
            .as_ref()
            .and_then(|o| o.directory.clone())
            .unwrap_or_else(|| PathBuf::from("./results"))
    }

    pub fn properties(&self) -> Vec<Property> {
        self.output
            .as_ref()
            .and_then(|o| o.properties.clone())
            .unwrap_or_else(|| Property::ALL.to_vec())
    }

    pub fn high_verbosity(&self) -> bool {
        self.output
            .as_ref()
            .and_then(|o| o.high_verbosity)
            .unwrap_or(false)
    }

    pub fn pipeline_settings(&self) -> PipelineSettings {
        PipelineSettings {
            energy_unit: self.energy_unit(),
            temperature_min: self.temperature.min.unwrap_or(0.0),
            temperature_step: self.temperature.step,
            temperature_count: self.temperature.count,
            pressure_min: self.pressure.min,
            pressure_step: self.pressure_step(),
            pressure_count: self.pressure.count,
            pressure_min_modifier: self.pressure.min_modifier.unwrap_or(1.0),
            order: self.order(),
            volume_ratio: self.volume_ratio(),
        }
    }
}
