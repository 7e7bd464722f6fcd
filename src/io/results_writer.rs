//! Tables of results written to the output directory.

use crate::config::Property;
use crate::error::{QhaError, Result};
use crate::pipeline::{TemperaturePressureField, TemperatureVolumeField, TEMPERATURE_PADDING};
use crate::units::{bohr3_to_angstrom3, EnergyUnit};
use nalgebra::DMatrix;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Number of grid steps between two written rows or columns.
pub fn sample_stride(sample_step: f64, step: f64) -> usize {
    ((sample_step / step).round() as usize).max(1)
}

fn write_table<F>(
    path: &Path,
    corner: &str,
    row_labels: &[f64],
    rows: &[usize],
    column_labels: &[f64],
    columns: &[usize],
    value: F,
) -> Result<()>
where
    F: Fn(usize, usize) -> f64,
{
    let mut out = BufWriter::new(File::create(path)?);
    write!(out, "{:>14}", corner)?;
    for &j in columns {
        write!(out, " {:>18.6}", column_labels[j])?;
    }
    writeln!(out)?;
    for &i in rows {
        write!(out, "{:>14.4}", row_labels[i])?;
        for &j in columns {
            write!(out, " {:>18.10e}", value(i, j))?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    debug!("wrote {}", path.display());
    Ok(())
}

/// Writes (T, V) and (T, P) tables, dropping the padding temperatures.
#[derive(Debug, Clone)]
pub struct ResultsWriter {
    directory: PathBuf,
    energy_unit: EnergyUnit,
    formula_unit_number: usize,
    temperature_stride: usize,
    pressure_stride: usize,
}

impl ResultsWriter {
    pub fn new(
        directory: &Path,
        energy_unit: EnergyUnit,
        formula_unit_number: usize,
        temperature_stride: usize,
        pressure_stride: usize,
    ) -> Result<Self> {
        if formula_unit_number == 0 {
            return Err(QhaError::InvalidInput(
                "the number of formula units must be positive".to_string(),
            ));
        }
        fs::create_dir_all(directory)?;
        Ok(ResultsWriter {
            directory: directory.to_path_buf(),
            energy_unit,
            formula_unit_number,
            temperature_stride: temperature_stride.max(1),
            pressure_stride: pressure_stride.max(1),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn kept_temperatures(&self, count: usize) -> usize {
        count.saturating_sub(TEMPERATURE_PADDING)
    }

    /// Energy/K per cell to J/(mol K) per formula unit.
    fn per_mole(&self, value: f64) -> f64 {
        self.energy_unit.energy_to_j_mol(value) / self.formula_unit_number as f64
    }

    fn write_tv_table<F>(
        &self,
        name: &str,
        tv: &TemperatureVolumeField,
        volumes: &[f64],
        value: F,
    ) -> Result<PathBuf>
    where
        F: Fn(usize, usize) -> f64,
    {
        let path = self.directory.join(name);
        let kept = self.kept_temperatures(tv.temperatures().len());
        let rows: Vec<usize> = (0..kept).step_by(self.temperature_stride).collect();
        let angstrom: Vec<f64> = volumes.iter().map(|&v| bohr3_to_angstrom3(v)).collect();
        let columns: Vec<usize> = (0..volumes.len()).collect();
        write_table(&path, "T(K)\\V(A^3)", tv.temperatures(), &rows, &angstrom, &columns, value)?;
        Ok(path)
    }

    pub fn write_tv(&self, tv: &TemperatureVolumeField) -> Result<Vec<PathBuf>> {
        let unit = self.energy_unit;
        let fitted = tv.free_energies();
        let sparse = tv.sparse_free_energies();
        let pressures = tv.pressures();
        let entropy = tv.entropy();
        Ok(vec![
            self.write_tv_table("f_tv_fitted_ev_ang3.txt", tv, tv.volumes(), |i, j| {
                unit.energy_to_ev(fitted[(i, j)])
            })?,
            self.write_tv_table("f_tv_nonfitted_ev_ang3.txt", tv, tv.sparse_volumes(), |i, j| {
                unit.energy_to_ev(sparse[(i, j)])
            })?,
            self.write_tv_table("p_tv_gpa.txt", tv, tv.volumes(), |i, j| {
                unit.energy_per_bohr3_to_gpa(pressures[(i, j)])
            })?,
            self.write_tv_table("s_tv_j.txt", tv, tv.volumes(), |i, j| {
                self.per_mole(entropy[(i, j)])
            })?,
        ])
    }

    fn write_tp_table<F>(
        &self,
        name: &str,
        tp: &TemperaturePressureField,
        value: F,
    ) -> Result<PathBuf>
    where
        F: Fn(usize, usize) -> f64,
    {
        let path = self.directory.join(name);
        let kept = self.kept_temperatures(tp.temperatures().len());
        let rows: Vec<usize> = (0..kept).collect();
        let columns: Vec<usize> = (0..tp.pressures_gpa().len())
            .step_by(self.pressure_stride)
            .collect();
        write_table(
            &path,
            "T(K)\\P(GPa)",
            tp.temperatures(),
            &rows,
            tp.pressures_gpa(),
            &columns,
            value,
        )?;
        Ok(path)
    }

    fn write_scaled(
        &self,
        name: &str,
        tp: &TemperaturePressureField,
        field: &DMatrix<f64>,
        scale: impl Fn(f64) -> f64,
    ) -> Result<PathBuf> {
        self.write_tp_table(name, tp, |i, j| scale(field[(i, j)]))
    }

    pub fn write_tp(
        &self,
        tp: &TemperaturePressureField,
        properties: &[Property],
    ) -> Result<Vec<PathBuf>> {
        let unit = self.energy_unit;
        let mut written = Vec::new();
        for property in properties {
            match property {
                Property::F | Property::G | Property::H | Property::U => {
                    let (prefix, field) = match property {
                        Property::F => ("f", tp.free_energy()),
                        Property::G => ("g", tp.gibbs()),
                        Property::H => ("h", tp.enthalpy()),
                        _ => ("u", tp.internal_energy()),
                    };
                    let name = format!("{prefix}_tp_{}.txt", unit.as_str());
                    written.push(self.write_scaled(&name, tp, field, |x| x)?);
                }
                Property::V => {
                    written.push(self.write_scaled("v_tp_bohr3.txt", tp, tp.volume(), |x| x)?);
                    written.push(self.write_scaled(
                        "v_tp_ang3.txt",
                        tp,
                        tp.volume(),
                        bohr3_to_angstrom3,
                    )?);
                }
                Property::Cv => written.push(self.write_scaled(
                    "cv_tp_jmolk.txt",
                    tp,
                    tp.heat_capacity_v(),
                    |x| self.per_mole(x),
                )?),
                Property::Cp => written.push(self.write_scaled(
                    "cp_tp_jmolk.txt",
                    tp,
                    tp.heat_capacity_p(),
                    |x| self.per_mole(x),
                )?),
                Property::Bt => written.push(self.write_scaled(
                    "bt_tp_gpa.txt",
                    tp,
                    tp.bulk_modulus(),
                    |x| unit.energy_per_bohr3_to_gpa(x),
                )?),
                Property::Bs => written.push(self.write_scaled(
                    "bs_tp_gpa.txt",
                    tp,
                    tp.adiabatic_bulk_modulus(),
                    |x| unit.energy_per_bohr3_to_gpa(x),
                )?),
                Property::Btp => written.push(self.write_scaled(
                    "btp_tp.txt",
                    tp,
                    tp.bulk_modulus_derivative(),
                    |x| x,
                )?),
                Property::Alpha => written.push(self.write_scaled(
                    "alpha_tp.txt",
                    tp,
                    tp.thermal_expansion(),
                    |x| x,
                )?),
                Property::Gamma => written.push(self.write_scaled(
                    "gamma_tp.txt",
                    tp,
                    tp.gruneisen(),
                    |x| x,
                )?),
            }
        }
        Ok(written)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_stride() {
        assert_eq!(sample_stride(100.0, 10.0), 10);
        assert_eq!(sample_stride(1.0, 0.1), 10);
        assert_eq!(sample_stride(0.05, 0.1), 1);
    }

    #[test]
    fn test_table_layout() {
        let dir = std::env::temp_dir().join(format!("qha-table-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("table.txt");
        write_table(
            &path,
            "T(K)\\P(GPa)",
            &[0.0, 10.0, 20.0],
            &[0, 2],
            &[0.0, 1.0, 2.0, 3.0],
            &[0, 2],
            |i, j| (i * 10 + j) as f64,
        )
        .unwrap();
        let text = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("   T(K)\\P(GPa)"));
        let last: Vec<f64> = lines[2]
            .split_whitespace()
            .map(|t| t.parse().unwrap())
            .collect();
        assert_eq!(last, vec![20.0, 20.0, 22.0]);
        fs::remove_dir_all(&dir).unwrap();
    }
}
