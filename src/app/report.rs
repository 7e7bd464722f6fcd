use crate::pipeline::{TemperaturePressureField, TemperatureVolumeField, TEMPERATURE_PADDING};
use crate::units::{bohr3_to_angstrom3, EnergyUnit};
use tracing::info;

pub fn report_summary(
    tv: &TemperatureVolumeField,
    tp: &TemperaturePressureField,
    unit: EnergyUnit,
) {
    info!("\nQHA calculation finished.");
    info!(
        "Volume grid: {} input volumes refined to {} (expanded x {:.4})",
        tv.sparse_volumes().len(),
        tv.volumes().len(),
        tv.ratio()
    );

    let kept = tp.temperatures().len().saturating_sub(TEMPERATURE_PADDING);
    if kept == 0 || tp.pressures_gpa().is_empty() {
        return;
    }
    let last = kept - 1;

    info!("\nAt P = {:.2} GPa:", tp.pressures_gpa()[0]);
    for &i in &[0, last] {
        info!(
            "  T = {:>8.2} K: V = {:.4} A^3, G = {:.8} {}, Bt = {:.4} GPa, alpha = {:.4e} 1/K",
            tp.temperatures()[i],
            bohr3_to_angstrom3(tp.volume()[(i, 0)]),
            tp.gibbs()[(i, 0)],
            unit,
            unit.energy_per_bohr3_to_gpa(tp.bulk_modulus()[(i, 0)]),
            tp.thermal_expansion()[(i, 0)]
        );
    }
}
