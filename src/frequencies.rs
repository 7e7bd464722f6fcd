//! Vibrational frequencies indexed by (volume, q-point, mode).

use crate::error::{QhaError, Result};

/// A dense, row-major 3-D array of mode frequencies in cm⁻¹.
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyArray {
    data: Vec<f64>,
    volumes: usize,
    q_points: usize,
    modes: usize,
}

impl FrequencyArray {
    pub fn new(volumes: usize, q_points: usize, modes: usize, data: Vec<f64>) -> Result<Self> {
        let expected = volumes * q_points * modes;
        if data.len() != expected {
            return Err(QhaError::shape(
                format!("{} x {} x {} = {} frequencies", volumes, q_points, modes, expected),
                format!("{} frequencies", data.len()),
            ));
        }
        Ok(FrequencyArray {
            data,
            volumes,
            q_points,
            modes,
        })
    }

    pub fn from_fn<F>(volumes: usize, q_points: usize, modes: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize) -> f64,
    {
        let mut data = Vec::with_capacity(volumes * q_points * modes);
        for v in 0..volumes {
            for q in 0..q_points {
                for m in 0..modes {
                    data.push(f(v, q, m));
                }
            }
        }
        FrequencyArray {
            data,
            volumes,
            q_points,
            modes,
        }
    }

    /// Build from nested vectors, rejecting ragged input.
    pub fn from_nested(nested: &[Vec<Vec<f64>>]) -> Result<Self> {
        let volumes = nested.len();
        let q_points = nested.first().map_or(0, |v| v.len());
        let modes = nested
            .first()
            .and_then(|v| v.first())
            .map_or(0, |q| q.len());

        let mut data = Vec::with_capacity(volumes * q_points * modes);
        for (i, per_volume) in nested.iter().enumerate() {
            if per_volume.len() != q_points {
                return Err(QhaError::shape(
                    format!("{} q-points at volume {}", q_points, i),
                    format!("{} q-points", per_volume.len()),
                ));
            }
            for (j, per_q) in per_volume.iter().enumerate() {
                if per_q.len() != modes {
                    return Err(QhaError::shape(
                        format!("{} modes at volume {}, q-point {}", modes, i, j),
                        format!("{} modes", per_q.len()),
                    ));
                }
                data.extend_from_slice(per_q);
            }
        }

        FrequencyArray::new(volumes, q_points, modes, data)
    }

    pub fn shape(&self) -> (usize, usize, usize) {
        (self.volumes, self.q_points, self.modes)
    }

    pub fn volumes(&self) -> usize {
        self.volumes
    }

    pub fn q_points(&self) -> usize {
        self.q_points
    }

    pub fn modes(&self) -> usize {
        self.modes
    }

    pub fn get(&self, volume: usize, q_point: usize, mode: usize) -> f64 {
        self.data[(volume * self.q_points + q_point) * self.modes + mode]
    }

    /// All modes at one (volume, q-point).
    pub fn modes_at(&self, volume: usize, q_point: usize) -> &[f64] {
        let start = (volume * self.q_points + q_point) * self.modes;
        &self.data[start..start + self.modes]
    }

    /// (volume, q-point, mode) of every negative frequency.
    pub fn negative_locations(&self) -> Vec<(usize, usize, usize)> {
        self.data
            .iter()
            .enumerate()
            .filter(|&(_, &w)| w < 0.0)
            .map(|(idx, _)| {
                let mode = idx % self.modes;
                let q_point = (idx / self.modes) % self.q_points;
                let volume = idx / (self.modes * self.q_points);
                (volume, q_point, mode)
            })
            .collect()
    }
}
