//! Eulerian finite strain with respect to a reference volume.
//!
//! f = ½((V₀/V)^(2/3) − 1) and its inverse V = V₀(2f + 1)^(−3/2).
//! Smaller volumes have larger strains.

/// Eulerian strain of `volume` with respect to `reference_volume`.
pub fn eulerian_strain(reference_volume: f64, volume: f64) -> f64 {
    0.5 * ((reference_volume / volume).powf(2.0 / 3.0) - 1.0)
}

/// Volume corresponding to `strain` with respect to `reference_volume`.
pub fn from_eulerian_strain(reference_volume: f64, strain: f64) -> f64 {
    reference_volume * (2.0 * strain + 1.0).powf(-1.5)
}

/// Coordinate change between volumes and strains for one fixed reference volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StrainTransform {
    reference_volume: f64,
}

impl StrainTransform {
    pub fn new(reference_volume: f64) -> Self {
        StrainTransform { reference_volume }
    }

    pub fn to_strain(&self, volume: f64) -> f64 {
        eulerian_strain(self.reference_volume, volume)
    }

    pub fn to_volume(&self, strain: f64) -> f64 {
        from_eulerian_strain(self.reference_volume, strain)
    }

    pub fn strains(&self, volumes: &[f64]) -> Vec<f64> {
        volumes.iter().map(|&v| self.to_strain(v)).collect()
    }

    pub fn volumes(&self, strains: &[f64]) -> Vec<f64> {
        strains.iter().map(|&f| self.to_volume(f)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_round_trip() {
        for &v0 in &[50.0, 320.5, 1200.0] {
            for &v in &[20.0, 293.8, 320.5, 400.0, 2500.0] {
                let f = eulerian_strain(v0, v);
                assert_relative_eq!(from_eulerian_strain(v0, f), v, max_relative = 1e-12);
            }
        }
    }

    #[test]
    fn test_reference_has_zero_strain() {
        let transform = StrainTransform::new(320.5);
        assert_eq!(transform.to_strain(320.5), 0.0);
        assert_eq!(transform.to_volume(0.0), 320.5);
    }

    #[test]
    fn test_compression_increases_strain() {
        let transform = StrainTransform::new(320.5);
        let strains = transform.strains(&[320.5, 311.5, 302.6, 293.8]);
        assert!(strains.windows(2).all(|w| w[1] > w[0]));
        assert!(transform.to_strain(400.0) < 0.0);
    }
}
