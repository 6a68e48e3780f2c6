use serde_derive::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_positive, EngineError};

// ---------------------------------------------------------------------------
// Exponential atmosphere
// ---------------------------------------------------------------------------

/// Altitude above which drag is ignored, km.
pub const DEFAULT_DRAG_CUTOFF: f64 = 500.0;

/// Single-layer exponential density model:
/// `rho(h) = rho0 * exp(-(h - h0) / H)` below the cutoff altitude, zero above.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExponentialAtmosphere {
    pub reference_altitude: f64, // km
    pub reference_density: f64,  // kg/m^3
    pub scale_height: f64,       // km
    #[serde(default = "default_cutoff")]
    pub cutoff_altitude: f64,    // km
}

fn default_cutoff() -> f64 {
    DEFAULT_DRAG_CUTOFF
}

impl ExponentialAtmosphere {
    pub fn new(reference_altitude: f64, reference_density: f64, scale_height: f64) -> Self {
        Self {
            reference_altitude,
            reference_density,
            scale_height,
            cutoff_altitude: DEFAULT_DRAG_CUTOFF,
        }
    }

    /// Upper thermosphere fit for Earth (Vallado, 400 km layer).
    pub fn earth() -> Self {
        Self::new(400.0, 2.803e-12, 58.515)
    }

    pub fn with_cutoff(mut self, cutoff_altitude: f64) -> Self {
        self.cutoff_altitude = cutoff_altitude;
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        ensure_finite(self.reference_altitude, "atmosphere reference altitude")?;
        ensure_positive(self.reference_density, "atmosphere reference density")?;
        ensure_positive(self.scale_height, "atmosphere scale height")?;
        ensure_finite(self.cutoff_altitude, "atmosphere cutoff altitude")
    }

    /// Density in kg/m^3 at the given altitude (km). Negative altitudes clamp to zero.
    pub fn density(&self, altitude: f64) -> f64 {
        let h = altitude.max(0.0);
        if h > self.cutoff_altitude {
            return 0.0;
        }
        self.reference_density * (-(h - self.reference_altitude) / self.scale_height).exp()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_density_at_reference_altitude() {
        let atm = ExponentialAtmosphere::earth();
        assert!((atm.density(400.0) - 2.803e-12).abs() < 1e-18);
    }

    #[test]
    fn density_monotonically_decreases() {
        let atm = ExponentialAtmosphere::earth();
        let rho_200 = atm.density(200.0);
        let rho_300 = atm.density(300.0);
        let rho_450 = atm.density(450.0);
        assert!(rho_200 > rho_300);
        assert!(rho_300 > rho_450);
        assert!(rho_450 > 0.0);
    }

    #[test]
    fn vacuum_above_cutoff() {
        let atm = ExponentialAtmosphere::earth();
        assert_eq!(atm.density(500.1), 0.0);
        assert_eq!(atm.with_cutoff(1000.0).density(500.1) > 0.0, true);
    }

    #[test]
    fn negative_altitude_clamps() {
        let atm = ExponentialAtmosphere::earth();
        assert_eq!(atm.density(-10.0), atm.density(0.0));
    }

    #[test]
    fn rejects_bad_scale_height() {
        let atm = ExponentialAtmosphere::new(0.0, 1.2, 0.0);
        assert!(atm.validate().is_err());
    }
}
