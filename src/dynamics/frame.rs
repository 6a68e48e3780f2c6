use nalgebra::Vector3;
use serde_derive::{Deserialize, Serialize};

use crate::error::EngineError;

/// Delta-v expressed in the local radial/normal/prograde frame (km/s).
///
/// Component order is always (radial, normal, prograde).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RnpVector {
    pub radial: f64,
    pub normal: f64,
    pub prograde: f64,
}

impl RnpVector {
    pub fn new(radial: f64, normal: f64, prograde: f64) -> Self {
        Self { radial, normal, prograde }
    }

    pub fn prograde(dv: f64) -> Self {
        Self::new(0.0, 0.0, dv)
    }

    pub fn magnitude(&self) -> f64 {
        (self.radial.powi(2) + self.normal.powi(2) + self.prograde.powi(2)).sqrt()
    }

    pub fn is_finite(&self) -> bool {
        self.radial.is_finite() && self.normal.is_finite() && self.prograde.is_finite()
    }
}

/// Orthonormal RNP basis at a position/velocity pair.
///
/// `radial = r/|r|`, `normal = (r x v)/|r x v|`, `prograde = normal x radial`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RnpFrame {
    pub radial: Vector3<f64>,
    pub normal: Vector3<f64>,
    pub prograde: Vector3<f64>,
}

impl RnpFrame {
    pub fn from_state(pos: &Vector3<f64>, vel: &Vector3<f64>) -> Result<Self, EngineError> {
        let h = pos.cross(vel);
        let r = pos.norm();
        let h_mag = h.norm();
        if !(r > 0.0 && h_mag > 1e-12 * r * vel.norm().max(1e-12)) || !h_mag.is_finite() {
            return Err(EngineError::InvalidInput {
                reason: "RNP frame undefined for zero radius or radial velocity".into(),
            });
        }
        let radial = pos / r;
        let normal = h / h_mag;
        let prograde = normal.cross(&radial);
        Ok(Self { radial, normal, prograde })
    }

    pub fn to_inertial(&self, dv: &RnpVector) -> Vector3<f64> {
        self.radial * dv.radial + self.normal * dv.normal + self.prograde * dv.prograde
    }

    pub fn to_rnp(&self, v: &Vector3<f64>) -> RnpVector {
        RnpVector::new(self.radial.dot(v), self.normal.dot(v), self.prograde.dot(v))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn circular_equatorial_basis() {
        let f = RnpFrame::from_state(&Vector3::new(7000.0, 0.0, 0.0), &Vector3::new(0.0, 7.5, 0.0)).unwrap();
        assert_eq!(f.radial, Vector3::x());
        assert_eq!(f.normal, Vector3::z());
        assert_eq!(f.prograde, Vector3::y());
    }

    #[test]
    fn basis_is_orthonormal_for_eccentric_state() {
        let f = RnpFrame::from_state(&Vector3::new(7000.0, 1200.0, -300.0), &Vector3::new(1.1, 7.2, 2.0)).unwrap();
        for v in [f.radial, f.normal, f.prograde] {
            assert!((v.norm() - 1.0).abs() < 1e-12);
        }
        assert!(f.radial.dot(&f.normal).abs() < 1e-12);
        assert!(f.radial.dot(&f.prograde).abs() < 1e-12);
        assert!(f.normal.dot(&f.prograde).abs() < 1e-12);
    }

    #[test]
    fn rnp_inertial_inverse() {
        let f = RnpFrame::from_state(&Vector3::new(7000.0, 1200.0, -300.0), &Vector3::new(1.1, 7.2, 2.0)).unwrap();
        let dv = RnpVector::new(0.01, -0.02, 0.3);
        let back = f.to_rnp(&f.to_inertial(&dv));
        assert!((back.radial - dv.radial).abs() < 1e-14);
        assert!((back.normal - dv.normal).abs() < 1e-14);
        assert!((back.prograde - dv.prograde).abs() < 1e-14);
        assert!((dv.magnitude() - f.to_inertial(&dv).norm()).abs() < 1e-14);
    }

    #[test]
    fn radial_trajectory_has_no_frame() {
        assert!(RnpFrame::from_state(&Vector3::new(7000.0, 0.0, 0.0), &Vector3::new(3.0, 0.0, 0.0)).is_err());
        assert!(RnpFrame::from_state(&Vector3::zeros(), &Vector3::new(0.0, 7.0, 0.0)).is_err());
    }
}
