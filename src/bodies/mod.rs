//! Massive bodies: the central body a satellite orbits and the third bodies perturbing it.

pub mod catalog;

use nalgebra::Vector3;
use serde_derive::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_positive, EngineError};
use crate::physics::atmosphere::ExponentialAtmosphere;

/// NAIF-style integer identifier (399 = Earth, 301 = Moon, ...).
pub type BodyId = i32;

fn zero_vector() -> Vector3<f64> {
    Vector3::zeros()
}

/// Body a satellite orbits. Immutable for the duration of a tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CentralBody {
    pub id: BodyId,
    pub name: String,
    pub mu: f64,                     // km^3/s^2
    pub radius: f64,                 // km, equatorial
    pub j2: Option<f64>,
    #[serde(default)]
    pub rotation_rate: f64,          // rad/s about +Z
    #[serde(default)]
    pub prime_meridian: f64,         // rad, body-fixed X offset at the reference time
    #[serde(default)]
    pub atmosphere: Option<ExponentialAtmosphere>,
    #[serde(default = "zero_vector")]
    pub position: Vector3<f64>,      // km, outer inertial frame
    #[serde(default = "zero_vector")]
    pub velocity: Vector3<f64>,      // km/s, outer inertial frame
}

impl CentralBody {
    pub fn new(id: BodyId, name: impl Into<String>, mu: f64, radius: f64) -> Result<Self, EngineError> {
        let body = Self {
            id,
            name: name.into(),
            mu,
            radius,
            j2: None,
            rotation_rate: 0.0,
            prime_meridian: 0.0,
            atmosphere: None,
            position: Vector3::zeros(),
            velocity: Vector3::zeros(),
        };
        body.validate()?;
        Ok(body)
    }

    pub fn with_j2(mut self, j2: f64) -> Self {
        self.j2 = Some(j2);
        self
    }

    pub fn with_rotation(mut self, rotation_rate: f64, prime_meridian: f64) -> Self {
        self.rotation_rate = rotation_rate;
        self.prime_meridian = prime_meridian;
        self
    }

    pub fn with_atmosphere(mut self, atmosphere: ExponentialAtmosphere) -> Self {
        self.atmosphere = Some(atmosphere);
        self
    }

    pub fn with_state(mut self, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        self.position = position;
        self.velocity = velocity;
        self
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        ensure_positive(self.mu, "central body mu")?;
        ensure_positive(self.radius, "central body radius")?;
        if let Some(j2) = self.j2 {
            ensure_finite(j2, "central body j2")?;
        }
        ensure_finite(self.rotation_rate, "central body rotation rate")?;
        ensure_finite(self.prime_meridian, "central body prime meridian")?;
        if let Some(atm) = &self.atmosphere {
            atm.validate()?;
        }
        Ok(())
    }

    /// Body-fixed rotation angle (rad) at `time`, measured from `reference_time`.
    pub fn rotation_angle(&self, time: f64, reference_time: f64) -> f64 {
        self.prime_meridian + self.rotation_rate * (time - reference_time)
    }
}

/// Third body contributing differential gravity. Position and velocity are
/// in the same outer inertial frame as `CentralBody::position`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerturbingBody {
    pub id: BodyId,
    pub mu: f64,
    pub position: Vector3<f64>,
    #[serde(default = "zero_vector")]
    pub velocity: Vector3<f64>,
}

impl PerturbingBody {
    pub fn new(id: BodyId, mu: f64, position: Vector3<f64>) -> Self {
        Self { id, mu, position, velocity: Vector3::zeros() }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        ensure_positive(self.mu, "perturbing body mu")?;
        if !(self.position.iter().all(|c| c.is_finite()) && self.velocity.iter().all(|c| c.is_finite())) {
            return Err(EngineError::InvalidInput {
                reason: format!("perturbing body {} has a non-finite state", self.id),
            });
        }
        Ok(())
    }

    /// Position relative to `central`, in km.
    pub fn relative_to(&self, central: &CentralBody) -> Vector3<f64> {
        self.position - central.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_positive_mu() {
        assert!(CentralBody::new(399, "Earth", -1.0, 6378.0).is_err());
        assert!(CentralBody::new(399, "Earth", 398_600.4418, 0.0).is_err());
        assert!(CentralBody::new(399, "Earth", 398_600.4418, 6378.0).is_ok());
    }

    #[test]
    fn rotation_angle_advances() {
        let earth = CentralBody::new(399, "Earth", 398_600.4418, 6378.137)
            .unwrap()
            .with_rotation(7.292_115e-5, 0.5);
        assert_eq!(earth.rotation_angle(100.0, 100.0), 0.5);
        assert!((earth.rotation_angle(1100.0, 100.0) - (0.5 + 7.292_115e-2)).abs() < 1e-12);
    }

    #[test]
    fn relative_position() {
        let earth = CentralBody::new(399, "Earth", 398_600.4418, 6378.137)
            .unwrap()
            .with_state(Vector3::new(1.0e8, 0.0, 0.0), Vector3::zeros());
        let moon = PerturbingBody::new(301, 4902.8, Vector3::new(1.0e8 + 384_400.0, 0.0, 0.0));
        assert_eq!(moon.relative_to(&earth), Vector3::new(384_400.0, 0.0, 0.0));
    }
}
