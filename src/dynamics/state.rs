use nalgebra::Vector3;
use serde_derive::{Deserialize, Serialize};

use crate::bodies::BodyId;
use crate::error::{ensure_finite, ensure_positive, EngineError};

pub type SatelliteId = u32;

// ---------------------------------------------------------------------------
// Orbital state: time-stamped position/velocity (no attitude)
// ---------------------------------------------------------------------------

/// Central-body-centered inertial state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalState {
    pub time: f64,          // s, simulated
    pub pos: Vector3<f64>,  // km
    pub vel: Vector3<f64>,  // km/s
}

impl OrbitalState {
    pub fn new(time: f64, pos: Vector3<f64>, vel: Vector3<f64>) -> Self {
        Self { time, pos, vel }
    }

    /// Advance by a derivative scaled by dt (used inside RK4).
    pub fn apply(&self, d: &Deriv, dt: f64) -> OrbitalState {
        OrbitalState {
            time: self.time + dt,
            pos: self.pos + d.dpos * dt,
            vel: self.vel + d.dvel * dt,
        }
    }

    pub fn is_finite(&self) -> bool {
        self.time.is_finite()
            && self.pos.iter().all(|c| c.is_finite())
            && self.vel.iter().all(|c| c.is_finite())
    }

    pub fn radius(&self) -> f64 {
        self.pos.norm()
    }

    pub fn speed(&self) -> f64 {
        self.vel.norm()
    }
}

/// State derivative: (velocity, acceleration).
#[derive(Debug, Clone, Copy)]
pub struct Deriv {
    pub dpos: Vector3<f64>,
    pub dvel: Vector3<f64>,
}

// ---------------------------------------------------------------------------
// Satellite
// ---------------------------------------------------------------------------

/// Drag-relevant physical properties.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ballistics {
    pub mass: f64,             // kg
    pub drag_coefficient: f64,
    pub area: f64,             // m^2
}

impl Ballistics {
    pub fn validate(&self) -> Result<(), EngineError> {
        ensure_positive(self.mass, "satellite mass")?;
        ensure_positive(self.area, "cross-sectional area")?;
        ensure_finite(self.drag_coefficient, "drag coefficient")?;
        if self.drag_coefficient < 0.0 {
            return Err(EngineError::InvalidInput {
                reason: format!("drag coefficient must be >= 0, got {}", self.drag_coefficient),
            });
        }
        Ok(())
    }
}

/// Live satellite owned by the simulation driver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Satellite {
    pub id: SatelliteId,
    pub central_body_id: BodyId,
    pub position: Vector3<f64>, // km
    pub velocity: Vector3<f64>, // km/s
    pub mass: f64,              // kg
    pub drag_coefficient: f64,
    pub cross_sectional_area: f64, // m^2
}

impl Satellite {
    pub fn new(id: SatelliteId, central_body_id: BodyId, position: Vector3<f64>, velocity: Vector3<f64>) -> Self {
        Self {
            id,
            central_body_id,
            position,
            velocity,
            mass: 100.0,
            drag_coefficient: 2.2,
            cross_sectional_area: 1.0,
        }
    }

    pub fn with_ballistics(mut self, mass: f64, drag_coefficient: f64, area: f64) -> Self {
        self.mass = mass;
        self.drag_coefficient = drag_coefficient;
        self.cross_sectional_area = area;
        self
    }

    pub fn ballistics(&self) -> Ballistics {
        Ballistics {
            mass: self.mass,
            drag_coefficient: self.drag_coefficient,
            area: self.cross_sectional_area,
        }
    }

    pub fn state_at(&self, time: f64) -> OrbitalState {
        OrbitalState::new(time, self.position, self.velocity)
    }

    pub fn set_state(&mut self, state: &OrbitalState) {
        self.position = state.pos;
        self.velocity = state.vel;
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        if !self.state_at(0.0).is_finite() {
            return Err(EngineError::InvalidInput {
                reason: format!("satellite {} has a non-finite state", self.id),
            });
        }
        self.ballistics().validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_derivative() {
        let s = OrbitalState::new(10.0, Vector3::new(7000.0, 0.0, 0.0), Vector3::new(0.0, 7.5, 0.0));
        let d = Deriv { dpos: s.vel, dvel: Vector3::new(-0.008, 0.0, 0.0) };
        let next = s.apply(&d, 2.0);
        assert_eq!(next.time, 12.0);
        assert_eq!(next.pos, Vector3::new(7000.0, 15.0, 0.0));
        assert_eq!(next.vel, Vector3::new(-0.016, 7.5, 0.0));
    }

    #[test]
    fn non_finite_detection() {
        let mut s = OrbitalState::new(0.0, Vector3::new(7000.0, 0.0, 0.0), Vector3::zeros());
        assert!(s.is_finite());
        s.vel.y = f64::NAN;
        assert!(!s.is_finite());
    }

    #[test]
    fn satellite_validation() {
        let sat = Satellite::new(1, 399, Vector3::new(7000.0, 0.0, 0.0), Vector3::new(0.0, 7.5, 0.0));
        assert!(sat.validate().is_ok());
        assert!(sat.clone().with_ballistics(0.0, 2.2, 1.0).validate().is_err());
        let mut bad = sat.clone();
        bad.position.x = f64::INFINITY;
        assert!(bad.validate().is_err());
    }

    #[test]
    fn drag_parameters_cannot_push_forward() {
        let sat = Satellite::new(1, 399, Vector3::new(7000.0, 0.0, 0.0), Vector3::new(0.0, 7.5, 0.0));
        assert!(sat.clone().with_ballistics(100.0, -2.2, 1.0).validate().is_err());
        assert!(sat.clone().with_ballistics(100.0, 2.2, -1.0).validate().is_err());
        assert!(sat.clone().with_ballistics(100.0, 2.2, 0.0).validate().is_err());
        assert!(sat.with_ballistics(100.0, 0.0, 1.0).validate().is_ok());
    }
}
