use std::f64::consts::PI;

use log::{info, warn};
use nalgebra::Vector3;
use serde_derive::{Deserialize, Serialize};

use super::elements::{OrbitalElements, CIRCULAR_TOLERANCE};
use crate::bodies::CentralBody;
use crate::dynamics::frame::{RnpFrame, RnpVector};
use crate::dynamics::state::{Satellite, SatelliteId};
use crate::error::{ensure_finite, ensure_positive, EngineError};
use crate::sim::nodes::{ManeuverNodeManager, NodeId};

/// Relative radius difference below which a transfer is a no-op.
pub const SAME_ORBIT_TOLERANCE: f64 = 1e-9;
/// Samples of the transfer arc kept for previews.
pub const TRANSFER_ARC_POINTS: usize = 64;

// ---------------------------------------------------------------------------
// Two-impulse Hohmann arithmetic
// ---------------------------------------------------------------------------

/// Result of a Hohmann transfer calculation between circular radii.
///
/// Delta-vs are signed along the local prograde direction: positive when
/// raising, negative (retrograde burns) when lowering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HohmannTransfer {
    pub dv1: f64,           // km/s, first burn at r1
    pub dv2: f64,           // km/s, second burn at r2
    pub total_dv: f64,      // km/s, |dv1| + |dv2|
    pub transfer_time: f64, // s, half the transfer orbit period
    pub r1: f64,            // km
    pub r2: f64,            // km
}

impl HohmannTransfer {
    pub fn transfer_sma(&self) -> f64 {
        (self.r1 + self.r2) / 2.0
    }
}

/// Hohmann transfer between circular orbits of radius `r1` and `r2` (km).
pub fn hohmann(r1: f64, r2: f64, mu: f64) -> Result<HohmannTransfer, EngineError> {
    ensure_positive(r1, "initial radius")?;
    ensure_positive(r2, "target radius")?;
    ensure_positive(mu, "mu")?;

    if (r2 - r1).abs() <= SAME_ORBIT_TOLERANCE * r1 {
        return Ok(HohmannTransfer { dv1: 0.0, dv2: 0.0, total_dv: 0.0, transfer_time: 0.0, r1, r2: r1 });
    }

    let sum = r1 + r2;
    let a_transfer = sum / 2.0;

    let dv1 = circular_velocity(r1, mu) * ((2.0 * r2 / sum).sqrt() - 1.0);
    let dv2 = circular_velocity(r2, mu) * (1.0 - (2.0 * r1 / sum).sqrt());
    let transfer_time = PI * (a_transfer.powi(3) / mu).sqrt();

    Ok(HohmannTransfer {
        dv1,
        dv2,
        total_dv: dv1.abs() + dv2.abs(),
        transfer_time,
        r1,
        r2,
    })
}

/// Circular orbit speed at radius `r`.
pub fn circular_velocity(r: f64, mu: f64) -> f64 {
    (mu / r).sqrt()
}

// ---------------------------------------------------------------------------
// Transfer planning against a live satellite
// ---------------------------------------------------------------------------

/// One impulsive burn of a plan, in the central-body inertial frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BurnDescription {
    pub position: Vector3<f64>,        // km
    pub velocity_before: Vector3<f64>, // km/s
    pub velocity_after: Vector3<f64>,  // km/s
    pub delta_v: Vector3<f64>,         // km/s, inertial
    pub delta_v_rnp: RnpVector,        // km/s, local frame at the burn
    pub magnitude: f64,                // km/s
}

impl BurnDescription {
    fn new(position: Vector3<f64>, velocity_before: Vector3<f64>, delta_v: Vector3<f64>, delta_v_rnp: RnpVector) -> Self {
        Self {
            position,
            velocity_before,
            velocity_after: velocity_before + delta_v,
            delta_v,
            delta_v_rnp,
            magnitude: delta_v.norm(),
        }
    }
}

/// Two-burn transfer, ready to preview or materialize as maneuver nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferPlan {
    pub satellite_id: SatelliteId,
    pub burn1: BurnDescription,
    pub burn2: BurnDescription,
    pub transfer_time: f64,  // s
    pub total_delta_v: f64,  // km/s
    /// Elements of the transfer ellipse; `None` for a no-op plan.
    pub transfer_orbit: Option<OrbitalElements>,
    /// Sampled transfer arc from burn 1 to burn 2 (km).
    pub orbit_points: Vec<Vector3<f64>>,
}

impl TransferPlan {
    /// True when the satellite is already on the target orbit.
    pub fn is_noop(&self) -> bool {
        self.transfer_time == 0.0
    }

    /// Commit the plan as two prograde nodes, the first at `now` and the
    /// second one transfer time later. A no-op plan adds nothing.
    ///
    /// Either both nodes are added or neither is.
    pub fn materialize(&self, nodes: &mut ManeuverNodeManager, now: f64) -> Result<Vec<NodeId>, EngineError> {
        if self.is_noop() {
            return Ok(Vec::new());
        }
        let sat = self.satellite_id;
        let first = nodes.add_node(sat, now, self.burn1.delta_v_rnp)?;
        let second = match nodes.add_node(sat, now + self.transfer_time, self.burn2.delta_v_rnp) {
            Ok(id) => id,
            Err(e) => {
                if let Err(undo) = nodes.remove_node(sat, first) {
                    warn!("sat {} could not roll back node {}: {}", sat, first, undo);
                }
                return Err(e);
            }
        };
        info!(
            "sat {} transfer materialized: nodes {} and {} (total dv {:.4} km/s)",
            sat, first, second, self.total_delta_v
        );
        Ok(vec![first, second])
    }
}

/// Plan a Hohmann transfer from the satellite's current orbit, assumed circular
/// at `current.sma`, to the target semi-major axis and eccentricity.
///
/// For an eccentric target the second burn lands on the target periapsis when
/// raising and on the target apoapsis when lowering.
pub fn plan_hohmann(
    satellite: &Satellite,
    current: &OrbitalElements,
    target_sma: f64,
    target_ecc: f64,
    central: &CentralBody,
) -> Result<TransferPlan, EngineError> {
    central.validate()?;
    if satellite.central_body_id != central.id {
        return Err(EngineError::CentralBodyNotFound { id: satellite.central_body_id });
    }
    ensure_positive(target_sma, "target semi-major axis")?;
    ensure_finite(target_ecc, "target eccentricity")?;
    if !(0.0..1.0).contains(&target_ecc) {
        return Err(EngineError::UnsupportedOrbitType { eccentricity: target_ecc });
    }
    satellite.validate()?;

    let mu = central.mu;
    let r1 = current.sma;
    let r2 = if target_ecc < CIRCULAR_TOLERANCE {
        target_sma
    } else if target_sma >= r1 {
        target_sma * (1.0 - target_ecc)
    } else {
        target_sma * (1.0 + target_ecc)
    };
    let transfer = hohmann(r1, r2, mu)?;

    let frame = RnpFrame::from_state(&satellite.position, &satellite.velocity)?;
    let position = satellite.position;
    let velocity = satellite.velocity;

    if transfer.transfer_time == 0.0 {
        let idle = BurnDescription::new(position, velocity, Vector3::zeros(), RnpVector::default());
        return Ok(TransferPlan {
            satellite_id: satellite.id,
            burn1: idle.clone(),
            burn2: idle,
            transfer_time: 0.0,
            total_delta_v: 0.0,
            transfer_orbit: None,
            orbit_points: Vec::new(),
        });
    }

    let burn1 = BurnDescription::new(
        position,
        velocity,
        frame.prograde * transfer.dv1,
        RnpVector::prograde(transfer.dv1),
    );

    // Opposite apsis: local prograde there is -p, radial is -r.
    let a_t = transfer.transfer_sma();
    let v_apsis = (mu * (2.0 / r2 - 1.0 / a_t)).sqrt();
    let burn2 = BurnDescription::new(
        -frame.radial * r2,
        -frame.prograde * v_apsis,
        -frame.prograde * transfer.dv2,
        RnpVector::prograde(transfer.dv2),
    );

    let v_depart = (mu * (2.0 / r1 - 1.0 / a_t)).sqrt();
    let transfer_orbit = OrbitalElements::from_state_vector(&(frame.radial * r1), &(frame.prograde * v_depart), mu)?;

    Ok(TransferPlan {
        satellite_id: satellite.id,
        burn1,
        burn2,
        transfer_time: transfer.transfer_time,
        total_delta_v: transfer.total_dv,
        transfer_orbit: Some(transfer_orbit),
        orbit_points: transfer_arc(&frame, r1, r2),
    })
}

/// Half-ellipse from r1 (theta = 0) to r2 (theta = pi) in the current orbit plane.
fn transfer_arc(frame: &RnpFrame, r1: f64, r2: f64) -> Vec<Vector3<f64>> {
    let p = 2.0 * r1 * r2 / (r1 + r2);
    // Signed so that theta = 0 is periapsis when raising and apoapsis when lowering
    let e = (r2 - r1) / (r1 + r2);
    (0..TRANSFER_ARC_POINTS)
        .map(|k| {
            let theta = PI * k as f64 / (TRANSFER_ARC_POINTS - 1) as f64;
            let r = p / (1.0 + e * theta.cos());
            (frame.radial * theta.cos() + frame.prograde * theta.sin()) * r
        })
        .collect()
}
