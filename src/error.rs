use snafu::prelude::*;

use crate::bodies::BodyId;
use crate::dynamics::state::SatelliteId;
use crate::sim::nodes::NodeId;

/// Errors raised by the engine.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum EngineError {
    /// Non-finite or out-of-range parameters, rejected before any work is done.
    #[snafu(display("invalid input: {reason}"))]
    InvalidInput { reason: String },
    /// Satellite position at or below the central body surface.
    #[snafu(display("collision with central body at t={time:.3} s (altitude {altitude:.3} km)"))]
    CollisionDetected { time: f64, altitude: f64 },
    /// An intermediate state became non-finite.
    #[snafu(display("propagation diverged at t={time:.3} s"))]
    PropagationDiverged { time: f64 },
    /// Parabolic or hyperbolic trajectory.
    #[snafu(display("unsupported orbit type (eccentricity {eccentricity:.6})"))]
    UnsupportedOrbitType { eccentricity: f64 },
    #[snafu(display("maneuver node scheduling conflict: {reason}"))]
    NodeSchedulingConflict { reason: String },
    #[snafu(display("central body {id} not found"))]
    CentralBodyNotFound { id: BodyId },
    #[snafu(display("satellite {id} not found"))]
    SatelliteNotFound { id: SatelliteId },
    #[snafu(display("maneuver node {id} not found"))]
    NodeNotFound { id: NodeId },
    /// A newer preview was requested for the same satellite.
    #[snafu(display("preview for satellite {id} superseded by a newer request"))]
    StalePreview { id: SatelliteId },
    /// The worker computing a preview exited without reporting a result.
    #[snafu(display("preview for satellite {id} aborted"))]
    PreviewAborted { id: SatelliteId },
    #[snafu(display("could not parse configuration: {source}"))]
    Config { source: serde_yaml::Error },
}

impl EngineError {
    /// True for errors that halt a satellite's propagation rather than reject a call.
    pub fn is_fatal_for_satellite(&self) -> bool {
        matches!(
            self,
            EngineError::CollisionDetected { .. } | EngineError::PropagationDiverged { .. }
        )
    }
}

/// Rejects non-finite scalars at the call boundary.
pub(crate) fn ensure_finite(value: f64, what: &str) -> Result<(), EngineError> {
    ensure!(
        value.is_finite(),
        InvalidInputSnafu {
            reason: format!("{what} must be finite, got {value}"),
        }
    );
    Ok(())
}

/// Rejects non-positive or non-finite scalars at the call boundary.
pub(crate) fn ensure_positive(value: f64, what: &str) -> Result<(), EngineError> {
    ensure!(
        value.is_finite() && value > 0.0,
        InvalidInputSnafu {
            reason: format!("{what} must be positive and finite, got {value}"),
        }
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finite_checks() {
        assert!(ensure_finite(1.0, "x").is_ok());
        assert!(ensure_finite(f64::NAN, "x").is_err());
        assert!(ensure_positive(0.0, "mu").is_err());
        assert!(ensure_positive(-3.0, "mu").is_err());
        assert!(ensure_positive(f64::INFINITY, "mu").is_err());
        assert!(ensure_positive(398_600.0, "mu").is_ok());
    }

    #[test]
    fn fatal_kinds() {
        let e = EngineError::CollisionDetected { time: 1.0, altitude: -2.0 };
        assert!(e.is_fatal_for_satellite());
        let e = EngineError::InvalidInput { reason: "x".into() };
        assert!(!e.is_fatal_for_satellite());
        assert!(format!("{}", EngineError::CentralBodyNotFound { id: 399 }).contains("399"));
    }
}
