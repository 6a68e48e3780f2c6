use serde_derive::{Deserialize, Serialize};

use crate::bodies::CentralBody;
use crate::dynamics::state::OrbitalState;
use crate::error::EngineError;

/// Sub-satellite point in body-fixed coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GroundTrackPoint {
    pub time: f64,      // s
    pub latitude: f64,  // deg, [-90, 90]
    pub longitude: f64, // deg, [-180, 180)
    pub altitude: f64,  // km above the equatorial radius
}

impl GroundTrackPoint {
    /// Project one inertial state, subtracting the body rotation since `reference_time`.
    pub fn from_state(state: &OrbitalState, central: &CentralBody, reference_time: f64) -> Self {
        let r = state.radius();
        let inertial_lon = state.pos.y.atan2(state.pos.x);
        let body_angle = central.rotation_angle(state.time, reference_time);
        let latitude = if r > 0.0 { (state.pos.z / r).clamp(-1.0, 1.0).asin() } else { 0.0 };
        Self {
            time: state.time,
            latitude: latitude.to_degrees(),
            longitude: wrap_longitude((inertial_lon - body_angle).to_degrees()),
            altitude: r - central.radius,
        }
    }
}

/// Wrap an angle in degrees to [-180, 180).
pub fn wrap_longitude(deg: f64) -> f64 {
    let lon = (deg + 180.0).rem_euclid(360.0) - 180.0;
    // rem_euclid can round up to exactly 360
    if lon >= 180.0 {
        -180.0
    } else {
        lon
    }
}

// ---------------------------------------------------------------------------
// Lazy projection over a trajectory
// ---------------------------------------------------------------------------

/// Iterator adapter projecting trajectory samples one-to-one. Errors from the
/// underlying trajectory pass through unchanged.
#[derive(Debug)]
pub struct GroundTrack<'b, I> {
    inner: I,
    central: &'b CentralBody,
    reference_time: f64,
}

pub fn project<'b, I>(trajectory: I, central: &'b CentralBody, reference_time: f64) -> GroundTrack<'b, I::IntoIter>
where
    I: IntoIterator<Item = Result<OrbitalState, EngineError>>,
{
    GroundTrack { inner: trajectory.into_iter(), central, reference_time }
}

impl<'b, I> Iterator for GroundTrack<'b, I>
where
    I: Iterator<Item = Result<OrbitalState, EngineError>>,
{
    type Item = Result<GroundTrackPoint, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner
            .next()
            .map(|item| item.map(|s| GroundTrackPoint::from_state(&s, self.central, self.reference_time)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    const OMEGA_EARTH: f64 = 7.292_115e-5;

    fn earth() -> CentralBody {
        CentralBody::new(399, "Earth", 398_600.4418, 6378.137)
            .unwrap()
            .with_rotation(OMEGA_EARTH, 0.0)
    }

    fn state(time: f64, pos: Vector3<f64>) -> OrbitalState {
        OrbitalState::new(time, pos, Vector3::new(0.0, 7.5, 0.0))
    }

    #[test]
    fn equator_and_pole() {
        let body = earth();
        let p = GroundTrackPoint::from_state(&state(0.0, Vector3::new(7000.0, 0.0, 0.0)), &body, 0.0);
        assert_eq!(p.latitude, 0.0);
        assert_eq!(p.longitude, 0.0);
        assert!((p.altitude - 621.863).abs() < 1e-9);

        let p = GroundTrackPoint::from_state(&state(0.0, Vector3::new(0.0, 0.0, 7000.0)), &body, 0.0);
        assert!((p.latitude - 90.0).abs() < 1e-12);
    }

    #[test]
    fn rotation_shifts_longitude_west() {
        let body = earth();
        // Quarter sidereal day later the same inertial point sits 90 deg further west
        let t = std::f64::consts::FRAC_PI_2 / OMEGA_EARTH;
        let p = GroundTrackPoint::from_state(&state(t, Vector3::new(7000.0, 0.0, 0.0)), &body, 0.0);
        assert!((p.longitude + 90.0).abs() < 1e-9, "lon = {}", p.longitude);

        // Measured from a later reference time the shift disappears
        let p = GroundTrackPoint::from_state(&state(t, Vector3::new(7000.0, 0.0, 0.0)), &body, t);
        assert!(p.longitude.abs() < 1e-9);
    }

    #[test]
    fn prime_meridian_offset() {
        let body = earth().with_rotation(OMEGA_EARTH, 30f64.to_radians());
        let p = GroundTrackPoint::from_state(&state(0.0, Vector3::new(0.0, 7000.0, 0.0)), &body, 0.0);
        assert!((p.longitude - 60.0).abs() < 1e-9);
    }

    #[test]
    fn longitude_wraps_to_half_open_range() {
        assert_eq!(wrap_longitude(180.0), -180.0);
        assert_eq!(wrap_longitude(-180.0), -180.0);
        assert!((wrap_longitude(540.5) - (-179.5)).abs() < 1e-12);
        assert!((wrap_longitude(-190.0) - 170.0).abs() < 1e-12);
        assert_eq!(wrap_longitude(-180.000_000_000_000_03), -180.0);
        for k in 0..64 {
            let lon = wrap_longitude(-180.0 - k as f64 * 1e-15);
            assert!((-180.0..180.0).contains(&lon), "k={k}: {lon}");
        }
    }

    #[test]
    fn projection_is_one_to_one_and_passes_errors() {
        let body = earth();
        let samples = vec![
            Ok(state(0.0, Vector3::new(7000.0, 0.0, 0.0))),
            Ok(state(10.0, Vector3::new(6990.0, 75.0, 0.0))),
            Err(EngineError::PropagationDiverged { time: 10.0 }),
        ];
        let out: Vec<_> = project(samples, &body, 0.0).collect();
        assert_eq!(out.len(), 3);
        assert_eq!(out[1].as_ref().unwrap().time, 10.0);
        assert!(matches!(out[2], Err(EngineError::PropagationDiverged { .. })));
    }
}
