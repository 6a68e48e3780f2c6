use log::debug;
use serde_derive::{Deserialize, Serialize};

use super::track::GroundTrackPoint;
use crate::error::{ensure_finite, ensure_positive, EngineError};

/// Point of interest on the body surface (degrees).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        ensure_finite(self.latitude, "latitude")?;
        ensure_finite(self.longitude, "longitude")?;
        if self.latitude.abs() > 90.0 {
            return Err(EngineError::InvalidInput {
                reason: format!("latitude {} outside [-90, 90]", self.latitude),
            });
        }
        Ok(())
    }
}

/// Visibility window over a point of interest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PassWindow {
    pub aos: f64,           // s
    pub los: f64,           // s
    pub max_elevation: f64, // deg
    pub duration: f64,      // s
    /// Visible at the first or last sample of the track; the real window may be longer.
    pub possibly_truncated: bool,
}

// ---------------------------------------------------------------------------
// Spherical geometry
// ---------------------------------------------------------------------------

/// Great-circle angle (rad) between two lat/lon points given in degrees (haversine).
pub fn central_angle(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (p1, p2) = (lat1.to_radians(), lat2.to_radians());
    let dlat = p2 - p1;
    let dlon = (lon2 - lon1).to_radians();
    let a = (dlat / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * a.sqrt().min(1.0).asin()
}

/// Coverage radius (rad) of a satellite down to the geometric horizon.
pub fn horizon_coverage(body_radius: f64, altitude: f64) -> f64 {
    coverage_with_mask(body_radius, altitude, 0.0)
}

/// Coverage radius (rad) for a minimum elevation `mask` (deg) at the ground.
pub fn coverage_with_mask(body_radius: f64, altitude: f64, mask: f64) -> f64 {
    if altitude <= 0.0 {
        return 0.0;
    }
    let eps = mask.to_radians();
    let ratio = body_radius / (body_radius + altitude);
    ((ratio * eps.cos()).clamp(-1.0, 1.0).acos() - eps).max(0.0)
}

/// Elevation (deg) of a satellite at `altitude` seen from a ground point
/// `angle` radians away from the sub-satellite point.
pub fn elevation(angle: f64, body_radius: f64, altitude: f64) -> f64 {
    let ratio = body_radius / (body_radius + altitude);
    (angle.cos() - ratio).atan2(angle.sin()).to_degrees()
}

// ---------------------------------------------------------------------------
// Window search
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassPredictor {
    pub body_radius: f64,   // km
    pub min_elevation: f64, // deg, used by `find_horizon_windows`
}

struct OpenWindow {
    aos: f64,
    max_elevation: f64,
    from_first_sample: bool,
}

impl PassPredictor {
    pub fn new(body_radius: f64) -> Self {
        Self { body_radius, min_elevation: 0.0 }
    }

    pub fn with_min_elevation(mut self, mask: f64) -> Self {
        self.min_elevation = mask;
        self
    }

    /// Windows where the great-circle distance from `poi` to the sub-satellite
    /// point is below `coverage(point)` (rad).
    ///
    /// A window opens on the first visible sample and closes on the next
    /// non-visible one. Visibility at either end of the track marks the window
    /// as possibly truncated.
    pub fn find_windows<I, F>(&self, track: I, poi: &GeoPoint, coverage: F) -> Result<Vec<PassWindow>, EngineError>
    where
        I: IntoIterator<Item = GroundTrackPoint>,
        F: Fn(&GroundTrackPoint) -> f64,
    {
        ensure_positive(self.body_radius, "body radius")?;
        poi.validate()?;

        let mut windows = Vec::new();
        let mut open: Option<OpenWindow> = None;
        let mut last_time = None;

        for (i, point) in track.into_iter().enumerate() {
            last_time = Some(point.time);
            let angle = central_angle(poi.latitude, poi.longitude, point.latitude, point.longitude);
            let visible = angle < coverage(&point);

            match (&mut open, visible) {
                (None, true) => {
                    open = Some(OpenWindow {
                        aos: point.time,
                        max_elevation: elevation(angle, self.body_radius, point.altitude),
                        from_first_sample: i == 0,
                    });
                }
                (Some(w), true) => {
                    w.max_elevation = w.max_elevation.max(elevation(angle, self.body_radius, point.altitude));
                }
                (Some(_), false) => {
                    if let Some(w) = open.take() {
                        windows.push(close(w, point.time, false));
                    }
                }
                (None, false) => {}
            }
        }

        if let (Some(w), Some(t)) = (open, last_time) {
            windows.push(close(w, t, true));
        }
        debug!(
            "{} pass window(s) over ({:.3}, {:.3})",
            windows.len(),
            poi.latitude,
            poi.longitude
        );
        Ok(windows)
    }

    /// Windows using horizon geometry with this predictor's elevation mask.
    pub fn find_horizon_windows<I>(&self, track: I, poi: &GeoPoint) -> Result<Vec<PassWindow>, EngineError>
    where
        I: IntoIterator<Item = GroundTrackPoint>,
    {
        let radius = self.body_radius;
        let mask = self.min_elevation;
        self.find_windows(track, poi, |p| coverage_with_mask(radius, p.altitude, mask))
    }
}

fn close(w: OpenWindow, los: f64, at_track_end: bool) -> PassWindow {
    PassWindow {
        aos: w.aos,
        los,
        max_elevation: w.max_elevation,
        duration: los - w.aos,
        possibly_truncated: w.from_first_sample || at_track_end,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const R: f64 = 6378.137;

    fn point(time: f64, latitude: f64, longitude: f64) -> GroundTrackPoint {
        GroundTrackPoint { time, latitude, longitude, altitude: 500.0 }
    }

    /// Equatorial track moving east one degree per sample.
    fn sweep(from: f64, to: f64) -> Vec<GroundTrackPoint> {
        (0..=((to - from) as usize))
            .map(|k| point(k as f64 * 10.0, 0.0, from + k as f64))
            .collect()
    }

    #[test]
    fn haversine_basics() {
        assert_eq!(central_angle(10.0, 20.0, 10.0, 20.0), 0.0);
        assert!((central_angle(0.0, 0.0, 0.0, 90.0) - std::f64::consts::FRAC_PI_2).abs() < 1e-12);
        assert!((central_angle(90.0, 0.0, -90.0, 0.0) - std::f64::consts::PI).abs() < 1e-12);
    }

    #[test]
    fn coverage_geometry() {
        let lambda = horizon_coverage(R, 500.0);
        assert!((lambda.to_degrees() - 21.98).abs() < 0.01, "{}", lambda.to_degrees());
        assert!(coverage_with_mask(R, 500.0, 10.0) < lambda);
        assert_eq!(horizon_coverage(R, 0.0), 0.0);
        // Elevation is 90 deg overhead and 0 at the horizon
        assert!((elevation(0.0, R, 500.0) - 90.0).abs() < 1e-12);
        assert!(elevation(lambda, R, 500.0).abs() < 1e-9);
        // Masked coverage edge sits at the mask elevation
        let masked = coverage_with_mask(R, 500.0, 10.0);
        assert!((elevation(masked, R, 500.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn single_complete_pass() {
        let predictor = PassPredictor::new(R);
        let track = sweep(-60.0, 60.0);
        let windows = predictor.find_horizon_windows(track, &GeoPoint::new(0.0, 0.0)).unwrap();
        assert_eq!(windows.len(), 1);
        let w = windows[0];
        assert!(!w.possibly_truncated);
        // Coverage is ~21.98 deg: first visible at -21, first invisible at +22
        assert_eq!(w.aos, 390.0);
        assert_eq!(w.los, 820.0);
        assert_eq!(w.duration, 430.0);
        assert!((w.max_elevation - 90.0).abs() < 1e-9);
    }

    #[test]
    fn truncated_at_track_ends() {
        let predictor = PassPredictor::new(R);
        let windows = predictor.find_horizon_windows(sweep(-5.0, 5.0), &GeoPoint::new(0.0, 0.0)).unwrap();
        assert_eq!(windows.len(), 1);
        assert!(windows[0].possibly_truncated);
        assert_eq!(windows[0].aos, 0.0);
        assert_eq!(windows[0].los, 100.0);

        let windows = predictor.find_horizon_windows(sweep(-40.0, 0.0), &GeoPoint::new(0.0, 0.0)).unwrap();
        assert_eq!(windows.len(), 1);
        assert!(windows[0].possibly_truncated);
    }

    #[test]
    fn sub_satellite_point_always_visible() {
        let predictor = PassPredictor::new(R);
        for altitude in [0.1, 200.0, 35_786.0] {
            let p = GroundTrackPoint { time: 0.0, latitude: 12.0, longitude: -70.0, altitude };
            let windows = predictor.find_horizon_windows([p], &GeoPoint::new(12.0, -70.0)).unwrap();
            assert_eq!(windows.len(), 1, "altitude {altitude}");
        }
    }

    #[test]
    fn far_side_never_visible() {
        let predictor = PassPredictor::new(R);
        let track: Vec<_> = (0..50).map(|k| point(k as f64, 0.0, 95.0 + k as f64)).collect();
        let windows = predictor.find_horizon_windows(track, &GeoPoint::new(0.0, 0.0)).unwrap();
        assert!(windows.is_empty());
    }

    #[test]
    fn custom_coverage_function() {
        let predictor = PassPredictor::new(R);
        // Two separate visible runs with a fixed 3 deg radius
        let mut track = sweep(-10.0, 10.0);
        track.extend(sweep(-10.0, 10.0).into_iter().map(|p| GroundTrackPoint { time: p.time + 1000.0, ..p }));
        let windows = predictor
            .find_windows(track, &GeoPoint::new(0.0, 0.0), |_| 3f64.to_radians())
            .unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].aos - windows[0].aos, 1000.0);
    }

    #[test]
    fn invalid_poi_rejected() {
        let predictor = PassPredictor::new(R);
        assert!(predictor.find_horizon_windows(sweep(0.0, 3.0), &GeoPoint::new(95.0, 0.0)).is_err());
        assert!(predictor.find_horizon_windows(sweep(0.0, 3.0), &GeoPoint::new(f64::NAN, 0.0)).is_err());
    }
}
