extern crate approx;
extern crate orbit_sim;
extern crate rstest;

use approx::assert_relative_eq;
use nalgebra::Vector3;
use orbit_sim::ground::passes::{central_angle, horizon_coverage};
use orbit_sim::ground::PassPredictor;
use orbit_sim::orbital::maneuvers::circular_velocity;
use orbit_sim::physics::ForceFlags;
use orbit_sim::{CentralBody, EngineConfig, GeoPoint, GroundTrackPoint, Satellite, Simulation};
use rstest::*;

const MU_EARTH: f64 = 398_600.4418;
const R_EARTH: f64 = 6378.137;
const OMEGA_EARTH: f64 = 7.292_115e-5;

#[fixture]
fn sim() -> Simulation {
    let config = EngineConfig { forces: ForceFlags::two_body(), pass_sample_step: 10.0, ..Default::default() };
    let mut sim = Simulation::new(config).unwrap();
    sim.add_central_body(
        CentralBody::new(399, "Earth", MU_EARTH, R_EARTH)
            .unwrap()
            .with_rotation(OMEGA_EARTH, 0.0),
    )
    .unwrap();
    let r = R_EARTH + 500.0;
    let inc = 45f64.to_radians();
    let v = circular_velocity(r, MU_EARTH);
    sim.add_satellite(Satellite::new(
        1,
        399,
        Vector3::new(r, 0.0, 0.0),
        Vector3::new(0.0, v * inc.cos(), v * inc.sin()),
    ))
    .unwrap();
    sim
}

#[rstest]
#[case(1.0)]
#[case(400.0)]
#[case(35_786.0)]
fn sub_satellite_point_is_visible(#[case] altitude: f64) {
    let p = GroundTrackPoint { time: 0.0, latitude: -33.9, longitude: 18.4, altitude };
    let windows = PassPredictor::new(R_EARTH)
        .find_horizon_windows([p], &GeoPoint::new(-33.9, 18.4))
        .unwrap();
    assert_eq!(windows.len(), 1);
    assert_relative_eq!(windows[0].max_elevation, 90.0, epsilon = 1e-9);
}

#[rstest]
#[case(200.0)]
#[case(2000.0)]
fn antipodal_side_never_visible(#[case] altitude: f64) {
    // Coverage below 90 deg for any finite altitude
    assert!(horizon_coverage(R_EARTH, altitude) < std::f64::consts::FRAC_PI_2);
    let track: Vec<_> = (0..36)
        .map(|k| GroundTrackPoint { time: k as f64 * 60.0, latitude: 0.0, longitude: 91.0 + k as f64 * 5.0, altitude })
        .collect();
    assert!(track
        .iter()
        .all(|p| central_angle(0.0, 0.0, p.latitude, p.longitude) > std::f64::consts::FRAC_PI_2));
    let windows = PassPredictor::new(R_EARTH)
        .find_horizon_windows(track, &GeoPoint::new(0.0, 0.0))
        .unwrap();
    assert!(windows.is_empty());
}

#[rstest]
fn ground_track_starts_under_satellite(sim: Simulation) {
    let track = sim.ground_track(1, 5700.0, 58).unwrap();
    assert!(track.is_complete());
    assert_eq!(track.value.len(), 58);
    let first = track.value[0];
    assert_relative_eq!(first.latitude, 0.0, epsilon = 1e-12);
    assert_relative_eq!(first.longitude, 0.0, epsilon = 1e-12);
    assert_relative_eq!(first.altitude, 500.0, epsilon = 1e-9);
    // Inclination bounds the latitude
    assert!(track.value.iter().all(|p| p.latitude.abs() <= 45.0 + 1e-6));
    assert!(track.value.iter().any(|p| p.latitude > 40.0));
}

#[rstest]
fn passes_over_starting_point(sim: Simulation) {
    let poi = GeoPoint::new(0.0, 0.0);
    let outcome = sim.pass_windows(&poi, 1, 86_400.0).unwrap();
    assert!(outcome.is_complete());
    let windows = outcome.value;
    assert!(windows.len() >= 2, "expected repeated passes, got {}", windows.len());

    // First window opens at t = 0 directly overhead
    assert_eq!(windows[0].aos, 0.0);
    assert!(windows[0].possibly_truncated);
    assert_relative_eq!(windows[0].max_elevation, 90.0, epsilon = 1e-6);

    for w in &windows[1..] {
        assert!(w.los > w.aos);
        assert_relative_eq!(w.duration, w.los - w.aos);
        // A 500 km pass lasts no more than ~13 minutes
        assert!(w.duration <= 800.0, "duration {}", w.duration);
        assert!(w.max_elevation > 0.0 && w.max_elevation <= 90.0);
    }
    for pair in windows.windows(2) {
        assert!(pair[1].aos >= pair[0].los);
    }
}

#[rstest]
fn preview_pass_windows_match(sim: Simulation) {
    let poi = GeoPoint::new(30.0, 60.0);
    let direct = sim.pass_windows(&poi, 1, 20_000.0).unwrap().value;
    let preview = sim.preview_pass_windows(poi, 1, 20_000.0).unwrap().wait().unwrap();
    assert_eq!(preview.value.value, direct);
}
