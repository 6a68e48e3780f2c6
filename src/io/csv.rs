use std::io::Write;

use serde_derive::Serialize;

use crate::dynamics::state::OrbitalState;
use crate::ground::{GroundTrackPoint, PassWindow};

/// Flat row for trajectory export.
#[derive(Debug, Serialize)]
struct TrajectoryRow {
    time: f64,
    pos_x: f64,
    pos_y: f64,
    pos_z: f64,
    vel_x: f64,
    vel_y: f64,
    vel_z: f64,
    altitude: f64,
}

/// Write trajectory states as CSV.
///
/// Columns: time, pos_x, pos_y, pos_z, vel_x, vel_y, vel_z, altitude
/// (km, km/s; altitude above `body_radius`).
pub fn write_trajectory<W: Write>(writer: W, trajectory: &[OrbitalState], body_radius: f64) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for s in trajectory {
        wtr.serialize(TrajectoryRow {
            time: s.time,
            pos_x: s.pos.x,
            pos_y: s.pos.y,
            pos_z: s.pos.z,
            vel_x: s.vel.x,
            vel_y: s.vel.y,
            vel_z: s.vel.z,
            altitude: s.radius() - body_radius,
        })?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write a ground track as CSV with columns time, latitude, longitude, altitude.
pub fn write_ground_track<W: Write>(writer: W, track: &[GroundTrackPoint]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for p in track {
        wtr.serialize(p)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write pass windows as CSV with columns aos, los, max_elevation, duration, possibly_truncated.
pub fn write_pass_windows<W: Write>(writer: W, windows: &[PassWindow]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    for w in windows {
        wtr.serialize(w)?;
    }
    wtr.flush()?;
    Ok(())
}
