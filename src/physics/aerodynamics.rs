use nalgebra::Vector3;

/// Velocity relative to an atmosphere co-rotating with the central body about +Z.
pub fn relative_velocity(pos: &Vector3<f64>, vel: &Vector3<f64>, rotation_rate: f64) -> Vector3<f64> {
    let omega = Vector3::new(0.0, 0.0, rotation_rate);
    vel - omega.cross(pos)
}

/// Drag acceleration in km/s^2, opposing the atmosphere-relative velocity.
///
/// `density` in kg/m^3, `area` in m^2, `mass` in kg; positions and velocities in km and km/s.
pub fn drag_acceleration(
    pos: &Vector3<f64>,
    vel: &Vector3<f64>,
    rotation_rate: f64,
    density: f64,
    cd: f64,
    area: f64,
    mass: f64,
) -> Vector3<f64> {
    let v_rel = relative_velocity(pos, vel, rotation_rate);
    let speed = v_rel.norm();
    if speed <= 1e-12 || density <= 0.0 {
        return Vector3::zeros();
    }
    // (km/s)^2 -> (m/s)^2 is 1e6, m/s^2 -> km/s^2 is 1e-3
    let ballistic = cd * area / mass;
    -0.5 * density * ballistic * speed * 1.0e3 * v_rel
}
