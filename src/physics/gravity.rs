use nalgebra::Vector3;

// ---------------------------------------------------------------------------
// Central-body gravity (central-body-centered inertial frame, km, km/s^2)
// ---------------------------------------------------------------------------

/// Point-mass gravity: `-mu * r / |r|^3`.
pub fn point_mass(pos: &Vector3<f64>, mu: f64) -> Vector3<f64> {
    let r = pos.norm();
    -mu / (r * r * r) * pos
}

/// J2 oblateness correction, to be added to the point-mass term.
///
/// `radius` is the equatorial radius the J2 coefficient is normalised to.
pub fn j2_perturbation(pos: &Vector3<f64>, mu: f64, radius: f64, j2: f64) -> Vector3<f64> {
    let r = pos.norm();
    let r2 = r * r;
    let z2 = pos.z * pos.z;

    let coeff = -1.5 * j2 * mu * radius * radius / (r2 * r2 * r);
    let xy_factor = coeff * (1.0 - 5.0 * z2 / r2);
    let z_factor = coeff * (3.0 - 5.0 * z2 / r2);

    Vector3::new(xy_factor * pos.x, xy_factor * pos.y, z_factor * pos.z)
}

// ---------------------------------------------------------------------------
// Third-body perturbation
// ---------------------------------------------------------------------------

/// Differential acceleration from a third body at `body_pos` (relative to the
/// central body): `mu_b * ((r_b - r) / |r_b - r|^3 - r_b / |r_b|^3)`.
pub fn third_body(pos: &Vector3<f64>, body_pos: &Vector3<f64>, mu_body: f64) -> Vector3<f64> {
    let to_body = body_pos - pos;
    let d = to_body.norm();
    let rb = body_pos.norm();
    mu_body * (to_body / (d * d * d) - body_pos / (rb * rb * rb))
}
