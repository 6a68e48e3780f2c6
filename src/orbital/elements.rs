use std::f64::consts::{PI, TAU};

use nalgebra::Vector3;
use serde_derive::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_positive, EngineError};

/// Eccentricity below which an orbit is treated as circular.
pub const CIRCULAR_TOLERANCE: f64 = 1e-6;
/// Inclination (rad) below which, or within this of pi, an orbit is treated as equatorial.
pub const EQUATORIAL_TOLERANCE: f64 = 1e-6;

/// Classical Keplerian orbital elements (elliptical orbits only).
///
/// `raan` is `None` for equatorial orbits and `argp` is `None` for circular ones.
/// In those cases `true_anom` is measured from the node line (circular inclined),
/// from the reference X axis (circular equatorial), and `argp` becomes the
/// longitude of periapsis (elliptical equatorial), so the satellite's angular
/// position is never lost.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    pub sma: f64,          // semi-major axis, km
    pub ecc: f64,          // eccentricity (0 = circular)
    pub inc: f64,          // inclination, rad
    pub raan: Option<f64>, // right ascension of ascending node, rad
    pub argp: Option<f64>, // argument of periapsis, rad
    pub true_anom: f64,    // true anomaly, rad
    pub mean_anom: f64,    // mean anomaly, rad
    pub period: f64,       // s
}

impl OrbitalElements {
    /// Build from classical elements, filling the derived mean anomaly and period.
    pub fn new(
        sma: f64,
        ecc: f64,
        inc: f64,
        raan: f64,
        argp: f64,
        true_anom: f64,
        mu: f64,
    ) -> Result<Self, EngineError> {
        ensure_positive(mu, "mu")?;
        ensure_positive(sma, "semi-major axis")?;
        for (value, what) in [(ecc, "eccentricity"), (inc, "inclination"), (raan, "raan"), (argp, "argp"), (true_anom, "true anomaly")] {
            ensure_finite(value, what)?;
        }
        if !(0.0..1.0).contains(&ecc) {
            return Err(EngineError::UnsupportedOrbitType { eccentricity: ecc });
        }
        Ok(Self {
            sma,
            ecc,
            inc,
            raan: Some(wrap_two_pi(raan)),
            argp: Some(wrap_two_pi(argp)),
            true_anom: wrap_two_pi(true_anom),
            mean_anom: mean_from_true(true_anom, ecc),
            period: period(sma, mu),
        })
    }

    /// Circular orbit of radius `sma` at the given inclination, starting on the node line.
    pub fn circular(sma: f64, inc: f64, mu: f64) -> Result<Self, EngineError> {
        Self::new(sma, 0.0, inc, 0.0, 0.0, 0.0, mu)
    }

    pub fn is_circular(&self) -> bool {
        self.argp.is_none()
    }

    pub fn is_equatorial(&self) -> bool {
        self.raan.is_none()
    }

    pub fn periapsis(&self) -> f64 {
        self.sma * (1.0 - self.ecc)
    }

    pub fn apoapsis(&self) -> f64 {
        self.sma * (1.0 + self.ecc)
    }

    /// Cartesian state from the elements. Undefined angles are taken as zero,
    /// which matches the reference directions used by `from_state_vector`.
    pub fn to_state_vector(&self, mu: f64) -> Result<(Vector3<f64>, Vector3<f64>), EngineError> {
        ensure_positive(mu, "mu")?;
        if !(0.0..1.0).contains(&self.ecc) {
            return Err(EngineError::UnsupportedOrbitType { eccentricity: self.ecc });
        }
        ensure_positive(self.sma, "semi-major axis")?;

        let p = self.sma * (1.0 - self.ecc * self.ecc); // semi-latus rectum
        let (sin_nu, cos_nu) = self.true_anom.sin_cos();
        let r_pqw = p / (1.0 + self.ecc * cos_nu);

        // Position and velocity in the perifocal frame (PQW)
        let r_pqw_vec = Vector3::new(r_pqw * cos_nu, r_pqw * sin_nu, 0.0);
        let sqrt_mu_p = (mu / p).sqrt();
        let v_pqw_vec = Vector3::new(-sqrt_mu_p * sin_nu, sqrt_mu_p * (self.ecc + cos_nu), 0.0);

        let (sin_raan, cos_raan) = self.raan.unwrap_or(0.0).sin_cos();
        let (sin_argp, cos_argp) = self.argp.unwrap_or(0.0).sin_cos();
        let (sin_inc, cos_inc) = self.inc.sin_cos();

        // Rotation PQW -> inertial
        let rot = |v: &Vector3<f64>| -> Vector3<f64> {
            Vector3::new(
                (cos_raan * cos_argp - sin_raan * sin_argp * cos_inc) * v.x
                    + (-cos_raan * sin_argp - sin_raan * cos_argp * cos_inc) * v.y,
                (sin_raan * cos_argp + cos_raan * sin_argp * cos_inc) * v.x
                    + (-sin_raan * sin_argp + cos_raan * cos_argp * cos_inc) * v.y,
                (sin_argp * sin_inc) * v.x + (cos_argp * sin_inc) * v.y,
            )
        };

        Ok((rot(&r_pqw_vec), rot(&v_pqw_vec)))
    }

    /// Elements from a central-body-centered inertial state.
    pub fn from_state_vector(pos: &Vector3<f64>, vel: &Vector3<f64>, mu: f64) -> Result<Self, EngineError> {
        ensure_positive(mu, "mu")?;
        if !(pos.iter().chain(vel.iter()).all(|c| c.is_finite())) {
            return Err(EngineError::InvalidInput { reason: "state vector must be finite".into() });
        }
        let r = pos.norm();
        ensure_positive(r, "position magnitude")?;
        let v = vel.norm();

        // Angular momentum
        let h = pos.cross(vel);
        let h_mag = h.norm();

        // Eccentricity vector: (v x h)/mu - r/|r|
        let e_vec = vel.cross(&h) / mu - pos / r;
        let ecc = e_vec.norm();

        let energy = 0.5 * v * v - mu / r;
        if ecc >= 1.0 || energy >= 0.0 || h_mag <= 0.0 {
            return Err(EngineError::UnsupportedOrbitType { eccentricity: ecc.max(1.0) });
        }
        let sma = -mu / (2.0 * energy);

        let h_hat = h / h_mag;
        let inc = h_hat.z.clamp(-1.0, 1.0).acos();
        let equatorial = inc < EQUATORIAL_TOLERANCE || PI - inc < EQUATORIAL_TOLERANCE;
        let circular = ecc < CIRCULAR_TOLERANCE;

        // In-plane angle from `from` to `to`, positive along the direction of motion.
        let angle = |from: &Vector3<f64>, to: &Vector3<f64>| -> f64 {
            wrap_two_pi(h_hat.dot(&from.cross(to)).atan2(from.dot(to)))
        };

        let (raan, argp, true_anom) = if equatorial {
            // Reference direction is the X axis; for retrograde equatorial orbits
            // the in-plane angle runs clockwise when seen from +Z.
            let x_axis = Vector3::x();
            if circular {
                (None, None, angle(&x_axis, pos))
            } else {
                (None, Some(angle(&x_axis, &e_vec)), angle(&e_vec, pos))
            }
        } else {
            let node = Vector3::new(-h.y, h.x, 0.0);
            let node_hat = node / node.norm();
            let raan = wrap_two_pi(node_hat.y.atan2(node_hat.x));
            if circular {
                (Some(raan), None, angle(&node_hat, pos))
            } else {
                (Some(raan), Some(angle(&node_hat, &e_vec)), angle(&e_vec, pos))
            }
        };

        Ok(Self {
            sma,
            ecc,
            inc,
            raan,
            argp,
            true_anom,
            mean_anom: mean_from_true(true_anom, ecc),
            period: period(sma, mu),
        })
    }
}

/// Orbital period for an elliptical orbit (s).
pub fn period(sma: f64, mu: f64) -> f64 {
    TAU * (sma.powi(3) / mu).sqrt()
}

pub fn wrap_two_pi(angle: f64) -> f64 {
    let a = angle.rem_euclid(TAU);
    // rem_euclid can round up to exactly TAU
    if a >= TAU {
        0.0
    } else {
        a
    }
}

/// Mean anomaly from true anomaly (elliptical), in [0, 2pi).
pub fn mean_from_true(true_anom: f64, ecc: f64) -> f64 {
    let (sin_nu, cos_nu) = true_anom.sin_cos();
    let ecc_anom = ((1.0 - ecc * ecc).sqrt() * sin_nu).atan2(ecc + cos_nu);
    wrap_two_pi(ecc_anom - ecc * ecc_anom.sin())
}

/// True anomaly from mean anomaly by Newton iteration on Kepler's equation.
pub fn true_from_mean(mean_anom: f64, ecc: f64) -> Result<f64, EngineError> {
    ensure_finite(mean_anom, "mean anomaly")?;
    if !(0.0..1.0).contains(&ecc) {
        return Err(EngineError::UnsupportedOrbitType { eccentricity: ecc });
    }
    let m = wrap_two_pi(mean_anom);
    let mut ecc_anom = if ecc < 0.8 { m } else { PI };
    for _ in 0..50 {
        let f = ecc_anom - ecc * ecc_anom.sin() - m;
        let step = f / (1.0 - ecc * ecc_anom.cos());
        ecc_anom -= step;
        if step.abs() < 1e-14 {
            break;
        }
    }
    let (sin_e, cos_e) = ecc_anom.sin_cos();
    let nu = ((1.0 - ecc * ecc).sqrt() * sin_e).atan2(cos_e - ecc);
    Ok(wrap_two_pi(nu))
}

#[cfg(test)]
mod tests {
    use super::*;

    const MU: f64 = 398_600.4418;

    #[test]
    fn circular_leo_roundtrip() {
        let orbit = OrbitalElements::circular(6771.0, 51.6_f64.to_radians(), MU).unwrap();
        let (pos, vel) = orbit.to_state_vector(MU).unwrap();

        let recovered = OrbitalElements::from_state_vector(&pos, &vel, MU).unwrap();
        assert!((recovered.sma - orbit.sma).abs() < 1e-6, "SMA mismatch");
        assert!(recovered.ecc < 1e-6, "Should be nearly circular");
        assert!(recovered.argp.is_none(), "argp undefined for circular orbits");
        assert!((recovered.inc - orbit.inc).abs() < 1e-9, "Inclination mismatch");
    }

    #[test]
    fn circular_orbit_speed() {
        let orbit = OrbitalElements::circular(6771.0, 0.0, MU).unwrap();
        let (_, vel) = orbit.to_state_vector(MU).unwrap();
        assert!((vel.norm() - 7.6726).abs() < 1e-4, "Circular orbit speed mismatch");
    }

    #[test]
    fn leo_period() {
        let orbit = OrbitalElements::circular(6771.0, 0.0, MU).unwrap();
        assert!((orbit.period - 5544.9).abs() < 1.0, "got {:.1} s", orbit.period);
    }

    #[test]
    fn elliptical_inclined_roundtrip() {
        let orbit = OrbitalElements::new(
            9000.0, 0.2, 0.7, 1.1, 2.3, 0.4, MU,
        ).unwrap();
        let (pos, vel) = orbit.to_state_vector(MU).unwrap();
        let el = OrbitalElements::from_state_vector(&pos, &vel, MU).unwrap();
        assert!((el.sma - 9000.0).abs() < 1e-6);
        assert!((el.ecc - 0.2).abs() < 1e-10);
        assert!((el.inc - 0.7).abs() < 1e-10);
        assert!((el.raan.unwrap() - 1.1).abs() < 1e-10);
        assert!((el.argp.unwrap() - 2.3).abs() < 1e-10);
        assert!((el.true_anom - 0.4).abs() < 1e-10);
        assert!((el.mean_anom - orbit.mean_anom).abs() < 1e-10);
    }

    #[test]
    fn circular_equatorial_keeps_longitude() {
        let r = 7000.0;
        let v = (MU / r).sqrt();
        let lon = 2.0_f64;
        let pos = Vector3::new(r * lon.cos(), r * lon.sin(), 0.0);
        let vel = Vector3::new(-v * lon.sin(), v * lon.cos(), 0.0);
        let el = OrbitalElements::from_state_vector(&pos, &vel, MU).unwrap();
        assert!(el.raan.is_none() && el.argp.is_none());
        assert!(!el.sma.is_nan() && !el.inc.is_nan() && !el.true_anom.is_nan());
        assert!((el.true_anom - lon).abs() < 1e-9);
    }

    #[test]
    fn retrograde_equatorial_roundtrip() {
        let r = 7000.0;
        let v = (MU / r).sqrt() * 1.1;
        let pos = Vector3::new(r * 0.6, r * 0.8, 0.0);
        let vel = Vector3::new(v * 0.8, -v * 0.6, 0.0);
        let el = OrbitalElements::from_state_vector(&pos, &vel, MU).unwrap();
        assert!(el.raan.is_none());
        assert!(el.argp.is_some());
        let (p2, v2) = el.to_state_vector(MU).unwrap();
        assert!((p2 - pos).norm() < 1e-6);
        assert!((v2 - vel).norm() < 1e-9);
    }

    #[test]
    fn hyperbolic_is_unsupported() {
        let pos = Vector3::new(7000.0, 0.0, 0.0);
        let vel = Vector3::new(0.0, 12.0, 0.0);
        assert!(matches!(
            OrbitalElements::from_state_vector(&pos, &vel, MU),
            Err(EngineError::UnsupportedOrbitType { .. })
        ));
        assert!(OrbitalElements::new(7000.0, 1.2, 0.0, 0.0, 0.0, 0.0, MU).is_err());
    }

    #[test]
    fn invalid_mu_is_rejected() {
        let pos = Vector3::new(7000.0, 0.0, 0.0);
        let vel = Vector3::new(0.0, 7.5, 0.0);
        assert!(matches!(
            OrbitalElements::from_state_vector(&pos, &vel, -1.0),
            Err(EngineError::InvalidInput { .. })
        ));
    }

    #[test]
    fn kepler_solver_inverts_mean_anomaly() {
        for &e in &[0.0, 0.1, 0.5, 0.9, 0.97] {
            for k in 0..12 {
                let nu = k as f64 * 0.5;
                let m = mean_from_true(nu, e);
                let back = true_from_mean(m, e).unwrap();
                let diff = (wrap_two_pi(back) - wrap_two_pi(nu)).abs();
                assert!(diff < 1e-9 || (TAU - diff) < 1e-9, "e={e} nu={nu} back={back}");
            }
        }
    }
}
