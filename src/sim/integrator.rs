use crate::dynamics::state::{Deriv, OrbitalState};
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Classical 4th-order Runge-Kutta over the 6-dimensional state
// ---------------------------------------------------------------------------

/// Single RK4 step: advance `state` by `dt` using `deriv` at the four stage points.
///
/// Derivative failures (e.g. a collision at a stage point) are propagated; a
/// non-finite result is reported as `PropagationDiverged`.
pub fn rk4_step<F>(state: &OrbitalState, dt: f64, mut deriv: F) -> Result<OrbitalState, EngineError>
where
    F: FnMut(&OrbitalState) -> Result<Deriv, EngineError>,
{
    let k1 = deriv(state)?;
    let k2 = deriv(&state.apply(&k1, dt * 0.5))?;
    let k3 = deriv(&state.apply(&k2, dt * 0.5))?;
    let k4 = deriv(&state.apply(&k3, dt))?;

    let next = OrbitalState {
        time: state.time + dt,
        pos: state.pos + (k1.dpos + 2.0 * k2.dpos + 2.0 * k3.dpos + k4.dpos) * (dt / 6.0),
        vel: state.vel + (k1.dvel + 2.0 * k2.dvel + 2.0 * k3.dvel + k4.dvel) * (dt / 6.0),
    };

    if !next.is_finite() {
        return Err(EngineError::PropagationDiverged { time: state.time });
    }
    Ok(next)
}
