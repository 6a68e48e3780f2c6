use nalgebra::Vector3;
use serde_derive::{Deserialize, Serialize};

use super::{aerodynamics, gravity};
use crate::bodies::{BodyId, CentralBody, PerturbingBody};
use crate::dynamics::state::Ballistics;
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Force model configuration
// ---------------------------------------------------------------------------

/// Perturbations to include on top of central-body point-mass gravity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceFlags {
    pub include_j2: bool,
    pub include_drag: bool,
    pub include_third_body: bool,
}

impl ForceFlags {
    /// Point-mass gravity only.
    pub fn two_body() -> Self {
        Self { include_j2: false, include_drag: false, include_third_body: false }
    }

    pub fn all() -> Self {
        Self { include_j2: true, include_drag: true, include_third_body: true }
    }
}

impl Default for ForceFlags {
    fn default() -> Self {
        Self { include_j2: true, include_drag: true, include_third_body: false }
    }
}

/// Origin of an acceleration component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ForceSource {
    CentralGravity,
    J2,
    Drag,
    ThirdBody(BodyId),
}

/// Summed acceleration plus its labeled components (km/s^2).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccelerationBreakdown {
    pub total: Vector3<f64>,
    pub components: Vec<(ForceSource, Vector3<f64>)>,
}

impl AccelerationBreakdown {
    pub fn component(&self, source: ForceSource) -> Option<Vector3<f64>> {
        self.components
            .iter()
            .find(|(s, _)| *s == source)
            .map(|(_, a)| *a)
    }
}

/// Everything the force model reads for one satellite, borrowed for a tick or a query.
#[derive(Debug, Clone, Copy)]
pub struct ForceContext<'a> {
    pub central: &'a CentralBody,
    pub perturbers: &'a [PerturbingBody],
    pub flags: ForceFlags,
    pub ballistics: Ballistics,
}

impl<'a> ForceContext<'a> {
    pub fn new(
        central: &'a CentralBody,
        perturbers: &'a [PerturbingBody],
        flags: ForceFlags,
        ballistics: Ballistics,
    ) -> Self {
        Self { central, perturbers, flags, ballistics }
    }

    pub fn validate(&self) -> Result<(), EngineError> {
        self.central.validate()?;
        if self.flags.include_third_body {
            for body in self.perturbers {
                body.validate()?;
            }
        }
        if self.flags.include_drag && self.central.atmosphere.is_some() {
            self.ballistics.validate()?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Force model
// ---------------------------------------------------------------------------

/// Stateless acceleration model; every input arrives with the call.
#[derive(Debug, Clone, Copy, Default)]
pub struct ForceModel;

impl ForceModel {
    /// Acceleration with labeled breakdown at a position/velocity.
    ///
    /// Fails with `PropagationDiverged` on a non-finite state and with
    /// `CollisionDetected` when the satellite is at or inside the central body.
    pub fn compute_acceleration(
        &self,
        time: f64,
        pos: &Vector3<f64>,
        vel: &Vector3<f64>,
        ctx: &ForceContext,
    ) -> Result<AccelerationBreakdown, EngineError> {
        let mut components = Vec::with_capacity(3 + ctx.perturbers.len());
        let total = self.accumulate(time, pos, vel, ctx, |source, a| components.push((source, a)))?;
        Ok(AccelerationBreakdown { total, components })
    }

    /// Summed acceleration only; used at integrator stage points.
    pub fn acceleration(
        &self,
        time: f64,
        pos: &Vector3<f64>,
        vel: &Vector3<f64>,
        ctx: &ForceContext,
    ) -> Result<Vector3<f64>, EngineError> {
        self.accumulate(time, pos, vel, ctx, |_, _| {})
    }

    fn accumulate(
        &self,
        time: f64,
        pos: &Vector3<f64>,
        vel: &Vector3<f64>,
        ctx: &ForceContext,
        mut record: impl FnMut(ForceSource, Vector3<f64>),
    ) -> Result<Vector3<f64>, EngineError> {
        if !(pos.iter().all(|x| x.is_finite()) && vel.iter().all(|x| x.is_finite())) {
            return Err(EngineError::PropagationDiverged { time });
        }
        let body = ctx.central;
        let r = pos.norm();
        if r <= body.radius {
            return Err(EngineError::CollisionDetected { time, altitude: r - body.radius });
        }

        let a_central = gravity::point_mass(pos, body.mu);
        record(ForceSource::CentralGravity, a_central);
        let mut total = a_central;

        if let (true, Some(j2)) = (ctx.flags.include_j2, body.j2) {
            let a = gravity::j2_perturbation(pos, body.mu, body.radius, j2);
            record(ForceSource::J2, a);
            total += a;
        }

        if let (true, Some(atm)) = (ctx.flags.include_drag, &body.atmosphere) {
            let density = atm.density(r - body.radius);
            let b = &ctx.ballistics;
            let a = aerodynamics::drag_acceleration(
                pos,
                vel,
                body.rotation_rate,
                density,
                b.drag_coefficient,
                b.area,
                b.mass,
            );
            record(ForceSource::Drag, a);
            total += a;
        }

        if ctx.flags.include_third_body {
            for third in ctx.perturbers.iter().filter(|p| p.id != body.id) {
                let a = gravity::third_body(pos, &third.relative_to(body), third.mu);
                record(ForceSource::ThirdBody(third.id), a);
                total += a;
            }
        }

        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::physics::atmosphere::ExponentialAtmosphere;

    fn earth() -> CentralBody {
        CentralBody::new(399, "Earth", 398_600.4418, 6378.137)
            .unwrap()
            .with_j2(1.082_63e-3)
            .with_rotation(7.292_115e-5, 0.0)
            .with_atmosphere(ExponentialAtmosphere::earth())
    }

    fn ballistics() -> Ballistics {
        Ballistics { mass: 500.0, drag_coefficient: 2.2, area: 4.0 }
    }

    #[test]
    fn two_body_only_has_central_component() {
        let body = earth();
        let ctx = ForceContext::new(&body, &[], ForceFlags::two_body(), ballistics());
        let pos = Vector3::new(6771.0, 0.0, 0.0);
        let vel = Vector3::new(0.0, 7.6726, 0.0);
        let acc = ForceModel.compute_acceleration(0.0, &pos, &vel, &ctx).unwrap();
        assert_eq!(acc.components.len(), 1);
        assert_eq!(acc.total, acc.component(ForceSource::CentralGravity).unwrap());
    }

    #[test]
    fn components_sum_to_total() {
        let body = earth();
        let moon = PerturbingBody::new(301, 4902.8, Vector3::new(0.0, 384_400.0, 0.0));
        let perturbers = [moon];
        let ctx = ForceContext::new(&body, &perturbers, ForceFlags::all(), ballistics());
        let pos = Vector3::new(6700.0, 0.0, 300.0);
        let vel = Vector3::new(0.0, 7.7, 0.0);
        let acc = ForceModel.compute_acceleration(0.0, &pos, &vel, &ctx).unwrap();
        assert_eq!(acc.components.len(), 4);
        let sum = acc.components.iter().fold(Vector3::zeros(), |s, (_, a)| s + a);
        assert!((sum - acc.total).norm() < 1e-18);
        assert!(acc.component(ForceSource::Drag).unwrap().y < 0.0);
        assert!(acc.component(ForceSource::ThirdBody(301)).is_some());
        let plain = ForceModel.acceleration(0.0, &pos, &vel, &ctx).unwrap();
        assert_eq!(plain, acc.total);
    }

    #[test]
    fn missing_j2_or_atmosphere_is_skipped() {
        let body = CentralBody::new(499, "Mars", 42_828.37, 3396.19).unwrap();
        let ctx = ForceContext::new(&body, &[], ForceFlags::all(), ballistics());
        let pos = Vector3::new(3800.0, 0.0, 0.0);
        let acc = ForceModel
            .compute_acceleration(0.0, &pos, &Vector3::new(0.0, 3.3, 0.0), &ctx)
            .unwrap();
        assert_eq!(acc.components.len(), 1);
    }

    #[test]
    fn inside_body_is_a_collision() {
        let body = earth();
        let ctx = ForceContext::new(&body, &[], ForceFlags::two_body(), ballistics());
        let err = ForceModel
            .acceleration(42.0, &Vector3::new(6000.0, 0.0, 0.0), &Vector3::zeros(), &ctx)
            .unwrap_err();
        match err {
            EngineError::CollisionDetected { time, altitude } => {
                assert_eq!(time, 42.0);
                assert!(altitude < 0.0);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(ForceModel
            .acceleration(0.0, &Vector3::zeros(), &Vector3::zeros(), &ctx)
            .is_err());
    }

    #[test]
    fn non_finite_state_is_divergence() {
        let body = earth();
        let ctx = ForceContext::new(&body, &[], ForceFlags::all(), ballistics());
        let nan = Vector3::new(f64::NAN, 0.0, 0.0);
        assert!(matches!(
            ForceModel.acceleration(7.0, &nan, &Vector3::zeros(), &ctx),
            Err(EngineError::PropagationDiverged { time }) if time == 7.0
        ));
        let inf = Vector3::new(0.0, f64::INFINITY, 0.0);
        assert!(matches!(
            ForceModel.acceleration(7.0, &Vector3::new(7000.0, 0.0, 0.0), &inf, &ctx),
            Err(EngineError::PropagationDiverged { .. })
        ));
    }
}
