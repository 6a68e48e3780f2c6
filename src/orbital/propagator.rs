use log::{debug, warn};
use serde_derive::{Deserialize, Serialize};

use crate::dynamics::state::{Deriv, OrbitalState};
use crate::error::{ensure_finite, ensure_positive, EngineError};
use crate::physics::forces::{ForceContext, ForceModel};
use crate::sim::integrator::rk4_step;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// How each output interval is subdivided for integration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum StepMode {
    /// Equal RK4 substeps no longer than `max_substep`.
    Fixed,
    /// Step-doubling RK4 keeping the position error per substep under `tolerance` km.
    Adaptive { tolerance: f64, min_step: f64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropagatorSettings {
    pub max_substep: f64, // s
    pub step_mode: StepMode,
}

impl Default for PropagatorSettings {
    fn default() -> Self {
        Self {
            max_substep: 10.0,
            step_mode: StepMode::Fixed,
        }
    }
}

impl PropagatorSettings {
    pub fn validate(&self) -> Result<(), EngineError> {
        ensure_positive(self.max_substep, "max substep")?;
        if let StepMode::Adaptive { tolerance, min_step } = self.step_mode {
            ensure_positive(tolerance, "adaptive tolerance")?;
            ensure_positive(min_step, "adaptive min step")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Propagator
// ---------------------------------------------------------------------------

/// RK4 propagator driving the force model. Holds no mutable state: identical
/// inputs always produce identical trajectories.
#[derive(Debug, Clone, Copy, Default)]
pub struct Propagator {
    pub force_model: ForceModel,
    pub settings: PropagatorSettings,
}

impl Propagator {
    pub fn new(settings: PropagatorSettings) -> Self {
        Self { force_model: ForceModel, settings }
    }

    /// Lazily propagate `initial` for `duration` seconds, emitting a point every
    /// `time_step` seconds (the last interval may be shorter) plus the initial point.
    ///
    /// A non-positive `duration` yields the initial state only. Invalid inputs are
    /// rejected here, before any integration.
    pub fn propagate<'a>(
        &self,
        initial: &OrbitalState,
        ctx: ForceContext<'a>,
        duration: f64,
        time_step: f64,
    ) -> Result<Trajectory<'a>, EngineError> {
        self.settings.validate()?;
        ensure_finite(duration, "duration")?;
        ensure_positive(time_step, "time step")?;
        if !initial.is_finite() {
            return Err(EngineError::InvalidInput { reason: "initial state must be finite".into() });
        }
        ctx.validate()?;

        let duration = duration.max(0.0);
        debug!(
            "propagating from t={:.3} s for {:.3} s (output step {:.3} s)",
            initial.time, duration, time_step
        );
        Ok(Trajectory {
            propagator: *self,
            ctx,
            state: *initial,
            start_time: initial.time,
            end_time: initial.time + duration,
            // At least one step per propagation
            step: if duration > 0.0 { time_step.min(duration) } else { time_step },
            steps_taken: 0,
            started: false,
            done: false,
        })
    }

    /// Advance a live state by exactly `dt` seconds.
    pub fn step(&self, state: &OrbitalState, ctx: &ForceContext, dt: f64) -> Result<OrbitalState, EngineError> {
        ensure_positive(dt, "step")?;
        self.advance(state, ctx, state.time + dt)
    }

    fn derivative(&self, ctx: &ForceContext, s: &OrbitalState) -> Result<Deriv, EngineError> {
        let acc = self.force_model.acceleration(s.time, &s.pos, &s.vel, ctx)?;
        Ok(Deriv { dpos: s.vel, dvel: acc })
    }

    /// Integrate from `state` up to `target` (absolute time), subdividing per the step mode.
    fn advance(&self, state: &OrbitalState, ctx: &ForceContext, target: f64) -> Result<OrbitalState, EngineError> {
        let interval = target - state.time;
        if interval <= 0.0 {
            return Ok(*state);
        }
        let mut s = *state;
        match self.settings.step_mode {
            StepMode::Fixed => {
                let n = (interval / self.settings.max_substep).ceil().max(1.0) as usize;
                let h = interval / n as f64;
                for i in 0..n {
                    s = rk4_step(&s, h, |st| self.derivative(ctx, st))?;
                    if i + 1 == n {
                        s.time = target;
                    }
                }
            }
            StepMode::Adaptive { tolerance, min_step } => {
                let mut h = self.settings.max_substep.min(interval);
                while target - s.time > 0.0 {
                    let remaining = target - s.time;
                    let last = h >= remaining;
                    let dt = if last { remaining } else { h };

                    let full = rk4_step(&s, dt, |st| self.derivative(ctx, st))?;
                    let half = rk4_step(&s, dt * 0.5, |st| self.derivative(ctx, st))?;
                    let fine = rk4_step(&half, dt * 0.5, |st| self.derivative(ctx, st))?;
                    let err = (fine.pos - full.pos).norm();

                    let scale = if err > 0.0 { 0.9 * (tolerance / err).powf(0.2) } else { 2.0 };
                    if err <= tolerance || dt <= min_step {
                        s = fine;
                        if last {
                            s.time = target;
                        }
                        h = (dt * scale.min(2.0)).min(self.settings.max_substep).max(min_step);
                    } else {
                        h = (dt * scale.max(0.1)).max(min_step);
                    }
                }
            }
        }
        let altitude = s.radius() - ctx.central.radius;
        if altitude <= 0.0 {
            return Err(EngineError::CollisionDetected { time: s.time, altitude });
        }
        Ok(s)
    }
}

// ---------------------------------------------------------------------------
// Trajectory: lazy, finite, single-pass sequence of states
// ---------------------------------------------------------------------------

/// Lazily integrated trajectory. Each item is consumed once; re-propagation
/// needs a new call to `Propagator::propagate`.
///
/// On failure the iterator yields one `Err` and then ends, so every `Ok` point
/// before it is a valid state.
#[derive(Debug)]
pub struct Trajectory<'a> {
    propagator: Propagator,
    ctx: ForceContext<'a>,
    state: OrbitalState,
    start_time: f64,
    end_time: f64,
    step: f64,
    steps_taken: u64,
    started: bool,
    done: bool,
}

/// Valid prefix of a trajectory together with the error that stopped it.
#[derive(Debug)]
pub struct PartialTrajectory {
    pub points: Vec<OrbitalState>,
    pub error: EngineError,
}

impl<'a> Trajectory<'a> {
    pub fn end_time(&self) -> f64 {
        self.end_time
    }

    /// Drain into a vector, keeping the valid prefix if propagation stops early.
    pub fn collect_points(self) -> Result<Vec<OrbitalState>, PartialTrajectory> {
        let mut points = Vec::with_capacity(self.size_hint().0);
        for item in self {
            match item {
                Ok(p) => points.push(p),
                Err(error) => return Err(PartialTrajectory { points, error }),
            }
        }
        Ok(points)
    }

    /// Remaining number of points, including the initial one if not yet emitted.
    fn remaining(&self) -> usize {
        if self.done {
            return 0;
        }
        let total_steps = ((self.end_time - self.start_time) / self.step).ceil() as u64;
        let pending = total_steps.saturating_sub(self.steps_taken) as usize;
        pending + usize::from(!self.started)
    }
}

impl<'a> Iterator for Trajectory<'a> {
    type Item = Result<OrbitalState, EngineError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            if self.end_time <= self.start_time {
                self.done = true;
            }
            return Some(Ok(self.state));
        }

        // Targets are computed from the start time so the sample grid never drifts.
        let target = (self.start_time + (self.steps_taken + 1) as f64 * self.step).min(self.end_time);
        match self.propagator.advance(&self.state, &self.ctx, target) {
            Ok(next) => {
                self.state = next;
                self.steps_taken += 1;
                if target >= self.end_time {
                    self.done = true;
                    debug!("propagation complete at t={:.3} s", target);
                }
                Some(Ok(next))
            }
            Err(e) => {
                warn!("propagation stopped at t={:.3} s: {}", self.state.time, e);
                self.done = true;
                Some(Err(e))
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.remaining();
        (0, Some(n))
    }
}

impl<'a> std::iter::FusedIterator for Trajectory<'a> {}
