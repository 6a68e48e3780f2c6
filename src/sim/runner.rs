use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};
use nalgebra::Vector3;
use rayon::prelude::*;
use serde_derive::{Deserialize, Serialize};

use super::nodes::{ManeuverNode, ManeuverNodeManager, NodeId, NodeQueue};
use super::preview::{Preview, PreviewHandle, PreviewTracker};
use crate::bodies::{catalog, BodyId, CentralBody, PerturbingBody};
use crate::config::EngineConfig;
use crate::dynamics::frame::RnpVector;
use crate::dynamics::state::{OrbitalState, Satellite, SatelliteId};
use crate::error::{ensure_finite, ensure_positive, EngineError};
use crate::ground::{project, GeoPoint, GroundTrackPoint, PassPredictor, PassWindow, QueryOutcome};
use crate::orbital::elements::OrbitalElements;
use crate::orbital::maneuvers::{self, TransferPlan};
use crate::orbital::propagator::Propagator;
use crate::physics::forces::{AccelerationBreakdown, ForceContext, ForceFlags};

// ---------------------------------------------------------------------------
// Live satellites
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SatelliteStatus {
    Active,
    /// Stopped after a collision or divergence; state is the last valid one.
    /// Later ticks skip the satellite until `reset_satellite` gives it a new
    /// state.
    Halted { time: f64, reason: String },
}

#[derive(Debug, Clone)]
pub struct SatelliteSlot {
    pub satellite: Satellite,
    pub status: SatelliteStatus,
}

/// Outcome of one simulation tick.
#[derive(Debug, Default)]
pub struct TickReport {
    pub time: f64,
    pub executed: Vec<(SatelliteId, NodeId)>,
    /// Per-satellite failures; fatal ones also halted the satellite.
    pub failures: Vec<(SatelliteId, EngineError)>,
}

impl TickReport {
    pub fn halted(&self) -> impl Iterator<Item = SatelliteId> + '_ {
        self.failures
            .iter()
            .filter(|(_, e)| e.is_fatal_for_satellite())
            .map(|(id, _)| *id)
    }
}

struct SatelliteTick {
    id: SatelliteId,
    executed: Vec<NodeId>,
    failure: Option<EngineError>,
}

/// Catalog bodies refreshed at the start of every tick.
#[derive(Debug, Clone)]
struct Ephemeris {
    center: BodyId,
    perturbers: Vec<BodyId>,
}

// ---------------------------------------------------------------------------
// Simulation driver
// ---------------------------------------------------------------------------

/// Owns live satellites, bodies and maneuver nodes, and answers planning queries.
#[derive(Debug)]
pub struct Simulation {
    config: EngineConfig,
    time: f64,
    start_time: f64,
    bodies: HashMap<BodyId, CentralBody>,
    perturbers: Vec<PerturbingBody>,
    ephemeris: Option<Ephemeris>,
    satellites: BTreeMap<SatelliteId, SatelliteSlot>,
    nodes: ManeuverNodeManager,
    previews: PreviewTracker,
    propagator: Propagator,
}

impl Default for Simulation {
    fn default() -> Self {
        Self::build(EngineConfig::default(), 0.0)
    }
}

impl Simulation {
    pub fn new(config: EngineConfig) -> Result<Self, EngineError> {
        config.validate()?;
        Ok(Self::build(config, 0.0))
    }

    /// Start the clock at `start_time`; body rotation angles are measured from it.
    pub fn with_start_time(config: EngineConfig, start_time: f64) -> Result<Self, EngineError> {
        config.validate()?;
        ensure_finite(start_time, "start time")?;
        Ok(Self::build(config, start_time))
    }

    fn build(config: EngineConfig, start_time: f64) -> Self {
        let mut nodes = ManeuverNodeManager::new(config.node_time_tolerance);
        nodes.set_clock(start_time);
        Self {
            propagator: Propagator::new(config.propagator),
            config,
            time: start_time,
            start_time,
            bodies: HashMap::new(),
            perturbers: Vec::new(),
            ephemeris: None,
            satellites: BTreeMap::new(),
            nodes,
            previews: PreviewTracker::default(),
        }
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_force_flags(&mut self, flags: ForceFlags) {
        self.config.forces = flags;
    }

    // -----------------------------------------------------------------------
    // Bodies
    // -----------------------------------------------------------------------

    pub fn add_central_body(&mut self, body: CentralBody) -> Result<(), EngineError> {
        body.validate()?;
        debug!("central body {} ({}) registered", body.id, body.name);
        self.bodies.insert(body.id, body);
        Ok(())
    }

    pub fn central_body(&self, id: BodyId) -> Result<&CentralBody, EngineError> {
        self.bodies.get(&id).ok_or(EngineError::CentralBodyNotFound { id })
    }

    /// Replace the perturbing-body snapshot used from the next tick on.
    pub fn set_perturbing_bodies(&mut self, bodies: Vec<PerturbingBody>) -> Result<(), EngineError> {
        for body in &bodies {
            body.validate()?;
        }
        self.perturbers = bodies;
        self.ephemeris = None;
        Ok(())
    }

    pub fn perturbing_bodies(&self) -> &[PerturbingBody] {
        &self.perturbers
    }

    /// Take `center` and `perturbers` from the built-in catalog and keep their
    /// positions updated from canonical orbits at every tick.
    pub fn use_catalog_ephemeris(&mut self, center: BodyId, perturbers: &[BodyId]) -> Result<(), EngineError> {
        let ephemeris = Ephemeris { center, perturbers: perturbers.to_vec() };
        self.refresh_ephemeris(&ephemeris)?;
        info!("catalog ephemeris enabled around body {} ({} perturbers)", center, perturbers.len());
        self.ephemeris = Some(ephemeris);
        Ok(())
    }

    fn refresh_ephemeris(&mut self, ephemeris: &Ephemeris) -> Result<(), EngineError> {
        let (central, perturbers) = catalog::snapshot(ephemeris.center, &ephemeris.perturbers, self.time)?;
        self.bodies.insert(central.id, central);
        self.perturbers = perturbers;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Satellites
    // -----------------------------------------------------------------------

    pub fn add_satellite(&mut self, satellite: Satellite) -> Result<(), EngineError> {
        satellite.validate()?;
        let body = self.central_body(satellite.central_body_id)?;
        let altitude = satellite.position.norm() - body.radius;
        if altitude <= 0.0 {
            return Err(EngineError::InvalidInput {
                reason: format!("satellite {} starts {:.3} km below the surface", satellite.id, -altitude),
            });
        }
        if self.satellites.contains_key(&satellite.id) {
            return Err(EngineError::InvalidInput {
                reason: format!("satellite {} already exists", satellite.id),
            });
        }
        info!("sat {} added about body {}", satellite.id, satellite.central_body_id);
        self.nodes.register(satellite.id);
        self.satellites.insert(
            satellite.id,
            SatelliteSlot { satellite, status: SatelliteStatus::Active },
        );
        Ok(())
    }

    pub fn remove_satellite(&mut self, id: SatelliteId) -> Result<Satellite, EngineError> {
        let slot = self.satellites.remove(&id).ok_or(EngineError::SatelliteNotFound { id })?;
        self.nodes.unregister(id);
        self.previews.invalidate(id);
        Ok(slot.satellite)
    }

    /// Overwrite a satellite's state at the current time and mark it active
    /// again. Outstanding previews for it become stale; pending nodes stay.
    pub fn reset_satellite(
        &mut self,
        id: SatelliteId,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
    ) -> Result<(), EngineError> {
        let slot = self.satellites.get(&id).ok_or(EngineError::SatelliteNotFound { id })?;
        let mut satellite = slot.satellite.clone();
        satellite.position = position;
        satellite.velocity = velocity;
        satellite.validate()?;
        let altitude = position.norm() - self.central_body(satellite.central_body_id)?.radius;
        if altitude <= 0.0 {
            return Err(EngineError::InvalidInput {
                reason: format!("satellite {} reset {:.3} km below the surface", id, -altitude),
            });
        }
        if let SatelliteStatus::Halted { time, .. } = slot.status {
            info!("sat {} resumed at t={:.3} s after halting at t={:.3} s", id, self.time, time);
        }
        self.satellites.insert(id, SatelliteSlot { satellite, status: SatelliteStatus::Active });
        self.previews.invalidate(id);
        Ok(())
    }

    pub fn satellite(&self, id: SatelliteId) -> Result<&Satellite, EngineError> {
        self.slot(id).map(|s| &s.satellite)
    }

    pub fn status(&self, id: SatelliteId) -> Result<&SatelliteStatus, EngineError> {
        self.slot(id).map(|s| &s.status)
    }

    pub fn satellite_ids(&self) -> impl Iterator<Item = SatelliteId> + '_ {
        self.satellites.keys().copied()
    }

    fn slot(&self, id: SatelliteId) -> Result<&SatelliteSlot, EngineError> {
        self.satellites.get(&id).ok_or(EngineError::SatelliteNotFound { id })
    }

    // -----------------------------------------------------------------------
    // Tick
    // -----------------------------------------------------------------------

    /// Advance every active satellite by `dt` seconds.
    ///
    /// Satellites step in parallel. A step is split at the execution time of
    /// each pending node inside it so burns land on their scheduled time.
    /// A failing satellite never stops the others.
    pub fn tick(&mut self, dt: f64) -> Result<TickReport, EngineError> {
        ensure_positive(dt, "tick duration")?;
        if let Some(ephemeris) = self.ephemeris.clone() {
            self.refresh_ephemeris(&ephemeris)?;
        }

        let from = self.time;
        let to = from + dt;
        let bodies = &self.bodies;
        let perturbers = self.perturbers.as_slice();
        let flags = self.config.forces;
        let propagator = self.propagator;

        let work: Vec<(&mut SatelliteSlot, &mut NodeQueue)> = self
            .satellites
            .iter_mut()
            .zip(self.nodes.queues_mut())
            .filter(|((a, _), (b, _))| a == b)
            .map(|((_, slot), (_, queue))| (slot, queue))
            .collect();

        let results: Vec<SatelliteTick> = work
            .into_par_iter()
            .filter(|(slot, _)| slot.status == SatelliteStatus::Active)
            .map(|(slot, queue)| step_satellite(slot, queue, bodies, perturbers, flags, &propagator, from, to))
            .collect();

        let mut report = TickReport { time: to, ..Default::default() };
        for r in results {
            if !r.executed.is_empty() {
                self.previews.invalidate(r.id);
            }
            report.executed.extend(r.executed.into_iter().map(|n| (r.id, n)));
            if let Some(e) = r.failure {
                report.failures.push((r.id, e));
            }
        }

        self.time = to;
        self.nodes.set_clock(to);
        debug!(
            "tick to t={:.3} s: {} burn(s), {} failure(s)",
            to,
            report.executed.len(),
            report.failures.len()
        );
        Ok(report)
    }

    // -----------------------------------------------------------------------
    // Maneuver nodes
    // -----------------------------------------------------------------------

    pub fn add_maneuver_node(
        &mut self,
        satellite: SatelliteId,
        execution_time: f64,
        delta_v: RnpVector,
    ) -> Result<NodeId, EngineError> {
        self.slot(satellite)?;
        self.nodes.add_node(satellite, execution_time, delta_v)
    }

    pub fn remove_maneuver_node(&mut self, satellite: SatelliteId, node: NodeId) -> Result<(), EngineError> {
        self.nodes.remove_node(satellite, node)
    }

    pub fn maneuver_nodes(&self, satellite: SatelliteId) -> Result<&[ManeuverNode], EngineError> {
        self.nodes.nodes(satellite)
    }

    // -----------------------------------------------------------------------
    // Queries on the live state
    // -----------------------------------------------------------------------

    pub fn orbital_elements(&self, satellite: SatelliteId) -> Result<OrbitalElements, EngineError> {
        let sat = self.satellite(satellite)?;
        let body = self.central_body(sat.central_body_id)?;
        OrbitalElements::from_state_vector(&sat.position, &sat.velocity, body.mu)
    }

    /// Current acceleration with its labeled components.
    pub fn acceleration(&self, satellite: SatelliteId) -> Result<AccelerationBreakdown, EngineError> {
        let sat = self.satellite(satellite)?;
        let body = self.central_body(sat.central_body_id)?;
        let ctx = ForceContext::new(body, &self.perturbers, self.config.forces, sat.ballistics());
        self.propagator
            .force_model
            .compute_acceleration(self.time, &sat.position, &sat.velocity, &ctx)
    }

    pub fn plan_hohmann(
        &self,
        satellite: SatelliteId,
        target_sma: f64,
        target_ecc: f64,
    ) -> Result<TransferPlan, EngineError> {
        self.snapshot(satellite)?.plan_hohmann(target_sma, target_ecc)
    }

    /// Commit a plan computed against the current state.
    pub fn materialize(&mut self, plan: &TransferPlan) -> Result<Vec<NodeId>, EngineError> {
        self.slot(plan.satellite_id)?;
        let ids = plan.materialize(&mut self.nodes, self.time)?;
        self.previews.invalidate(plan.satellite_id);
        Ok(ids)
    }

    /// Commit a previewed plan; refused if a newer preview was requested or
    /// the satellite's orbit changed since.
    pub fn materialize_preview(&mut self, preview: &Preview<TransferPlan>) -> Result<Vec<NodeId>, EngineError> {
        if !self.previews.is_current(preview.satellite_id, preview.generation) {
            warn!("refusing stale transfer preview for sat {}", preview.satellite_id);
            return Err(EngineError::StalePreview { id: preview.satellite_id });
        }
        self.materialize(&preview.value)
    }

    /// Sample the future ground track with `num_points` points over `duration`
    /// (0 points uses the configured default).
    pub fn ground_track(
        &self,
        satellite: SatelliteId,
        duration: f64,
        num_points: usize,
    ) -> Result<QueryOutcome<Vec<GroundTrackPoint>>, EngineError> {
        self.snapshot(satellite)?.ground_track(duration, num_points)
    }

    pub fn pass_windows(
        &self,
        poi: &GeoPoint,
        satellite: SatelliteId,
        duration: f64,
    ) -> Result<QueryOutcome<Vec<PassWindow>>, EngineError> {
        self.snapshot(satellite)?.pass_windows(poi, duration)
    }

    // -----------------------------------------------------------------------
    // Previews: same queries on worker tasks, last request wins
    // -----------------------------------------------------------------------

    pub fn preview_hohmann(
        &self,
        satellite: SatelliteId,
        target_sma: f64,
        target_ecc: f64,
    ) -> Result<PreviewHandle<TransferPlan>, EngineError> {
        let snapshot = self.snapshot(satellite)?;
        Ok(self
            .previews
            .spawn(satellite, move || snapshot.plan_hohmann(target_sma, target_ecc)))
    }

    pub fn preview_ground_track(
        &self,
        satellite: SatelliteId,
        duration: f64,
        num_points: usize,
    ) -> Result<PreviewHandle<QueryOutcome<Vec<GroundTrackPoint>>>, EngineError> {
        let snapshot = self.snapshot(satellite)?;
        Ok(self
            .previews
            .spawn(satellite, move || snapshot.ground_track(duration, num_points)))
    }

    pub fn preview_pass_windows(
        &self,
        poi: GeoPoint,
        satellite: SatelliteId,
        duration: f64,
    ) -> Result<PreviewHandle<QueryOutcome<Vec<PassWindow>>>, EngineError> {
        let snapshot = self.snapshot(satellite)?;
        Ok(self
            .previews
            .spawn(satellite, move || snapshot.pass_windows(&poi, duration)))
    }

    /// Owned copy of everything a query reads, so it can run off-thread.
    fn snapshot(&self, satellite: SatelliteId) -> Result<QuerySnapshot, EngineError> {
        let sat = self.satellite(satellite)?.clone();
        let body = self.central_body(sat.central_body_id)?.clone();
        Ok(QuerySnapshot {
            satellite: sat,
            body,
            perturbers: self.perturbers.clone(),
            propagator: self.propagator,
            config: self.config,
            time: self.time,
            start_time: self.start_time,
        })
    }
}

/// Step one satellite from `from` to `to`, executing due nodes on the way.
#[allow(clippy::too_many_arguments)]
fn step_satellite(
    slot: &mut SatelliteSlot,
    queue: &mut NodeQueue,
    bodies: &HashMap<BodyId, CentralBody>,
    perturbers: &[PerturbingBody],
    flags: ForceFlags,
    propagator: &Propagator,
    from: f64,
    to: f64,
) -> SatelliteTick {
    let id = slot.satellite.id;
    let mut tick = SatelliteTick { id, executed: Vec::new(), failure: None };
    let Some(body) = bodies.get(&slot.satellite.central_body_id) else {
        tick.failure = Some(EngineError::CentralBodyNotFound { id: slot.satellite.central_body_id });
        return tick;
    };
    let ctx = ForceContext::new(body, perturbers, flags, slot.satellite.ballistics());

    let mut state = slot.satellite.state_at(from);
    let mut nodes_blocked = false;
    loop {
        if !nodes_blocked {
            match queue.tick(state.time, &mut state) {
                Ok(ids) => tick.executed.extend(ids),
                Err(e) => {
                    warn!("sat {}: maneuver node could not be applied: {}", id, e);
                    tick.failure = Some(e);
                    nodes_blocked = true;
                }
            }
        }
        if state.time >= to {
            break;
        }
        let stop = queue
            .next_pending_time()
            .filter(|t| !nodes_blocked && *t > state.time && *t < to)
            .unwrap_or(to);
        match propagator.step(&state, &ctx, stop - state.time) {
            Ok(next) => state = OrbitalState { time: stop, ..next },
            Err(e) => {
                warn!("sat {} halted at t={:.3} s: {}", id, state.time, e);
                if e.is_fatal_for_satellite() {
                    slot.status = SatelliteStatus::Halted { time: state.time, reason: e.to_string() };
                }
                tick.failure = Some(e);
                break;
            }
        }
    }
    slot.satellite.set_state(&state);
    tick
}

// ---------------------------------------------------------------------------
// Read-only query snapshot
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
struct QuerySnapshot {
    satellite: Satellite,
    body: CentralBody,
    perturbers: Vec<PerturbingBody>,
    propagator: Propagator,
    config: EngineConfig,
    time: f64,
    start_time: f64,
}

impl QuerySnapshot {
    fn context(&self) -> ForceContext<'_> {
        ForceContext::new(&self.body, &self.perturbers, self.config.forces, self.satellite.ballistics())
    }

    fn plan_hohmann(&self, target_sma: f64, target_ecc: f64) -> Result<TransferPlan, EngineError> {
        let current = OrbitalElements::from_state_vector(&self.satellite.position, &self.satellite.velocity, self.body.mu)?;
        maneuvers::plan_hohmann(&self.satellite, &current, target_sma, target_ecc, &self.body)
    }

    /// Project `duration` seconds of future trajectory at `step` spacing,
    /// keeping the valid prefix if propagation stops early.
    fn sampled_track(&self, duration: f64, step: f64, limit: usize) -> Result<QueryOutcome<Vec<GroundTrackPoint>>, EngineError> {
        let initial = self.satellite.state_at(self.time);
        let trajectory = self.propagator.propagate(&initial, self.context(), duration, step)?;
        let mut points = Vec::with_capacity(trajectory.size_hint().1.unwrap_or(0).min(limit));
        for item in project(trajectory, &self.body, self.start_time).take(limit) {
            match item {
                Ok(p) => points.push(p),
                Err(e) => return Ok(QueryOutcome { value: points, stopped_by: Some(e) }),
            }
        }
        Ok(QueryOutcome::complete(points))
    }

    fn ground_track(&self, duration: f64, num_points: usize) -> Result<QueryOutcome<Vec<GroundTrackPoint>>, EngineError> {
        ensure_finite(duration, "duration")?;
        let n = if num_points == 0 { self.config.ground_track_samples } else { num_points };
        let step = if n > 1 && duration > 0.0 { duration / (n - 1) as f64 } else { 1.0 };
        self.sampled_track(duration, step, n)
    }

    fn pass_windows(&self, poi: &GeoPoint, duration: f64) -> Result<QueryOutcome<Vec<PassWindow>>, EngineError> {
        ensure_positive(duration, "duration")?;
        poi.validate()?;
        let track = self.sampled_track(duration, self.config.pass_sample_step, usize::MAX)?;
        let predictor = PassPredictor::new(self.body.radius).with_min_elevation(self.config.min_elevation);
        let stopped_by = track.stopped_by;
        let windows = predictor.find_horizon_windows(track.value, poi)?;
        Ok(QueryOutcome { value: windows, stopped_by })
    }
}
