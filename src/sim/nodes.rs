use std::collections::BTreeMap;
use std::fmt;

use log::{debug, info};
use nalgebra::Vector3;
use serde_derive::{Deserialize, Serialize};

use crate::dynamics::frame::{RnpFrame, RnpVector};
use crate::dynamics::state::{OrbitalState, SatelliteId};
use crate::error::{ensure_finite, EngineError};

// ---------------------------------------------------------------------------
// Maneuver nodes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Node lifecycle. `Executed` and `Cancelled` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeStatus {
    Pending,
    Executed,
    Cancelled,
}

/// A scheduled impulsive burn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManeuverNode {
    pub id: NodeId,
    pub satellite_id: SatelliteId,
    pub execution_time: f64, // s, absolute simulated time
    pub delta_v: RnpVector,  // km/s
    pub status: NodeStatus,
    /// Inertial delta-v actually added, filled in on execution.
    pub applied_delta_v: Option<Vector3<f64>>,
}

impl ManeuverNode {
    pub fn is_pending(&self) -> bool {
        self.status == NodeStatus::Pending
    }
}

// ---------------------------------------------------------------------------
// Per-satellite queue
// ---------------------------------------------------------------------------

/// Nodes for one satellite, kept sorted by execution time. Executed and
/// cancelled nodes stay in place as history.
#[derive(Debug, Clone, Default)]
pub struct NodeQueue {
    nodes: Vec<ManeuverNode>,
}

impl NodeQueue {
    pub fn nodes(&self) -> &[ManeuverNode] {
        &self.nodes
    }

    pub fn pending(&self) -> impl Iterator<Item = &ManeuverNode> {
        self.nodes.iter().filter(|n| n.is_pending())
    }

    pub fn next_pending_time(&self) -> Option<f64> {
        self.pending().map(|n| n.execution_time).next()
    }

    fn insert(&mut self, node: ManeuverNode) {
        let idx = self.nodes.partition_point(|n| n.execution_time <= node.execution_time);
        self.nodes.insert(idx, node);
    }

    /// Apply every pending node due at `now` in chronological order. Each burn
    /// uses the RNP frame of the state left by the previous one.
    ///
    /// Returns the ids of the executed nodes. If a frame cannot be built the
    /// node stays pending and the error is returned; burns already applied
    /// in this call are kept.
    pub fn tick(&mut self, now: f64, state: &mut OrbitalState) -> Result<Vec<NodeId>, EngineError> {
        let mut executed = Vec::new();
        for node in self.nodes.iter_mut() {
            if node.execution_time > now {
                break;
            }
            if !node.is_pending() {
                continue;
            }
            let frame = RnpFrame::from_state(&state.pos, &state.vel)?;
            let dv = frame.to_inertial(&node.delta_v);
            state.vel += dv;
            node.status = NodeStatus::Executed;
            node.applied_delta_v = Some(dv);
            info!(
                "sat {} executed node {} at t={:.3} s (|dv| = {:.4} km/s)",
                node.satellite_id,
                node.id,
                now,
                dv.norm()
            );
            executed.push(node.id);
        }
        Ok(executed)
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Owns every satellite's node queue and the current simulated time used to
/// reject past-dated nodes.
#[derive(Debug, Clone)]
pub struct ManeuverNodeManager {
    queues: BTreeMap<SatelliteId, NodeQueue>,
    clock: f64,
    next_id: u64,
    /// Pending nodes closer together than this (s) are considered duplicates.
    time_tolerance: f64,
}

impl Default for ManeuverNodeManager {
    fn default() -> Self {
        Self::new(1e-6)
    }
}

impl ManeuverNodeManager {
    pub fn new(time_tolerance: f64) -> Self {
        Self {
            queues: BTreeMap::new(),
            clock: 0.0,
            next_id: 1,
            time_tolerance: time_tolerance.max(0.0),
        }
    }

    pub fn register(&mut self, satellite: SatelliteId) {
        self.queues.entry(satellite).or_default();
    }

    pub fn unregister(&mut self, satellite: SatelliteId) -> Option<NodeQueue> {
        self.queues.remove(&satellite)
    }

    pub fn clock(&self) -> f64 {
        self.clock
    }

    /// Advance the simulated clock. It never runs backwards.
    pub fn set_clock(&mut self, now: f64) {
        self.clock = self.clock.max(now);
    }

    pub fn add_node(
        &mut self,
        satellite: SatelliteId,
        execution_time: f64,
        delta_v: RnpVector,
    ) -> Result<NodeId, EngineError> {
        ensure_finite(execution_time, "execution time")?;
        if !delta_v.is_finite() {
            return Err(EngineError::InvalidInput { reason: "delta-v must be finite".into() });
        }
        let clock = self.clock;
        let tolerance = self.time_tolerance;
        let queue = self
            .queues
            .get_mut(&satellite)
            .ok_or(EngineError::SatelliteNotFound { id: satellite })?;

        if execution_time < clock {
            return Err(EngineError::NodeSchedulingConflict {
                reason: format!("execution time {execution_time:.3} s is before current time {clock:.3} s"),
            });
        }
        if let Some(other) = queue
            .pending()
            .find(|n| (n.execution_time - execution_time).abs() <= tolerance)
        {
            return Err(EngineError::NodeSchedulingConflict {
                reason: format!("node {} is already pending at t={:.3} s", other.id, other.execution_time),
            });
        }

        let id = NodeId(self.next_id);
        self.next_id += 1;
        queue.insert(ManeuverNode {
            id,
            satellite_id: satellite,
            execution_time,
            delta_v,
            status: NodeStatus::Pending,
            applied_delta_v: None,
        });
        debug!("sat {} scheduled node {} at t={:.3} s", satellite, id, execution_time);
        Ok(id)
    }

    /// Cancel a pending node. Executed or already cancelled nodes are an error.
    pub fn remove_node(&mut self, satellite: SatelliteId, node_id: NodeId) -> Result<(), EngineError> {
        let queue = self
            .queues
            .get_mut(&satellite)
            .ok_or(EngineError::SatelliteNotFound { id: satellite })?;
        let node = queue
            .nodes
            .iter_mut()
            .find(|n| n.id == node_id)
            .ok_or(EngineError::NodeNotFound { id: node_id })?;
        match node.status {
            NodeStatus::Pending => {
                node.status = NodeStatus::Cancelled;
                info!("sat {} cancelled node {}", satellite, node_id);
                Ok(())
            }
            status => Err(EngineError::NodeSchedulingConflict {
                reason: format!("node {node_id} is {status:?} and can no longer be removed"),
            }),
        }
    }

    /// Execute due nodes for one satellite against its freshly propagated state.
    pub fn tick(
        &mut self,
        satellite: SatelliteId,
        now: f64,
        state: &mut OrbitalState,
    ) -> Result<Vec<NodeId>, EngineError> {
        ensure_finite(now, "current time")?;
        let executed = self.queue_mut(satellite)?.tick(now, state);
        self.set_clock(now);
        executed
    }

    pub fn nodes(&self, satellite: SatelliteId) -> Result<&[ManeuverNode], EngineError> {
        self.queues
            .get(&satellite)
            .map(NodeQueue::nodes)
            .ok_or(EngineError::SatelliteNotFound { id: satellite })
    }

    pub fn next_pending_time(&self, satellite: SatelliteId) -> Option<f64> {
        self.queues.get(&satellite).and_then(NodeQueue::next_pending_time)
    }

    pub(crate) fn queue_mut(&mut self, satellite: SatelliteId) -> Result<&mut NodeQueue, EngineError> {
        self.queues
            .get_mut(&satellite)
            .ok_or(EngineError::SatelliteNotFound { id: satellite })
    }

    pub(crate) fn queues_mut(&mut self) -> impl Iterator<Item = (&SatelliteId, &mut NodeQueue)> {
        self.queues.iter_mut()
    }
}
