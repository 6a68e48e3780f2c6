pub mod integrator;
pub mod nodes;
pub mod preview;
pub mod runner;

pub use integrator::rk4_step;
pub use nodes::{ManeuverNode, ManeuverNodeManager, NodeId, NodeStatus};
pub use preview::{Preview, PreviewHandle, PreviewTracker};
pub use runner::{SatelliteStatus, Simulation, TickReport};
