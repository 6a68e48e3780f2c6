pub mod elements;
pub mod maneuvers;
pub mod propagator;

pub use elements::OrbitalElements;
pub use maneuvers::{hohmann, plan_hohmann, BurnDescription, HohmannTransfer, TransferPlan};
pub use propagator::{PartialTrajectory, Propagator, PropagatorSettings, StepMode, Trajectory};
