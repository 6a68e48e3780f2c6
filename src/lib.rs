pub mod bodies;
pub mod config;
pub mod dynamics;
pub mod error;
pub mod ground;
pub mod io;
pub mod orbital;
pub mod physics;
pub mod sim;

pub use bodies::{BodyId, CentralBody, PerturbingBody};
pub use config::EngineConfig;
pub use dynamics::{OrbitalState, RnpFrame, RnpVector, Satellite, SatelliteId};
pub use error::EngineError;
pub use ground::{GeoPoint, GroundTrackPoint, PassWindow, QueryOutcome};
pub use orbital::{OrbitalElements, TransferPlan};
pub use sim::{NodeId, NodeStatus, Simulation};
