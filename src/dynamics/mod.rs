pub mod frame;
pub mod state;

pub use frame::{RnpFrame, RnpVector};
pub use state::{Ballistics, Deriv, OrbitalState, Satellite, SatelliteId};
