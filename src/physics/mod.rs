pub mod aerodynamics;
pub mod atmosphere;
pub mod forces;
pub mod gravity;

pub use forces::{AccelerationBreakdown, ForceContext, ForceFlags, ForceModel, ForceSource};
