//! Body-fixed projections of trajectories and visibility over surface points.

pub mod passes;
pub mod track;

pub use passes::{GeoPoint, PassPredictor, PassWindow};
pub use track::{project, GroundTrackPoint};

use crate::error::EngineError;

/// Result of a ground query. When propagation stopped early, `value` holds
/// what was derived from the valid prefix and `stopped_by` the reason.
#[derive(Debug)]
pub struct QueryOutcome<T> {
    pub value: T,
    pub stopped_by: Option<EngineError>,
}

impl<T> QueryOutcome<T> {
    pub fn complete(value: T) -> Self {
        Self { value, stopped_by: None }
    }

    pub fn is_complete(&self) -> bool {
        self.stopped_by.is_none()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> QueryOutcome<U> {
        QueryOutcome { value: f(self.value), stopped_by: self.stopped_by }
    }
}
