use std::collections::HashMap;
use std::sync::mpsc::{channel, Receiver, TryRecvError};
use std::sync::{Arc, Mutex, PoisonError};

use log::{debug, warn};

use crate::dynamics::state::SatelliteId;
use crate::error::EngineError;

// ---------------------------------------------------------------------------
// Last-request-wins previews computed off the live tick
// ---------------------------------------------------------------------------

/// A finished preview, tagged with the request generation it answers.
#[derive(Debug, Clone, PartialEq)]
pub struct Preview<T> {
    pub satellite_id: SatelliteId,
    pub generation: u64,
    pub value: T,
}

/// Per-satellite generation counters. Cloning shares the counters.
#[derive(Debug, Clone, Default)]
pub struct PreviewTracker {
    generations: Arc<Mutex<HashMap<SatelliteId, u64>>>,
}

impl PreviewTracker {
    /// Start a new request for `satellite`, superseding any in flight.
    pub fn begin(&self, satellite: SatelliteId) -> u64 {
        let mut map = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        let generation = map.entry(satellite).or_insert(0);
        *generation += 1;
        *generation
    }

    pub fn current(&self, satellite: SatelliteId) -> u64 {
        let map = self.generations.lock().unwrap_or_else(PoisonError::into_inner);
        map.get(&satellite).copied().unwrap_or(0)
    }

    pub fn is_current(&self, satellite: SatelliteId, generation: u64) -> bool {
        self.current(satellite) == generation
    }

    /// Invalidate outstanding requests without starting a new one, e.g. after
    /// the live state they were computed from changed.
    pub fn invalidate(&self, satellite: SatelliteId) {
        self.begin(satellite);
    }

    /// Run `job` on the rayon pool as the newest request for `satellite`.
    ///
    /// The job must work on owned copies of whatever it reads; it never
    /// touches live state.
    pub fn spawn<T, F>(&self, satellite: SatelliteId, job: F) -> PreviewHandle<T>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, EngineError> + Send + 'static,
    {
        let generation = self.begin(satellite);
        let (tx, rx) = channel();
        let tracker = self.clone();
        rayon::spawn(move || {
            // Skip the work entirely if a newer request arrived while queued
            let result = if tracker.is_current(satellite, generation) {
                job()
            } else {
                Err(EngineError::StalePreview { id: satellite })
            };
            if let Err(e) = tx.send(result) {
                debug!("preview {} for sat {} dropped before completion: {}", generation, satellite, e);
            }
        });
        PreviewHandle {
            satellite_id: satellite,
            generation,
            receiver: rx,
            tracker: self.clone(),
        }
    }
}

/// Pending preview result.
#[derive(Debug)]
pub struct PreviewHandle<T> {
    satellite_id: SatelliteId,
    generation: u64,
    receiver: Receiver<Result<T, EngineError>>,
    tracker: PreviewTracker,
}

impl<T> PreviewHandle<T> {
    pub fn satellite_id(&self) -> SatelliteId {
        self.satellite_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        self.tracker.is_current(self.satellite_id, self.generation)
    }

    /// Block until the worker reports. Fails with `StalePreview` if a newer
    /// request for the same satellite was issued in the meantime.
    pub fn wait(self) -> Result<Preview<T>, EngineError> {
        let result = self
            .receiver
            .recv()
            .map_err(|_| EngineError::PreviewAborted { id: self.satellite_id })?;
        self.finish(result)
    }

    /// Non-blocking poll; `None` while the worker is still running.
    pub fn try_take(&self) -> Option<Result<Preview<T>, EngineError>> {
        match self.receiver.try_recv() {
            Ok(result) => Some(self.finish(result)),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(Err(EngineError::PreviewAborted { id: self.satellite_id })),
        }
    }

    fn finish(&self, result: Result<T, EngineError>) -> Result<Preview<T>, EngineError> {
        let value = result?;
        if !self.is_current() {
            warn!(
                "discarding stale preview {} for sat {} (current {})",
                self.generation,
                self.satellite_id,
                self.tracker.current(self.satellite_id)
            );
            return Err(EngineError::StalePreview { id: self.satellite_id });
        }
        Ok(Preview {
            satellite_id: self.satellite_id,
            generation: self.generation,
            value,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc::sync_channel;

    #[test]
    fn single_request_completes() {
        let tracker = PreviewTracker::default();
        let handle = tracker.spawn(3, || Ok(42));
        let preview = handle.wait().unwrap();
        assert_eq!(preview.value, 42);
        assert_eq!(preview.satellite_id, 3);
        assert_eq!(preview.generation, 1);
    }

    #[test]
    fn newer_request_wins() {
        let tracker = PreviewTracker::default();
        let (gate_tx, gate_rx) = sync_channel::<()>(0);
        // Hold the first job until the second request has been issued
        let first = tracker.spawn(1, move || {
            gate_rx.recv().ok();
            Ok("old")
        });
        let second = tracker.spawn(1, || Ok("new"));
        gate_tx.send(()).ok();

        assert!(!first.is_current());
        assert!(matches!(first.wait(), Err(EngineError::StalePreview { id: 1 })));
        assert_eq!(second.wait().unwrap().value, "new");
    }

    #[test]
    fn satellites_are_independent() {
        let tracker = PreviewTracker::default();
        let a = tracker.spawn(1, || Ok(1));
        let b = tracker.spawn(2, || Ok(2));
        assert_eq!(a.wait().unwrap().value, 1);
        assert_eq!(b.wait().unwrap().value, 2);
    }

    #[test]
    fn job_errors_pass_through() {
        let tracker = PreviewTracker::default();
        let h = tracker.spawn::<(), _>(1, || Err(EngineError::PropagationDiverged { time: 3.0 }));
        assert!(matches!(h.wait(), Err(EngineError::PropagationDiverged { .. })));
    }

    #[test]
    fn invalidate_marks_stale() {
        let tracker = PreviewTracker::default();
        let g = tracker.begin(9);
        assert!(tracker.is_current(9, g));
        tracker.invalidate(9);
        assert!(!tracker.is_current(9, g));
    }
}
