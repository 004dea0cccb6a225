//! Thread-safe session state shared between the scan pipeline and the
//! transform broadcast thread.
//!
//! Two independent locks guard disjoint state:
//! - the correction lock: short critical sections, written by the
//!   corrector after every accepted scan, read by the broadcast thread;
//! - the map lock: held for an entire synthesis pass, and by map queries.
//!
//! The correction lock must never be held across a synthesis pass, so the
//! low-latency broadcaster is never stuck behind a long rasterization.

use std::sync::{Arc, Mutex, MutexGuard};

use crossbeam_channel::{Receiver, Sender};

use crate::core::types::{Pose2D, Timestamped};
use crate::mapping::{GridSnapshot, MapMetadata};

/// Shared session state.
#[derive(Debug, Default)]
pub struct SessionShared {
    /// Current map→odom correction transform.
    correction: Mutex<Pose2D>,
    /// Most recently published grid, `None` until the first synthesis.
    map: Mutex<Option<GridSnapshot>>,
}

impl SessionShared {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically replace the correction transform.
    pub fn set_correction(&self, correction: Pose2D) {
        let mut guard = self.correction.lock().expect("correction lock poisoned");
        *guard = correction;
    }

    /// Read the current correction transform.
    pub fn correction(&self) -> Pose2D {
        *self.correction.lock().expect("correction lock poisoned")
    }

    /// Lock the map slot for a whole synthesis pass.
    pub(crate) fn lock_map(&self) -> MutexGuard<'_, Option<GridSnapshot>> {
        self.map.lock().expect("map lock poisoned")
    }

    /// On-demand query for the most recent map.
    ///
    /// Returns `None` when no map has been produced yet, or when the
    /// published map is degenerate (zero-sized).
    pub fn latest_map(&self) -> Option<GridSnapshot> {
        let guard = self.map.lock().expect("map lock poisoned");
        guard
            .as_ref()
            .filter(|m| m.info.width > 0 && m.info.height > 0)
            .cloned()
    }
}

/// Handle type for shared session state.
pub type SessionSharedHandle = Arc<SessionShared>;

/// Create a new shared session wrapped in an `Arc`.
pub fn create_session() -> SessionSharedHandle {
    Arc::new(SessionShared::new())
}

/// Sending halves of the session's output channels.
///
/// Sends never block (unbounded channels) and a disconnected receiver is
/// ignored: consumers are optional, dropping one must not stall mapping.
pub struct SlamOutputs {
    /// Pose distribution entropy, stamped with the triggering scan.
    pub entropy_tx: Sender<Timestamped<f64>>,
    /// Full grid after each synthesis pass.
    pub map_tx: Sender<GridSnapshot>,
    /// Grid metadata after each synthesis pass.
    pub map_metadata_tx: Sender<MapMetadata>,
}

impl SlamOutputs {
    /// Create the output channels, returning the sender bundle and the
    /// matching receivers `(entropy, map, map_metadata)`.
    pub fn channels() -> (
        Self,
        Receiver<Timestamped<f64>>,
        Receiver<GridSnapshot>,
        Receiver<MapMetadata>,
    ) {
        let (entropy_tx, entropy_rx) = crossbeam_channel::unbounded();
        let (map_tx, map_rx) = crossbeam_channel::unbounded();
        let (map_metadata_tx, map_metadata_rx) = crossbeam_channel::unbounded();
        (
            Self {
                entropy_tx,
                map_tx,
                map_metadata_tx,
            },
            entropy_rx,
            map_rx,
            map_metadata_rx,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapping::MapMetadata;

    #[test]
    fn test_correction_roundtrip() {
        let shared = SessionShared::new();
        assert_eq!(shared.correction(), Pose2D::identity());

        let c = Pose2D::new(1.0, -2.0, 0.3);
        shared.set_correction(c);
        assert_eq!(shared.correction(), c);
    }

    #[test]
    fn test_latest_map_none_until_published() {
        let shared = SessionShared::new();
        assert!(shared.latest_map().is_none());
    }

    #[test]
    fn test_latest_map_filters_zero_sized() {
        let shared = SessionShared::new();
        *shared.lock_map() = Some(GridSnapshot {
            info: MapMetadata {
                resolution: 0.05,
                width: 0,
                height: 0,
                origin: Pose2D::identity(),
                stamp_us: 0,
            },
            data: Vec::new(),
        });
        assert!(shared.latest_map().is_none());
    }
}
