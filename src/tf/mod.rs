//! Coordinate-frame transform lookups.
//!
//! The pipeline never talks to a transform transport directly; it goes
//! through the [`TransformSource`] trait. Lookups are bounded-wait: a
//! source must return within the caller's timeout, either with the
//! transform or with a [`TransformError`]. A failed lookup mutates nothing;
//! the caller drops the current scan.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use nalgebra::Isometry3;
use thiserror::Error;

use crate::core::types::Pose2D;

/// Transform lookup errors.
///
/// All variants are transient from the pipeline's point of view: the
/// current scan is dropped and the next one retried.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Timed out waiting for transform {target} <- {source_frame}")]
    Timeout { target: String, source_frame: String },

    #[error("Transform {target} <- {source_frame} is not available")]
    Unavailable { target: String, source_frame: String },
}

/// Bounded-wait source of frame-to-frame transforms.
///
/// `lookup` resolves the pose of `source_frame` expressed in
/// `target_frame` at the given timestamp. Implementations must return
/// within `timeout` and must not block indefinitely.
pub trait TransformSource: Send {
    fn lookup(
        &self,
        target_frame: &str,
        source_frame: &str,
        timestamp_us: u64,
        timeout: Duration,
    ) -> Result<Isometry3<f32>, TransformError>;
}

/// A correction transform stamped for broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct StampedTransform {
    /// Parent frame (map).
    pub parent_frame: String,
    /// Child frame (odometry).
    pub child_frame: String,
    /// The rigid 2D transform mapping child-frame coordinates into the
    /// parent frame.
    pub transform: Pose2D,
    /// Timestamp in microseconds. Extrapolated slightly into the future so
    /// the transform stays valid for consumers querying near "now".
    pub stamp_us: u64,
}

/// Extract the yaw component of an isometry.
///
/// Roll and pitch are discarded under the planar-mount invariant.
#[inline]
pub fn yaw_of(iso: &Isometry3<f32>) -> f32 {
    iso.rotation.euler_angles().2
}

/// Project an isometry onto the plane as a [`Pose2D`].
#[inline]
pub fn planar(iso: &Isometry3<f32>) -> Pose2D {
    Pose2D::new(iso.translation.x, iso.translation.y, yaw_of(iso))
}

/// In-memory transform table.
///
/// Holds one transform per (target, source) frame pair. Embedders feed it
/// from whatever transport they use; tests set entries directly. Lookups
/// never wait, so the timeout only matters for real transport-backed
/// sources.
#[derive(Clone, Default)]
pub struct StaticTransformSource {
    frames: Arc<Mutex<HashMap<(String, String), Isometry3<f32>>>>,
}

impl StaticTransformSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the transform for a frame pair.
    pub fn set(&self, target_frame: &str, source_frame: &str, transform: Isometry3<f32>) {
        let mut frames = self.frames.lock().expect("transform table poisoned");
        frames.insert(
            (target_frame.to_string(), source_frame.to_string()),
            transform,
        );
    }

    /// Remove the transform for a frame pair, making lookups fail.
    pub fn clear(&self, target_frame: &str, source_frame: &str) {
        let mut frames = self.frames.lock().expect("transform table poisoned");
        frames.remove(&(target_frame.to_string(), source_frame.to_string()));
    }
}

impl TransformSource for StaticTransformSource {
    fn lookup(
        &self,
        target_frame: &str,
        source_frame: &str,
        _timestamp_us: u64,
        _timeout: Duration,
    ) -> Result<Isometry3<f32>, TransformError> {
        if target_frame == source_frame {
            return Ok(Isometry3::identity());
        }
        let frames = self.frames.lock().expect("transform table poisoned");
        frames
            .get(&(target_frame.to_string(), source_frame.to_string()))
            .copied()
            .ok_or_else(|| TransformError::Unavailable {
                target: target_frame.to_string(),
                source_frame: source_frame.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use nalgebra::{Translation3, UnitQuaternion, Vector3};
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_static_source_roundtrip() {
        let source = StaticTransformSource::new();
        let iso = Isometry3::from_parts(
            Translation3::new(1.0, 2.0, 0.0),
            UnitQuaternion::from_euler_angles(0.0, 0.0, FRAC_PI_2),
        );
        source.set("odom", "laser", iso);

        let looked_up = source
            .lookup("odom", "laser", 0, Duration::from_millis(100))
            .unwrap();
        assert_relative_eq!(looked_up.translation.x, 1.0);
        assert_relative_eq!(yaw_of(&looked_up), FRAC_PI_2, epsilon = 1e-6);
    }

    #[test]
    fn test_static_source_missing_pair() {
        let source = StaticTransformSource::new();
        let err = source
            .lookup("odom", "laser", 0, Duration::from_millis(100))
            .unwrap_err();
        assert!(matches!(err, TransformError::Unavailable { .. }));
    }

    #[test]
    fn test_identity_for_same_frame() {
        let source = StaticTransformSource::new();
        let iso = source
            .lookup("base_link", "base_link", 0, Duration::from_millis(100))
            .unwrap();
        assert_relative_eq!(iso.translation.vector, Vector3::zeros());
    }

    #[test]
    fn test_planar_projection_discards_roll_pitch() {
        let iso = Isometry3::from_parts(
            Translation3::new(3.0, -1.0, 0.5),
            UnitQuaternion::from_euler_angles(0.2, -0.1, 1.0),
        );
        let pose = planar(&iso);
        assert_relative_eq!(pose.x, 3.0);
        assert_relative_eq!(pose.y, -1.0);
        assert_relative_eq!(pose.theta, 1.0, epsilon = 1e-5);
    }
}
