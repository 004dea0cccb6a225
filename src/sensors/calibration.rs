//! One-time laser geometry calibration from the first scan.
//!
//! Derives the sensor's mount orientation, a centered ascending angle
//! table and the range limits the engine will run with. Calibration is
//! attempted on every arriving scan until it succeeds; a failure changes
//! no state.

use std::f32::consts::PI;
use std::time::Duration;

use nalgebra::{Isometry3, Translation3, UnitQuaternion, Vector3};
use thiserror::Error;

use crate::core::types::{LaserScan, Pose2D};
use crate::tf::{planar, TransformError, TransformSource};

/// Tolerance for the planar-mount check on the projected z component.
const PLANAR_TOLERANCE: f32 = 0.001;

/// Margin subtracted from the first scan's `range_max` for the default
/// hard maximum range.
const RANGE_MARGIN: f32 = 0.01;

/// How the sensor is mounted relative to the robot base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MountOrientation {
    /// Scan plane faces up; angles run as reported.
    Upward,
    /// Sensor is upside down; angles are mirrored.
    Inverted,
}

/// Calibration failures. All leave the session uncalibrated; the next
/// scan retries automatically.
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("failed to resolve sensor pose: {0}")]
    Transform(#[from] TransformError),

    #[error("laser must be mounted planar, z-projection gave {z:.5} (expected ±1)")]
    NonPlanarMount { z: f32 },
}

/// Geometry derived once from the first accepted scan.
///
/// Computed exactly once per session; every later scan is validated
/// against `beam_count`.
#[derive(Debug, Clone)]
pub struct LaserGeometry {
    /// Frame id of the sensor, taken from the first scan.
    pub frame_id: String,
    /// Beam count all subsequent scans must match.
    pub beam_count: usize,
    /// Ascending angle table, symmetric around zero
    /// (spans [-span/2, +span/2]).
    pub angles: Vec<f32>,
    /// Absolute angular increment between beams.
    pub angle_increment: f32,
    /// Rotation that centers the scan in the sensor frame (flipped for an
    /// inverted mount).
    pub centered_sensor_pose: Isometry3<f32>,
    /// Mount orientation derived from the up-vector projection.
    pub mount: MountOrientation,
    /// Whether adapted readings must be emitted in reverse order.
    pub reverse_ranges: bool,
    /// Hard maximum range (default: first scan's range_max − 1 cm).
    pub max_range: f32,
    /// Maximum range used for map building (default: same as max_range).
    pub max_usable_range: f32,
}

impl LaserGeometry {
    /// Resolve the centered sensor pose in the odometry frame at
    /// `timestamp_us`.
    ///
    /// Bounded-wait lookup; on failure nothing is mutated and the caller
    /// must drop the current scan. Yaw only, per the planar-mount
    /// invariant. Never touches the occupancy-grid lock, so it is safe to
    /// call concurrently with map synthesis.
    pub fn sensor_pose_in_odom(
        &self,
        tf: &dyn TransformSource,
        odom_frame: &str,
        timestamp_us: u64,
        timeout: Duration,
    ) -> Result<Pose2D, TransformError> {
        let odom_to_sensor = tf.lookup(odom_frame, &self.frame_id, timestamp_us, timeout)?;
        Ok(planar(&(odom_to_sensor * self.centered_sensor_pose)))
    }
}

/// Derive laser geometry from the first scan.
///
/// Resolves the sensor's pose relative to `base_frame`, projects a point
/// one meter above the sensor origin to determine the mount orientation,
/// and builds the centered ascending angle table. `max_range_override` and
/// `max_usable_range_override` replace the scan-derived defaults when set.
pub fn calibrate(
    scan: &LaserScan,
    tf: &dyn TransformSource,
    base_frame: &str,
    timeout: Duration,
    max_range_override: Option<f32>,
    max_usable_range_override: Option<f32>,
) -> Result<LaserGeometry, CalibrationError> {
    let sensor_pose = tf.lookup(base_frame, &scan.frame_id, scan.timestamp_us, timeout)?;

    // Project a point 1m above the sensor origin into the base frame. Its
    // z component tells us which way the scan plane faces.
    let above = Vector3::new(0.0, 0.0, 1.0 + sensor_pose.translation.z);
    let up = sensor_pose * nalgebra::Point3::from(above);

    log::debug!("Z-axis in sensor frame: {:.3}", up.z);

    if (up.z.abs() - 1.0).abs() > PLANAR_TOLERANCE {
        log::warn!(
            "Laser has to be mounted planar! Z-coordinate has to be 1 or -1, but gave: {:.5}",
            up.z
        );
        return Err(CalibrationError::NonPlanarMount { z: up.z });
    }

    let angle_center = (scan.angle_min + scan.angle_max) / 2.0;

    let (mount, reverse_ranges, centered_sensor_pose) = if up.z > 0.0 {
        log::info!("Laser is mounted upwards.");
        (
            MountOrientation::Upward,
            scan.angle_min > scan.angle_max,
            Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_euler_angles(0.0, 0.0, angle_center),
            ),
        )
    } else {
        log::info!("Laser is mounted upside down.");
        (
            MountOrientation::Inverted,
            scan.angle_min < scan.angle_max,
            Isometry3::from_parts(
                Translation3::identity(),
                UnitQuaternion::from_euler_angles(PI, 0.0, -angle_center),
            ),
        )
    };

    // Symmetric ascending angle table regardless of the raw ordering.
    let increment = scan.angle_increment.abs();
    let mut theta = -(scan.angle_min - scan.angle_max).abs() / 2.0;
    let mut angles = Vec::with_capacity(scan.beam_count());
    for _ in 0..scan.beam_count() {
        angles.push(theta);
        theta += increment;
    }

    log::debug!(
        "Laser angles in centered laser frame: min {:.3} max {:.3} inc {:.3}",
        angles.first().copied().unwrap_or(0.0),
        angles.last().copied().unwrap_or(0.0),
        increment
    );

    let max_range = max_range_override.unwrap_or(scan.range_max - RANGE_MARGIN);
    let max_usable_range = max_usable_range_override.unwrap_or(max_range);

    Ok(LaserGeometry {
        frame_id: scan.frame_id.clone(),
        beam_count: scan.beam_count(),
        angles,
        angle_increment: increment,
        centered_sensor_pose,
        mount,
        reverse_ranges,
        max_range,
        max_usable_range,
    })
}
