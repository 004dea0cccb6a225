//! Raw laser scan frame as received from the range sensor.

use serde::{Deserialize, Serialize};

/// One raw range-sensor sweep.
///
/// Immutable once received. Field semantics follow the usual planar lidar
/// convention: `ranges[i]` is measured at angle
/// `angle_min + i * angle_increment` in the sensor frame. `angle_increment`
/// may be negative, in which case `angle_min > angle_max` and the readings
/// run clockwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaserScan {
    /// Frame identifier of the sensor that produced this scan.
    pub frame_id: String,
    /// Acquisition timestamp in microseconds.
    pub timestamp_us: u64,
    /// Angle of the first beam (radians).
    pub angle_min: f32,
    /// Angle of the last beam (radians).
    pub angle_max: f32,
    /// Angular distance between consecutive beams (radians, signed).
    pub angle_increment: f32,
    /// Minimum valid range (meters). Shorter readings are sensor noise.
    pub range_min: f32,
    /// Maximum valid range (meters).
    pub range_max: f32,
    /// Measured distances, one per beam (meters).
    pub ranges: Vec<f32>,
}

impl LaserScan {
    /// Number of beams in this scan.
    #[inline]
    pub fn beam_count(&self) -> usize {
        self.ranges.len()
    }
}
