//! Contract for the external grid-SLAM particle-filter engine.
//!
//! The engine is a black box by design: motion model, resampling,
//! likelihood scoring and active-area scan matching all live behind the
//! [`GridSlamEngine`] trait. This crate only calibrates the sensor, feeds
//! adapted readings in, and reads particles and the trajectory tree back
//! out. Nothing here reproduces the engine's internals.

mod trajectory;

use serde::{Deserialize, Serialize};

use crate::core::types::Pose2D;

pub use trajectory::{Ancestors, NodeId, TrajectoryNode, TrajectoryTree};

/// Scan-matching parameters forwarded verbatim to the engine.
///
/// This crate does not interpret their numerical meaning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingParams {
    /// Standard deviation of the matching kernel (cells).
    pub sigma: f32,
    /// Search window half-size for matching (cells).
    pub kernel_size: u32,
    /// Initial linear search step (meters).
    pub linear_step: f32,
    /// Initial angular search step (radians).
    pub angular_step: f32,
    /// Number of refinement iterations.
    pub iterations: u32,
    /// Standard deviation for a single beam likelihood.
    pub likelihood_sigma: f32,
    /// Likelihood smoothing gain.
    pub likelihood_gain: f32,
    /// Evaluate only every (n+1)th beam when matching (0 = all beams).
    pub beam_skip: u32,
    /// Minimum score for accepting a match outcome.
    pub minimum_score: f32,
}

/// Motion-model noise coefficients forwarded verbatim to the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MotionNoise {
    /// Linear noise per linear motion.
    pub rr: f32,
    /// Angular noise per linear motion.
    pub rt: f32,
    /// Linear noise per angular motion.
    pub tr: f32,
    /// Angular noise per angular motion.
    pub tt: f32,
}

/// Everything the engine needs at initialization time.
///
/// Assembled once, after the first scan has been calibrated, and handed to
/// [`GridSlamEngine::initialize`].
#[derive(Debug, Clone)]
pub struct EngineSetup {
    /// Number of beams per scan, fixed for the session.
    pub beam_count: usize,
    /// Ascending, symmetric per-beam angle table (length == beam_count).
    pub angles: Vec<f32>,
    /// Absolute angular increment between beams.
    pub angle_increment: f32,
    /// Sensor pose relative to the centered sensor frame (identity here;
    /// centering is handled during pose resolution).
    pub sensor_pose: Pose2D,
    /// Hard maximum range; rays beyond are discarded entirely.
    pub max_range: f32,
    /// Maximum range used for map building.
    pub max_usable_range: f32,
    /// Scan-matching parameters.
    pub matching: MatchingParams,
    /// Motion-model noise.
    pub motion_noise: MotionNoise,
    /// Process a new reading only after this much linear motion (meters).
    pub linear_update: f32,
    /// Process a new reading only after this much angular motion (radians).
    pub angular_update: f32,
    /// Process a new reading after this much time regardless of motion
    /// (seconds, negative disables).
    pub temporal_update: f32,
    /// Effective-sample-size threshold for resampling.
    pub resample_threshold: f32,
    /// Fixed particle count.
    pub particle_count: usize,
    /// Initial map bounding box, world meters.
    pub xmin: f32,
    pub ymin: f32,
    pub xmax: f32,
    pub ymax: f32,
    /// Cell size (meters).
    pub delta: f32,
    /// Initial sensor pose in the odometry frame.
    pub initial_pose: Pose2D,
    /// Likelihood sampling ranges and steps.
    pub linear_sample_range: f32,
    pub linear_sample_step: f32,
    pub angular_sample_range: f32,
    pub angular_sample_step: f32,
    /// RNG seed for the engine's samplers.
    pub seed: u64,
}

/// One adapted reading submitted to the engine.
#[derive(Debug, Clone)]
pub struct RangeReading {
    /// Adapted range array (ascending beam order, short readings replaced).
    pub ranges: Vec<f32>,
    /// Sensor pose in the odometry frame at acquisition time.
    pub odom_pose: Pose2D,
    /// Acquisition timestamp in microseconds.
    pub timestamp_us: u64,
}

/// One hypothesis in the engine's filter.
#[derive(Debug, Clone, Copy)]
pub struct EngineParticle {
    /// Hypothesized sensor pose in the map frame.
    pub pose: Pose2D,
    /// Importance weight (unnormalized, >= 0).
    pub weight: f64,
    /// Leaf of this particle's trajectory chain.
    pub node: NodeId,
}

/// The external particle-filter engine.
///
/// `process_scan` may silently decline readings that fail the engine's own
/// motion-gating thresholds; a `false` return is not an error. Particles
/// and the trajectory tree are read-only snapshots, valid until the next
/// `process_scan` call.
pub trait GridSlamEngine: Send {
    /// One-time initialization with calibrated geometry and tuning.
    fn initialize(&mut self, setup: EngineSetup);

    /// Feed one adapted reading. Returns whether the engine accepted it.
    fn process_scan(&mut self, reading: &RangeReading) -> bool;

    /// Current particle set.
    fn particles(&self) -> &[EngineParticle];

    /// Index of the highest-weight particle in `particles()`.
    fn best_particle_index(&self) -> usize;

    /// The trajectory arena backing the particles' ancestry chains.
    fn trajectory(&self) -> &TrajectoryTree;
}
