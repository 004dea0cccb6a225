//! Configuration surface.
//!
//! All sections have defaults matching long-standing field-proven values,
//! so an empty TOML document yields a working configuration. Engine tuning
//! constants are forwarded verbatim; this crate does not interpret them.

use serde::Deserialize;

use crate::engine::{MatchingParams, MotionNoise};

/// Frame identifiers used for transform lookups and broadcast.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Robot base frame.
    pub base_frame: String,
    /// Map frame the correction is published under.
    pub map_frame: String,
    /// Odometry frame the correction is published to.
    pub odom_frame: String,
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            base_frame: "base_link".to_string(),
            map_frame: "map".to_string(),
            odom_frame: "odom".to_string(),
        }
    }
}

/// Initial map bounding box and cell resolution.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct MapBounds {
    /// Minimum x position in the map (meters).
    pub xmin: f32,
    /// Minimum y position in the map (meters).
    pub ymin: f32,
    /// Maximum x position in the map (meters).
    pub xmax: f32,
    /// Maximum y position in the map (meters).
    pub ymax: f32,
    /// Cell size (meters).
    pub delta: f32,
}

impl Default for MapBounds {
    fn default() -> Self {
        Self {
            xmin: -100.0,
            ymin: -100.0,
            xmax: 100.0,
            ymax: 100.0,
            delta: 0.05,
        }
    }
}

/// Engine tuning constants, forwarded verbatim.
///
/// Note on the likelihood sampling pairs: historically the linear and
/// angular range/step pairs have been confused when forwarded to the
/// engine (`linear_sample_*` vs `angular_sample_*`). The observed mapping
/// is preserved here exactly as configured; if localization behaves
/// unexpectedly, verify these four values empirically rather than
/// trusting their names.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct EngineTuning {
    /// Hard maximum laser range; default is the first scan's
    /// `range_max` − 1 cm.
    pub max_range: Option<f32>,
    /// Maximum range used for map building; default same as `max_range`.
    pub max_usable_range: Option<f32>,
    /// Standard deviation for scan matching (cells).
    pub sigma: f32,
    /// Search window for scan matching (cells).
    pub kernel_size: u32,
    /// Initial linear search step.
    pub linear_step: f32,
    /// Initial angular search step.
    pub angular_step: f32,
    /// Refinement iterations in the scan matcher.
    pub iterations: u32,
    /// Standard deviation for a single beam.
    pub likelihood_sigma: f32,
    /// Gain for smoothing the likelihood.
    pub likelihood_gain: f32,
    /// Take only every (n+1)th beam when matching (0 = all beams).
    pub beam_skip: u32,
    /// Minimum score for a good match outcome.
    pub minimum_score: f32,
    /// Motion noise: linear per linear motion.
    pub noise_rr: f32,
    /// Motion noise: angular per linear motion.
    pub noise_rt: f32,
    /// Motion noise: linear per angular motion.
    pub noise_tr: f32,
    /// Motion noise: angular per angular motion.
    pub noise_tt: f32,
    /// Process a new reading only after this much linear motion (meters).
    pub linear_update: f32,
    /// Process a new reading only after this much angular motion (rad).
    pub angular_update: f32,
    /// Process a new reading after this much time regardless of motion
    /// (seconds, negative disables).
    pub temporal_update: f32,
    /// Effective-sample-size threshold for resampling.
    pub resample_threshold: f32,
    /// Fixed particle count.
    pub particle_count: usize,
    /// Likelihood sampling, linear range. See the note above.
    pub linear_sample_range: f32,
    /// Likelihood sampling, linear step. See the note above.
    pub linear_sample_step: f32,
    /// Likelihood sampling, angular range. See the note above.
    pub angular_sample_range: f32,
    /// Likelihood sampling, angular step. See the note above.
    pub angular_sample_step: f32,
    /// RNG seed for the engine's samplers (0 = pick from the clock).
    pub seed: u64,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            max_range: None,
            max_usable_range: None,
            sigma: 0.05,
            kernel_size: 1,
            linear_step: 0.05,
            angular_step: 0.05,
            iterations: 5,
            likelihood_sigma: 0.075,
            likelihood_gain: 3.0,
            beam_skip: 0,
            minimum_score: 0.0,
            noise_rr: 0.1,
            noise_rt: 0.2,
            noise_tr: 0.1,
            noise_tt: 0.2,
            linear_update: 1.0,
            angular_update: 0.5,
            temporal_update: -1.0,
            resample_threshold: 0.5,
            particle_count: 30,
            linear_sample_range: 0.01,
            linear_sample_step: 0.01,
            angular_sample_range: 0.005,
            angular_sample_step: 0.005,
            seed: 0,
        }
    }
}

impl EngineTuning {
    /// Matching parameter block in engine form.
    pub fn matching_params(&self) -> MatchingParams {
        MatchingParams {
            sigma: self.sigma,
            kernel_size: self.kernel_size,
            linear_step: self.linear_step,
            angular_step: self.angular_step,
            iterations: self.iterations,
            likelihood_sigma: self.likelihood_sigma,
            likelihood_gain: self.likelihood_gain,
            beam_skip: self.beam_skip,
            minimum_score: self.minimum_score,
        }
    }

    /// Motion noise block in engine form.
    pub fn motion_noise(&self) -> MotionNoise {
        MotionNoise {
            rr: self.noise_rr,
            rt: self.noise_rt,
            tr: self.noise_tr,
            tt: self.noise_tt,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SlamConfig {
    /// Frame identifiers.
    pub frames: FrameConfig,
    /// Process only every Nth arriving scan (1 = all scans).
    pub throttle_scans: u32,
    /// Seconds between two map recalculations.
    pub map_update_interval_s: f32,
    /// Period of the correction broadcast thread (seconds); 0 disables
    /// the broadcast entirely.
    pub transform_publish_period_s: f32,
    /// Forward extrapolation applied to broadcast stamps (seconds);
    /// defaults to the publish period.
    pub tf_delay_s: Option<f32>,
    /// Occupancy classification threshold: estimates strictly above it
    /// classify as occupied.
    pub occupied_threshold: f32,
    /// Initial map bounding box and resolution.
    pub bounds: MapBounds,
    /// Engine tuning, forwarded verbatim.
    pub engine: EngineTuning,
}

impl SlamConfig {
    /// Parse a TOML document; missing keys fall back to defaults.
    pub fn from_toml_str(s: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(s)
    }

    /// Effective broadcast stamp delay (seconds).
    pub fn tf_delay_s(&self) -> f32 {
        self.tf_delay_s.unwrap_or(self.transform_publish_period_s)
    }

    /// Map update interval in microseconds.
    pub fn map_update_interval_us(&self) -> u64 {
        (self.map_update_interval_s.max(0.0) * 1e6) as u64
    }

    /// Throttle factor, never below 1.
    pub fn throttle(&self) -> u64 {
        self.throttle_scans.max(1) as u64
    }
}

impl Default for SlamConfig {
    fn default() -> Self {
        Self {
            frames: FrameConfig::default(),
            throttle_scans: 1,
            map_update_interval_s: 5.0,
            transform_publish_period_s: 0.05,
            tf_delay_s: None,
            occupied_threshold: 0.25,
            bounds: MapBounds::default(),
            engine: EngineTuning::default(),
        }
    }
}
