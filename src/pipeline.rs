//! Per-scan processing pipeline.
//!
//! Every arriving scan runs the same gauntlet: throttle, one-time
//! calibration, beam-count validation, odometry pose resolution, engine
//! submission, correction update and (interval permitting) a map
//! synthesis pass. Each gate drops the scan without touching session
//! state, so a bad scan can never corrupt the map or the correction.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};

use crate::config::SlamConfig;
use crate::core::types::{LaserScan, Pose2D};
use crate::engine::{EngineSetup, GridSlamEngine, RangeReading};
use crate::localization::corrector::Corrector;
use crate::mapping::rasterizer::BeamRasterizer;
use crate::mapping::synthesizer::MapSynthesizer;
use crate::mapping::GridSnapshot;
use crate::sensors::adapter::adapt_ranges;
use crate::sensors::calibration::{calibrate, LaserGeometry};
use crate::state::{SessionSharedHandle, SlamOutputs};
use crate::tf::TransformSource;

/// Bounded wait for transform lookups on the scan path.
pub const RESOLVER_TIMEOUT: Duration = Duration::from_millis(100);

/// Why a scan was dropped. Drops never mutate session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// Discarded by the throttle counter.
    Throttled,
    /// First-scan calibration failed; retried on the next scan.
    CalibrationFailed,
    /// Beam count differs from the calibrated geometry.
    BeamCountMismatch,
    /// Odometry pose could not be resolved within the bounded wait.
    PoseUnavailable,
}

/// Result of feeding one scan through the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanOutcome {
    /// The scan reached the engine.
    Processed {
        /// Whether the engine accepted it (it may decline on its own
        /// motion-gating thresholds).
        accepted: bool,
        /// Whether a map synthesis pass ran.
        map_updated: bool,
    },
    /// The scan was dropped before reaching the engine.
    Dropped(DropReason),
}

/// Session state that only exists once calibration has succeeded.
struct Calibrated {
    geometry: LaserGeometry,
    synthesizer: MapSynthesizer,
}

/// The scan-driven core of a mapping session.
pub struct ScanPipeline {
    config: SlamConfig,
    tf: Box<dyn TransformSource>,
    engine: Box<dyn GridSlamEngine>,
    shared: SessionSharedHandle,
    outputs: SlamOutputs,
    corrector: Corrector,
    calibrated: Option<Calibrated>,
    /// Arriving-scan counter, incremented before the throttle gate.
    scan_count: u64,
    /// Stamp of the last synthesis pass; `None` forces a pass on the
    /// first accepted scan.
    last_map_update_us: Option<u64>,
}

impl ScanPipeline {
    pub fn new(
        config: SlamConfig,
        tf: Box<dyn TransformSource>,
        engine: Box<dyn GridSlamEngine>,
        shared: SessionSharedHandle,
        outputs: SlamOutputs,
    ) -> Self {
        let corrector = Corrector::new(shared.clone());
        Self {
            config,
            tf,
            engine,
            shared,
            outputs,
            corrector,
            calibrated: None,
            scan_count: 0,
            last_map_update_us: None,
        }
    }

    /// Shared session state, for map queries and the broadcast thread.
    pub fn shared(&self) -> SessionSharedHandle {
        self.shared.clone()
    }

    /// Most recent published map, if any.
    pub fn latest_map(&self) -> Option<GridSnapshot> {
        self.shared.latest_map()
    }

    /// Feed one scan through the pipeline.
    pub fn handle_scan(&mut self, scan: &LaserScan) -> ScanOutcome {
        self.scan_count += 1;
        if self.scan_count % self.config.throttle() != 0 {
            return ScanOutcome::Dropped(DropReason::Throttled);
        }

        if self.calibrated.is_none() {
            match self.calibrate_session(scan) {
                Ok(calibrated) => self.calibrated = Some(calibrated),
                Err(reason) => return ScanOutcome::Dropped(reason),
            }
        }
        let Some(calibrated) = self.calibrated.as_mut() else {
            return ScanOutcome::Dropped(DropReason::CalibrationFailed);
        };

        let ranges = match adapt_ranges(scan, &calibrated.geometry) {
            Ok(ranges) => ranges,
            Err(err) => {
                warn!("dropping scan: {err}");
                return ScanOutcome::Dropped(DropReason::BeamCountMismatch);
            }
        };

        let odom_pose = match calibrated.geometry.sensor_pose_in_odom(
            self.tf.as_ref(),
            &self.config.frames.odom_frame,
            scan.timestamp_us,
            RESOLVER_TIMEOUT,
        ) {
            Ok(pose) => pose,
            Err(err) => {
                warn!("unable to determine robot pose for scan: {err}");
                return ScanOutcome::Dropped(DropReason::PoseUnavailable);
            }
        };

        let reading = RangeReading {
            ranges,
            odom_pose,
            timestamp_us: scan.timestamp_us,
        };
        let accepted = self.engine.process_scan(&reading);

        let mut map_updated = false;
        if accepted {
            let particles = self.engine.particles();
            let best = &particles[self.engine.best_particle_index()];
            debug!(
                "scan processed: odom ({:.3}, {:.3}, {:.3}) estimate ({:.3}, {:.3}, {:.3})",
                odom_pose.x, odom_pose.y, odom_pose.theta, best.pose.x, best.pose.y, best.pose.theta
            );
            let estimate = best.pose;
            self.corrector.update(&estimate, &odom_pose);

            // A pass runs on the first accepted scan and thereafter once
            // at least the configured interval of scan time has passed.
            let due = match self.last_map_update_us {
                None => true,
                Some(last) => {
                    scan.timestamp_us.saturating_sub(last) >= self.config.map_update_interval_us()
                }
            };
            if due {
                calibrated.synthesizer.synthesize(
                    self.engine.as_ref(),
                    &calibrated.geometry,
                    &self.shared,
                    &self.outputs,
                    scan.timestamp_us,
                );
                self.last_map_update_us = Some(scan.timestamp_us);
                map_updated = true;
                debug!("map updated at {} us", scan.timestamp_us);
            }
        }

        ScanOutcome::Processed {
            accepted,
            map_updated,
        }
    }

    /// One-time calibration and engine initialization from the first
    /// scan that reaches this gate.
    fn calibrate_session(&mut self, scan: &LaserScan) -> Result<Calibrated, DropReason> {
        let tuning = &self.config.engine;
        let geometry = match calibrate(
            scan,
            self.tf.as_ref(),
            &self.config.frames.base_frame,
            RESOLVER_TIMEOUT,
            tuning.max_range,
            tuning.max_usable_range,
        ) {
            Ok(geometry) => geometry,
            Err(err) => {
                warn!("calibration failed, will retry on the next scan: {err}");
                return Err(DropReason::CalibrationFailed);
            }
        };

        let initial_pose = match geometry.sensor_pose_in_odom(
            self.tf.as_ref(),
            &self.config.frames.odom_frame,
            scan.timestamp_us,
            RESOLVER_TIMEOUT,
        ) {
            Ok(pose) => pose,
            Err(err) => {
                warn!("unable to determine initial pose, starting at origin: {err}");
                Pose2D::identity()
            }
        };

        let seed = if tuning.seed == 0 {
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0)
        } else {
            tuning.seed
        };

        let bounds = self.config.bounds;
        self.engine.initialize(EngineSetup {
            beam_count: geometry.beam_count,
            angles: geometry.angles.clone(),
            angle_increment: geometry.angle_increment,
            sensor_pose: Pose2D::identity(),
            max_range: geometry.max_range,
            max_usable_range: geometry.max_usable_range,
            matching: tuning.matching_params(),
            motion_noise: tuning.motion_noise(),
            linear_update: tuning.linear_update,
            angular_update: tuning.angular_update,
            temporal_update: tuning.temporal_update,
            resample_threshold: tuning.resample_threshold,
            particle_count: tuning.particle_count,
            xmin: bounds.xmin,
            ymin: bounds.ymin,
            xmax: bounds.xmax,
            ymax: bounds.ymax,
            delta: bounds.delta,
            initial_pose,
            linear_sample_range: tuning.linear_sample_range,
            linear_sample_step: tuning.linear_sample_step,
            angular_sample_range: tuning.angular_sample_range,
            angular_sample_step: tuning.angular_sample_step,
            seed,
        });

        info!(
            "session calibrated: {} beams, max range {:.2} m, initial pose ({:.3}, {:.3}, {:.3})",
            geometry.beam_count, geometry.max_range, initial_pose.x, initial_pose.y, initial_pose.theta
        );

        let synthesizer = MapSynthesizer::new(
            bounds,
            self.config.occupied_threshold,
            Box::new(BeamRasterizer::new(
                geometry.max_range,
                geometry.max_usable_range,
            )),
        );

        Ok(Calibrated {
            geometry,
            synthesizer,
        })
    }
}
