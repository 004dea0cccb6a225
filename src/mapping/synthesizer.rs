//! Occupancy grid synthesis from the engine's best trajectory.
//!
//! Each pass rebuilds the published grid from scratch: the best particle's
//! trajectory is walked root-to-leaf and every stored reading is
//! rasterized into a fresh working grid. Rebuilding (rather than patching)
//! means a loop closure that rewrites history is reflected in full.

use log::debug;

use crate::config::MapBounds;
use crate::core::types::{Pose2D, Timestamped};
use crate::engine::GridSlamEngine;
use crate::localization::entropy::compute_entropy;
use crate::mapping::rasterizer::ScanRasterizer;
use crate::mapping::working_grid::WorkingGrid;
use crate::mapping::{GridSnapshot, MapMetadata};
use crate::sensors::calibration::LaserGeometry;
use crate::state::{SessionShared, SlamOutputs};

/// Cell value for space no reading has covered.
pub const UNKNOWN: i8 = -1;
/// Cell value for observed free space.
pub const FREE: i8 = 0;
/// Cell value for observed occupied space.
pub const OCCUPIED: i8 = 100;

/// Classify a working-grid estimate into a published cell value.
///
/// Negative estimates mean the cell was never visited. Occupied requires
/// strictly exceeding the threshold, so a threshold of 1.0 can never
/// classify a cell as occupied.
pub fn classify(estimate: f32, occupied_threshold: f32) -> i8 {
    if estimate < 0.0 {
        UNKNOWN
    } else if estimate > occupied_threshold {
        OCCUPIED
    } else {
        FREE
    }
}

/// Rebuilds and publishes the occupancy grid.
pub struct MapSynthesizer {
    /// Current bounding box; only ever grows across passes.
    bounds: MapBounds,
    occupied_threshold: f32,
    rasterizer: Box<dyn ScanRasterizer>,
}

impl MapSynthesizer {
    pub fn new(
        bounds: MapBounds,
        occupied_threshold: f32,
        rasterizer: Box<dyn ScanRasterizer>,
    ) -> Self {
        Self {
            bounds,
            occupied_threshold,
            rasterizer,
        }
    }

    /// Current bounding box (grows monotonically).
    pub fn bounds(&self) -> MapBounds {
        self.bounds
    }

    /// Rebuild the grid from the engine's best trajectory and publish it.
    ///
    /// The session's map lock is held for the whole pass, so concurrent
    /// map queries observe either the previous grid or the new one, never
    /// a partial rebuild.
    pub fn synthesize(
        &mut self,
        engine: &dyn GridSlamEngine,
        geometry: &LaserGeometry,
        shared: &SessionShared,
        outputs: &SlamOutputs,
        stamp_us: u64,
    ) {
        let mut slot = shared.lock_map();

        let particles = engine.particles();
        let entropy = compute_entropy(particles);
        if entropy > 0.0 {
            let _ = outputs.entropy_tx.send(Timestamped::new(entropy, stamp_us));
        }

        let best = &particles[engine.best_particle_index()];
        debug!(
            "best particle pose ({:.3}, {:.3}, {:.3}) weight {:.6}",
            best.pose.x, best.pose.y, best.pose.theta, best.weight
        );

        let mut working = WorkingGrid::from_bounds(
            self.bounds.xmin,
            self.bounds.ymin,
            self.bounds.xmax,
            self.bounds.ymax,
            self.bounds.delta,
        );

        let tree = engine.trajectory();
        for node in tree.ancestors(best.node) {
            // Nodes without a stored reading exist only for pose lineage.
            let Some(reading) = node.reading.as_deref() else {
                continue;
            };
            debug!(
                "registering scan at ({:.3}, {:.3}, {:.3})",
                node.pose.x, node.pose.y, node.pose.theta
            );
            self.rasterizer.invalidate_active_area();
            self.rasterizer
                .compute_active_area(&mut working, &node.pose, &geometry.angles, reading);
            self.rasterizer
                .register_scan(&mut working, &node.pose, &geometry.angles, reading);
        }

        let (width, height) = working.dimensions();
        let published_dims = slot
            .as_ref()
            .map(|m| (m.info.width as usize, m.info.height as usize));
        if published_dims != Some((width, height)) {
            let (xmin, ymin, xmax, ymax) = working.bounds();
            self.bounds.xmin = xmin;
            self.bounds.ymin = ymin;
            self.bounds.xmax = xmax;
            self.bounds.ymax = ymax;
            debug!(
                "map size is now {}x{} cells, ({:.3},{:.3}) to ({:.3},{:.3})",
                width, height, xmin, ymin, xmax, ymax
            );
        }

        let mut data = vec![UNKNOWN; width * height];
        for cy in 0..height {
            for cx in 0..width {
                data[cy * width + cx] = classify(working.estimate(cx, cy), self.occupied_threshold);
            }
        }

        let (origin_x, origin_y) = working.origin();
        let snapshot = GridSnapshot {
            info: MapMetadata {
                resolution: self.bounds.delta,
                width: width as u32,
                height: height as u32,
                origin: Pose2D::new(origin_x, origin_y, 0.0),
                stamp_us,
            },
            data,
        };

        let _ = outputs.map_metadata_tx.send(snapshot.info.clone());
        let _ = outputs.map_tx.send(snapshot.clone());
        *slot = Some(snapshot);
    }
}
