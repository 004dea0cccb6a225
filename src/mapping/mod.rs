//! Occupancy grid synthesis from the engine's trajectory tree.

pub mod rasterizer;
pub mod synthesizer;
pub mod working_grid;

use serde::{Deserialize, Serialize};

use crate::core::types::Pose2D;

/// Metadata describing a published grid, without the cell payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMetadata {
    /// Cell size in meters.
    pub resolution: f32,
    /// Grid width in cells.
    pub width: u32,
    /// Grid height in cells.
    pub height: u32,
    /// World pose of cell (0, 0).
    pub origin: Pose2D,
    /// Timestamp of the synthesis pass (microseconds).
    pub stamp_us: u64,
}

/// A published occupancy grid.
///
/// `data` is row-major (`index = y * width + x`) with each cell in
/// {-1 unknown, 0 free, 100 occupied}. Within one session, width and
/// height only ever grow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// Grid metadata.
    pub info: MapMetadata,
    /// Classified cells, `width * height` entries.
    pub data: Vec<i8>,
}

impl GridSnapshot {
    /// Cell value at (x, y), or `None` when out of bounds.
    pub fn cell(&self, x: u32, y: u32) -> Option<i8> {
        if x < self.info.width && y < self.info.height {
            Some(self.data[(y * self.info.width + x) as usize])
        } else {
            None
        }
    }
}
