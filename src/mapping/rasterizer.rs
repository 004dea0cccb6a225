//! Ray accumulation into the working grid.
//!
//! The synthesizer delegates per-node ray accumulation to a
//! [`ScanRasterizer`]. The contract mirrors the matching collaborator it
//! abstracts: `compute_active_area` grows the grid to cover everything a
//! reading will touch, `register_scan` accumulates the beams. Both must be
//! commutative per cell across nodes.

use crate::core::types::Pose2D;
use crate::mapping::working_grid::WorkingGrid;

/// Accumulates one reading at a time into a [`WorkingGrid`].
pub trait ScanRasterizer: Send {
    /// Invalidate any active-area state cached from a previous node.
    fn invalidate_active_area(&mut self);

    /// Grow `grid` so it covers the sensor pose and all beam endpoints of
    /// this reading.
    fn compute_active_area(
        &mut self,
        grid: &mut WorkingGrid,
        pose: &Pose2D,
        angles: &[f32],
        ranges: &[f32],
    );

    /// Accumulate the reading's beams into `grid`.
    fn register_scan(
        &mut self,
        grid: &mut WorkingGrid,
        pose: &Pose2D,
        angles: &[f32],
        ranges: &[f32],
    );
}

/// Plain beam rasterizer: Bresenham free-space traversal with an endpoint
/// hit for beams that terminate inside the usable range.
#[derive(Debug, Clone)]
pub struct BeamRasterizer {
    /// Rays beyond this range are discarded entirely.
    max_range: f32,
    /// Rays are clipped to this range for map building; clipped rays mark
    /// free space but no endpoint hit.
    max_usable_range: f32,
    /// Maximum ray length in cells, as a traversal guard.
    max_ray_cells: usize,
    active_area_valid: bool,
}

impl BeamRasterizer {
    pub fn new(max_range: f32, max_usable_range: f32) -> Self {
        Self {
            max_range,
            max_usable_range,
            max_ray_cells: 4096,
            active_area_valid: false,
        }
    }

    /// World endpoint of one beam, clipped to the usable range.
    ///
    /// Returns `None` for beams that carry no information (non-finite or
    /// beyond the hard maximum range).
    fn beam_endpoint(&self, pose: &Pose2D, angle: f32, range: f32) -> Option<(f32, f32, bool)> {
        if !range.is_finite() || range > self.max_range {
            return None;
        }
        let (clipped, hit) = if range > self.max_usable_range {
            (self.max_usable_range, false)
        } else {
            (range, true)
        };
        let beam_angle = pose.theta + angle;
        let (sin_a, cos_a) = beam_angle.sin_cos();
        Some((pose.x + clipped * cos_a, pose.y + clipped * sin_a, hit))
    }

    /// Bresenham traversal from the sensor cell to the endpoint cell.
    fn trace_beam(&self, grid: &mut WorkingGrid, x0: i32, y0: i32, x1: i32, y1: i32, hit: bool) {
        let dx = (x1 - x0).abs();
        let dy = (y1 - y0).abs();

        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };

        let mut x = x0;
        let mut y = y0;
        let mut err = dx - dy;
        let mut steps = 0;

        loop {
            if x == x1 && y == y1 {
                if hit {
                    grid.mark_hit(x, y);
                } else {
                    grid.mark_free(x, y);
                }
                break;
            }

            grid.mark_free(x, y);

            steps += 1;
            if steps >= self.max_ray_cells {
                break;
            }

            let e2 = 2 * err;
            if e2 > -dy {
                err -= dy;
                x += sx;
            }
            if e2 < dx {
                err += dx;
                y += sy;
            }
        }
    }
}

impl ScanRasterizer for BeamRasterizer {
    fn invalidate_active_area(&mut self) {
        self.active_area_valid = false;
    }

    fn compute_active_area(
        &mut self,
        grid: &mut WorkingGrid,
        pose: &Pose2D,
        angles: &[f32],
        ranges: &[f32],
    ) {
        grid.ensure_contains(pose.x, pose.y);
        for (angle, range) in angles.iter().zip(ranges.iter()) {
            if let Some((ex, ey, _)) = self.beam_endpoint(pose, *angle, *range) {
                grid.ensure_contains(ex, ey);
            }
        }
        self.active_area_valid = true;
    }

    fn register_scan(
        &mut self,
        grid: &mut WorkingGrid,
        pose: &Pose2D,
        angles: &[f32],
        ranges: &[f32],
    ) {
        if !self.active_area_valid {
            self.compute_active_area(grid, pose, angles, ranges);
        }

        let (sx, sy) = grid.world_to_cell_signed(pose.x, pose.y);
        for (angle, range) in angles.iter().zip(ranges.iter()) {
            if let Some((ex, ey, hit)) = self.beam_endpoint(pose, *angle, *range) {
                let (ecx, ecy) = grid.world_to_cell_signed(ex, ey);
                self.trace_beam(grid, sx, sy, ecx, ecy, hit);
            }
        }
    }
}
