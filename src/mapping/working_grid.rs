//! Growable accumulation grid for one synthesis pass.
//!
//! Cells count beam passes and beam hits; the occupancy estimate for a
//! cell is `hits / visits`, or negative when the cell was never touched.
//! That convention lets the synthesizer tell "unknown" apart from "free"
//! without a separate mask. Accumulation is commutative per cell, so the
//! order in which trajectory nodes are registered does not matter.

/// Raw occupancy estimate for a never-visited cell.
const UNVISITED: f32 = -1.0;

/// Hit/visit accumulation raster with a growable bounding box.
#[derive(Debug, Clone)]
pub struct WorkingGrid {
    resolution: f32,
    width: usize,
    height: usize,
    /// World coordinate of cell (0, 0).
    origin_x: f32,
    origin_y: f32,
    /// Beam endpoints per cell.
    hits: Vec<u32>,
    /// Beam traversals per cell (including endpoints).
    visits: Vec<u32>,
}

impl WorkingGrid {
    /// Create a grid covering the world box (xmin, ymin)..(xmax, ymax).
    pub fn from_bounds(xmin: f32, ymin: f32, xmax: f32, ymax: f32, resolution: f32) -> Self {
        let width = ((xmax - xmin) / resolution).ceil().max(1.0) as usize;
        let height = ((ymax - ymin) / resolution).ceil().max(1.0) as usize;
        Self {
            resolution,
            width,
            height,
            origin_x: xmin,
            origin_y: ymin,
            hits: vec![0; width * height],
            visits: vec![0; width * height],
        }
    }

    pub fn dimensions(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    pub fn resolution(&self) -> f32 {
        self.resolution
    }

    /// World coordinate of cell (0, 0).
    pub fn origin(&self) -> (f32, f32) {
        (self.origin_x, self.origin_y)
    }

    /// World bounding box as (xmin, ymin, xmax, ymax).
    pub fn bounds(&self) -> (f32, f32, f32, f32) {
        (
            self.origin_x,
            self.origin_y,
            self.origin_x + self.width as f32 * self.resolution,
            self.origin_y + self.height as f32 * self.resolution,
        )
    }

    /// Convert world coordinates to cell indices, signed.
    #[inline]
    pub fn world_to_cell_signed(&self, x: f32, y: f32) -> (i32, i32) {
        let cx = ((x - self.origin_x) / self.resolution).floor() as i32;
        let cy = ((y - self.origin_y) / self.resolution).floor() as i32;
        (cx, cy)
    }

    #[inline]
    fn is_valid_cell(&self, cx: i32, cy: i32) -> bool {
        cx >= 0 && cy >= 0 && (cx as usize) < self.width && (cy as usize) < self.height
    }

    #[inline]
    fn cell_index(&self, cx: usize, cy: usize) -> usize {
        cy * self.width + cx
    }

    /// Raw occupancy estimate at a cell: `hits / visits`, negative when
    /// the cell was never visited. Out-of-bounds cells are unvisited.
    #[inline]
    pub fn estimate(&self, cx: usize, cy: usize) -> f32 {
        if cx >= self.width || cy >= self.height {
            return UNVISITED;
        }
        let idx = self.cell_index(cx, cy);
        let visits = self.visits[idx];
        if visits == 0 {
            UNVISITED
        } else {
            self.hits[idx] as f32 / visits as f32
        }
    }

    /// Record a beam passing through a cell.
    #[inline]
    pub fn mark_free(&mut self, cx: i32, cy: i32) {
        if self.is_valid_cell(cx, cy) {
            let idx = self.cell_index(cx as usize, cy as usize);
            self.visits[idx] += 1;
        }
    }

    /// Record a beam terminating in a cell.
    #[inline]
    pub fn mark_hit(&mut self, cx: i32, cy: i32) {
        if self.is_valid_cell(cx, cy) {
            let idx = self.cell_index(cx as usize, cy as usize);
            self.visits[idx] += 1;
            self.hits[idx] += 1;
        }
    }

    /// Ensure the grid can contain the given world point.
    ///
    /// Grows the grid if necessary, preserving accumulated counts. The
    /// grid never shrinks.
    pub fn ensure_contains(&mut self, x: f32, y: f32) {
        let (cx, cy) = self.world_to_cell_signed(x, y);

        let mut needs_resize = false;
        let mut new_origin_x = self.origin_x;
        let mut new_origin_y = self.origin_y;
        let mut new_width = self.width;
        let mut new_height = self.height;

        if cx < 0 {
            let expand = (-cx) as usize + 1;
            new_origin_x -= expand as f32 * self.resolution;
            new_width += expand;
            needs_resize = true;
        }
        if cx >= self.width as i32 {
            new_width = (cx as usize) + 1;
            needs_resize = true;
        }
        if cy < 0 {
            let expand = (-cy) as usize + 1;
            new_origin_y -= expand as f32 * self.resolution;
            new_height += expand;
            needs_resize = true;
        }
        if cy >= self.height as i32 {
            new_height = (cy as usize) + 1;
            needs_resize = true;
        }

        if needs_resize {
            self.resize(new_width, new_height, new_origin_x, new_origin_y);
        }
    }

    fn resize(&mut self, new_width: usize, new_height: usize, new_origin_x: f32, new_origin_y: f32) {
        let mut new_hits = vec![0u32; new_width * new_height];
        let mut new_visits = vec![0u32; new_width * new_height];

        // Offset of the old origin inside the new grid, in cells.
        let dx = ((self.origin_x - new_origin_x) / self.resolution).round() as i32;
        let dy = ((self.origin_y - new_origin_y) / self.resolution).round() as i32;

        for old_y in 0..self.height {
            for old_x in 0..self.width {
                let new_x = old_x as i32 + dx;
                let new_y = old_y as i32 + dy;

                if new_x >= 0
                    && new_y >= 0
                    && (new_x as usize) < new_width
                    && (new_y as usize) < new_height
                {
                    let old_idx = old_y * self.width + old_x;
                    let new_idx = (new_y as usize) * new_width + (new_x as usize);
                    new_hits[new_idx] = self.hits[old_idx];
                    new_visits[new_idx] = self.visits[old_idx];
                }
            }
        }

        self.hits = new_hits;
        self.visits = new_visits;
        self.width = new_width;
        self.height = new_height;
        self.origin_x = new_origin_x;
        self.origin_y = new_origin_y;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_unvisited_cells_are_negative() {
        let grid = WorkingGrid::from_bounds(-1.0, -1.0, 1.0, 1.0, 0.1);
        assert!(grid.estimate(0, 0) < 0.0);
    }

    #[test]
    fn test_estimate_is_hit_ratio() {
        let mut grid = WorkingGrid::from_bounds(-1.0, -1.0, 1.0, 1.0, 0.1);
        grid.mark_hit(5, 5);
        grid.mark_free(5, 5);
        grid.mark_free(5, 5);
        grid.mark_free(5, 5);
        assert_relative_eq!(grid.estimate(5, 5), 0.25);
    }

    #[test]
    fn test_growth_preserves_counts() {
        let mut grid = WorkingGrid::from_bounds(0.0, 0.0, 1.0, 1.0, 0.1);
        grid.mark_hit(3, 3);

        let (w0, h0) = grid.dimensions();
        grid.ensure_contains(-0.5, 2.0);
        let (w1, h1) = grid.dimensions();
        assert!(w1 > w0);
        assert!(h1 > h0);

        // Cell (3, 3) in the old frame moved with the origin shift.
        let (cx, cy) = grid.world_to_cell_signed(0.35, 0.35);
        assert_relative_eq!(grid.estimate(cx as usize, cy as usize), 1.0);
    }

    #[test]
    fn test_contained_point_does_not_resize() {
        let mut grid = WorkingGrid::from_bounds(0.0, 0.0, 1.0, 1.0, 0.1);
        let dims = grid.dimensions();
        grid.ensure_contains(0.5, 0.5);
        assert_eq!(grid.dimensions(), dims);
    }

    #[test]
    fn test_marks_outside_bounds_ignored() {
        let mut grid = WorkingGrid::from_bounds(0.0, 0.0, 1.0, 1.0, 0.1);
        grid.mark_hit(-1, 0);
        grid.mark_free(100, 100);
        // No panic, nothing recorded.
        assert!(grid.estimate(0, 0) < 0.0);
    }
}
