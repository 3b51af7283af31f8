//! Block decomposition of the logical grid.
//!
//! The worker count is factored into a `line_div x col_div` process grid,
//! using the most balanced divisor pair that fits the grid. Each block is
//! `rows_per_block x cols_per_block`; remainder rows and columns that do not
//! fill a whole block are dropped, not redistributed.

use tracing::{info, warn};

use crate::error::{LifeError, Result};

use super::topology::BlockCoord;

/// Half-open extents of one block in the logical grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockExtents {
    pub row_start: usize,
    pub row_end: usize,
    pub col_start: usize,
    pub col_end: usize,
}

impl BlockExtents {
    #[inline]
    pub fn contains(&self, row: usize, col: usize) -> bool {
        (self.row_start..self.row_end).contains(&row) && (self.col_start..self.col_end).contains(&col)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Partition {
    grid_rows: usize,
    grid_cols: usize,
    line_div: usize,
    col_div: usize,
    rows_per_block: usize,
    cols_per_block: usize,
}

impl Partition {
    /// Factor `worker_count` and size the blocks for a `grid_rows x grid_cols` grid.
    pub fn compute(grid_rows: usize, grid_cols: usize, worker_count: usize) -> Result<Self> {
        if grid_rows == 0 || grid_cols == 0 {
            return Err(LifeError::config(
                "grid",
                format!("dimensions {grid_rows}x{grid_cols} must be positive"),
            ));
        }
        if worker_count == 0 {
            return Err(LifeError::config("workers", "must be at least 1"));
        }
        if worker_count > grid_rows {
            return Err(LifeError::config(
                "workers",
                format!("{worker_count} workers exceed the {grid_rows} grid rows"),
            ));
        }

        let layouts = candidate_layouts(worker_count, grid_rows, grid_cols);
        if worker_count > 2 && layouts.len() == 2 {
            warn!(
                workers = worker_count,
                "worker count is prime; the grid cannot be evenly partitioned, \
                 falling back to a strip layout"
            );
        }
        let (line_div, col_div) = layouts
            .iter()
            .copied()
            .find(|&(line_div, col_div)| line_div <= grid_rows && col_div <= grid_cols)
            .ok_or_else(|| {
                LifeError::config(
                    "workers",
                    format!(
                        "no layout of {worker_count} workers fits a {grid_rows}x{grid_cols} grid without empty blocks"
                    ),
                )
            })?;
        if let Some(&(best_rows, best_cols)) = layouts.first() {
            if line_div.abs_diff(col_div) > best_rows.abs_diff(best_cols) {
                warn!(
                    line_div,
                    col_div,
                    balanced = format!("{best_rows}x{best_cols}"),
                    "balanced layout does not fit the grid; using a less balanced one"
                );
            }
        }

        let partition = Self {
            grid_rows,
            grid_cols,
            line_div,
            col_div,
            rows_per_block: grid_rows / line_div,
            cols_per_block: grid_cols / col_div,
        };

        let dropped_rows = partition.dropped_rows();
        let dropped_cols = partition.dropped_cols();
        if dropped_rows > 0 || dropped_cols > 0 {
            warn!(
                dropped_rows,
                dropped_cols,
                line_div,
                col_div,
                "grid does not divide evenly; remainder cells are excluded from the simulation"
            );
        }
        info!(
            line_div,
            col_div,
            rows_per_block = partition.rows_per_block,
            cols_per_block = partition.cols_per_block,
            "partitioned {grid_rows}x{grid_cols} grid across {worker_count} workers"
        );
        Ok(partition)
    }

    #[inline]
    pub fn grid_rows(&self) -> usize {
        self.grid_rows
    }

    #[inline]
    pub fn grid_cols(&self) -> usize {
        self.grid_cols
    }

    #[inline]
    pub fn line_div(&self) -> usize {
        self.line_div
    }

    #[inline]
    pub fn col_div(&self) -> usize {
        self.col_div
    }

    #[inline]
    pub fn rows_per_block(&self) -> usize {
        self.rows_per_block
    }

    #[inline]
    pub fn cols_per_block(&self) -> usize {
        self.cols_per_block
    }

    #[inline]
    pub fn worker_count(&self) -> usize {
        self.line_div * self.col_div
    }

    /// Rows actually simulated; the torus wraps at this height.
    #[inline]
    pub fn effective_rows(&self) -> usize {
        self.rows_per_block * self.line_div
    }

    /// Columns actually simulated; the torus wraps at this width.
    #[inline]
    pub fn effective_cols(&self) -> usize {
        self.cols_per_block * self.col_div
    }

    pub fn dropped_rows(&self) -> usize {
        self.grid_rows - self.effective_rows()
    }

    pub fn dropped_cols(&self) -> usize {
        self.grid_cols - self.effective_cols()
    }

    pub fn extents(&self, coords: BlockCoord) -> BlockExtents {
        let row_start = coords.row * self.rows_per_block;
        let col_start = coords.col * self.cols_per_block;
        BlockExtents {
            row_start,
            row_end: row_start + self.rows_per_block,
            col_start,
            col_end: col_start + self.cols_per_block,
        }
    }

    /// Block owning a zero-based cell and the cell's interior-local position,
    /// or `None` if the cell was truncated away.
    pub fn locate(&self, row: usize, col: usize) -> Option<(BlockCoord, usize, usize)> {
        if row >= self.effective_rows() || col >= self.effective_cols() {
            return None;
        }
        Some((
            BlockCoord::new(row / self.rows_per_block, col / self.cols_per_block),
            row % self.rows_per_block,
            col % self.cols_per_block,
        ))
    }
}

/// Every `line_div x col_div` factorization of `n`, most balanced first.
///
/// Each pair appears in both orientations; on equal balance the one laying
/// the larger factor along the longer grid axis comes first.
fn candidate_layouts(n: usize, rows: usize, cols: usize) -> Vec<(usize, usize)> {
    let mut layouts: Vec<(usize, usize)> = (1..=n)
        .filter(|d| n % d == 0)
        .map(|d| (d, n / d))
        .collect();
    let tall = rows >= cols;
    layouts.sort_by_key(|&(line_div, col_div)| {
        (line_div.abs_diff(col_div), (line_div >= col_div) != tall)
    });
    layouts
}

#[cfg(test)]
mod tests {
    use super::{Partition, candidate_layouts};
    use crate::distlife::topology::BlockCoord;
    use crate::error::LifeError;

    #[test]
    fn layouts_are_ordered_by_balance() {
        assert_eq!(candidate_layouts(4, 8, 8)[0], (2, 2));
        assert_eq!(candidate_layouts(12, 40, 8)[..2], [(4, 3), (3, 4)]);
        assert_eq!(candidate_layouts(12, 8, 40)[..2], [(3, 4), (4, 3)]);
        assert_eq!(candidate_layouts(7, 8, 8), vec![(7, 1), (1, 7)]);
        assert_eq!(candidate_layouts(1, 8, 8), vec![(1, 1)]);
        assert_eq!(candidate_layouts(36, 8, 8).len(), 9);
    }

    #[test]
    fn square_worker_counts_use_square_grids() {
        let p = Partition::compute(64, 64, 16).unwrap();
        assert_eq!((p.line_div(), p.col_div()), (4, 4));
        assert_eq!((p.rows_per_block(), p.cols_per_block()), (16, 16));
    }

    #[test]
    fn larger_factor_follows_longer_axis() {
        let tall = Partition::compute(60, 20, 6).unwrap();
        assert_eq!((tall.line_div(), tall.col_div()), (3, 2));
        let wide = Partition::compute(20, 60, 6).unwrap();
        assert_eq!((wide.line_div(), wide.col_div()), (2, 3));
    }

    #[test]
    fn prime_worker_count_falls_back_to_a_strip() {
        let p = Partition::compute(30, 30, 5).unwrap();
        assert_eq!(p.line_div() * p.col_div(), 5);
        assert!(p.line_div() == 1 || p.col_div() == 1);
    }

    #[test]
    fn strip_transposes_when_columns_are_too_few() {
        let p = Partition::compute(10, 3, 5).unwrap();
        assert_eq!((p.line_div(), p.col_div()), (5, 1));
    }

    #[test]
    fn narrow_grids_fall_back_to_a_less_balanced_layout() {
        // 2x2 needs two columns; a 4x1 strip fits.
        let p = Partition::compute(10, 1, 4).unwrap();
        assert_eq!((p.line_div(), p.col_div()), (4, 1));
        // 3x3 does not fit two columns; 9x1 does.
        let p = Partition::compute(9, 2, 9).unwrap();
        assert_eq!((p.line_div(), p.col_div()), (9, 1));
        assert_eq!((p.rows_per_block(), p.cols_per_block()), (1, 2));
        // Neither 3x4 nor 4x3 fits; 6x2 is the most balanced pair that does.
        let p = Partition::compute(20, 2, 12).unwrap();
        assert_eq!((p.line_div(), p.col_div()), (6, 2));
        assert_eq!((p.rows_per_block(), p.cols_per_block()), (3, 1));
        assert_eq!(p.dropped_rows(), 2);
    }

    #[test]
    fn remainder_is_truncated() {
        let p = Partition::compute(10, 10, 4).unwrap();
        assert_eq!(p.rows_per_block(), 5);
        let p = Partition::compute(11, 9, 4).unwrap();
        assert_eq!((p.rows_per_block(), p.cols_per_block()), (5, 4));
        assert_eq!((p.dropped_rows(), p.dropped_cols()), (1, 1));
        assert_eq!(p.locate(10, 0), None);
        assert_eq!(p.locate(7, 5), Some((BlockCoord::new(1, 1), 2, 1)));
    }

    #[test]
    fn extents_tile_the_effective_grid() {
        let p = Partition::compute(24, 18, 6).unwrap();
        let mut covered = vec![0u8; 24 * 18];
        for row in 0..p.line_div() {
            for col in 0..p.col_div() {
                let e = p.extents(BlockCoord::new(row, col));
                for r in e.row_start..e.row_end {
                    for c in e.col_start..e.col_end {
                        covered[r * 18 + c] += 1;
                    }
                }
            }
        }
        assert!(covered.iter().all(|&n| n == 1));
    }

    #[test]
    fn configuration_errors_are_fatal() {
        assert!(matches!(
            Partition::compute(0, 10, 1),
            Err(LifeError::Config { parameter: "grid", .. })
        ));
        assert!(matches!(
            Partition::compute(4, 10, 5),
            Err(LifeError::Config { parameter: "workers", .. })
        ));
    }
}
