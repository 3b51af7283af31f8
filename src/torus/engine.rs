use rayon::prelude::*;

use crate::grid::{LifeGrid, Population};
use crate::rules::B3S23;

/// Rows per rayon task. Small grids stay on the calling thread.
const PARALLEL_ROW_CHUNK: usize = 16;
const PARALLEL_MIN_CELLS: usize = 64 * 64;

pub struct TorusLife {
    rows: usize,
    cols: usize,
    /// `cells[phase]` = current (read), `cells[1 - phase]` = next (write).
    cells: [Vec<u8>; 2],
    phase: usize,
    generation: u64,
}

impl TorusLife {
    pub fn new(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "torus dimensions must be non-zero");
        Self {
            rows,
            cols,
            cells: [vec![0; rows * cols], vec![0; rows * cols]],
            phase: 0,
            generation: 0,
        }
    }

    pub fn with_population(rows: usize, cols: usize, population: &Population) -> Self {
        let mut engine = Self::new(rows, cols);
        for &(row, col) in population.cells() {
            engine.set_cell(row, col, true);
        }
        engine
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn set_cell(&mut self, row: usize, col: usize, alive: bool) {
        let idx = (row % self.rows) * self.cols + col % self.cols;
        self.cells[self.phase][idx] = alive as u8;
    }

    pub fn get_cell(&self, row: usize, col: usize) -> bool {
        self.cells[self.phase][(row % self.rows) * self.cols + col % self.cols] != 0
    }

    pub fn population(&self) -> u64 {
        self.cells[self.phase].iter().map(|&c| c as u64).sum()
    }

    pub fn snapshot(&self) -> LifeGrid {
        let mut grid = LifeGrid::new(self.rows, self.cols);
        for row in 0..self.rows {
            let start = row * self.cols;
            grid.row_mut(row)
                .copy_from_slice(&self.cells[self.phase][start..start + self.cols]);
        }
        grid
    }

    /// Advance one generation. Returns `true` if any cell changed.
    pub fn step(&mut self) -> bool {
        let rows = self.rows;
        let cols = self.cols;
        let (current, next) = {
            let (a, b) = self.cells.split_at_mut(1);
            if self.phase == 0 {
                (&a[0], &mut b[0])
            } else {
                (&b[0], &mut a[0])
            }
        };

        let changed = if rows * cols >= PARALLEL_MIN_CELLS {
            next.par_chunks_mut(cols * PARALLEL_ROW_CHUNK)
                .enumerate()
                .map(|(chunk, out)| {
                    let first = chunk * PARALLEL_ROW_CHUNK;
                    let mut changed = false;
                    for (offset, out_row) in out.chunks_mut(cols).enumerate() {
                        changed |= advance_row(current, out_row, first + offset, rows, cols);
                    }
                    changed
                })
                .reduce(|| false, |a, b| a | b)
        } else {
            let mut changed = false;
            for (row, out_row) in next.chunks_mut(cols).enumerate() {
                changed |= advance_row(current, out_row, row, rows, cols);
            }
            changed
        };

        self.phase ^= 1;
        self.generation += 1;
        changed
    }

    pub fn step_n(&mut self, n: u64) {
        for _ in 0..n {
            self.step();
        }
    }

    /// Step until a generation leaves every cell unchanged or `max_generations`
    /// is reached. Returns the generation at which no change was observed.
    pub fn run_until_stable(&mut self, max_generations: u64) -> Option<u64> {
        for _ in 0..max_generations {
            if !self.step() {
                return Some(self.generation);
            }
        }
        None
    }
}

/// Compute one output row with toroidal wraparound in both axes.
#[inline]
fn advance_row(current: &[u8], out: &mut [u8], row: usize, rows: usize, cols: usize) -> bool {
    let above = &current[((row + rows - 1) % rows) * cols..][..cols];
    let here = &current[row * cols..][..cols];
    let below = &current[((row + 1) % rows) * cols..][..cols];

    let mut changed = false;
    for col in 0..cols {
        let west = (col + cols - 1) % cols;
        let east = (col + 1) % cols;
        let neighbors = above[west]
            + above[col]
            + above[east]
            + here[west]
            + here[east]
            + below[west]
            + below[col]
            + below[east];
        let cell = here[col];
        let next = B3S23.lookup(cell, neighbors);
        changed |= next != cell;
        out[col] = next;
    }
    changed
}
