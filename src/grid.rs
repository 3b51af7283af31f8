//! Full-grid snapshots and initial populations.
//!
//! Both are plain row-major data with zero-based coordinates. The 1-based
//! convention of population files is handled at the edge by
//! [`Population::from_one_based`] and the `io` module.

use std::collections::BTreeSet;

use crate::error::{LifeError, Result};

/// Row-major snapshot of the whole logical grid. Cells are `0` (dead) or `1`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LifeGrid {
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

impl LifeGrid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            cells: vec![0; rows * cols],
        }
    }

    pub fn from_population(rows: usize, cols: usize, population: &Population) -> Self {
        let mut grid = Self::new(rows, cols);
        for &(row, col) in population.cells() {
            if row < rows && col < cols {
                grid.set(row, col, true);
            }
        }
        grid
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.cols + col] != 0
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, alive: bool) {
        self.cells[row * self.cols + col] = alive as u8;
    }

    /// Raw row-major cell bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.cells
    }

    pub(crate) fn row_mut(&mut self, row: usize) -> &mut [u8] {
        let start = row * self.cols;
        &mut self.cells[start..start + self.cols]
    }

    pub fn row(&self, row: usize) -> &[u8] {
        let start = row * self.cols;
        &self.cells[start..start + self.cols]
    }

    pub fn population(&self) -> u64 {
        self.cells.iter().map(|&c| c as u64).sum()
    }

    /// Row-major boolean view, the shape renderers consume.
    pub fn to_bools(&self) -> Vec<Vec<bool>> {
        self.cells
            .chunks(self.cols.max(1))
            .take(self.rows)
            .map(|row| row.iter().map(|&c| c != 0).collect())
            .collect()
    }

    pub fn for_each_live<F: FnMut(usize, usize)>(&self, mut f: F) {
        for (idx, &cell) in self.cells.iter().enumerate() {
            if cell != 0 {
                f(idx / self.cols, idx % self.cols);
            }
        }
    }
}

/// Set of initially live cells, validated against the grid bounds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Population {
    cells: BTreeSet<(usize, usize)>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from zero-based `(row, col)` pairs, rejecting anything out of bounds.
    pub fn from_cells<I>(rows: usize, cols: usize, cells: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut population = Self::new();
        for (row, col) in cells {
            if row >= rows || col >= cols {
                return Err(LifeError::OutOfBounds {
                    row,
                    col,
                    rows,
                    cols,
                });
            }
            population.cells.insert((row, col));
        }
        Ok(population)
    }

    /// Build from 1-based `(row, col)` pairs as found in population files.
    pub fn from_one_based<I>(rows: usize, cols: usize, cells: I) -> Result<Self>
    where
        I: IntoIterator<Item = (usize, usize)>,
    {
        let mut population = Self::new();
        for (row, col) in cells {
            if row == 0 || col == 0 || row > rows || col > cols {
                return Err(LifeError::OutOfBounds {
                    row,
                    col,
                    rows,
                    cols,
                });
            }
            population.cells.insert((row - 1, col - 1));
        }
        Ok(population)
    }

    pub fn insert(&mut self, row: usize, col: usize) {
        self.cells.insert((row, col));
    }

    /// Zero-based live cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &(usize, usize)> {
        self.cells.iter()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl FromIterator<(usize, usize)> for Population {
    fn from_iter<I: IntoIterator<Item = (usize, usize)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{LifeGrid, Population};
    use crate::error::LifeError;

    #[test]
    fn one_based_coordinates_are_shifted() {
        let population = Population::from_one_based(3, 4, [(1, 1), (3, 4)]).unwrap();
        let cells: Vec<_> = population.cells().copied().collect();
        assert_eq!(cells, vec![(0, 0), (2, 3)]);
    }

    #[test]
    fn one_based_rejects_zero_and_overflow() {
        assert!(matches!(
            Population::from_one_based(3, 3, [(0, 1)]),
            Err(LifeError::OutOfBounds { .. })
        ));
        assert!(matches!(
            Population::from_one_based(3, 3, [(1, 4)]),
            Err(LifeError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn grid_from_population_counts_cells() {
        let population = Population::from_cells(4, 4, [(0, 0), (1, 2), (1, 2)]).unwrap();
        let grid = LifeGrid::from_population(4, 4, &population);
        assert_eq!(grid.population(), 2);
        assert!(grid.get(1, 2));
        assert!(!grid.get(2, 1));
        let bools = grid.to_bools();
        assert_eq!(bools.len(), 4);
        assert!(bools[0][0]);
    }
}
