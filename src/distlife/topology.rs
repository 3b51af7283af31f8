//! Periodic 2D arrangement of workers.
//!
//! Every worker owns exactly one block at `(block_row, block_col)` in a
//! `line_div x col_div` process grid. Coordinates wrap in both axes, so each
//! worker has 8 neighbors even at the edges of the process grid; with a single
//! block row or column some of those neighbors are the worker itself.

use crate::error::{LifeError, Result};

use super::WorkerId;

/// The 8 cardinal and intercardinal directions for neighbor addressing.
///
/// Rows grow southward, columns grow eastward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    North = 0, // (r-1, c)
    South = 1, // (r+1, c)
    West  = 2, // (r, c-1)
    East  = 3, // (r, c+1)
    NW    = 4, // (r-1, c-1)
    NE    = 5, // (r-1, c+1)
    SW    = 6, // (r+1, c-1)
    SE    = 7, // (r+1, c+1)
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::North, Direction::South,
        Direction::West,  Direction::East,
        Direction::NW,    Direction::NE,
        Direction::SW,    Direction::SE,
    ];

    /// The `(row, col)` offset for this direction.
    #[inline]
    pub const fn offset(self) -> (isize, isize) {
        match self {
            Direction::North => (-1, 0),
            Direction::South => (1, 0),
            Direction::West  => (0, -1),
            Direction::East  => (0, 1),
            Direction::NW    => (-1, -1),
            Direction::NE    => (-1, 1),
            Direction::SW    => (1, -1),
            Direction::SE    => (1, 1),
        }
    }

    /// The reverse direction. A neighbor to the north receives what we send
    /// north as its southern halo.
    #[inline]
    pub const fn reverse(self) -> Direction {
        match self {
            Direction::North => Direction::South,
            Direction::South => Direction::North,
            Direction::West  => Direction::East,
            Direction::East  => Direction::West,
            Direction::NW    => Direction::SE,
            Direction::NE    => Direction::SW,
            Direction::SW    => Direction::NE,
            Direction::SE    => Direction::NW,
        }
    }

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockCoord {
    pub row: usize,
    pub col: usize,
}

impl BlockCoord {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Bijection between worker ids and block coordinates, periodic in both axes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Topology {
    line_div: usize,
    col_div: usize,
    /// `workers[row * col_div + col]` owns block `(row, col)`.
    workers: Vec<WorkerId>,
    /// Inverse of `workers`.
    coords: Vec<BlockCoord>,
    /// Pre-resolved neighbor ids, indexed by worker then `Direction`.
    neighbors: Vec<[WorkerId; 8]>,
}

impl Topology {
    /// Row-major enumeration: worker `w` owns block `(w / col_div, w % col_div)`.
    pub fn build(line_div: usize, col_div: usize, worker_count: usize) -> Result<Self> {
        check_extent(line_div, col_div, worker_count)?;
        Self::from_assignment(line_div, col_div, (0..worker_count).collect())
    }

    /// Use an externally computed placement, e.g. one remapped for locality.
    ///
    /// `assignment[row * col_div + col]` is the worker that owns that block.
    /// Every worker in `0..assignment.len()` must appear exactly once.
    pub fn from_assignment(
        line_div: usize,
        col_div: usize,
        assignment: Vec<WorkerId>,
    ) -> Result<Self> {
        check_extent(line_div, col_div, assignment.len())?;
        let worker_count = assignment.len();

        let mut coords = vec![None; worker_count];
        for (slot, &worker) in assignment.iter().enumerate() {
            if worker >= worker_count {
                return Err(LifeError::InvalidAssignment(format!(
                    "worker {worker} out of range for {worker_count} workers"
                )));
            }
            if coords[worker].is_some() {
                return Err(LifeError::InvalidAssignment(format!(
                    "worker {worker} owns more than one block"
                )));
            }
            coords[worker] = Some(BlockCoord::new(slot / col_div, slot % col_div));
        }
        let coords: Vec<BlockCoord> = coords.into_iter().flatten().collect();

        let mut topology = Self {
            line_div,
            col_div,
            workers: assignment,
            coords,
            neighbors: Vec::with_capacity(worker_count),
        };
        for worker in 0..worker_count {
            let here = topology.coords[worker];
            let mut ids = [0; 8];
            for dir in Direction::ALL {
                let (dr, dc) = dir.offset();
                ids[dir.index()] = topology.worker_at_offset(here, dr, dc);
            }
            topology.neighbors.push(ids);
        }
        Ok(topology)
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
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    #[inline]
    pub fn coords_of(&self, worker: WorkerId) -> BlockCoord {
        self.coords[worker]
    }

    /// Worker owning `coords`. With `wrap`, coordinates are reduced modulo the
    /// process grid; without it, out-of-range coordinates yield `None`.
    pub fn worker_at(&self, coords: (isize, isize), wrap: bool) -> Option<WorkerId> {
        let (row, col) = coords;
        let (row, col) = if wrap {
            (
                row.rem_euclid(self.line_div as isize) as usize,
                col.rem_euclid(self.col_div as isize) as usize,
            )
        } else {
            if row < 0 || col < 0 {
                return None;
            }
            let (row, col) = (row as usize, col as usize);
            if row >= self.line_div || col >= self.col_div {
                return None;
            }
            (row, col)
        };
        Some(self.workers[row * self.col_div + col])
    }

    #[inline]
    fn worker_at_offset(&self, here: BlockCoord, dr: isize, dc: isize) -> WorkerId {
        let row = (here.row as isize + dr).rem_euclid(self.line_div as isize) as usize;
        let col = (here.col as isize + dc).rem_euclid(self.col_div as isize) as usize;
        self.workers[row * self.col_div + col]
    }

    /// Neighbor of `worker` in `dir`. May be `worker` itself.
    #[inline]
    pub fn neighbor(&self, worker: WorkerId, dir: Direction) -> WorkerId {
        self.neighbors[worker][dir.index()]
    }

    /// All 8 neighbors of `worker`, indexed by `Direction`.
    #[inline]
    pub fn neighbors(&self, worker: WorkerId) -> &[WorkerId; 8] {
        &self.neighbors[worker]
    }
}

fn check_extent(line_div: usize, col_div: usize, worker_count: usize) -> Result<()> {
    if line_div == 0 || col_div == 0 {
        return Err(LifeError::config(
            "process grid",
            format!("{line_div}x{col_div} has an empty axis"),
        ));
    }
    let blocks = line_div * col_div;
    if blocks > worker_count {
        return Err(LifeError::UnassignedBlocks {
            line_div,
            col_div,
            blocks,
            workers: worker_count,
        });
    }
    if blocks < worker_count {
        return Err(LifeError::IdleWorkers {
            line_div,
            col_div,
            blocks,
            workers: worker_count,
        });
    }
    Ok(())
}
