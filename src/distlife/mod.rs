//! Distributed toroidal Life.
//!
//! The grid is cut into `line_div x col_div` equal blocks, one per worker.
//! Each worker owns a padded block whose one-cell halo mirrors the borders of
//! its eight torus neighbors. A generation exchanges halos over a channel
//! fabric while the halo-independent cells are computed, then finishes the
//! outer ring once the halos land. Convergence is an all-worker reduction;
//! results are gathered to worker [`ROOT`].

mod block;
mod config;
mod engine;
mod fabric;
mod gather;
mod halo;
mod kernel;
mod partition;
mod reduce;
mod topology;
mod worker;

/// Worker rank, `0..worker_count`.
pub type WorkerId = usize;

pub use block::{BlockPair, GridBlock, Region};
pub use config::{
    DEFAULT_MAX_GENERATIONS, DEFAULT_REDUCE_RATE, DEFAULT_TRANSPORT_TIMEOUT, LifeConfig,
    WORKERS_ENV,
};
pub use engine::{DistLife, HALO_SLOTS, SimulationReport, Termination};
pub use fabric::{Fabric, ROOT};
pub use gather::{BlockPiece, ResultCollector};
pub use halo::HaloChannels;
pub use kernel::{advance_inner, advance_ring};
pub use partition::{BlockExtents, Partition};
pub use reduce::{ConvergenceReducer, Verdict, Vote};
pub use topology::{BlockCoord, Direction, Topology};
pub use worker::{RunLimits, Worker, WorkerOutcome, WorkerState};
