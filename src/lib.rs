//! Distributed toroidal Conway's Game of Life engine (B3/S23).
//!
//! [`DistLife`] splits the grid across worker threads that exchange
//! one-cell halos every generation; [`TorusLife`] is the single-address-space
//! engine it is checked against.

pub mod distlife;
pub mod error;
pub mod grid;
pub mod io;
pub mod rules;
pub mod torus;

pub use distlife::{DistLife, LifeConfig, SimulationReport, Termination};
pub use error::{LifeError, Result};
pub use grid::{LifeGrid, Population};
pub use torus::TorusLife;
