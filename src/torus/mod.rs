//! Single-address-space toroidal engine.
//!
//! Holds the whole grid in one process and advances it with rayon. The
//! distributed engine must agree with it cell for cell on every input.

mod engine;

pub use engine::TorusLife;
