//! Error type shared by every layer of the crate.

use thiserror::Error;

use crate::distlife::WorkerId;

#[derive(Debug, Error)]
pub enum LifeError {
    /// A configuration value is unusable. Reported before any worker starts.
    #[error("invalid configuration: `{parameter}` {reason}")]
    Config {
        parameter: &'static str,
        reason: String,
    },

    /// The process grid has more blocks than there are workers to own them.
    #[error(
        "topology {line_div}x{col_div} needs {blocks} workers but only {workers} exist; \
         unowned blocks would deadlock their neighbors"
    )]
    UnassignedBlocks {
        line_div: usize,
        col_div: usize,
        blocks: usize,
        workers: usize,
    },

    /// More workers than blocks in the process grid.
    #[error("topology {line_div}x{col_div} has {blocks} blocks but {workers} workers were requested")]
    IdleWorkers {
        line_div: usize,
        col_div: usize,
        blocks: usize,
        workers: usize,
    },

    /// A worker assignment handed to `Topology::from_assignment` is not a bijection.
    #[error("invalid worker assignment: {0}")]
    InvalidAssignment(String),

    #[error("cell ({row}, {col}) lies outside the {rows}x{cols} grid")]
    OutOfBounds {
        row: usize,
        col: usize,
        rows: usize,
        cols: usize,
    },

    /// A send, receive or collective failed. The run cannot continue.
    #[error("transport failure on worker {worker} during {operation}: {reason}")]
    Transport {
        worker: WorkerId,
        operation: &'static str,
        reason: String,
    },

    /// A collective was entered out of step with the other workers.
    #[error("protocol violation on worker {worker}: {reason}")]
    Protocol { worker: WorkerId, reason: String },

    #[error("worker {0} panicked")]
    WorkerPanicked(WorkerId),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl LifeError {
    pub(crate) fn config(parameter: &'static str, reason: impl Into<String>) -> Self {
        LifeError::Config {
            parameter,
            reason: reason.into(),
        }
    }

    pub(crate) fn transport(
        worker: WorkerId,
        operation: &'static str,
        reason: impl std::fmt::Display,
    ) -> Self {
        LifeError::Transport {
            worker,
            operation,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LifeError>;
