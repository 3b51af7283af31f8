use std::time::Duration;

use crate::error::{LifeError, Result};

pub const DEFAULT_MAX_GENERATIONS: u64 = 1000;
pub const DEFAULT_REDUCE_RATE: u64 = 1;
pub const DEFAULT_TRANSPORT_TIMEOUT: Duration = Duration::from_secs(60);

/// Environment override for the worker count when none is configured.
pub const WORKERS_ENV: &str = "HALOLIFE_WORKERS";

/// Configuration for a distributed run.
///
/// Start from `LifeConfig::new(rows, cols)` and adjust individual knobs via
/// the builder methods. Everything is checked by [`LifeConfig::validate`]
/// before any worker is created.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LifeConfig {
    pub rows: usize,
    pub cols: usize,
    /// Number of workers. `None` means `HALOLIFE_WORKERS`, else the available
    /// parallelism, capped at the row count.
    pub workers: Option<usize>,
    /// Generations to run before giving up on convergence.
    pub max_generations: u64,
    /// Reduce the convergence flag every this many generations.
    pub reduce_rate: u64,
    /// Gather a full-grid snapshot every this many generations.
    pub snapshot_interval: Option<u64>,
    /// Longest a worker waits on any single receive before declaring the run
    /// broken.
    pub transport_timeout: Duration,
}

impl LifeConfig {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            rows,
            cols,
            workers: None,
            max_generations: DEFAULT_MAX_GENERATIONS,
            reduce_rate: DEFAULT_REDUCE_RATE,
            snapshot_interval: None,
            transport_timeout: DEFAULT_TRANSPORT_TIMEOUT,
        }
    }

    pub fn workers(mut self, n: usize) -> Self {
        self.workers = Some(n);
        self
    }

    pub fn max_generations(mut self, n: u64) -> Self {
        self.max_generations = n;
        self
    }

    pub fn reduce_rate(mut self, n: u64) -> Self {
        self.reduce_rate = n;
        self
    }

    pub fn snapshot_interval(mut self, n: u64) -> Self {
        self.snapshot_interval = Some(n);
        self
    }

    pub fn transport_timeout(mut self, timeout: Duration) -> Self {
        self.transport_timeout = timeout;
        self
    }

    /// Worker count after applying the environment and auto-detection.
    pub fn resolved_workers(&self) -> usize {
        if let Some(n) = self.workers {
            return n;
        }
        let detected = std::env::var(WORKERS_ENV)
            .ok()
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|&n| n > 0)
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(|n| n.get())
                    .unwrap_or(1)
            });
        detected.min(self.rows).max(1)
    }

    pub fn validate(&self) -> Result<()> {
        if self.rows == 0 {
            return Err(LifeError::config("rows", "must be positive"));
        }
        if self.cols == 0 {
            return Err(LifeError::config("cols", "must be positive"));
        }
        let workers = self.resolved_workers();
        if workers == 0 {
            return Err(LifeError::config("workers", "must be at least 1"));
        }
        if workers > self.rows {
            return Err(LifeError::config(
                "workers",
                format!("{workers} workers exceed the {} grid rows", self.rows),
            ));
        }
        if self.reduce_rate == 0 {
            return Err(LifeError::config("reduce_rate", "must be at least 1"));
        }
        if self.snapshot_interval == Some(0) {
            return Err(LifeError::config("snapshot_interval", "must be at least 1"));
        }
        if self.transport_timeout.is_zero() {
            return Err(LifeError::config("transport_timeout", "must be non-zero"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::LifeConfig;
    use crate::error::LifeError;

    fn rejected(config: LifeConfig) -> &'static str {
        match config.validate() {
            Err(LifeError::Config { parameter, .. }) => parameter,
            other => panic!("expected a config error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_validate() {
        let config = LifeConfig::new(32, 32).workers(4);
        assert!(config.validate().is_ok());
        assert_eq!(config.max_generations, 1000);
        assert_eq!(config.reduce_rate, 1);
    }

    #[test]
    fn invalid_values_name_the_parameter() {
        assert_eq!(rejected(LifeConfig::new(0, 8).workers(1)), "rows");
        assert_eq!(rejected(LifeConfig::new(8, 0).workers(1)), "cols");
        assert_eq!(rejected(LifeConfig::new(8, 8).workers(0)), "workers");
        assert_eq!(rejected(LifeConfig::new(4, 8).workers(5)), "workers");
        assert_eq!(rejected(LifeConfig::new(8, 8).workers(2).reduce_rate(0)), "reduce_rate");
        assert_eq!(
            rejected(LifeConfig::new(8, 8).workers(2).snapshot_interval(0)),
            "snapshot_interval"
        );
        assert_eq!(
            rejected(LifeConfig::new(8, 8).workers(2).transport_timeout(Duration::ZERO)),
            "transport_timeout"
        );
    }

    #[test]
    fn auto_worker_count_never_exceeds_rows() {
        let config = LifeConfig::new(1, 64);
        assert_eq!(config.resolved_workers(), 1);
    }
}
