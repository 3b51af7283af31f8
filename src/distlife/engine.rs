use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::error::{LifeError, Result};
use crate::grid::{LifeGrid, Population};

use super::WorkerId;
use super::config::LifeConfig;
use super::fabric::{Fabric, ROOT};
use super::partition::Partition;
use super::topology::Topology;
use super::worker::{RunLimits, Worker, WorkerOutcome, WorkerState};

/// Halo buffer generations. Two lets the next generation's exchange start
/// on fresh buffers while the previous one drains.
pub const HALO_SLOTS: usize = 2;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Termination {
    /// Every worker reported no change in this generation.
    Converged { generation: u64 },
    /// The generation limit ran out first.
    MaxGenerations,
}

#[derive(Clone, Debug)]
pub struct SimulationReport {
    pub partition: Partition,
    pub generations: u64,
    pub termination: Termination,
    pub initial: LifeGrid,
    pub final_grid: LifeGrid,
    /// `(generation, grid)` for every snapshot interval reached.
    pub snapshots: Vec<(u64, LifeGrid)>,
    pub elapsed: Duration,
}

/// Distributed toroidal Game of Life.
///
/// Construction validates the configuration, partitions the grid and builds
/// the topology; nothing is spawned until [`DistLife::run`].
pub struct DistLife {
    config: LifeConfig,
    partition: Arc<Partition>,
    topology: Arc<Topology>,
}

impl DistLife {
    pub fn new(config: LifeConfig) -> Result<Self> {
        config.validate()?;
        let workers = config.resolved_workers();
        let partition = Partition::compute(config.rows, config.cols, workers)?;
        let topology = Topology::build(partition.line_div(), partition.col_div(), workers)?;
        Ok(Self {
            config,
            partition: Arc::new(partition),
            topology: Arc::new(topology),
        })
    }

    /// Like [`DistLife::new`], but with an externally chosen block placement.
    /// `assignment[row * col_div + col]` owns block `(row, col)`.
    pub fn with_assignment(config: LifeConfig, assignment: Vec<WorkerId>) -> Result<Self> {
        config.validate()?;
        let workers = config.resolved_workers();
        let partition = Partition::compute(config.rows, config.cols, workers)?;
        let topology =
            Topology::from_assignment(partition.line_div(), partition.col_div(), assignment)?;
        if topology.worker_count() != workers {
            return Err(LifeError::InvalidAssignment(format!(
                "assignment covers {} workers, configuration has {workers}",
                topology.worker_count()
            )));
        }
        Ok(Self {
            config,
            partition: Arc::new(partition),
            topology: Arc::new(topology),
        })
    }

    pub fn config(&self) -> &LifeConfig {
        &self.config
    }

    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    /// Split a population into per-worker interior-local seed lists.
    /// Cells in truncated remainder rows/columns, or outside the grid
    /// altogether, are dropped.
    pub fn scatter(&self, population: &Population) -> Vec<Vec<(usize, usize)>> {
        let mut seeds = vec![Vec::new(); self.topology.worker_count()];
        let (mut truncated, mut outside) = (0usize, 0usize);
        for &(row, col) in population.cells() {
            if row >= self.partition.grid_rows() || col >= self.partition.grid_cols() {
                outside += 1;
                continue;
            }
            match self.partition.locate(row, col) {
                Some((coords, local_row, local_col)) => {
                    let owner = self
                        .topology
                        .worker_at((coords.row as isize, coords.col as isize), false);
                    if let Some(owner) = owner {
                        seeds[owner].push((local_row, local_col));
                    }
                }
                None => truncated += 1,
            }
        }
        if truncated > 0 {
            warn!(truncated, "live cells fall in truncated rows/columns and were ignored");
        }
        if outside > 0 {
            warn!(
                outside,
                rows = self.partition.grid_rows(),
                cols = self.partition.grid_cols(),
                "live cells lie outside the grid and were ignored"
            );
        }
        seeds
    }

    /// Run the simulation on one thread per worker and collect the report.
    pub fn run(&self, population: &Population) -> Result<SimulationReport> {
        let worker_count = self.topology.worker_count();
        let limits = RunLimits {
            max_generations: self.config.max_generations,
            reduce_rate: self.config.reduce_rate,
            snapshot_interval: self.config.snapshot_interval,
        };

        let mut fabric = Fabric::wire(&self.topology, HALO_SLOTS, self.config.transport_timeout);
        let seeds = self.scatter(population);
        let mut workers = Vec::with_capacity(worker_count);
        for (id, cells) in seeds.iter().enumerate() {
            let mut worker = Worker::new(
                id,
                Arc::clone(&self.partition),
                Arc::clone(&self.topology),
                &mut fabric,
                limits,
            )?;
            worker.seed(cells);
            workers.push(worker);
        }
        debug_assert_eq!(fabric.unclaimed_links(), 0);
        drop(fabric);

        info!(
            workers = worker_count,
            rows = self.partition.grid_rows(),
            cols = self.partition.grid_cols(),
            live = population.len(),
            max_generations = limits.max_generations,
            reduce_rate = limits.reduce_rate,
            "starting simulation"
        );
        let start = Instant::now();

        let results: Vec<Result<WorkerOutcome>> = thread::scope(|scope| {
            let mut handles = Vec::with_capacity(worker_count);
            for worker in workers {
                let id = worker.id();
                let spawned = thread::Builder::new()
                    .name(format!("halo-worker-{id}"))
                    .spawn_scoped(scope, move || worker.run());
                handles.push((id, spawned));
            }
            handles
                .into_iter()
                .map(|(id, spawned)| match spawned {
                    Ok(handle) => handle
                        .join()
                        .unwrap_or_else(|_| Err(LifeError::WorkerPanicked(id))),
                    Err(err) => Err(LifeError::Io(err)),
                })
                .collect()
        });
        let elapsed = start.elapsed();

        let mut outcomes = Vec::with_capacity(worker_count);
        let mut errors = Vec::new();
        for result in results {
            match result {
                Ok(outcome) => outcomes.push(outcome),
                Err(err) => {
                    error!(%err, "worker failed");
                    errors.push(err);
                }
            }
        }
        if let Some(err) = root_cause(errors) {
            return Err(err);
        }

        let report = assemble_report(&self.partition, outcomes, elapsed)?;
        info!(
            generations = report.generations,
            termination = ?report.termination,
            population = report.final_grid.population(),
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            "simulation finished"
        );
        Ok(report)
    }
}

/// Pick the error most likely to explain a failed run. Transport errors are
/// usually echoes of a peer dying, so anything else wins.
fn root_cause(errors: Vec<LifeError>) -> Option<LifeError> {
    let mut fallback = None;
    for err in errors {
        match err {
            LifeError::Transport { .. } => {
                if fallback.is_none() {
                    fallback = Some(err);
                }
            }
            other => return Some(other),
        }
    }
    fallback
}

fn assemble_report(
    partition: &Partition,
    outcomes: Vec<WorkerOutcome>,
    elapsed: Duration,
) -> Result<SimulationReport> {
    let Some(first) = outcomes.first() else {
        return Err(LifeError::config("workers", "no worker produced an outcome"));
    };
    let (generations, state) = (first.generations, first.state);
    if let Some(odd) = outcomes
        .iter()
        .find(|o| o.generations != generations || o.state != state)
    {
        return Err(LifeError::Protocol {
            worker: odd.worker,
            reason: format!(
                "stopped in {:?} after {} generations, worker {} stopped in {state:?} after {generations}",
                odd.state, odd.generations, first.worker
            ),
        });
    }

    let root = outcomes
        .into_iter()
        .find(|o| o.worker == ROOT)
        .ok_or_else(|| LifeError::transport(ROOT, "gather", "root produced no outcome"))?;
    let (Some(initial), Some(final_grid)) = (root.initial, root.final_grid) else {
        return Err(LifeError::transport(ROOT, "gather", "root returned no grid"));
    };

    let termination = match state {
        WorkerState::Converged => Termination::Converged { generation: generations },
        _ => Termination::MaxGenerations,
    };
    Ok(SimulationReport {
        partition: partition.clone(),
        generations,
        termination,
        initial,
        final_grid,
        snapshots: root.snapshots,
        elapsed,
    })
}
