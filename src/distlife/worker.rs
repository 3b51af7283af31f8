//! Per-worker generation loop.
//!
//! Each generation overlaps communication with computation:
//!
//! ```text
//! start_all(slot) -> inner cells -> wait_receives(slot) -> ring cells
//!     -> [reduce every reduce_rate generations] -> wait_sends(slot) -> swap
//! ```
//!
//! Inner cells depend only on resident data, so the halo transfer is hidden
//! behind them. The slot flips with the block swap, so the next generation's
//! exchange runs on the other channel set.

use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::Result;
use crate::grid::LifeGrid;

use super::WorkerId;
use super::block::BlockPair;
use super::fabric::Fabric;
use super::gather::ResultCollector;
use super::halo::HaloChannels;
use super::kernel::{advance_inner, advance_ring};
use super::partition::Partition;
use super::reduce::ConvergenceReducer;
use super::topology::Topology;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkerState {
    Idle,
    SendingHalo,
    ComputingInterior,
    AwaitingHalo,
    ComputingBorder,
    Converged,
    MaxLoopsReached,
}

/// Loop limits shared by every worker of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RunLimits {
    pub max_generations: u64,
    pub reduce_rate: u64,
    pub snapshot_interval: Option<u64>,
}

#[derive(Debug)]
pub struct WorkerOutcome {
    pub worker: WorkerId,
    pub state: WorkerState,
    pub generations: u64,
    /// Root only.
    pub initial: Option<LifeGrid>,
    /// Root only.
    pub final_grid: Option<LifeGrid>,
    /// Root only: `(generation, grid)` per snapshot interval.
    pub snapshots: Vec<(u64, LifeGrid)>,
}

pub struct Worker {
    id: WorkerId,
    partition: Arc<Partition>,
    topology: Arc<Topology>,
    blocks: BlockPair,
    halo: HaloChannels,
    reducer: ConvergenceReducer,
    collector: ResultCollector,
    limits: RunLimits,
    state: WorkerState,
    generation: u64,
}

impl Worker {
    /// Allocate the block pair and claim this worker's links from `fabric`.
    pub fn new(
        id: WorkerId,
        partition: Arc<Partition>,
        topology: Arc<Topology>,
        fabric: &mut Fabric,
        limits: RunLimits,
    ) -> Result<Self> {
        let halo = HaloChannels::setup(id, &partition, &topology, fabric)?;
        let ports = fabric.take_collective_ports(id)?;
        let workers = topology.worker_count();
        let reducer = ConvergenceReducer::new(id, workers, fabric.timeout(), &ports);
        let collector = ResultCollector::new(id, workers, fabric.timeout(), &ports);
        let blocks = BlockPair::new(partition.rows_per_block(), partition.cols_per_block());
        Ok(Self {
            id,
            partition,
            topology,
            blocks,
            halo,
            reducer,
            collector,
            limits,
            state: WorkerState::Idle,
            generation: 0,
        })
    }

    #[inline]
    pub fn id(&self) -> WorkerId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> WorkerState {
        self.state
    }

    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn blocks(&self) -> &BlockPair {
        &self.blocks
    }

    /// Inject live cells given in interior-local coordinates. Only valid
    /// before the first generation.
    pub fn seed(&mut self, cells: &[(usize, usize)]) {
        debug_assert_eq!(self.generation, 0);
        let block = self.blocks.current_mut();
        for &(row, col) in cells {
            block.set_local(row, col, true);
        }
    }

    /// Advance one generation without reducing or swapping. Returns `true`
    /// when no local cell changed.
    fn advance(&mut self) -> Result<bool> {
        let slot = self.blocks.slot();

        self.transition(WorkerState::SendingHalo);
        self.halo.start_all(slot, self.blocks.current_mut())?;

        self.transition(WorkerState::ComputingInterior);
        let (current, next) = self.blocks.current_and_next_mut();
        let mut changed = advance_inner(current, next);

        self.transition(WorkerState::AwaitingHalo);
        self.halo.wait_receives(slot, self.blocks.current_mut())?;

        self.transition(WorkerState::ComputingBorder);
        let (current, next) = self.blocks.current_and_next_mut();
        changed |= advance_ring(current, next);

        Ok(!changed)
    }

    /// Run one full generation: exchange, compute, optionally reduce, retire
    /// sends and swap. Returns `true` once global convergence is observed.
    pub fn step(&mut self) -> Result<bool> {
        let slot = self.blocks.slot();
        self.generation += 1;
        let unchanged = self.advance()?;

        let converged = if self.generation % self.limits.reduce_rate == 0 {
            self.reducer.reduce(self.generation, unchanged)?
        } else {
            false
        };

        self.halo.wait_sends(slot)?;
        self.blocks.swap();
        self.transition(WorkerState::Idle);
        Ok(converged)
    }

    /// Collective snapshot of the current generation. `Some` on the root only.
    pub fn gather(&mut self) -> Result<Option<LifeGrid>> {
        self.collector
            .gather(self.blocks.current(), &self.partition, &self.topology)
    }

    /// Run until global convergence or the generation limit.
    pub fn run(mut self) -> Result<WorkerOutcome> {
        debug!(
            worker = self.id,
            coords = ?self.topology.coords_of(self.id),
            live = self.blocks.current().population(),
            "worker starting"
        );
        let initial = self.gather()?;
        let mut snapshots = Vec::new();

        loop {
            if self.generation >= self.limits.max_generations {
                self.transition(WorkerState::MaxLoopsReached);
                break;
            }
            let converged = self.step()?;
            if let Some(interval) = self.limits.snapshot_interval {
                if self.generation % interval == 0 {
                    if let Some(grid) = self.gather()? {
                        snapshots.push((self.generation, grid));
                    }
                }
            }
            if converged {
                self.transition(WorkerState::Converged);
                break;
            }
        }

        let final_grid = self.gather()?;
        debug!(
            worker = self.id,
            generations = self.generation,
            state = ?self.state,
            "worker finished"
        );
        Ok(WorkerOutcome {
            worker: self.id,
            state: self.state,
            generations: self.generation,
            initial,
            final_grid,
            snapshots,
        })
    }

    #[inline]
    fn transition(&mut self, next: WorkerState) {
        trace!(worker = self.id, generation = self.generation, from = ?self.state, to = ?next);
        self.state = next;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::{RunLimits, Worker, WorkerState};
    use crate::distlife::fabric::Fabric;
    use crate::distlife::partition::Partition;
    use crate::distlife::topology::Topology;

    fn lone_worker(rows: usize, cols: usize, limits: RunLimits) -> Worker {
        let partition = Partition::compute(rows, cols, 1).unwrap();
        let topology = Topology::build(1, 1, 1).unwrap();
        let mut fabric = Fabric::wire(&topology, 2, Duration::from_secs(5));
        Worker::new(0, Arc::new(partition), Arc::new(topology), &mut fabric, limits).unwrap()
    }

    fn live(worker: &Worker) -> Vec<(usize, usize)> {
        let block = worker.blocks().current();
        let mut out = Vec::new();
        for row in 0..block.rows() {
            for col in 0..block.cols() {
                if block.get_local(row, col) {
                    out.push((row, col));
                }
            }
        }
        out
    }

    #[test]
    fn step_flips_the_slot_and_returns_to_idle() {
        let limits = RunLimits {
            max_generations: 4,
            reduce_rate: 10,
            snapshot_interval: None,
        };
        let mut worker = lone_worker(6, 6, limits);
        worker.seed(&[(2, 1), (2, 2), (2, 3)]);
        assert_eq!(worker.state(), WorkerState::Idle);
        assert_eq!(worker.blocks().slot(), 0);

        assert!(!worker.step().unwrap());
        assert_eq!(worker.state(), WorkerState::Idle);
        assert_eq!(worker.generation(), 1);
        assert_eq!(worker.blocks().slot(), 1);
        assert_eq!(live(&worker), vec![(1, 2), (2, 2), (3, 2)]);

        assert!(!worker.step().unwrap());
        assert_eq!(worker.blocks().slot(), 0);
        assert_eq!(live(&worker), vec![(2, 1), (2, 2), (2, 3)]);
    }

    #[test]
    fn still_life_converges_on_a_reduction_generation() {
        let limits = RunLimits {
            max_generations: 10,
            reduce_rate: 2,
            snapshot_interval: None,
        };
        let mut worker = lone_worker(6, 6, limits);
        worker.seed(&[(2, 2), (2, 3), (3, 2), (3, 3)]);
        assert!(!worker.step().unwrap());
        assert!(worker.step().unwrap());

        let mut worker = lone_worker(6, 6, limits);
        worker.seed(&[(2, 2), (2, 3), (3, 2), (3, 3)]);
        let outcome = worker.run().unwrap();
        assert_eq!(outcome.state, WorkerState::Converged);
        assert_eq!(outcome.generations, 2);
        assert_eq!(outcome.final_grid, outcome.initial);
    }
}
