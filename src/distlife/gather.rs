//! Full-grid collection at the root worker.
//!
//! Every worker ships exactly its interior; the root stitches the pieces into
//! a `LifeGrid` using the partition extents. Gathers are numbered so that a
//! worker running ahead to the next snapshot cannot have its piece mixed into
//! the current one. Collecting reads the current block only and never
//! disturbs the simulation state.

use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};

use crate::error::{LifeError, Result};
use crate::grid::LifeGrid;

use super::WorkerId;
use super::block::GridBlock;
use super::fabric::{CollectivePorts, recv_within};
use super::partition::Partition;
use super::topology::Topology;

#[derive(Debug)]
pub struct BlockPiece {
    pub worker: WorkerId,
    pub sequence: u64,
    /// Interior cells, row-major, `rows_per_block * cols_per_block` long.
    pub cells: Vec<u8>,
}

pub struct ResultCollector {
    worker: WorkerId,
    worker_count: usize,
    timeout: Duration,
    sequence: u64,
    piece_tx: Sender<BlockPiece>,
    /// Root only: incoming pieces plus any that arrived for a later gather.
    inbox: Option<(Receiver<BlockPiece>, Vec<BlockPiece>)>,
}

impl ResultCollector {
    pub(crate) fn new(
        worker: WorkerId,
        worker_count: usize,
        timeout: Duration,
        ports: &CollectivePorts,
    ) -> Self {
        Self {
            worker,
            worker_count,
            timeout,
            sequence: 0,
            piece_tx: ports.piece_tx.clone(),
            inbox: ports
                .root
                .as_ref()
                .map(|root| (root.piece_rx.clone(), Vec::new())),
        }
    }

    /// Collective gather. Returns the assembled grid on the root and `None`
    /// everywhere else.
    pub fn gather(
        &mut self,
        block: &GridBlock,
        partition: &Partition,
        topology: &Topology,
    ) -> Result<Option<LifeGrid>> {
        let sequence = self.sequence;
        self.sequence += 1;

        let Some((inbox, early)) = self.inbox.as_mut() else {
            let mut cells = Vec::with_capacity(block.rows() * block.cols());
            for row in 0..block.rows() {
                cells.extend_from_slice(block.interior_row(row));
            }
            self.piece_tx
                .send(BlockPiece {
                    worker: self.worker,
                    sequence,
                    cells,
                })
                .map_err(|_| LifeError::transport(self.worker, "gather send", "root disconnected"))?;
            return Ok(None);
        };

        let mut grid = LifeGrid::new(partition.grid_rows(), partition.grid_cols());
        let mut seen = vec![false; self.worker_count];
        seen[self.worker] = true;
        place_rows(
            &mut grid,
            partition,
            topology,
            self.worker,
            (0..block.rows()).map(|row| block.interior_row(row)),
        );

        let mut remaining = self.worker_count - 1;
        let mut pending = std::mem::take(early);
        while remaining > 0 {
            let piece = match pending.iter().position(|p| p.sequence == sequence) {
                Some(pos) => pending.swap_remove(pos),
                None => recv_within(inbox, self.worker, "gather receive", self.timeout)?,
            };
            if piece.sequence > sequence {
                pending.push(piece);
                continue;
            }
            if piece.sequence < sequence || piece.worker >= self.worker_count || seen[piece.worker] {
                return Err(LifeError::Protocol {
                    worker: self.worker,
                    reason: format!(
                        "unexpected block piece from worker {} (gather {}, expected {sequence})",
                        piece.worker, piece.sequence
                    ),
                });
            }
            let expected = partition.rows_per_block() * partition.cols_per_block();
            if piece.cells.len() != expected {
                return Err(LifeError::Protocol {
                    worker: self.worker,
                    reason: format!(
                        "block piece from worker {} has {} cells, expected {expected}",
                        piece.worker,
                        piece.cells.len()
                    ),
                });
            }
            seen[piece.worker] = true;
            place_rows(
                &mut grid,
                partition,
                topology,
                piece.worker,
                piece.cells.chunks(partition.cols_per_block()),
            );
            remaining -= 1;
        }
        *early = pending;
        Ok(Some(grid))
    }
}

fn place_rows<'a>(
    grid: &mut LifeGrid,
    partition: &Partition,
    topology: &Topology,
    worker: WorkerId,
    rows: impl Iterator<Item = &'a [u8]>,
) {
    let extents = partition.extents(topology.coords_of(worker));
    for (offset, src) in rows.enumerate() {
        grid.row_mut(extents.row_start + offset)[extents.col_start..extents.col_end]
            .copy_from_slice(src);
    }
}
