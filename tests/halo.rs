use std::thread;
use std::time::Duration;

use halo_life::distlife::{Direction, Fabric, GridBlock, HaloChannels, Partition, Topology};
use halo_life::error::LifeError;

const TIMEOUT: Duration = Duration::from_secs(20);

fn pattern(row: usize, col: usize) -> bool {
    (row * 7 + col * 3 + row * col) % 5 < 2
}

fn build(rows: usize, cols: usize, workers: usize) -> (Partition, Topology, Vec<HaloChannels>) {
    let partition = Partition::compute(rows, cols, workers).unwrap();
    let topology = Topology::build(partition.line_div(), partition.col_div(), workers).unwrap();
    let mut fabric = Fabric::wire(&topology, 2, TIMEOUT);
    let channels = (0..workers)
        .map(|worker| HaloChannels::setup(worker, &partition, &topology, &mut fabric).unwrap())
        .collect();
    assert_eq!(fabric.unclaimed_links(), 0);
    (partition, topology, channels)
}

fn seeded_block(partition: &Partition, topology: &Topology, worker: usize) -> GridBlock {
    let extents = partition.extents(topology.coords_of(worker));
    let mut block = GridBlock::new(partition.rows_per_block(), partition.cols_per_block());
    for row in 0..block.rows() {
        for col in 0..block.cols() {
            block.set_local(row, col, pattern(extents.row_start + row, extents.col_start + col));
        }
    }
    block
}

/// Every padded cell, halo included, must hold the toroidal global cell it mirrors.
fn assert_halo_consistent(partition: &Partition, topology: &Topology, worker: usize, block: &GridBlock) {
    let extents = partition.extents(topology.coords_of(worker));
    let rows = partition.effective_rows() as isize;
    let cols = partition.effective_cols() as isize;
    for padded_row in 0..block.rows() + 2 {
        for padded_col in 0..block.cols() + 2 {
            let global_row = (extents.row_start as isize + padded_row as isize - 1).rem_euclid(rows);
            let global_col = (extents.col_start as isize + padded_col as isize - 1).rem_euclid(cols);
            assert_eq!(
                block.get_padded(padded_row, padded_col) != 0,
                pattern(global_row as usize, global_col as usize),
                "worker {worker} padded ({padded_row}, {padded_col})"
            );
        }
    }
}

fn exchange_all(rows: usize, cols: usize, workers: usize) {
    let (partition, topology, channels) = build(rows, cols, workers);
    let blocks: Vec<GridBlock> = thread::scope(|scope| {
        let handles: Vec<_> = channels
            .into_iter()
            .enumerate()
            .map(|(worker, mut halo)| {
                let mut block = seeded_block(&partition, &topology, worker);
                scope.spawn(move || {
                    for slot in [0, 1, 0] {
                        halo.start_all(slot, &mut block).unwrap();
                        halo.wait_receives(slot, &mut block).unwrap();
                        halo.wait_sends(slot).unwrap();
                    }
                    block
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    for (worker, block) in blocks.iter().enumerate() {
        let pristine = seeded_block(&partition, &topology, worker);
        for row in 0..block.rows() {
            assert_eq!(block.interior_row(row), pristine.interior_row(row), "worker {worker} interior");
        }
        assert_halo_consistent(&partition, &topology, worker, block);
    }
}

#[test]
fn halos_mirror_neighbor_borders_on_a_square_grid() {
    exchange_all(12, 12, 4);
    exchange_all(18, 18, 9);
}

#[test]
fn halos_mirror_neighbor_borders_on_strips() {
    // 2x1: north and south neighbor are the same worker.
    exchange_all(12, 10, 2);
    // 1x3: north and south are loopbacks.
    exchange_all(9, 30, 3);
    // 3x1: east and west are loopbacks.
    exchange_all(30, 9, 3);
}

#[test]
fn single_worker_is_all_loopback() {
    let (partition, topology, mut channels) = build(6, 5, 1);
    let mut halo = channels.pop().unwrap();
    let mut block = seeded_block(&partition, &topology, 0);
    halo.start_all(0, &mut block).unwrap();
    halo.wait_receives(0, &mut block).unwrap();
    halo.wait_sends(0).unwrap();
    assert_halo_consistent(&partition, &topology, 0, &block);
    assert_eq!(topology.neighbors(0), &[0; 8]);
}

#[test]
fn border_and_halo_regions_face_each_other() {
    let block = GridBlock::new(4, 6);
    for dir in Direction::ALL {
        assert_eq!(block.border_region(dir).len, block.halo_region(dir.reverse()).len);
    }
    assert_eq!(block.border_region(Direction::North).len, 6);
    assert_eq!(block.border_region(Direction::West).len, 4);
    assert_eq!(block.border_region(Direction::SE).len, 1);
}

#[test]
fn out_of_order_calls_are_protocol_errors() {
    let (partition, topology, mut channels) = build(6, 5, 1);
    let mut halo = channels.pop().unwrap();
    let mut block = seeded_block(&partition, &topology, 0);

    assert!(matches!(halo.wait_receives(0, &mut block), Err(LifeError::Protocol { .. })));
    assert!(matches!(halo.wait_sends(1), Err(LifeError::Protocol { .. })));
    halo.start_all(1, &mut block).unwrap();
    assert!(matches!(halo.start_all(1, &mut block), Err(LifeError::Protocol { .. })));
    // Slots are independent.
    halo.start_all(0, &mut block).unwrap();
}

#[test]
fn a_vanished_peer_is_a_transport_error() {
    let (partition, topology, mut channels) = build(12, 12, 2);
    drop(channels.pop());
    let mut halo = channels.pop().unwrap();
    let mut block = seeded_block(&partition, &topology, 0);
    let err = match halo.start_all(0, &mut block) {
        Err(err) => err,
        Ok(()) => halo.wait_receives(0, &mut block).unwrap_err(),
    };
    assert!(matches!(err, LifeError::Transport { worker: 0, .. }), "{err}");
}
