use std::collections::HashSet;

use halo_life::grid::Population;
use halo_life::torus::TorusLife;
use rand::Rng;
use rand::SeedableRng;

fn set_cells(engine: &mut TorusLife, cells: &[(usize, usize)]) {
    for &(row, col) in cells {
        engine.set_cell(row, col, true);
    }
}

fn collect_live(engine: &TorusLife) -> HashSet<(usize, usize)> {
    let mut out = HashSet::new();
    engine.snapshot().for_each_live(|row, col| {
        out.insert((row, col));
    });
    out
}

fn assert_alive(engine: &TorusLife, cells: &[(usize, usize)]) {
    for &(row, col) in cells {
        assert!(engine.get_cell(row, col), "expected alive at ({row},{col})");
    }
}

fn assert_dead(engine: &TorusLife, cells: &[(usize, usize)]) {
    for &(row, col) in cells {
        assert!(!engine.get_cell(row, col), "expected dead at ({row},{col})");
    }
}

fn step_naive(cells: &HashSet<(usize, usize)>, rows: usize, cols: usize) -> HashSet<(usize, usize)> {
    let wrap = |row: usize, col: usize, dr: isize, dc: isize| {
        (
            (row as isize + dr).rem_euclid(rows as isize) as usize,
            (col as isize + dc).rem_euclid(cols as isize) as usize,
        )
    };

    let mut candidates = HashSet::new();
    for &(row, col) in cells {
        for dr in -1..=1 {
            for dc in -1..=1 {
                candidates.insert(wrap(row, col, dr, dc));
            }
        }
    }

    let mut next = HashSet::new();
    for (row, col) in candidates {
        let mut neighbors = 0;
        for dr in -1..=1 {
            for dc in -1..=1 {
                if dr == 0 && dc == 0 {
                    continue;
                }
                if cells.contains(&wrap(row, col, dr, dc)) {
                    neighbors += 1;
                }
            }
        }
        let alive = cells.contains(&(row, col));
        if neighbors == 3 || (alive && neighbors == 2) {
            next.insert((row, col));
        }
    }
    next
}

#[test]
fn block_is_stable() {
    let mut engine = TorusLife::new(8, 8);
    let block = [(3, 3), (3, 4), (4, 3), (4, 4)];
    set_cells(&mut engine, &block);

    assert!(!engine.step());

    assert_alive(&engine, &block);
    assert_dead(&engine, &[(2, 3), (5, 4), (3, 2), (4, 5)]);
}

#[test]
fn blinker_oscillates() {
    let mut engine = TorusLife::new(8, 8);
    set_cells(&mut engine, &[(4, 3), (4, 4), (4, 5)]);

    assert!(engine.step());
    assert_alive(&engine, &[(3, 4), (4, 4), (5, 4)]);
    assert_dead(&engine, &[(4, 3), (4, 5)]);

    assert!(engine.step());
    assert_alive(&engine, &[(4, 3), (4, 4), (4, 5)]);
    assert_dead(&engine, &[(3, 4), (5, 4)]);
}

#[test]
fn glider_wraps_back_to_its_start() {
    // A glider moves one cell diagonally every four generations, so on an
    // n x n torus it returns home after 4n generations.
    let mut engine = TorusLife::new(10, 10);
    let glider = [(0, 1), (1, 2), (2, 0), (2, 1), (2, 2)];
    set_cells(&mut engine, &glider);
    let start = collect_live(&engine);

    engine.step_n(4);
    let shifted: HashSet<_> = glider.iter().map(|&(r, c)| (r + 1, c + 1)).collect();
    assert_eq!(collect_live(&engine), shifted);

    engine.step_n(36);
    assert_eq!(collect_live(&engine), start);
    assert_eq!(engine.generation(), 40);
}

#[test]
fn lone_cell_dies_and_then_nothing_changes() {
    let mut engine = TorusLife::new(5, 5);
    engine.set_cell(0, 0, true);
    assert_eq!(engine.run_until_stable(10), Some(2));
    assert_eq!(engine.population(), 0);
}

#[test]
fn oscillator_never_stabilises() {
    let mut engine = TorusLife::new(8, 8);
    set_cells(&mut engine, &[(4, 3), (4, 4), (4, 5)]);
    assert_eq!(engine.run_until_stable(25), None);
    assert_eq!(engine.generation(), 25);
}

#[test]
fn matches_naive_on_random_soups() {
    for (rows, cols, seed) in [(16, 16, 11u64), (12, 31, 22), (70, 90, 33)] {
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let mut population = Population::new();
        let mut expected = HashSet::new();
        for row in 0..rows {
            for col in 0..cols {
                if rng.random::<f64>() < 0.3 {
                    population.insert(row, col);
                    expected.insert((row, col));
                }
            }
        }
        let mut engine = TorusLife::with_population(rows, cols, &population);

        for generation in 1..=12 {
            engine.step();
            expected = step_naive(&expected, rows, cols);
            assert_eq!(
                collect_live(&engine),
                expected,
                "{rows}x{cols} seed {seed} diverges at generation {generation}"
            );
        }
    }
}
