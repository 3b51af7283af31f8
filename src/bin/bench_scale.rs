#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::time::Instant;

use halo_life::distlife::{DistLife, LifeConfig};
use halo_life::grid::Population;
use halo_life::torus::TorusLife;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;

const DENSITY: f64 = 0.42;

fn seed(size: usize) -> Population {
    let mut rng = StdRng::seed_from_u64(0x5EED_1234_ABCD_EF01);
    let mut population = Population::new();
    for row in 0..size {
        for col in 0..size {
            if rng.random::<f64>() < DENSITY {
                population.insert(row, col);
            }
        }
    }
    population
}

fn bench_torus(size: usize, population: &Population, iterations: u64) -> (f64, u64) {
    let mut torus = TorusLife::with_population(size, size, population);
    let start = Instant::now();
    torus.step_n(iterations);
    (start.elapsed().as_secs_f64() * 1000.0, torus.population())
}

fn bench_dist(
    size: usize,
    workers: usize,
    population: &Population,
    iterations: u64,
) -> Option<(f64, u64)> {
    // Converging early would make the timings incomparable, so only reduce
    // once at the very end.
    let config = LifeConfig::new(size, size)
        .workers(workers)
        .max_generations(iterations)
        .reduce_rate(iterations.max(1));
    let engine = match DistLife::new(config) {
        Ok(engine) => engine,
        Err(err) => {
            eprintln!("skipping {workers} workers: {err}");
            return None;
        }
    };
    match engine.run(population) {
        Ok(report) => Some((
            report.elapsed.as_secs_f64() * 1000.0,
            report.final_grid.population(),
        )),
        Err(err) => {
            eprintln!("{workers} workers failed: {err}");
            None
        }
    }
}

fn main() {
    let scales: &[(usize, u64)] = &[(256, 200), (512, 200), (1024, 100), (2048, 50)];
    let max_workers = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let worker_counts: Vec<usize> = [1, 2, 4, 8, 16, 32]
        .into_iter()
        .filter(|&n| n <= max_workers)
        .collect();

    println!(
        "{:<10} {:>8} {:>8} {:>12} {:>10} {:>9} {:>8}",
        "Grid", "Workers", "Iters", "Total(ms)", "Avg(ms)", "Speedup", "Pop"
    );
    println!("{}", "-".repeat(72));

    for &(size, iters) in scales {
        let population = seed(size);
        let (torus_ms, torus_pop) = bench_torus(size, &population, iters);
        println!(
            "{:<10} {:>8} {:>8} {:>12.1} {:>10.4} {:>9} {:>8}",
            format!("{size}x{size}"),
            "torus",
            iters,
            torus_ms,
            torus_ms / iters as f64,
            "1.00x",
            torus_pop
        );
        for &workers in &worker_counts {
            let Some((total_ms, pop)) = bench_dist(size, workers, &population, iters) else {
                continue;
            };
            let status = if pop == torus_pop { "" } else { " MISMATCH" };
            println!(
                "{:<10} {:>8} {:>8} {:>12.1} {:>10.4} {:>8.2}x {:>8}{status}",
                format!("{size}x{size}"),
                workers,
                iters,
                total_ms,
                total_ms / iters as f64,
                torus_ms / total_ms,
                pop
            );
        }
    }
}
