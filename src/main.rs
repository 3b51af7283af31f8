#[cfg(feature = "mimalloc-global")]
#[global_allocator]
static GLOBAL_ALLOCATOR: mimalloc::MiMalloc = mimalloc::MiMalloc;

use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::process::ExitCode;

use halo_life::distlife::{DistLife, LifeConfig, Termination};
use halo_life::error::{LifeError, Result};
use halo_life::grid::Population;
use halo_life::io::{random_population, read_population_file, render_titled, write_population};
use rand::SeedableRng;
use rand::rngs::StdRng;
use tracing::error;
use tracing_subscriber::EnvFilter;

const DEFAULT_SIDE: usize = 64;
const DEFAULT_SEED: u64 = 0x5EED_1234_ABCD_EF01;
const USAGE: &str = "usage: halo-life [--rows N] [--cols N] [--workers N] [--generations N] \
     [--reduce-rate N] [--snapshot-every N] [--input FILE | --random] [--seed N] \
     [--write-population FILE] [--quiet]";

struct MainArgs {
    config: LifeConfig,
    input: Option<PathBuf>,
    seed: u64,
    write_population: Option<PathBuf>,
    quiet: bool,
}

fn parse_args() -> Result<MainArgs> {
    let args: Vec<String> = std::env::args().collect();
    let mut rows = DEFAULT_SIDE;
    let mut cols = DEFAULT_SIDE;
    let mut workers = None;
    let mut generations = None;
    let mut reduce_rate = None;
    let mut snapshot_every = None;
    let mut input = None;
    let mut seed = DEFAULT_SEED;
    let mut write_population = None;
    let mut quiet = false;

    let value = |i: usize, flag: &'static str| -> Result<&str> {
        args.get(i)
            .map(String::as_str)
            .ok_or_else(|| LifeError::Config {
                parameter: flag,
                reason: "requires a value".to_owned(),
            })
    };
    let number = |i: usize, flag: &'static str| -> Result<u64> {
        value(i, flag)?.parse().map_err(|_| LifeError::Config {
            parameter: flag,
            reason: "requires a non-negative integer".to_owned(),
        })
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--rows" => {
                i += 1;
                rows = number(i, "--rows")? as usize;
            }
            "--cols" => {
                i += 1;
                cols = number(i, "--cols")? as usize;
            }
            "--workers" => {
                i += 1;
                workers = Some(number(i, "--workers")? as usize);
            }
            "--generations" => {
                i += 1;
                generations = Some(number(i, "--generations")?);
            }
            "--reduce-rate" => {
                i += 1;
                reduce_rate = Some(number(i, "--reduce-rate")?);
            }
            "--snapshot-every" => {
                i += 1;
                snapshot_every = Some(number(i, "--snapshot-every")?);
            }
            "--input" => {
                i += 1;
                input = Some(PathBuf::from(value(i, "--input")?));
            }
            "--random" => input = None,
            "--seed" => {
                i += 1;
                seed = number(i, "--seed")?;
            }
            "--write-population" => {
                i += 1;
                write_population = Some(PathBuf::from(value(i, "--write-population")?));
            }
            "--quiet" => quiet = true,
            "--help" | "-h" => {
                println!("{USAGE}");
                std::process::exit(0);
            }
            other => {
                return Err(LifeError::Config {
                    parameter: "arguments",
                    reason: format!("unknown argument {other}\n{USAGE}"),
                });
            }
        }
        i += 1;
    }

    let mut config = LifeConfig::new(rows, cols);
    if let Some(n) = workers {
        config = config.workers(n);
    }
    if let Some(n) = generations {
        config = config.max_generations(n);
    }
    if let Some(n) = reduce_rate {
        config = config.reduce_rate(n);
    }
    if let Some(n) = snapshot_every {
        config = config.snapshot_interval(n);
    }
    Ok(MainArgs {
        config,
        input,
        seed,
        write_population,
        quiet,
    })
}

fn load_population(args: &MainArgs) -> Result<Population> {
    let (rows, cols) = (args.config.rows, args.config.cols);
    let population = match &args.input {
        Some(path) => read_population_file(path, rows, cols)?,
        None => {
            let mut rng = StdRng::seed_from_u64(args.seed);
            random_population(rows, cols, &mut rng)
        }
    };
    if let Some(path) = &args.write_population {
        write_population(BufWriter::new(File::create(path)?), &population)?;
    }
    Ok(population)
}

fn run(args: MainArgs) -> Result<()> {
    let engine = DistLife::new(args.config.clone())?;
    let population = load_population(&args)?;
    let report = engine.run(&population)?;

    if !args.quiet {
        print!("{}", render_titled("Initial", &report.initial));
        for (generation, grid) in &report.snapshots {
            print!("{}", render_titled(&format!("Generation {generation}"), grid));
        }
        print!("{}", render_titled("Final", &report.final_grid));
    }

    let partition = &report.partition;
    match report.termination {
        Termination::Converged { generation } => {
            println!("Converged after {generation} generations");
        }
        Termination::MaxGenerations => {
            println!("Stopped after {} generations without converging", report.generations);
        }
    }
    let total_ms = report.elapsed.as_secs_f64() * 1000.0;
    let avg_ms = if report.generations > 0 {
        total_ms / report.generations as f64
    } else {
        0.0
    };
    println!(
        "{}x{} grid on {} workers ({}x{} blocks of {}x{}): {total_ms:.3} ms total, {avg_ms:.6} ms/gen, {} live",
        partition.grid_rows(),
        partition.grid_cols(),
        partition.worker_count(),
        partition.line_div(),
        partition.col_div(),
        partition.rows_per_block(),
        partition.cols_per_block(),
        report.final_grid.population()
    );
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match parse_args().and_then(run) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!(%err, "run failed");
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}
