//! Population files, random seeding and text rendering.
//!
//! A population file lists one live cell per line as `row col`, 1-based and
//! whitespace-separated. Blank lines and `#` comments are ignored.

use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use rand::Rng;
use tracing::{info, warn};

use crate::error::Result;
use crate::grid::{LifeGrid, Population};

/// Parse a population for a `rows x cols` grid. Malformed or out-of-range
/// lines are skipped with a warning rather than failing the whole file.
pub fn parse_population<R: BufRead>(reader: R, rows: usize, cols: usize) -> Result<Population> {
    let mut population = Population::new();
    let mut accepted = 0usize;
    for (index, line) in reader.lines().enumerate() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let line_no = index + 1;
        let Some((row, col)) = parse_coordinate(trimmed) else {
            warn!(line = line_no, content = trimmed, "skipping malformed population line");
            continue;
        };
        if row == 0 || col == 0 || row > rows || col > cols {
            warn!(
                line = line_no,
                row,
                col,
                rows,
                cols,
                "skipping population line outside the grid"
            );
            continue;
        }
        population.insert(row - 1, col - 1);
        accepted += 1;
    }
    info!(accepted, live = population.len(), "population read");
    Ok(population)
}

fn parse_coordinate(line: &str) -> Option<(usize, usize)> {
    let mut fields = line.split_whitespace();
    let row = fields.next()?.parse().ok()?;
    let col = fields.next()?.parse().ok()?;
    if fields.next().is_some() {
        return None;
    }
    Some((row, col))
}

pub fn read_population_file(path: impl AsRef<Path>, rows: usize, cols: usize) -> Result<Population> {
    let file = File::open(path.as_ref())?;
    parse_population(BufReader::new(file), rows, cols)
}

/// Write `population` in the file format, 1-based, one cell per line.
pub fn write_population<W: Write>(mut writer: W, population: &Population) -> Result<()> {
    for &(row, col) in population.cells() {
        writeln!(writer, "{} {}", row + 1, col + 1)?;
    }
    writer.flush()?;
    Ok(())
}

/// Pick a live-cell count uniformly in `[0, rows * cols]`, then that many
/// uniformly random cells. Repeated picks collapse, so the result may hold
/// fewer cells than drawn.
pub fn random_population<R: Rng>(rows: usize, cols: usize, rng: &mut R) -> Population {
    if rows == 0 || cols == 0 {
        return Population::new();
    }
    let alive = rng.random_range(0..=rows * cols);
    (0..alive)
        .map(|_| (rng.random_range(0..rows), rng.random_range(0..cols)))
        .collect()
}

/// Render as `|o| |o|` rows, one line per grid row.
pub fn render(grid: &LifeGrid) -> String {
    let mut out = String::with_capacity(grid.rows() * (2 * grid.cols() + 2));
    for row in 0..grid.rows() {
        out.push('|');
        for &cell in grid.row(row) {
            out.push(if cell != 0 { 'o' } else { ' ' });
            out.push('|');
        }
        out.push('\n');
    }
    out
}

/// `render` preceded by a one-line caption.
pub fn render_titled(title: &str, grid: &LifeGrid) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{title} ({} live)", grid.population());
    out.push_str(&render(grid));
    out
}

#[cfg(test)]
mod tests {
    use super::{parse_coordinate, render};
    use crate::grid::{LifeGrid, Population};

    #[test]
    fn coordinates_need_exactly_two_integers() {
        assert_eq!(parse_coordinate("3 4"), Some((3, 4)));
        assert_eq!(parse_coordinate("  3\t4 "), Some((3, 4)));
        assert_eq!(parse_coordinate("3"), None);
        assert_eq!(parse_coordinate("3 4 5"), None);
        assert_eq!(parse_coordinate("-1 4"), None);
        assert_eq!(parse_coordinate("a b"), None);
    }

    #[test]
    fn render_marks_live_cells() {
        let population = Population::from_cells(2, 3, [(0, 1), (1, 0)]).unwrap();
        let grid = LifeGrid::from_population(2, 3, &population);
        assert_eq!(render(&grid), "| |o| |\n|o| | |\n");
    }
}
