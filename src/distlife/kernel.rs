//! Rule application over a padded block.
//!
//! The block is split into two disjoint cell sets:
//! - the inner cells, at least one cell away from the block edge, whose
//!   neighborhoods lie entirely inside the owned interior;
//! - the outer ring of the interior, whose neighborhoods reach into the halo.
//!
//! Inner cells can be computed while halos are in flight; the ring must wait.
//! Both functions write into `next` and return whether any cell changed.

use crate::rules::B3S23;

use super::block::GridBlock;

#[inline(always)]
fn advance_cell(current: &[u8], next: &mut [u8], idx: usize, stride: usize) -> bool {
    let above = idx - stride;
    let below = idx + stride;
    let neighbors = current[above - 1]
        + current[above]
        + current[above + 1]
        + current[idx - 1]
        + current[idx + 1]
        + current[below - 1]
        + current[below]
        + current[below + 1];
    let cell = current[idx];
    let out = B3S23.lookup(cell, neighbors);
    next[idx] = out;
    out != cell
}

/// Advance every cell that does not touch the halo.
pub fn advance_inner(current: &GridBlock, next: &mut GridBlock) -> bool {
    let (rows, cols, stride) = (current.rows(), current.cols(), current.stride());
    if rows < 3 || cols < 3 {
        return false;
    }
    let src = current.cells();
    let dst = next.cells_mut();
    let mut changed = false;
    for row in 2..rows {
        let base = row * stride;
        for col in 2..cols {
            changed |= advance_cell(src, dst, base + col, stride);
        }
    }
    changed
}

/// Advance the outer ring of the interior. Every ring cell is visited once,
/// including single-row and single-column blocks.
pub fn advance_ring(current: &GridBlock, next: &mut GridBlock) -> bool {
    let (rows, cols, stride) = (current.rows(), current.cols(), current.stride());
    let src = current.cells();
    let dst = next.cells_mut();
    let mut changed = false;

    for col in 1..=cols {
        changed |= advance_cell(src, dst, stride + col, stride);
    }
    if rows > 1 {
        let base = rows * stride;
        for col in 1..=cols {
            changed |= advance_cell(src, dst, base + col, stride);
        }
    }
    for row in 2..rows {
        let base = row * stride;
        changed |= advance_cell(src, dst, base + 1, stride);
        if cols > 1 {
            changed |= advance_cell(src, dst, base + cols, stride);
        }
    }
    changed
}

#[cfg(test)]
mod tests {
    use super::{advance_inner, advance_ring};
    use crate::distlife::block::GridBlock;

    /// Count how many times each interior cell is written by the two passes.
    fn coverage(rows: usize, cols: usize) -> Vec<u32> {
        let current = GridBlock::new(rows, cols);
        let mut counts = vec![0u32; rows * cols];
        for pass in 0..2 {
            let mut next = GridBlock::new(rows, cols);
            for cell in next.cells_mut().iter_mut() {
                *cell = 7;
            }
            if pass == 0 {
                advance_inner(&current, &mut next);
            } else {
                advance_ring(&current, &mut next);
            }
            for r in 0..rows {
                for c in 0..cols {
                    if next.get_padded(r + 1, c + 1) != 7 {
                        counts[r * cols + c] += 1;
                    }
                }
            }
            // The halo ring is never written.
            for c in 0..cols + 2 {
                assert_eq!(next.get_padded(0, c), 7);
                assert_eq!(next.get_padded(rows + 1, c), 7);
            }
        }
        counts
    }

    #[test]
    fn inner_and_ring_partition_the_interior() {
        for (rows, cols) in [(1, 1), (1, 5), (5, 1), (2, 2), (3, 3), (4, 7), (9, 6)] {
            let counts = coverage(rows, cols);
            assert!(
                counts.iter().all(|&n| n == 1),
                "{rows}x{cols} block: {counts:?}"
            );
        }
    }

    #[test]
    fn blinker_inside_a_block_flips() {
        let mut current = GridBlock::new(5, 5);
        for col in 1..4 {
            current.set_local(2, col, true);
        }
        let mut next = GridBlock::new(5, 5);
        let inner = advance_inner(&current, &mut next);
        let ring = advance_ring(&current, &mut next);
        assert!(inner || ring);
        for row in 1..4 {
            assert!(next.get_local(row, 2));
        }
        assert!(!next.get_local(2, 1));
        assert!(!next.get_local(2, 3));
        assert_eq!(next.population(), 3);
    }
}
