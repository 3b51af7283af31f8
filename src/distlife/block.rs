//! Per-worker cell storage.
//!
//! A `GridBlock` is one contiguous `(rows + 2) x (cols + 2)` allocation: the
//! owned interior sits at `[1..=rows][1..=cols]` and the outer ring is the
//! halo, holding copies of neighboring blocks' border cells. Halo cells are
//! valid only between a completed halo receive and the next send-start.
//!
//! `BlockPair` keeps the current and next generation side by side and flips
//! a slot index instead of copying.

use super::topology::Direction;

/// A strided run of cells inside a block: a row, a column, or a single cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub offset: usize,
    pub len: usize,
    pub stride: usize,
}

impl Region {
    #[inline]
    pub fn indices(self) -> impl Iterator<Item = usize> {
        (0..self.len).map(move |i| self.offset + i * self.stride)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridBlock {
    rows: usize,
    cols: usize,
    stride: usize,
    cells: Vec<u8>,
}

impl GridBlock {
    pub fn new(rows: usize, cols: usize) -> Self {
        assert!(rows > 0 && cols > 0, "blocks must own at least one cell");
        let stride = cols + 2;
        Self {
            rows,
            cols,
            stride,
            cells: vec![0; (rows + 2) * stride],
        }
    }

    /// Interior rows.
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Interior columns.
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Distance between vertically adjacent cells.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    #[inline]
    pub(crate) fn cells(&self) -> &[u8] {
        &self.cells
    }

    #[inline]
    pub(crate) fn cells_mut(&mut self) -> &mut [u8] {
        &mut self.cells
    }

    /// Index of a cell in padded coordinates (`0` and `rows + 1` are halo).
    #[inline(always)]
    pub fn index(&self, row: usize, col: usize) -> usize {
        row * self.stride + col
    }

    /// Read an interior cell by zero-based local position.
    #[inline]
    pub fn get_local(&self, row: usize, col: usize) -> bool {
        self.cells[self.index(row + 1, col + 1)] != 0
    }

    /// Write an interior cell by zero-based local position.
    #[inline]
    pub fn set_local(&mut self, row: usize, col: usize, alive: bool) {
        let idx = self.index(row + 1, col + 1);
        self.cells[idx] = alive as u8;
    }

    /// Read any cell in padded coordinates, halo included.
    #[inline]
    pub fn get_padded(&self, row: usize, col: usize) -> u8 {
        self.cells[self.index(row, col)]
    }

    /// Interior row `row` (zero-based), without halo columns.
    pub fn interior_row(&self, row: usize) -> &[u8] {
        let start = self.index(row + 1, 1);
        &self.cells[start..start + self.cols]
    }

    pub fn population(&self) -> u64 {
        (0..self.rows)
            .map(|r| self.interior_row(r).iter().map(|&c| c as u64).sum::<u64>())
            .sum()
    }

    /// Border cells of the interior that a neighbor in `dir` needs.
    pub fn border_region(&self, dir: Direction) -> Region {
        let (r, c) = (self.rows, self.cols);
        match dir {
            Direction::North => self.row_region(1),
            Direction::South => self.row_region(r),
            Direction::West => self.col_region(1),
            Direction::East => self.col_region(c),
            Direction::NW => self.cell_region(1, 1),
            Direction::NE => self.cell_region(1, c),
            Direction::SW => self.cell_region(r, 1),
            Direction::SE => self.cell_region(r, c),
        }
    }

    /// Halo cells filled from the neighbor in `dir`.
    pub fn halo_region(&self, dir: Direction) -> Region {
        let (r, c) = (self.rows, self.cols);
        match dir {
            Direction::North => self.row_region(0),
            Direction::South => self.row_region(r + 1),
            Direction::West => self.col_region(0),
            Direction::East => self.col_region(c + 1),
            Direction::NW => self.cell_region(0, 0),
            Direction::NE => self.cell_region(0, c + 1),
            Direction::SW => self.cell_region(r + 1, 0),
            Direction::SE => self.cell_region(r + 1, c + 1),
        }
    }

    #[inline]
    fn row_region(&self, row: usize) -> Region {
        Region {
            offset: self.index(row, 1),
            len: self.cols,
            stride: 1,
        }
    }

    #[inline]
    fn col_region(&self, col: usize) -> Region {
        Region {
            offset: self.index(1, col),
            len: self.rows,
            stride: self.stride,
        }
    }

    #[inline]
    fn cell_region(&self, row: usize, col: usize) -> Region {
        Region {
            offset: self.index(row, col),
            len: 1,
            stride: 1,
        }
    }

    /// Pack a region into `out`, replacing its contents.
    pub fn read_region(&self, region: Region, out: &mut Vec<u8>) {
        out.clear();
        if region.stride == 1 {
            out.extend_from_slice(&self.cells[region.offset..region.offset + region.len]);
        } else {
            out.extend(region.indices().map(|idx| self.cells[idx]));
        }
    }

    /// Unpack `data` into a region. `data` must be exactly `region.len` long.
    pub fn write_region(&mut self, region: Region, data: &[u8]) {
        debug_assert_eq!(data.len(), region.len);
        if region.stride == 1 {
            self.cells[region.offset..region.offset + region.len].copy_from_slice(data);
        } else {
            for (idx, &value) in region.indices().zip(data) {
                self.cells[idx] = value;
            }
        }
    }

    /// Copy one region of this block onto another without a staging buffer.
    pub fn copy_region(&mut self, from: Region, to: Region) {
        debug_assert_eq!(from.len, to.len);
        for (src, dst) in from.indices().zip(to.indices()) {
            self.cells[dst] = self.cells[src];
        }
    }
}

/// Current and next generation of one worker's block.
///
/// `slot()` names the allocation holding the current generation; halo
/// channels are bound per slot, so the slot doubles as the channel
/// buffer index.
#[derive(Clone, Debug)]
pub struct BlockPair {
    blocks: [GridBlock; 2],
    slot: usize,
}

impl BlockPair {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            blocks: [GridBlock::new(rows, cols), GridBlock::new(rows, cols)],
            slot: 0,
        }
    }

    #[inline]
    pub fn slot(&self) -> usize {
        self.slot
    }

    #[inline]
    pub fn current(&self) -> &GridBlock {
        &self.blocks[self.slot]
    }

    #[inline]
    pub fn current_mut(&mut self) -> &mut GridBlock {
        &mut self.blocks[self.slot]
    }

    #[inline]
    pub fn current_and_next_mut(&mut self) -> (&GridBlock, &mut GridBlock) {
        let (a, b) = self.blocks.split_at_mut(1);
        if self.slot == 0 {
            (&a[0], &mut b[0])
        } else {
            (&b[0], &mut a[0])
        }
    }

    #[inline]
    pub fn swap(&mut self) {
        self.slot ^= 1;
    }
}

#[cfg(test)]
mod tests {
    use super::{BlockPair, GridBlock};
    use crate::distlife::topology::Direction;

    fn numbered(rows: usize, cols: usize) -> GridBlock {
        let mut block = GridBlock::new(rows, cols);
        for (i, cell) in block.cells_mut().iter_mut().enumerate() {
            *cell = i as u8;
        }
        block
    }

    #[test]
    fn border_regions_address_the_interior_edge() {
        let block = numbered(3, 4);
        let mut out = Vec::new();

        block.read_region(block.border_region(Direction::North), &mut out);
        assert_eq!(out, vec![7, 8, 9, 10]);
        block.read_region(block.border_region(Direction::South), &mut out);
        assert_eq!(out, vec![19, 20, 21, 22]);
        block.read_region(block.border_region(Direction::West), &mut out);
        assert_eq!(out, vec![7, 13, 19]);
        block.read_region(block.border_region(Direction::East), &mut out);
        assert_eq!(out, vec![10, 16, 22]);
        block.read_region(block.border_region(Direction::SE), &mut out);
        assert_eq!(out, vec![22]);
    }

    #[test]
    fn halo_regions_address_the_outer_ring() {
        let block = numbered(3, 4);
        let mut out = Vec::new();

        block.read_region(block.halo_region(Direction::North), &mut out);
        assert_eq!(out, vec![1, 2, 3, 4]);
        block.read_region(block.halo_region(Direction::East), &mut out);
        assert_eq!(out, vec![11, 17, 23]);
        block.read_region(block.halo_region(Direction::NW), &mut out);
        assert_eq!(out, vec![0]);
        block.read_region(block.halo_region(Direction::SE), &mut out);
        assert_eq!(out, vec![29]);
    }

    #[test]
    fn write_region_touches_only_its_cells() {
        let mut block = GridBlock::new(2, 2);
        let region = block.halo_region(Direction::West);
        block.write_region(region, &[1, 1]);
        assert_eq!(block.population(), 0);
        assert_eq!(block.get_padded(1, 0), 1);
        assert_eq!(block.get_padded(2, 0), 1);
        assert_eq!(block.get_padded(0, 0), 0);
        assert_eq!(block.get_padded(3, 0), 0);
    }

    #[test]
    fn pair_swaps_without_copying() {
        let mut pair = BlockPair::new(2, 2);
        pair.current_mut().set_local(0, 0, true);
        assert_eq!(pair.slot(), 0);
        pair.swap();
        assert_eq!(pair.slot(), 1);
        assert!(!pair.current().get_local(0, 0));
        pair.swap();
        assert!(pair.current().get_local(0, 0));
    }
}
