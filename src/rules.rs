//! Rule table for B3/S23.
//!
//! Indexed by `(alive << 4) | live_neighbors`, so a lookup is a single load
//! with no branches on the hot path.

pub struct RuleTable {
    table: [u8; 32],
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RuleTable {
    pub const fn new() -> Self {
        let mut table = [0u8; 32];
        let mut neighbors = 0u8;
        while neighbors <= 8 {
            table[neighbors as usize] = next_state(0, neighbors);
            table[16 | neighbors as usize] = next_state(1, neighbors);
            neighbors += 1;
        }
        Self { table }
    }

    /// Next state of a cell (`0` or `1`) given its current state and live neighbor count.
    #[inline(always)]
    pub fn lookup(&self, cell: u8, neighbors: u8) -> u8 {
        self.table[(((cell & 1) << 4) | (neighbors & 15)) as usize]
    }
}

/// Shared instance; the table is built at compile time.
pub static B3S23: RuleTable = RuleTable::new();

const fn next_state(cell: u8, neighbors: u8) -> u8 {
    let alive = if cell == 1 {
        neighbors == 2 || neighbors == 3
    } else {
        neighbors == 3
    };
    alive as u8
}
