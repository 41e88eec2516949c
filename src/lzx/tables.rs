// LZX constants and the position-slot tables.
//
// A match offset is coded as a small position slot plus `extra_bits[slot]`
// low bits added to `position_base[slot]`. Both tables are shared by every
// decoder and built once on first use.

pub const MIN_MATCH: usize = 2;
pub const NUM_CHARS: usize = 256;

pub const PRETREE_NUM_ELEMENTS: usize = 20;
pub const ALIGNED_NUM_ELEMENTS: usize = 8;
pub const NUM_PRIMARY_LENGTHS: usize = 7;
pub const NUM_SECONDARY_LENGTHS: usize = 249;

pub const PRETREE_MAXSYMBOLS: usize = PRETREE_NUM_ELEMENTS;
pub const PRETREE_TABLEBITS: u32 = 6;
pub const MAINTREE_MAXSYMBOLS: usize = NUM_CHARS + 50 * 8;
pub const MAINTREE_TABLEBITS: u32 = 12;
pub const LENGTH_MAXSYMBOLS: usize = NUM_SECONDARY_LENGTHS + 1;
pub const LENGTH_TABLEBITS: u32 = 12;
pub const ALIGNED_MAXSYMBOLS: usize = ALIGNED_NUM_ELEMENTS;
pub const ALIGNED_TABLEBITS: u32 = 7;

/// Number of position slots covered by the tables.
pub const POSITION_SLOTS: usize = 51;

/// Smallest and largest supported window sizes, as powers of two.
pub const MIN_WINDOW_BITS: u32 = 15;
pub const MAX_WINDOW_BITS: u32 = 21;

/// Position slots used by a window of `2^window_bits` bytes.
///
/// window bits:     15 16 17 18 19 20 21
/// position slots:  30 32 34 36 38 42 50
pub const fn position_slots(window_bits: u32) -> usize {
    match window_bits {
        21 => 50,
        20 => 42,
        n => (n as usize) << 1,
    }
}

/// Per-slot extra bit counts and offset bases.
#[derive(Debug)]
pub struct PositionTables {
    pub extra_bits: [u8; POSITION_SLOTS],
    pub position_base: [u32; POSITION_SLOTS],
}

fn build_position_tables() -> PositionTables {
    let mut extra_bits = [0u8; POSITION_SLOTS];
    let mut j = 0u8;
    for i in (0..POSITION_SLOTS).step_by(2) {
        extra_bits[i] = j;
        if i + 1 < POSITION_SLOTS {
            extra_bits[i + 1] = j;
        }
        if i != 0 && j < 17 {
            j += 1;
        }
    }

    let mut position_base = [0u32; POSITION_SLOTS];
    let mut base = 0u32;
    for (slot, &extra) in extra_bits.iter().enumerate() {
        position_base[slot] = base;
        base += 1 << extra;
    }

    PositionTables {
        extra_bits,
        position_base,
    }
}

/// Return a reference to the lazily-initialized position tables.
pub fn position_tables() -> &'static PositionTables {
    use std::sync::LazyLock;
    static TABLES: LazyLock<PositionTables> = LazyLock::new(build_position_tables);
    &TABLES
}
