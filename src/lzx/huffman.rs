// Canonical Huffman decode tables for the LZX trees.
//
// A table has `1 << bits` direct-lookup entries followed by `symbols * 2`
// entries of tree nodes for codes longer than `bits`. Direct entries hold a
// symbol, or a node index (>= symbols) whose two children sit at
// `2 * node` and `2 * node + 1`.

use crate::buffer::ByteBitBuffer;
use crate::error::{Result, XnbError};

/// Longest code length LZX can express.
pub const MAX_CODE_LEN: u32 = 16;

/// Extra length slots kept past the last symbol; a run in the length
/// stream may overrun its range by this much.
pub const LENTABLE_SAFETY: usize = 64;

/// Marks a table slot that no code has claimed yet.
const UNUSED: u16 = 0xFFFF;

fn overrun(what: &str) -> XnbError {
    XnbError::CorruptHuffmanTable(what.to_string())
}

/// Build a decode table for `symbols` codes from their bit `lengths`.
///
/// Lengths of 0 are unused symbols. Returns an empty table when every
/// length is 0; any other incomplete or over-subscribed code is
/// `CorruptHuffmanTable`.
pub fn make_decode_table(symbols: usize, bits: u32, lengths: &[u8]) -> Result<Vec<u16>> {
    let len_of = |sym: usize| u32::from(lengths.get(sym).copied().unwrap_or(0));

    let direct = 1usize << bits;
    let mut table = vec![0u16; direct + symbols * 2];

    // Phase 1: codes short enough for the direct table.
    let mut pos = 0usize;
    let mut bit_mask = direct >> 1;
    for bit_num in 1..=bits {
        for sym in 0..symbols {
            if len_of(sym) != bit_num {
                continue;
            }
            let leaf = pos;
            pos += bit_mask;
            if pos > direct {
                return Err(overrun("direct table overrun"));
            }
            table[leaf..pos].fill(sym as u16);
        }
        bit_mask >>= 1;
    }

    if pos == direct {
        return Ok(table);
    }

    if pos == 0 && (0..symbols).all(|sym| len_of(sym) == 0) {
        return Ok(Vec::new());
    }

    // Phase 2: long codes hang off the unfilled direct slots as binary trees.
    table[pos..direct].fill(UNUSED);
    let mut next_node = symbols.max(direct >> 1);

    let mut pos = pos << 16;
    let full = direct << 16;
    let mut bit_mask = 1usize << 15;
    for bit_num in (bits + 1)..=MAX_CODE_LEN {
        for sym in 0..symbols {
            if len_of(sym) != bit_num {
                continue;
            }
            let mut leaf = pos >> 16;
            for fill in 0..(bit_num - bits) {
                let slot = *table.get(leaf).ok_or_else(|| overrun("tree node out of range"))?;
                if slot == UNUSED {
                    let child = next_node << 1;
                    if child + 1 >= table.len() {
                        return Err(overrun("too many tree nodes"));
                    }
                    table[child] = UNUSED;
                    table[child + 1] = UNUSED;
                    table[leaf] = next_node as u16;
                    next_node += 1;
                }
                leaf = usize::from(table[leaf]) << 1;
                if (pos >> (15 - fill)) & 1 == 1 {
                    leaf += 1;
                }
            }
            *table.get_mut(leaf).ok_or_else(|| overrun("tree leaf out of range"))? = sym as u16;

            pos += bit_mask;
            if pos > full {
                return Err(overrun("long code overrun"));
            }
        }
        bit_mask >>= 1;
    }

    if pos == full {
        Ok(table)
    } else {
        Err(overrun("code lengths do not fill the table"))
    }
}

/// One LZX tree: its per-symbol code lengths and the derived decode table.
///
/// The lengths persist across blocks because they are delta-coded against
/// the previous block's values. The table is rebuilt whenever they change.
#[derive(Debug, Clone)]
pub struct HuffmanTree {
    symbols: usize,
    bits: u32,
    lengths: Vec<u8>,
    table: Vec<u16>,
}

impl HuffmanTree {
    pub fn new(symbols: usize, bits: u32) -> Self {
        Self {
            symbols,
            bits,
            lengths: vec![0; symbols + LENTABLE_SAFETY],
            table: Vec::new(),
        }
    }

    pub fn lengths(&self) -> &[u8] {
        &self.lengths
    }

    pub fn lengths_mut(&mut self) -> &mut [u8] {
        &mut self.lengths
    }

    /// True when no symbol has a code.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Rebuild the decode table from the current lengths.
    pub fn rebuild(&mut self) -> Result<()> {
        self.table = make_decode_table(self.symbols, self.bits, &self.lengths)?;
        Ok(())
    }

    /// Decode one symbol and consume exactly its code length in bits.
    pub fn read_symbol(&self, buf: &mut ByteBitBuffer) -> Result<usize> {
        if self.table.is_empty() {
            return Err(XnbError::CorruptHuffmanTable(
                "symbol read from an empty tree".into(),
            ));
        }

        let mut sym = usize::from(self.table[buf.peek_bits(self.bits) as usize]);
        if sym >= self.symbols {
            let window = buf.peek_bits(32);
            let mut probe = 1u32 << (32 - self.bits);
            loop {
                probe >>= 1;
                if probe == 0 {
                    return Err(overrun("code longer than lookahead"));
                }
                let next = (sym << 1) | usize::from(window & probe != 0);
                sym = usize::from(
                    *self
                        .table
                        .get(next)
                        .ok_or_else(|| overrun("walked off the tree"))?,
                );
                if sym < self.symbols {
                    break;
                }
            }
        }

        buf.read_bits(u32::from(self.lengths[sym]))?;
        Ok(sym)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
