// LZX frame decoder.
//
// One `LzxDecoder` is one decompression session: the sliding window, the
// repeated-offset cache and the delta-coded tree lengths all persist across
// calls to `decompress`, which produces one frame per call.

use log::debug;

use super::huffman::HuffmanTree;
use super::tables::{
    ALIGNED_MAXSYMBOLS, ALIGNED_NUM_ELEMENTS, ALIGNED_TABLEBITS, LENGTH_MAXSYMBOLS,
    LENGTH_TABLEBITS, MAINTREE_MAXSYMBOLS, MAINTREE_TABLEBITS, MAX_WINDOW_BITS, MIN_MATCH,
    MIN_WINDOW_BITS, NUM_CHARS, NUM_PRIMARY_LENGTHS, NUM_SECONDARY_LENGTHS,
    PRETREE_MAXSYMBOLS, PRETREE_NUM_ELEMENTS, PRETREE_TABLEBITS, position_slots, position_tables,
};
use crate::buffer::ByteBitBuffer;
use crate::error::{Result, XnbError};

// ---------------------------------------------------------------------------
// Block types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockType {
    Invalid,
    Verbatim,
    Aligned,
    Uncompressed,
}

impl BlockType {
    pub fn from_bits(bits: u32) -> Self {
        match bits {
            1 => Self::Verbatim,
            2 => Self::Aligned,
            3 => Self::Uncompressed,
            _ => Self::Invalid,
        }
    }
}

// ---------------------------------------------------------------------------
// Repeated offsets
// ---------------------------------------------------------------------------

/// The R0/R1/R2 recency list of match offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepeatedOffsets {
    pub r0: u32,
    pub r1: u32,
    pub r2: u32,
}

impl Default for RepeatedOffsets {
    fn default() -> Self {
        Self {
            r0: 1,
            r1: 1,
            r2: 1,
        }
    }
}

impl RepeatedOffsets {
    /// Resolve repeated-offset slot 0, 1 or 2. Slots 1 and 2 swap the chosen
    /// entry into R0; slot 0 leaves the list alone.
    pub fn take(&mut self, slot: usize) -> u32 {
        match slot {
            0 => {}
            1 => std::mem::swap(&mut self.r0, &mut self.r1),
            _ => std::mem::swap(&mut self.r0, &mut self.r2),
        }
        self.r0
    }

    /// Record a freshly coded offset as R0, shifting the others down.
    pub fn push(&mut self, offset: u32) {
        self.r2 = self.r1;
        self.r1 = self.r0;
        self.r0 = offset;
    }

    pub fn as_array(&self) -> [u32; 3] {
        [self.r0, self.r1, self.r2]
    }
}

// ---------------------------------------------------------------------------
// Decoder
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct LzxDecoder {
    window: Vec<u8>,
    window_posn: usize,
    offsets: RepeatedOffsets,
    main_elements: usize,
    header_read: bool,
    block_type: BlockType,
    block_length: usize,
    block_remaining: usize,
    /// Bytes a match wrote past the end of the previous frame.
    carry: usize,
    pretree: HuffmanTree,
    maintree: HuffmanTree,
    lengthtree: HuffmanTree,
    alignedtree: HuffmanTree,
}

impl LzxDecoder {
    /// Create a session with a `2^window_bits` byte window (15..=21).
    pub fn new(window_bits: u32) -> Result<Self> {
        if !(MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&window_bits) {
            return Err(XnbError::UnsupportedFeature(format!(
                "LZX window of 2^{window_bits} bytes"
            )));
        }
        Ok(Self {
            window: vec![0; 1 << window_bits],
            window_posn: 0,
            offsets: RepeatedOffsets::default(),
            main_elements: NUM_CHARS + (position_slots(window_bits) << 3),
            header_read: false,
            block_type: BlockType::Invalid,
            block_length: 0,
            block_remaining: 0,
            carry: 0,
            pretree: HuffmanTree::new(PRETREE_MAXSYMBOLS, PRETREE_TABLEBITS),
            maintree: HuffmanTree::new(MAINTREE_MAXSYMBOLS, MAINTREE_TABLEBITS),
            lengthtree: HuffmanTree::new(LENGTH_MAXSYMBOLS, LENGTH_TABLEBITS),
            alignedtree: HuffmanTree::new(ALIGNED_MAXSYMBOLS, ALIGNED_TABLEBITS),
        })
    }

    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    /// Current `[R0, R1, R2]`.
    pub fn repeated_offsets(&self) -> [u32; 3] {
        self.offsets.as_array()
    }

    pub fn block_type(&self) -> BlockType {
        self.block_type
    }

    /// Decode one frame of `frame_size` bytes from `buf`.
    ///
    /// `block_size` is the number of compressed bytes the caller has framed
    /// for this call; uncompressed data may not be read beyond it. The buffer
    /// is left aligned to a 16-bit boundary.
    pub fn decompress(
        &mut self,
        buf: &mut ByteBitBuffer,
        frame_size: usize,
        block_size: usize,
    ) -> Result<&[u8]> {
        let window_size = self.window.len();
        if frame_size > window_size {
            return Err(XnbError::CorruptStream(format!(
                "frame of {frame_size} bytes exceeds {window_size}-byte window"
            )));
        }
        let chunk_end = buf.byte_position() + block_size;

        if !self.header_read {
            if buf.read_bits(1)? != 0 {
                return Err(XnbError::UnsupportedFeature(
                    "E8 call translation in LZX stream".into(),
                ));
            }
            self.header_read = true;
        }

        let carried = std::mem::take(&mut self.carry);
        if carried > frame_size {
            return Err(XnbError::CorruptStream(format!(
                "match carried {carried} bytes into a {frame_size}-byte frame"
            )));
        }
        let mut togo = frame_size - carried;

        while togo > 0 {
            if self.block_remaining == 0 {
                if buf.byte_position() >= chunk_end {
                    return Err(XnbError::TruncatedStream { remaining: togo });
                }
                self.read_block_header(buf)?;
            }

            while self.block_remaining > 0 && togo > 0 {
                let this_run = self.block_remaining.min(togo);
                togo -= this_run;
                self.block_remaining -= this_run;

                self.window_posn &= window_size - 1;
                if self.window_posn + this_run > window_size {
                    return Err(XnbError::CorruptStream(
                        "run crosses the end of the window".into(),
                    ));
                }

                match self.block_type {
                    BlockType::Verbatim | BlockType::Aligned => {
                        let overshoot = self.decode_run(buf, this_run)?;
                        if overshoot > 0 {
                            if overshoot > self.block_remaining {
                                return Err(XnbError::CorruptStream(
                                    "match runs past the end of its block".into(),
                                ));
                            }
                            self.block_remaining -= overshoot;
                            self.carry = overshoot;
                        }
                    }
                    BlockType::Uncompressed => {
                        if buf.byte_position() + this_run > chunk_end {
                            return Err(XnbError::CorruptStream(format!(
                                "uncompressed run of {this_run} bytes overruns its chunk"
                            )));
                        }
                        let bytes = buf.read_bytes(this_run)?;
                        self.window[self.window_posn..self.window_posn + this_run]
                            .copy_from_slice(bytes);
                        self.window_posn += this_run;
                    }
                    BlockType::Invalid => {
                        return Err(XnbError::CorruptStream("run in an invalid block".into()));
                    }
                }
            }
        }

        buf.align_to_frame();

        let written_to = if self.window_posn == 0 {
            window_size
        } else {
            self.window_posn
        };
        let end = written_to - self.carry;
        let start = end.checked_sub(frame_size).ok_or_else(|| {
            XnbError::CorruptStream("frame starts before the window".into())
        })?;
        Ok(&self.window[start..end])
    }

    fn read_block_header(&mut self, buf: &mut ByteBitBuffer) -> Result<()> {
        // Uncompressed blocks of odd length are followed by one pad byte.
        if self.block_type == BlockType::Uncompressed && self.block_length & 1 == 1 {
            buf.seek(1);
        }

        let kind = buf.read_bits(3)?;
        let hi = buf.read_bits(16)? as usize;
        let lo = buf.read_bits(8)? as usize;
        self.block_type = BlockType::from_bits(kind);
        self.block_length = (hi << 8) | lo;
        self.block_remaining = self.block_length;
        debug!(
            "lzx block: {:?}, {} bytes",
            self.block_type, self.block_length
        );

        match self.block_type {
            BlockType::Aligned => {
                for i in 0..ALIGNED_NUM_ELEMENTS {
                    self.alignedtree.lengths_mut()[i] = buf.read_bits(3)? as u8;
                }
                self.alignedtree.rebuild()?;
                self.read_main_and_length_trees(buf)
            }
            BlockType::Verbatim => self.read_main_and_length_trees(buf),
            BlockType::Uncompressed => {
                buf.align_to_frame();
                self.offsets = RepeatedOffsets {
                    r0: buf.read_u32()?,
                    r1: buf.read_u32()?,
                    r2: buf.read_u32()?,
                };
                Ok(())
            }
            BlockType::Invalid => Err(XnbError::CorruptStream(format!(
                "invalid block type {kind}"
            ))),
        }
    }

    fn read_main_and_length_trees(&mut self, buf: &mut ByteBitBuffer) -> Result<()> {
        let main = self.maintree.lengths_mut();
        read_lengths(&mut self.pretree, buf, main, 0, NUM_CHARS)?;
        let main = self.maintree.lengths_mut();
        read_lengths(&mut self.pretree, buf, main, NUM_CHARS, self.main_elements)?;
        self.maintree.rebuild()?;

        let lengths = self.lengthtree.lengths_mut();
        read_lengths(&mut self.pretree, buf, lengths, 0, NUM_SECONDARY_LENGTHS)?;
        self.lengthtree.rebuild()
    }

    /// Decode literals and matches until `this_run` bytes are produced.
    /// Returns how far the last match overshot the run.
    fn decode_run(&mut self, buf: &mut ByteBitBuffer, this_run: usize) -> Result<usize> {
        let aligned = self.block_type == BlockType::Aligned;
        let mut produced = 0usize;

        while produced < this_run {
            let element = self.maintree.read_symbol(buf)?;
            if element < NUM_CHARS {
                self.window[self.window_posn] = element as u8;
                self.window_posn += 1;
                produced += 1;
                continue;
            }

            let element = element - NUM_CHARS;
            let mut match_length = element & NUM_PRIMARY_LENGTHS;
            if match_length == NUM_PRIMARY_LENGTHS {
                match_length += self.lengthtree.read_symbol(buf)?;
            }
            match_length += MIN_MATCH;

            let slot = element >> 3;
            let offset = if slot > 2 {
                let offset = self.coded_offset(buf, slot, aligned)?;
                self.offsets.push(offset);
                offset
            } else {
                self.offsets.take(slot)
            };

            self.copy_match(offset as usize, match_length)?;
            produced += match_length;
        }

        Ok(produced - this_run)
    }

    fn coded_offset(&self, buf: &mut ByteBitBuffer, slot: usize, aligned: bool) -> Result<u32> {
        let tables = position_tables();
        let extra = u32::from(tables.extra_bits[slot]);
        let base = tables.position_base[slot] - 2;

        if !aligned {
            return Ok(base + buf.read_bits(extra)?);
        }

        Ok(match extra {
            0 => 1,
            1 | 2 => base + buf.read_bits(extra)?,
            3 => base + self.alignedtree.read_symbol(buf)? as u32,
            _ => {
                let verbatim = buf.read_bits(extra - 3)?;
                base + (verbatim << 3) + self.alignedtree.read_symbol(buf)? as u32
            }
        })
    }

    fn copy_match(&mut self, offset: usize, length: usize) -> Result<()> {
        let window_size = self.window.len();
        if offset == 0 || offset > window_size {
            return Err(XnbError::CorruptStream(format!(
                "match offset {offset} outside the window"
            )));
        }
        if self.window_posn + length > window_size {
            return Err(XnbError::CorruptStream(
                "match runs past the end of the window".into(),
            ));
        }

        let dest = self.window_posn;
        if dest >= offset {
            copy_forward(&mut self.window, dest - offset, dest, length);
        } else {
            // Source starts before the wrap: copy the tail of the window first.
            let src = dest + window_size - offset;
            let head = offset - dest;
            if head < length {
                copy_forward(&mut self.window, src, dest, head);
                copy_forward(&mut self.window, 0, dest + head, length - head);
            } else {
                copy_forward(&mut self.window, src, dest, length);
            }
        }
        self.window_posn += length;
        Ok(())
    }
}

/// Byte-at-a-time copy so overlapping matches repeat their source.
fn copy_forward(window: &mut [u8], src: usize, dest: usize, len: usize) {
    for i in 0..len {
        window[dest + i] = window[src + i];
    }
}

/// Read delta-coded lengths for `lengths[first..last]` through a fresh
/// pretree.
fn read_lengths(
    pretree: &mut HuffmanTree,
    buf: &mut ByteBitBuffer,
    lengths: &mut [u8],
    first: usize,
    last: usize,
) -> Result<()> {
    for i in 0..PRETREE_NUM_ELEMENTS {
        pretree.lengths_mut()[i] = buf.read_bits(4)? as u8;
    }
    pretree.rebuild()?;

    let mut i = first;
    while i < last {
        match pretree.read_symbol(buf)? {
            17 => {
                let zeros = buf.read_bits(4)? as usize + 4;
                fill_lengths(lengths, &mut i, zeros, 0)?;
            }
            18 => {
                let zeros = buf.read_bits(5)? as usize + 20;
                fill_lengths(lengths, &mut i, zeros, 0)?;
            }
            19 => {
                let same = buf.read_bits(1)? as usize + 4;
                let symbol = pretree.read_symbol(buf)?;
                let value = delta_length(lengths[i], symbol);
                fill_lengths(lengths, &mut i, same, value)?;
            }
            symbol => {
                lengths[i] = delta_length(lengths[i], symbol);
                i += 1;
            }
        }
    }
    Ok(())
}

/// New length from the previous one and a pretree symbol, modulo 17.
#[inline]
fn delta_length(previous: u8, symbol: usize) -> u8 {
    (i32::from(previous) - symbol as i32).rem_euclid(17) as u8
}

fn fill_lengths(lengths: &mut [u8], i: &mut usize, count: usize, value: u8) -> Result<()> {
    let end = *i + count;
    if end > lengths.len() {
        return Err(XnbError::CorruptStream(
            "length run overflows the table".into(),
        ));
    }
    lengths[*i..end].fill(value);
    *i = end;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
