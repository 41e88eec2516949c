// Byte- and bit-addressed cursor over an owned byte buffer.
//
// Byte reads are plain little/big-endian decodes. Bit reads follow the LZX
// bitstream layout: the stream is a sequence of little-endian 16-bit words
// and bits are taken from the high end of each word, so the overall order is
// MSB-first per word.

use crate::buffer::varint::{self, MAX_VARINT_LEN};
use crate::error::{Result, XnbError};

/// Width of one bitstream frame in bits.
pub const FRAME_BITS: u32 = 16;

/// Owned byte buffer with a byte cursor and a bit cursor inside the current
/// 16-bit frame.
///
/// Invariant: `bit_offset < 16`. Bit overflow moves `byte_offset` by whole
/// 2-byte frames.
#[derive(Debug, Clone, Default)]
pub struct ByteBitBuffer {
    data: Vec<u8>,
    byte_offset: usize,
    bit_offset: u32,
}

macro_rules! fixed_width_reads {
    ($($le:ident, $be:ident => $ty:ty;)*) => {
        $(
            #[inline]
            pub fn $le(&mut self) -> Result<$ty> {
                Ok(<$ty>::from_le_bytes(self.read_array()?))
            }

            #[inline]
            pub fn $be(&mut self) -> Result<$ty> {
                Ok(<$ty>::from_be_bytes(self.read_array()?))
            }
        )*
    };
}

impl ByteBitBuffer {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data,
            byte_offset: 0,
            bit_offset: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn byte_position(&self) -> usize {
        self.byte_offset
    }

    /// Move the byte cursor to an absolute position. The bit cursor is kept.
    pub fn set_byte_position(&mut self, pos: usize) {
        self.byte_offset = pos;
    }

    /// Bytes between the byte cursor and the end of the buffer.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.byte_offset)
    }

    /// Move the byte cursor by `delta`, clamping at 0. Returns the new position.
    pub fn seek(&mut self, delta: i64) -> usize {
        let target = self.byte_offset as i64 + delta;
        self.byte_offset = usize::try_from(target).unwrap_or(0);
        self.byte_offset
    }

    /// Drop everything from `at` onwards and append `tail`.
    ///
    /// Used to splice decompressed content in place of the compressed payload.
    pub fn replace_tail(&mut self, at: usize, tail: &[u8]) {
        self.data.truncate(at);
        self.data.extend_from_slice(tail);
    }

    // -----------------------------------------------------------------------
    // Byte reads
    // -----------------------------------------------------------------------

    /// Borrow the next `n` bytes without moving the cursor.
    pub fn peek_bytes(&self, n: usize) -> Result<&[u8]> {
        let end = self
            .byte_offset
            .checked_add(n)
            .filter(|&end| end <= self.data.len())
            .ok_or(XnbError::OutOfBounds {
                offset: self.byte_offset,
                requested: n,
                len: self.data.len(),
            })?;
        Ok(&self.data[self.byte_offset..end])
    }

    /// Borrow the next `n` bytes and advance past them.
    pub fn read_bytes(&mut self, n: usize) -> Result<&[u8]> {
        let start = self.byte_offset;
        self.peek_bytes(n)?;
        self.byte_offset += n;
        Ok(&self.data[start..start + n])
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_array::<1>()?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    fixed_width_reads! {
        read_u16, read_u16_be => u16;
        read_i16, read_i16_be => i16;
        read_u32, read_u32_be => u32;
        read_i32, read_i32_be => i32;
        read_f32, read_f32_be => f32;
        read_f64, read_f64_be => f64;
    }

    /// 16-bit value stored high byte first, as used by the compressed-chunk
    /// size fields.
    pub fn read_lzx_u16(&mut self) -> Result<u16> {
        self.read_u16_be()
    }

    /// Read a .NET 7-bit encoded length.
    pub fn read_7bit_encoded_length(&mut self) -> Result<u32> {
        let start = self.byte_offset;
        let tail = self.data.get(start..).unwrap_or(&[]);
        match varint::read_u32(tail) {
            Some((value, consumed)) => {
                self.byte_offset += consumed;
                Ok(value)
            }
            None if tail.len() < MAX_VARINT_LEN => Err(XnbError::OutOfBounds {
                offset: start,
                requested: tail.len() + 1,
                len: self.data.len(),
            }),
            None => Err(XnbError::MalformedVarint { offset: start }),
        }
    }

    /// Read a 7-bit length followed by that many UTF-8 bytes.
    pub fn read_length_prefixed_string(&mut self) -> Result<String> {
        let len = self.read_7bit_encoded_length()? as usize;
        let bytes = self.read_bytes(len)?;
        String::from_utf8(bytes.to_vec())
            .map_err(|e| XnbError::InvalidContent(format!("string is not UTF-8: {e}")))
    }

    // -----------------------------------------------------------------------
    // Bit reads
    // -----------------------------------------------------------------------

    pub fn bit_position(&self) -> u32 {
        self.bit_offset
    }

    /// Set the bit cursor relative to the current 16-bit frame.
    ///
    /// Values outside `0..16` (including negative ones) move the byte cursor
    /// by whole frames: `offset = 16 * k + r` seeks `2 * k` bytes and leaves
    /// the bit cursor at `r`. The byte cursor clamps at 0.
    pub fn set_bit_position(&mut self, offset: i32) {
        let frames = offset.div_euclid(FRAME_BITS as i32);
        self.bit_offset = offset.rem_euclid(FRAME_BITS as i32) as u32;
        self.seek(i64::from(frames) * 2);
    }

    /// Advance to the next 16-bit boundary unless already on one.
    pub fn align_to_frame(&mut self) {
        if self.bit_offset != 0 {
            self.bit_offset = 0;
            self.byte_offset += 2;
        }
    }

    /// Little-endian word at `at`; bytes past the end read as zero.
    #[inline]
    fn word_at(&self, at: usize) -> u32 {
        let lo = self.data.get(at).copied().unwrap_or(0);
        let hi = self.data.get(at + 1).copied().unwrap_or(0);
        u32::from(u16::from_le_bytes([lo, hi]))
    }

    /// Collect `n` bits starting at the given cursor. Returns the bits and the
    /// cursor after them.
    fn gather_bits(&self, n: u32, mut byte: usize, mut bit: u32) -> (u32, usize, u32) {
        let mut left = n;
        let mut out = 0u32;
        while left > 0 {
            let take = left.min(FRAME_BITS - bit);
            let shift = FRAME_BITS - bit - take;
            let value = (self.word_at(byte) >> shift) & ((1u32 << take) - 1);
            left -= take;
            out |= value << left;
            bit += take;
            if bit == FRAME_BITS {
                bit = 0;
                byte += 2;
            }
        }
        (out, byte, bit)
    }

    /// Look at the next `n` (0..=32) bits without consuming them.
    ///
    /// Bits beyond the end of the buffer read as zero, so lookahead near the
    /// end of a stream is always possible.
    #[inline]
    pub fn peek_bits(&self, n: u32) -> u32 {
        debug_assert!(n <= 32);
        self.gather_bits(n, self.byte_offset, self.bit_offset).0
    }

    /// Consume `n` (0..=32) bits, MSB-first across 16-bit frames.
    pub fn read_bits(&mut self, n: u32) -> Result<u32> {
        debug_assert!(n <= 32);
        let (value, byte, bit) = self.gather_bits(n, self.byte_offset, self.bit_offset);
        let end = if bit == 0 { byte } else { byte + 2 };
        if n > 0 && end > self.data.len() {
            return Err(XnbError::OutOfBounds {
                offset: self.byte_offset,
                requested: end - self.byte_offset,
                len: self.data.len(),
            });
        }
        self.byte_offset = byte;
        self.bit_offset = bit;
        Ok(value)
    }
}

impl From<Vec<u8>> for ByteBitBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
