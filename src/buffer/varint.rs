// 7-bit encoded integers (.NET `Write7BitEncodedInt` layout).
//
// Base-128, little-endian: least-significant group first.
// Each byte has bit 7 set except the final byte. Used for string lengths,
// reader counts and reader indices.

/// Maximum encoded length for a 32-bit value (ceil(32/7) = 5).
pub const MAX_VARINT_LEN: usize = 5;

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

/// Encode `num` into `buf`, returning the number of bytes written (1..=5).
#[inline]
pub fn encode_u32(mut num: u32, buf: &mut [u8; MAX_VARINT_LEN]) -> usize {
    let mut i = 0;
    loop {
        let group = (num & 0x7F) as u8;
        num >>= 7;
        if num == 0 {
            buf[i] = group;
            return i + 1;
        }
        buf[i] = group | 0x80;
        i += 1;
    }
}

/// Append the encoding of `num` to `out`.
pub fn write_u32(out: &mut Vec<u8>, num: u32) {
    let mut buf = [0u8; MAX_VARINT_LEN];
    let len = encode_u32(num, &mut buf);
    out.extend_from_slice(&buf[..len]);
}

/// Number of bytes `num` occupies once encoded.
#[inline]
pub fn sizeof_u32(num: u32) -> usize {
    let bits = 32 - num.leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

/// Decode a value from the front of `data`.
///
/// Returns `(value, bytes_consumed)`, or `None` when no terminating byte is
/// found within `MAX_VARINT_LEN` bytes (or `data` runs out first). Bits of the
/// fifth group above bit 31 are discarded, as the .NET reader does.
pub fn read_u32(data: &[u8]) -> Option<(u32, usize)> {
    let mut val: u32 = 0;
    for (i, &byte) in data.iter().take(MAX_VARINT_LEN).enumerate() {
        val |= u32::from(byte & 0x7F).wrapping_shl(7 * i as u32);
        if byte & 0x80 == 0 {
            return Some((val, i + 1));
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
