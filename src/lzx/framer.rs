// Top-level chunk framing of an LZX-compressed container payload.
//
// The payload is a sequence of chunks, each carrying one output frame:
//
//   [0xFF][frame hi][frame lo][block hi][block lo][block_size bytes]
//   [block hi][block lo][block_size bytes]              (frame = 0x8000)
//
// Size fields are 16-bit with the high byte first.

use log::{debug, info};

use super::decoder::LzxDecoder;
use crate::buffer::ByteBitBuffer;
use crate::error::{Result, XnbError};

/// Window size used by every compressed container.
pub const WINDOW_BITS: u32 = 16;

/// Output frame size when a chunk does not declare one.
pub const DEFAULT_FRAME_SIZE: usize = 0x8000;

/// Largest frame or block size a chunk may declare.
pub const MAX_CHUNK_SIZE: usize = 0x10000;

/// Output capacity reserved up front; the declared size is untrusted.
const MAX_PREALLOC: usize = 1 << 24;

/// Control byte announcing an explicit frame size.
const EXPLICIT_FRAME: u8 = 0xFF;

/// Decompress `compressed_todo` payload bytes starting at the buffer's byte
/// cursor, expecting exactly `decompressed_todo` bytes of output.
///
/// One `LzxDecoder` spans all chunks, so window and tree state carry over.
pub fn decompress(
    buf: &mut ByteBitBuffer,
    compressed_todo: usize,
    decompressed_todo: usize,
) -> Result<Vec<u8>> {
    let mut lzx = LzxDecoder::new(WINDOW_BITS)?;
    let mut out = Vec::with_capacity(decompressed_todo.min(MAX_PREALLOC));
    let mut pos = 0usize;

    while pos < compressed_todo {
        let (frame_size, block_size) = if buf.read_u8()? == EXPLICIT_FRAME {
            let frame = usize::from(buf.read_lzx_u16()?);
            let block = usize::from(buf.read_lzx_u16()?);
            pos += 5;
            (frame, block)
        } else {
            buf.seek(-1);
            let block = usize::from(buf.read_lzx_u16()?);
            pos += 2;
            (DEFAULT_FRAME_SIZE, block)
        };

        if block_size == 0 || frame_size == 0 {
            break;
        }
        if block_size > MAX_CHUNK_SIZE || frame_size > MAX_CHUNK_SIZE {
            return Err(XnbError::CorruptStream(format!(
                "chunk declares frame {frame_size} / block {block_size}"
            )));
        }
        debug!("lzx chunk: frame {frame_size}, block {block_size}");

        let chunk_start = buf.byte_position();
        out.extend_from_slice(lzx.decompress(buf, frame_size, block_size)?);
        buf.set_byte_position(chunk_start + block_size);
        pos += block_size;
    }

    if out.len() != decompressed_todo {
        return Err(XnbError::CorruptStream(format!(
            "decompressed {} bytes, header declares {decompressed_todo}",
            out.len()
        )));
    }
    info!("decompressed {compressed_todo} bytes into {decompressed_todo}");
    Ok(out)
}
