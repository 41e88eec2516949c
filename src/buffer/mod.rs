// Byte/bit cursor primitives.
//
// Submodules:
// - `varint` : .NET 7-bit encoded lengths
// - `reader` : `ByteBitBuffer`, the read cursor used by every decoder
// - `writer` : `BufferWriter`, the byte sink used when packing

pub mod reader;
pub mod varint;
pub mod writer;

pub use reader::ByteBitBuffer;
pub use writer::BufferWriter;
