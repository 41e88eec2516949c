// LZX decompression.
//
// Submodules:
// - `tables`  : constants and the shared position-slot tables
// - `huffman` : decode-table construction and symbol lookup
// - `decoder` : `LzxDecoder`, the per-session frame decoder
// - `framer`  : chunk framing of a compressed container payload

pub mod decoder;
pub mod framer;
pub mod huffman;
pub mod tables;

pub use decoder::{BlockType, LzxDecoder, RepeatedOffsets};
pub use framer::decompress;
pub use huffman::{HuffmanTree, make_decode_table};
