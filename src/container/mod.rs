// Container format.
//
// Submodules:
// - `header`: prologue: magic, platform, version, flags, sizes
// - `xnb`   : `Container` load/convert, payload decompression

pub mod header;
pub mod xnb;

pub use header::{Compression, ContainerHeader, HeaderFlags, Platform};
pub use xnb::{Container, ReaderEntry, convert, from_bytes, load};
