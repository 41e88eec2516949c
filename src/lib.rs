//! xnbkit: reader and writer for XNB content containers.
//!
//! The crate provides:
//! - A byte/bit cursor and writer (`buffer`)
//! - A pure-Rust LZX decompressor (`lzx`)
//! - Container load/convert (`container`) over a table of type readers (`reader`)
//! - A JSON projection with sidecar blob export (`porter`, `json` feature)
//! - File-oriented helpers (`io`, `json` feature)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```no_run
//! use xnbkit::container;
//!
//! let loaded = container::load("Content/Data/Items.xnb").unwrap();
//! println!("root reader: {}", loaded.readers[0].type_name);
//!
//! let bytes = container::convert(&loaded).unwrap();
//! std::fs::write("Items.xnb", bytes).unwrap();
//! ```

pub mod buffer;
pub mod container;
pub mod error;
pub mod lzx;
pub mod reader;

#[cfg(feature = "json")]
pub mod io;
#[cfg(feature = "json")]
pub mod porter;

#[cfg(feature = "cli")]
pub mod cli;

pub use container::{Container, convert, from_bytes, load};
pub use error::{Result, XnbError};
