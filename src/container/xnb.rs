// Whole-container load and convert.
//
// Load: prologue -> (decompress payload in place) -> reader table ->
// shared resource count -> root object.
// Convert: the reverse, with sizes patched in at the end.

use std::path::Path;

use log::{debug, info};

use super::header::{
    COMPRESSED_PROLOGUE_SIZE, Compression, ContainerHeader, DECOMPRESSED_SIZE_OFFSET,
    FILE_SIZE_OFFSET, HeaderFlags,
};
use crate::buffer::{BufferWriter, ByteBitBuffer};
use crate::error::{Result, XnbError};
use crate::lzx;
use crate::reader::{ReaderResolver, TypeReader, Value};

/// One entry of the reader table as stored in the file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReaderEntry {
    /// Full type name of the reader.
    pub type_name: String,
    pub version: i32,
}

impl ReaderEntry {
    pub fn new(type_name: impl Into<String>, version: i32) -> Self {
        Self {
            type_name: type_name.into(),
            version,
        }
    }

    pub fn reader(&self) -> Result<TypeReader> {
        TypeReader::from_type_name(&self.type_name)
    }
}

/// A decoded container: header fields, reader table and root object.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub header: ContainerHeader,
    pub readers: Vec<ReaderEntry>,
    pub content: Value,
}

impl Container {
    /// Build the resolver for this container's reader table.
    pub fn resolver(&self) -> Result<ReaderResolver> {
        let readers = self
            .readers
            .iter()
            .map(ReaderEntry::reader)
            .collect::<Result<Vec<_>>>()?;
        Ok(ReaderResolver::new(readers))
    }

    /// Reader of the root object.
    pub fn root_reader(&self) -> Result<TypeReader> {
        self.readers
            .first()
            .ok_or_else(|| XnbError::InvalidContent("empty reader table".into()))?
            .reader()
    }
}

/// Read and decode a container file.
pub fn load(path: impl AsRef<Path>) -> Result<Container> {
    let path = path.as_ref();
    info!("reading {}", path.display());
    from_bytes(std::fs::read(path)?)
}

/// Decode a container held in memory.
pub fn from_bytes(data: Vec<u8>) -> Result<Container> {
    let mut buf = ByteBitBuffer::new(data);
    let header = ContainerHeader::decode(&mut buf)?;

    let decompressed = match (header.compression(), header.decompressed_size) {
        (Compression::Lzx, Some(size)) => {
            let compressed_todo =
                (header.file_size as usize).saturating_sub(COMPRESSED_PROLOGUE_SIZE);
            Some(lzx::decompress(&mut buf, compressed_todo, size as usize)?)
        }
        (Compression::Lz4, Some(size)) => {
            let payload = buf.as_slice().get(COMPRESSED_PROLOGUE_SIZE..).unwrap_or_default();
            Some(lz4_decompress(payload, size as usize)?)
        }
        _ => None,
    };
    if let Some(content) = decompressed {
        buf.replace_tail(COMPRESSED_PROLOGUE_SIZE, &content);
        buf.set_byte_position(COMPRESSED_PROLOGUE_SIZE);
    }
    debug!("reading content from byte {}", buf.byte_position());

    let count = buf.read_7bit_encoded_length()? as usize;
    debug!("readers: {count}");
    let mut entries = Vec::with_capacity(count.min(buf.remaining()));
    let mut readers = Vec::with_capacity(entries.capacity());
    for _ in 0..count {
        let type_name = buf.read_length_prefixed_string()?;
        let version = buf.read_i32()?;
        let reader = TypeReader::from_type_name(&type_name)?;
        debug!("reader {type_name} -> {reader}");
        readers.push(reader);
        entries.push(ReaderEntry { type_name, version });
    }

    let shared = buf.read_7bit_encoded_length()?;
    debug!("shared resources: {shared}");
    if shared != 0 {
        return Err(XnbError::UnsupportedFeature(format!(
            "{shared} shared resource(s)"
        )));
    }

    let resolver = ReaderResolver::new(readers);
    let content = resolver.read_root(&mut buf)?;
    info!("container read");

    Ok(Container {
        header,
        readers: entries,
        content,
    })
}

/// Serialize a container.
///
/// Android and iOS containers are LZ4 compressed when the `lz4` feature is
/// enabled; everything else, LZX sources included, is written uncompressed.
pub fn convert(container: &Container) -> Result<Vec<u8>> {
    let resolver = container.resolver()?;
    let lz4 = cfg!(feature = "lz4") && container.header.platform.is_mobile();

    let mut flags = container.header.flags & HeaderFlags::HIDEF;
    if lz4 {
        flags |= HeaderFlags::LZ4;
    }
    let header = ContainerHeader {
        flags,
        file_size: 0,
        decompressed_size: lz4.then_some(0),
        ..container.header.clone()
    };

    let mut w = BufferWriter::new();
    header.encode(&mut w);
    let content_start = w.len();

    w.write_7bit_encoded_length(container.readers.len() as u32);
    for entry in &container.readers {
        w.write_length_prefixed_string(&entry.type_name);
        w.write_i32(entry.version);
    }
    w.write_7bit_encoded_length(0);
    resolver.write_root(&mut w, &container.content)?;

    if lz4 {
        let compressed = lz4_compress(&w.as_slice()[content_start..])?;
        let decompressed_len = w.len() - content_start;
        w.truncate(content_start);
        w.write_bytes(&compressed);
        w.patch_u32(DECOMPRESSED_SIZE_OFFSET, decompressed_len as u32);
        debug!("lz4: {decompressed_len} -> {} bytes", compressed.len());
    }

    w.patch_u32(FILE_SIZE_OFFSET, w.len() as u32);
    Ok(w.into_inner())
}

// ---------------------------------------------------------------------------
// LZ4
// ---------------------------------------------------------------------------

/// Upper bound of the LZ4 block expansion ratio.
#[cfg(feature = "lz4")]
const LZ4_MAX_RATIO: usize = 255;

#[cfg(feature = "lz4")]
fn lz4_decompress(payload: &[u8], size: usize) -> Result<Vec<u8>> {
    if size > payload.len().saturating_mul(LZ4_MAX_RATIO) + 16 {
        return Err(XnbError::Lz4(format!(
            "{} byte block cannot expand to {size} bytes",
            payload.len()
        )));
    }
    let out = lz4_flex::block::decompress(payload, size)
        .map_err(|e| XnbError::Lz4(e.to_string()))?;
    if out.len() != size {
        return Err(XnbError::Lz4(format!(
            "decompressed {} bytes, header declares {size}",
            out.len()
        )));
    }
    Ok(out)
}

#[cfg(not(feature = "lz4"))]
fn lz4_decompress(_payload: &[u8], _size: usize) -> Result<Vec<u8>> {
    Err(XnbError::UnsupportedFeature(
        "LZ4 compressed container (built without the `lz4` feature)".into(),
    ))
}

#[cfg(feature = "lz4")]
fn lz4_compress(content: &[u8]) -> Result<Vec<u8>> {
    Ok(lz4_flex::block::compress(content))
}

#[cfg(not(feature = "lz4"))]
fn lz4_compress(_content: &[u8]) -> Result<Vec<u8>> {
    Err(XnbError::UnsupportedFeature("LZ4 compression".into()))
}
