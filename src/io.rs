// File-level helpers for unpacking and packing containers.
//
// `unpack_file()` writes the JSON projection and its sidecar blobs next to
// each other; `pack_file()` reads them back and writes a container.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use log::info;

use crate::container;
use crate::error::{Result, XnbError};
use crate::porter::{self, ExportedBlob};

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Statistics returned by `unpack_file()`.
#[derive(Debug, Clone)]
pub struct UnpackStats {
    /// Container file size in bytes.
    pub input_size: u64,
    /// Payload size after decompression, if the container was compressed.
    pub decompressed_size: Option<u64>,
    /// Number of entries in the reader table.
    pub readers: usize,
    /// Sidecar files written next to the JSON document.
    pub exported: Vec<PathBuf>,
}

/// Statistics returned by `pack_file()`.
#[derive(Debug, Clone)]
pub struct PackStats {
    /// Container size in bytes.
    pub output_size: u64,
    /// Number of sidecar files read.
    pub imported: usize,
}

const BUF_SIZE: usize = 64 * 1024; // 64 KiB

// ---------------------------------------------------------------------------
// unpack_file
// ---------------------------------------------------------------------------

/// Decode the container at `input` and write its JSON projection to
/// `output`. Sidecar files take the stem of `output`.
pub fn unpack_file(input: &Path, output: &Path) -> Result<UnpackStats> {
    let data = std::fs::read(input)?;
    let input_size = data.len() as u64;
    let loaded = container::from_bytes(data)?;

    let stem = file_stem(output)?;
    let dir = output.parent().unwrap_or(Path::new(""));
    if !dir.as_os_str().is_empty() {
        std::fs::create_dir_all(dir)?;
    }

    let mut blobs: Vec<ExportedBlob> = Vec::new();
    let doc = porter::to_json(&loaded, &stem, &mut blobs)?;

    let mut exported = Vec::with_capacity(blobs.len());
    for blob in blobs {
        let path = dir.join(&blob.file_name);
        std::fs::write(&path, &blob.data)?;
        exported.push(path);
    }

    let mut w = BufWriter::with_capacity(BUF_SIZE, File::create(output)?);
    serde_json::to_writer_pretty(&mut w, &doc)?;
    w.write_all(b"\n")?;
    w.flush()?;
    info!("output file saved: {}", output.display());

    Ok(UnpackStats {
        input_size,
        decompressed_size: loaded.header.decompressed_size.map(u64::from),
        readers: loaded.readers.len(),
        exported,
    })
}

// ---------------------------------------------------------------------------
// pack_file
// ---------------------------------------------------------------------------

/// Read the JSON projection at `input` (and its sidecar files) and write
/// the container to `output`.
pub fn pack_file(input: &Path, output: &Path) -> Result<PackStats> {
    info!("reading {}", input.display());
    let doc: serde_json::Value =
        serde_json::from_reader(BufReader::with_capacity(BUF_SIZE, File::open(input)?))?;

    let dir = input.parent().unwrap_or(Path::new(""));
    let mut imported = 0usize;
    let rebuilt = porter::from_json(&doc, |name| {
        // Sidecars must sit next to the document.
        if Path::new(name).file_name().map(|f| f != name).unwrap_or(true) {
            return Err(XnbError::InvalidContent(format!(
                "export \"{name}\" is not a plain file name"
            )));
        }
        imported += 1;
        Ok(std::fs::read(dir.join(name))?)
    })?;

    let bytes = container::convert(&rebuilt)?;
    std::fs::write(output, &bytes)?;
    info!("output file saved: {}", output.display());

    Ok(PackStats {
        output_size: bytes.len() as u64,
        imported,
    })
}

fn file_stem(path: &Path) -> Result<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            XnbError::InvalidContent(format!("{} has no usable file name", path.display()))
        })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Container, ContainerHeader, HeaderFlags, Platform, ReaderEntry};
    use crate::reader::{Texture, Value};

    fn write_container(dir: &Path, name: &str, c: &Container) -> PathBuf {
        let path = dir.join(name);
        std::fs::write(&path, container::convert(c).unwrap()).unwrap();
        path
    }

    fn texture_container() -> Container {
        Container {
            header: ContainerHeader {
                platform: Platform::Windows,
                format_version: 5,
                flags: HeaderFlags::empty(),
                file_size: 0,
                decompressed_size: None,
            },
            readers: vec![ReaderEntry::new(
                "Microsoft.Xna.Framework.Content.Texture2DReader, Microsoft.Xna.Framework.Graphics",
                0,
            )],
            content: Value::Texture(Texture {
                format: 0,
                width: 2,
                height: 1,
                levels: vec![vec![0xFF, 0, 0, 0xFF, 0, 0xFF, 0, 0xFF]],
            }),
        }
    }

    #[test]
    fn unpack_then_pack_reproduces_the_container() {
        let dir = tempfile::tempdir().unwrap();
        let original = texture_container();
        let input = write_container(dir.path(), "tile.xnb", &original);

        let json = dir.path().join("out/tile.json");
        let stats = unpack_file(&input, &json).unwrap();
        assert_eq!(stats.readers, 1);
        assert_eq!(stats.exported, vec![dir.path().join("out/tile.bin")]);
        assert_eq!(
            std::fs::read(&stats.exported[0]).unwrap(),
            vec![0xFF, 0, 0, 0xFF, 0, 0xFF, 0, 0xFF]
        );

        let packed = dir.path().join("tile.packed.xnb");
        let pack_stats = pack_file(&json, &packed).unwrap();
        assert_eq!(pack_stats.imported, 1);
        assert_eq!(
            std::fs::read(&packed).unwrap(),
            std::fs::read(&input).unwrap()
        );
    }

    #[test]
    fn sidecar_paths_must_be_plain_names() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("evil.json");
        std::fs::write(
            &json,
            r#"{
                "header": { "target": "w", "formatVersion": 5, "hidef": false, "compressed": false },
                "readers": [{ "type": "Microsoft.Xna.Framework.Content.EffectReader", "version": 0 }],
                "content": { "export": "../secret.cso" }
            }"#,
        )
        .unwrap();
        assert!(matches!(
            pack_file(&json, &dir.path().join("evil.xnb")),
            Err(XnbError::InvalidContent(_))
        ));
    }

    #[test]
    fn missing_input_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            unpack_file(&dir.path().join("nope.xnb"), &dir.path().join("nope.json")),
            Err(XnbError::Io(_))
        ));
    }
}
