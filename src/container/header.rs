// Container prologue encoding/decoding.
//
// Layout (all little-endian):
//
//   "XNB" | platform u8 | version u8 | flags u8 | file size u32
//   [decompressed size u32]                          (compressed only)

use bitflags::bitflags;
use log::{debug, info, warn};

use crate::buffer::{BufferWriter, ByteBitBuffer};
use crate::error::{Result, XnbError};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

pub const MAGIC: [u8; 3] = *b"XNB";

/// Bytes before the compressed payload: magic, platform, version, flags and
/// both size fields.
pub const COMPRESSED_PROLOGUE_SIZE: usize = 14;

/// Offset of the file size field.
pub const FILE_SIZE_OFFSET: usize = 6;

/// Offset of the decompressed size field in compressed containers.
pub const DECOMPRESSED_SIZE_OFFSET: usize = 10;

bitflags! {
    /// Flag byte of the prologue.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct HeaderFlags: u8 {
        const HIDEF = 0x01;
        const LZ4 = 0x40;
        const LZX = 0x80;
    }
}

/// Payload compression selected by the flag byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Lz4,
    Lzx,
}

// ---------------------------------------------------------------------------
// Platform
// ---------------------------------------------------------------------------

/// Target platform byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Windows,
    WindowsPhone,
    Xbox360,
    Android,
    Ios,
    /// Unrecognized code, kept so the container can be written back.
    Unknown(u8),
}

impl Platform {
    pub fn from_code(code: u8) -> Self {
        match code.to_ascii_lowercase() {
            b'w' => Self::Windows,
            b'm' => Self::WindowsPhone,
            b'x' => Self::Xbox360,
            b'a' => Self::Android,
            b'i' => Self::Ios,
            _ => Self::Unknown(code),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Self::Windows => b'w',
            Self::WindowsPhone => b'm',
            Self::Xbox360 => b'x',
            Self::Android => b'a',
            Self::Ios => b'i',
            Self::Unknown(c) => c,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Windows => "Microsoft Windows",
            Self::WindowsPhone => "Windows Phone 7",
            Self::Xbox360 => "Xbox 360",
            Self::Android => "Android",
            Self::Ios => "iOS",
            Self::Unknown(_) => "unknown",
        }
    }

    /// Platforms whose containers are packed with LZ4.
    pub fn is_mobile(self) -> bool {
        matches!(self, Self::Android | Self::Ios)
    }
}

fn version_name(version: u8) -> Option<&'static str> {
    match version {
        3 => Some("XNA Game Studio 3.0"),
        4 => Some("XNA Game Studio 3.1"),
        5 => Some("XNA Game Studio 4.0"),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Header
// ---------------------------------------------------------------------------

/// Parsed container prologue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub platform: Platform,
    pub format_version: u8,
    pub flags: HeaderFlags,
    /// Total file size as declared.
    pub file_size: u32,
    /// Present only when the payload is compressed.
    pub decompressed_size: Option<u32>,
}

impl ContainerHeader {
    /// Decode the prologue at the start of `buf`.
    ///
    /// The declared file size must equal the buffer length.
    pub fn decode(buf: &mut ByteBitBuffer) -> Result<Self> {
        let mut magic = [0u8; 3];
        let n = buf.remaining().min(3);
        magic[..n].copy_from_slice(buf.read_bytes(n)?);
        if n < 3 || magic != MAGIC {
            return Err(XnbError::InvalidMagic(magic));
        }
        debug!("valid magic found");

        let platform = Platform::from_code(buf.read_u8()?);
        match platform {
            Platform::Unknown(c) => warn!("unknown target platform {:?}", char::from(c)),
            p => debug!("target platform: {}", p.name()),
        }

        let format_version = buf.read_u8()?;
        match version_name(format_version) {
            Some(name) => debug!("format version: {name}"),
            None => warn!("format version {format_version:#04x} unknown"),
        }

        let flags = HeaderFlags::from_bits_retain(buf.read_u8()?);
        let file_size = buf.read_u32()?;
        if file_size as usize != buf.len() {
            return Err(XnbError::TruncatedFile {
                declared: u64::from(file_size),
                actual: buf.len() as u64,
            });
        }

        let mut header = Self {
            platform,
            format_version,
            flags,
            file_size,
            decompressed_size: None,
        };
        if header.compression() != Compression::None {
            header.decompressed_size = Some(buf.read_u32()?);
        }

        info!("container validated");
        debug!(
            "content: {}, compression: {:?}, file size {file_size}, decompressed size {:?}",
            if header.hidef() { "HiDef" } else { "Reach" },
            header.compression(),
            header.decompressed_size
        );
        Ok(header)
    }

    /// Write the prologue. Size fields are written as declared; callers
    /// patch them once the payload length is known.
    pub fn encode(&self, w: &mut BufferWriter) {
        w.write_bytes(&MAGIC);
        w.write_u8(self.platform.code());
        w.write_u8(self.format_version);
        w.write_u8(self.flags.bits());
        w.write_u32(self.file_size);
        if let Some(size) = self.decompressed_size {
            w.write_u32(size);
        }
    }

    pub fn hidef(&self) -> bool {
        self.flags.contains(HeaderFlags::HIDEF)
    }

    /// LZX takes precedence when both compression bits are set.
    pub fn compression(&self) -> Compression {
        if self.flags.contains(HeaderFlags::LZX) {
            Compression::Lzx
        } else if self.flags.contains(HeaderFlags::LZ4) {
            Compression::Lz4
        } else {
            Compression::None
        }
    }

    pub fn is_compressed(&self) -> bool {
        self.compression() != Compression::None
    }
}
