// Type readers: decode/encode one value of a container-declared type.
//
// Submodules:
// - `types`    : full type name to tag normalization
// - `value`    : the decoded `Value` graph
// - `resolver` : `ReaderResolver`, index-table dispatch for reference types
//
// A reader is either a value type, read inline where it appears, or a
// reference type, which is preceded on the wire by its 1-based index into
// the container's reader table.

pub mod resolver;
pub mod types;
pub mod value;

use std::fmt;

use crate::buffer::{BufferWriter, ByteBitBuffer};
use crate::error::{Result, XnbError};

pub use resolver::{MAX_NESTING, ReaderResolver};
pub use types::{parse_subtypes, simplify_type, split_type_tag};
pub use value::{SoundEffect, Texture, Value};

/// Decoder/encoder for one type tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeReader {
    Boolean,
    Char,
    Int32,
    UInt32,
    Single,
    Double,
    String,
    Vector2,
    Vector3,
    Vector4,
    Rectangle,
    Array(Box<TypeReader>),
    List(Box<TypeReader>),
    Dictionary(Box<TypeReader>, Box<TypeReader>),
    Nullable(Box<TypeReader>),
    Texture2D,
    SpriteFont,
    Effect,
    SoundEffect,
    TBin,
    BmFont,
}

/// Fields of a SpriteFont in wire order, with the reader each one uses.
pub fn sprite_font_fields() -> [(&'static str, TypeReader); 8] {
    use TypeReader::*;
    [
        ("texture", Texture2D),
        ("glyphs", List(Box::new(Rectangle))),
        ("cropping", List(Box::new(Rectangle))),
        ("characterMap", List(Box::new(Char))),
        ("verticalLineSpacing", Int32),
        ("horizontalSpacing", Single),
        ("kerning", List(Box::new(Vector3))),
        ("defaultCharacter", Nullable(Box::new(Char))),
    ]
}

impl TypeReader {
    /// Build a reader from a short tag such as `Dictionary<String,Int32>`.
    pub fn from_tag(tag: &str) -> Result<Self> {
        Self::from_tag_at(tag, 0)
    }

    fn from_tag_at(tag: &str, depth: usize) -> Result<Self> {
        if depth > MAX_NESTING {
            return Err(XnbError::UnknownType(format!(
                "type tag nested more than {MAX_NESTING} deep"
            )));
        }
        let (head, args) = split_type_tag(tag)?;
        let sub = |i: usize| -> Result<Box<TypeReader>> {
            Ok(Box::new(Self::from_tag_at(args[i], depth + 1)?))
        };

        let reader = match (head, args.len()) {
            ("Boolean", 0) => Self::Boolean,
            ("Char", 0) => Self::Char,
            ("Int32", 0) => Self::Int32,
            ("UInt32", 0) => Self::UInt32,
            ("Single", 0) => Self::Single,
            ("Double", 0) => Self::Double,
            ("String", 0) => Self::String,
            ("Vector2", 0) => Self::Vector2,
            ("Vector3", 0) => Self::Vector3,
            ("Vector4", 0) => Self::Vector4,
            ("Rectangle", 0) => Self::Rectangle,
            ("Array", 1) => Self::Array(sub(0)?),
            ("List", 1) => Self::List(sub(0)?),
            ("Dictionary", 2) => Self::Dictionary(sub(0)?, sub(1)?),
            ("Nullable", 1) => Self::Nullable(sub(0)?),
            ("Texture2D", 0) => Self::Texture2D,
            ("SpriteFont", 0) => Self::SpriteFont,
            ("Effect", 0) => Self::Effect,
            ("SoundEffect", 0) => Self::SoundEffect,
            ("TBin", 0) => Self::TBin,
            ("BmFont", 0) => Self::BmFont,
            _ => return Err(XnbError::UnknownType(format!("no reader for tag \"{tag}\""))),
        };
        Ok(reader)
    }

    /// Build a reader from a full type name as stored in a container.
    pub fn from_type_name(type_name: &str) -> Result<Self> {
        Self::from_tag(&simplify_type(type_name)?)
    }

    /// Value types are read inline; reference types go through the
    /// reader table.
    pub fn is_value_type(&self) -> bool {
        matches!(
            self,
            Self::Boolean
                | Self::Char
                | Self::Int32
                | Self::UInt32
                | Self::Single
                | Self::Double
                | Self::Vector2
                | Self::Vector3
                | Self::Vector4
                | Self::Rectangle
                | Self::Nullable(_)
        )
    }

    /// Read one value of this type at the cursor.
    pub fn read(&self, buf: &mut ByteBitBuffer, resolver: &ReaderResolver) -> Result<Value> {
        let value = match self {
            Self::Boolean => Value::Bool(buf.read_u8()? != 0),
            Self::Char => Value::Char(read_char(buf)?),
            Self::Int32 => Value::Int32(buf.read_i32()?),
            Self::UInt32 => Value::UInt32(buf.read_u32()?),
            Self::Single => Value::Single(buf.read_f32()?),
            Self::Double => Value::Double(buf.read_f64()?),
            Self::String => Value::String(buf.read_length_prefixed_string()?),
            Self::Vector2 => Value::Vector2([buf.read_f32()?, buf.read_f32()?]),
            Self::Vector3 => Value::Vector3([buf.read_f32()?, buf.read_f32()?, buf.read_f32()?]),
            Self::Vector4 => Value::Vector4([
                buf.read_f32()?,
                buf.read_f32()?,
                buf.read_f32()?,
                buf.read_f32()?,
            ]),
            Self::Rectangle => Value::Rectangle {
                x: buf.read_i32()?,
                y: buf.read_i32()?,
                width: buf.read_i32()?,
                height: buf.read_i32()?,
            },
            Self::Array(element) | Self::List(element) => {
                let count = buf.read_u32()? as usize;
                let mut items = Vec::with_capacity(count.min(buf.remaining()));
                for _ in 0..count {
                    items.push(read_child(element, buf, resolver)?);
                }
                Value::List(items)
            }
            Self::Dictionary(key, value) => {
                let count = buf.read_u32()? as usize;
                let mut entries = Vec::with_capacity(count.min(buf.remaining()));
                for _ in 0..count {
                    let k = read_child(key, buf, resolver)?;
                    let v = read_child(value, buf, resolver)?;
                    entries.push((k, v));
                }
                Value::Map(entries)
            }
            Self::Nullable(inner) => {
                if buf.read_u8()? != 0 {
                    read_child(inner, buf, resolver)?
                } else {
                    Value::Null
                }
            }
            Self::Texture2D => Value::Texture(read_texture(buf)?),
            Self::SpriteFont => {
                let mut fields = Vec::with_capacity(8);
                for (name, reader) in sprite_font_fields() {
                    fields.push((name.to_string(), read_child(&reader, buf, resolver)?));
                }
                Value::Struct(fields)
            }
            Self::Effect => {
                let size = buf.read_u32()? as usize;
                Value::Blob(buf.read_bytes(size)?.to_vec())
            }
            Self::SoundEffect => Value::Sound(read_sound_effect(buf)?),
            Self::TBin => {
                let size = buf.read_i32()?;
                let size = usize::try_from(size).map_err(|_| {
                    XnbError::InvalidContent(format!("negative tile map size {size}"))
                })?;
                Value::Blob(buf.read_bytes(size)?.to_vec())
            }
            Self::BmFont => Value::String(buf.read_length_prefixed_string()?),
        };
        Ok(value)
    }

    /// Write `value` as this type. Reference-type children are written with
    /// their reader index; this reader's own index is the caller's concern.
    pub fn write(
        &self,
        w: &mut BufferWriter,
        value: &Value,
        resolver: &ReaderResolver,
    ) -> Result<()> {
        match (self, value) {
            (Self::Boolean, Value::Bool(b)) => w.write_bool(*b),
            (Self::Char, Value::Char(c)) => {
                let mut utf8 = [0u8; 4];
                w.write_bytes(c.encode_utf8(&mut utf8).as_bytes());
            }
            (Self::Int32, Value::Int32(v)) => w.write_i32(*v),
            (Self::UInt32, Value::UInt32(v)) => w.write_u32(*v),
            (Self::Single, Value::Single(v)) => w.write_f32(*v),
            (Self::Double, Value::Double(v)) => w.write_f64(*v),
            (Self::String | Self::BmFont, Value::String(s)) => w.write_length_prefixed_string(s),
            (Self::Vector2, Value::Vector2(v)) => v.iter().for_each(|&f| w.write_f32(f)),
            (Self::Vector3, Value::Vector3(v)) => v.iter().for_each(|&f| w.write_f32(f)),
            (Self::Vector4, Value::Vector4(v)) => v.iter().for_each(|&f| w.write_f32(f)),
            (
                Self::Rectangle,
                Value::Rectangle {
                    x,
                    y,
                    width,
                    height,
                },
            ) => {
                for v in [x, y, width, height] {
                    w.write_i32(*v);
                }
            }
            (Self::Array(element) | Self::List(element), Value::List(items)) => {
                w.write_u32(items.len() as u32);
                for item in items {
                    write_child(element, w, item, resolver)?;
                }
            }
            (Self::Dictionary(key, value), Value::Map(entries)) => {
                w.write_u32(entries.len() as u32);
                for (k, v) in entries {
                    write_child(key, w, k, resolver)?;
                    write_child(value, w, v, resolver)?;
                }
            }
            (Self::Nullable(_), Value::Null) => w.write_bool(false),
            (Self::Nullable(inner), v) => {
                w.write_bool(true);
                write_child(inner, w, v, resolver)?;
            }
            (Self::Texture2D, Value::Texture(t)) => {
                w.write_i32(t.format);
                w.write_u32(t.width);
                w.write_u32(t.height);
                w.write_u32(t.levels.len() as u32);
                for level in &t.levels {
                    w.write_u32(level.len() as u32);
                    w.write_bytes(level);
                }
            }
            (Self::SpriteFont, Value::Struct(_)) => {
                for (name, reader) in sprite_font_fields() {
                    let field = value.field(name).ok_or_else(|| {
                        XnbError::InvalidContent(format!("SpriteFont is missing \"{name}\""))
                    })?;
                    write_child(&reader, w, field, resolver)?;
                }
            }
            (Self::Effect, Value::Blob(data)) => {
                w.write_u32(data.len() as u32);
                w.write_bytes(data);
            }
            (Self::SoundEffect, Value::Sound(sound)) => {
                for chunk in [&sound.format, &sound.data] {
                    w.write_u32(chunk.len() as u32);
                    w.write_bytes(chunk);
                }
                w.write_i32(sound.loop_start);
                w.write_i32(sound.loop_length);
                w.write_i32(sound.duration);
            }
            (Self::TBin, Value::Blob(data)) => {
                w.write_i32(data.len() as i32);
                w.write_bytes(data);
            }
            _ => {
                return Err(XnbError::InvalidContent(format!(
                    "{self} reader cannot write a {} value",
                    value.kind()
                )));
            }
        }
        Ok(())
    }
}

impl fmt::Display for TypeReader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Array(e) => write!(f, "Array<{e}>"),
            Self::List(e) => write!(f, "List<{e}>"),
            Self::Dictionary(k, v) => write!(f, "Dictionary<{k},{v}>"),
            Self::Nullable(e) => write!(f, "Nullable<{e}>"),
            leaf => write!(f, "{leaf:?}"),
        }
    }
}

fn read_child(
    reader: &TypeReader,
    buf: &mut ByteBitBuffer,
    resolver: &ReaderResolver,
) -> Result<Value> {
    if reader.is_value_type() {
        resolver.nested(|| reader.read(buf, resolver))
    } else {
        resolver.resolve_nullable(buf)
    }
}

fn write_child(
    reader: &TypeReader,
    w: &mut BufferWriter,
    value: &Value,
    resolver: &ReaderResolver,
) -> Result<()> {
    if reader.is_value_type() {
        reader.write(w, value, resolver)
    } else {
        resolver.write_nullable(w, reader, value)
    }
}

/// One UTF-8 encoded character; the lead byte gives its width.
fn read_char(buf: &mut ByteBitBuffer) -> Result<char> {
    let lead = buf.peek_bytes(1)?[0];
    let width = match lead.leading_ones() {
        0 => 1,
        2 => 2,
        3 => 3,
        4 => 4,
        _ => {
            return Err(XnbError::InvalidContent(format!(
                "byte {lead:#04x} does not start a UTF-8 character"
            )));
        }
    };
    let bytes = buf.read_bytes(width)?;
    std::str::from_utf8(bytes)
        .ok()
        .and_then(|s| s.chars().next())
        .ok_or_else(|| XnbError::InvalidContent("invalid UTF-8 character".into()))
}

fn read_texture(buf: &mut ByteBitBuffer) -> Result<Texture> {
    let format = buf.read_i32()?;
    let width = buf.read_u32()?;
    let height = buf.read_u32()?;
    let mip_count = buf.read_u32()? as usize;
    log::debug!("texture: format {format}, {width}x{height}, {mip_count} level(s)");

    let mut levels = Vec::with_capacity(mip_count.min(32));
    for _ in 0..mip_count {
        let size = buf.read_u32()? as usize;
        levels.push(buf.read_bytes(size)?.to_vec());
    }
    Ok(Texture {
        format,
        width,
        height,
        levels,
    })
}

fn read_sound_effect(buf: &mut ByteBitBuffer) -> Result<SoundEffect> {
    let format_size = buf.read_u32()? as usize;
    let format = buf.read_bytes(format_size)?.to_vec();
    let data_size = buf.read_u32()? as usize;
    let data = buf.read_bytes(data_size)?.to_vec();
    Ok(SoundEffect {
        format,
        data,
        loop_start: buf.read_i32()?,
        loop_length: buf.read_i32()?,
        duration: buf.read_i32()?,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
