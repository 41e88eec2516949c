// JSON projection of a container.
//
// A container unpacks to
//
//   { "header": { "target", "formatVersion", "hidef", "compressed" },
//     "readers": [ { "type", "version" }, ... ],
//     "content": ... }
//
// plus sidecar files for binary leaves. Both directions walk the content
// alongside its `TypeReader`, so packing restores exact types.

use serde_json::{Map, Value as Json, json};

use crate::buffer::{BufferWriter, ByteBitBuffer};
use crate::container::{Container, ContainerHeader, HeaderFlags, Platform, ReaderEntry};
use crate::error::{Result, XnbError};
use crate::reader::{SoundEffect, Texture, TypeReader, Value, sprite_font_fields};

/// Binary leaf pulled out of the JSON document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportedBlob {
    /// File name referenced from the document's `"export"` field.
    pub file_name: String,
    pub data: Vec<u8>,
}

// ---------------------------------------------------------------------------
// Export
// ---------------------------------------------------------------------------

struct Exporter<'a> {
    stem: &'a str,
    blobs: &'a mut Vec<ExportedBlob>,
}

impl Exporter<'_> {
    fn export(&mut self, extension: &str, data: Vec<u8>) -> String {
        let file_name = match self.blobs.len() {
            0 => format!("{}.{extension}", self.stem),
            n => format!("{}.{n}.{extension}", self.stem),
        };
        log::info!("exporting {file_name}");
        self.blobs.push(ExportedBlob {
            file_name: file_name.clone(),
            data,
        });
        file_name
    }
}

/// Project `container` to JSON. Binary leaves are appended to `blobs` and
/// named after `stem`.
pub fn to_json(
    container: &Container,
    stem: &str,
    blobs: &mut Vec<ExportedBlob>,
) -> Result<Json> {
    let root = container.root_reader()?;
    let mut exporter = Exporter { stem, blobs };
    let content = value_to_json(&root, &container.content, &mut exporter)?;

    let header = &container.header;
    Ok(json!({
        "header": {
            "target": char::from(header.platform.code()).to_string(),
            "formatVersion": header.format_version,
            "hidef": header.hidef(),
            "compressed": header.is_compressed(),
        },
        "readers": container
            .readers
            .iter()
            .map(|r| json!({ "type": r.type_name, "version": r.version }))
            .collect::<Vec<_>>(),
        "content": content,
    }))
}

fn value_to_json(reader: &TypeReader, value: &Value, ex: &mut Exporter<'_>) -> Result<Json> {
    let mismatch = || {
        XnbError::InvalidContent(format!("{reader} reader cannot export a {} value", value.kind()))
    };

    let out = match (reader, value) {
        (_, Value::Null) => Json::Null,
        (TypeReader::Nullable(inner), v) => value_to_json(inner, v, ex)?,
        (TypeReader::Boolean, Value::Bool(b)) => json!(b),
        (TypeReader::Char, Value::Char(c)) => json!(c.to_string()),
        (TypeReader::Int32, Value::Int32(v)) => json!(v),
        (TypeReader::UInt32, Value::UInt32(v)) => json!(v),
        (TypeReader::Single, Value::Single(v)) => single_to_json(*v),
        (TypeReader::Double, Value::Double(v)) => non_finite(*v).unwrap_or_else(|| json!(v)),
        (TypeReader::String, Value::String(s)) => json!(s),
        (TypeReader::Vector2, Value::Vector2(v)) => vector_to_json(v),
        (TypeReader::Vector3, Value::Vector3(v)) => vector_to_json(v),
        (TypeReader::Vector4, Value::Vector4(v)) => vector_to_json(v),
        (
            TypeReader::Rectangle,
            Value::Rectangle {
                x,
                y,
                width,
                height,
            },
        ) => json!({ "x": x, "y": y, "width": width, "height": height }),
        (TypeReader::Array(element) | TypeReader::List(element), Value::List(items)) => Json::Array(
            items
                .iter()
                .map(|item| value_to_json(element, item, ex))
                .collect::<Result<_>>()?,
        ),
        (TypeReader::Dictionary(key, val), Value::Map(entries)) => {
            if entries.iter().all(|(k, _)| key_to_string(k).is_some()) {
                let mut map = Map::with_capacity(entries.len());
                for (k, v) in entries {
                    let name = key_to_string(k).ok_or_else(mismatch)?;
                    map.insert(name, value_to_json(val, v, ex)?);
                }
                Json::Object(map)
            } else {
                let mut pairs = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    pairs.push(json!({
                        "key": value_to_json(key, k, ex)?,
                        "value": value_to_json(val, v, ex)?,
                    }));
                }
                Json::Array(pairs)
            }
        }
        (TypeReader::Texture2D, Value::Texture(t)) => {
            let files: Vec<String> = t
                .levels
                .iter()
                .map(|level| ex.export("bin", level.clone()))
                .collect();
            json!({
                "format": t.format,
                "width": t.width,
                "height": t.height,
                "export": files,
            })
        }
        (TypeReader::SpriteFont, Value::Struct(_)) => {
            let mut map = Map::new();
            for (name, field_reader) in sprite_font_fields() {
                let field = value.field(name).ok_or_else(mismatch)?;
                map.insert(name.to_string(), value_to_json(&field_reader, field, ex)?);
            }
            Json::Object(map)
        }
        (TypeReader::Effect, Value::Blob(data)) => json!({ "export": ex.export("cso", data.clone()) }),
        (TypeReader::TBin, Value::Blob(data)) => json!({ "export": ex.export("tbin", data.clone()) }),
        (TypeReader::SoundEffect, Value::Sound(sound)) => json!({
            "export": ex.export("wav", wav_file(sound)),
            "loopStart": sound.loop_start,
            "loopLength": sound.loop_length,
            "duration": sound.duration,
        }),
        (TypeReader::BmFont, Value::String(xml)) => {
            json!({ "export": ex.export("xml", xml.clone().into_bytes()) })
        }
        _ => return Err(mismatch()),
    };
    Ok(out)
}

/// JSON has no NaN or infinities; they travel as strings.
fn non_finite(v: f64) -> Option<Json> {
    if v.is_nan() {
        Some(json!("NaN"))
    } else if v.is_infinite() {
        Some(json!(if v > 0.0 { "Infinity" } else { "-Infinity" }))
    } else {
        None
    }
}

fn single_to_json(v: f32) -> Json {
    non_finite(f64::from(v)).unwrap_or_else(|| json!(v))
}

fn vector_to_json(v: &[f32]) -> Json {
    let mut map = Map::with_capacity(v.len());
    for (name, &c) in ["x", "y", "z", "w"].iter().zip(v) {
        map.insert(name.to_string(), single_to_json(c));
    }
    Json::Object(map)
}

/// RIFF/WAVE file holding a sound effect's format and sample chunks.
fn wav_file(sound: &SoundEffect) -> Vec<u8> {
    let padded = |n: usize| n + (n & 1);
    let body = 4 + 8 + padded(sound.format.len()) + 8 + padded(sound.data.len());

    let mut w = BufferWriter::with_capacity(8 + body);
    w.write_bytes(b"RIFF");
    w.write_u32(body as u32);
    w.write_bytes(b"WAVE");
    for (id, chunk) in [(b"fmt ", &sound.format), (b"data", &sound.data)] {
        w.write_bytes(id);
        w.write_u32(chunk.len() as u32);
        w.write_bytes(chunk);
        if chunk.len() & 1 == 1 {
            w.write_u8(0);
        }
    }
    w.into_inner()
}

/// Format and sample chunks of a RIFF/WAVE file; other chunks are skipped.
fn wav_chunks(wav: Vec<u8>) -> Result<(Vec<u8>, Vec<u8>)> {
    let mut buf = ByteBitBuffer::new(wav);
    let not_wav = || invalid("sound export is not a RIFF/WAVE file");
    if buf.read_bytes(4).map_err(|_| not_wav())? != b"RIFF" {
        return Err(not_wav());
    }
    buf.read_u32()?;
    if buf.read_bytes(4).map_err(|_| not_wav())? != b"WAVE" {
        return Err(not_wav());
    }

    let mut format = None;
    while buf.remaining() >= 8 {
        let id: [u8; 4] = buf.read_bytes(4)?.try_into().map_err(|_| not_wav())?;
        let size = buf.read_u32()? as usize;
        let chunk = buf.read_bytes(size)?.to_vec();
        if size & 1 == 1 && buf.remaining() > 0 {
            buf.seek(1);
        }
        match &id {
            b"fmt " => format = Some(chunk),
            b"data" => {
                let format = format.ok_or_else(|| invalid("WAV data chunk precedes fmt"))?;
                return Ok((format, chunk));
            }
            _ => {}
        }
    }
    Err(invalid("WAV file has no data chunk"))
}

/// Scalar keys become JSON object member names.
fn key_to_string(key: &Value) -> Option<String> {
    match key {
        Value::String(s) => Some(s.clone()),
        Value::Char(c) => Some(c.to_string()),
        Value::Int32(v) => Some(v.to_string()),
        Value::UInt32(v) => Some(v.to_string()),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Import
// ---------------------------------------------------------------------------

/// Rebuild a container from its JSON projection. `load_blob` resolves the
/// file names found in `"export"` fields.
pub fn from_json(
    doc: &Json,
    mut load_blob: impl FnMut(&str) -> Result<Vec<u8>>,
) -> Result<Container> {
    let header = field(doc, "header")?;
    let target = field(header, "target")?
        .as_str()
        .and_then(|s| s.bytes().next())
        .ok_or_else(|| invalid("header.target must be a one-letter string"))?;
    let format_version = u8::try_from(as_i64(field(header, "formatVersion")?)?)
        .map_err(|_| invalid("header.formatVersion out of range"))?;
    let hidef = field(header, "hidef")?.as_bool().unwrap_or(false);

    let readers = field(doc, "readers")?
        .as_array()
        .ok_or_else(|| invalid("readers must be an array"))?
        .iter()
        .map(|r| {
            let type_name = field(r, "type")?
                .as_str()
                .ok_or_else(|| invalid("reader type must be a string"))?;
            let version = i32::try_from(as_i64(field(r, "version")?)?)
                .map_err(|_| invalid("reader version out of range"))?;
            Ok(ReaderEntry::new(type_name, version))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut container = Container {
        header: ContainerHeader {
            platform: Platform::from_code(target),
            format_version,
            flags: if hidef {
                HeaderFlags::HIDEF
            } else {
                HeaderFlags::empty()
            },
            file_size: 0,
            decompressed_size: None,
        },
        readers,
        content: Value::Null,
    };
    let root = container.root_reader()?;
    container.content = value_from_json(&root, field(doc, "content")?, &mut load_blob)?;
    Ok(container)
}

fn value_from_json(
    reader: &TypeReader,
    doc: &Json,
    load_blob: &mut dyn FnMut(&str) -> Result<Vec<u8>>,
) -> Result<Value> {
    // Null is only representable for references and nullables.
    if doc.is_null() && (!reader.is_value_type() || matches!(reader, TypeReader::Nullable(_))) {
        return Ok(Value::Null);
    }

    let value = match reader {
        TypeReader::Nullable(inner) => value_from_json(inner, doc, load_blob)?,
        TypeReader::Boolean => Value::Bool(
            doc.as_bool()
                .ok_or_else(|| invalid(format!("expected a boolean, got {doc}")))?,
        ),
        TypeReader::Char => Value::Char(parse_char(doc)?),
        TypeReader::Int32 => Value::Int32(
            i32::try_from(as_i64(doc)?).map_err(|_| invalid(format!("{doc} is not an Int32")))?,
        ),
        TypeReader::UInt32 => Value::UInt32(
            u32::try_from(as_i64(doc)?).map_err(|_| invalid(format!("{doc} is not a UInt32")))?,
        ),
        TypeReader::Single => Value::Single(as_f64(doc)? as f32),
        TypeReader::Double => Value::Double(as_f64(doc)?),
        TypeReader::String => Value::String(as_str(doc)?.to_string()),
        TypeReader::Vector2 => Value::Vector2([float(doc, "x")?, float(doc, "y")?]),
        TypeReader::Vector3 => {
            Value::Vector3([float(doc, "x")?, float(doc, "y")?, float(doc, "z")?])
        }
        TypeReader::Vector4 => Value::Vector4([
            float(doc, "x")?,
            float(doc, "y")?,
            float(doc, "z")?,
            float(doc, "w")?,
        ]),
        TypeReader::Rectangle => Value::Rectangle {
            x: int(doc, "x")?,
            y: int(doc, "y")?,
            width: int(doc, "width")?,
            height: int(doc, "height")?,
        },
        TypeReader::Array(element) | TypeReader::List(element) => Value::List(
            as_array(doc)?
                .iter()
                .map(|item| value_from_json(element, item, load_blob))
                .collect::<Result<_>>()?,
        ),
        TypeReader::Dictionary(key, val) => {
            let mut entries = Vec::new();
            match doc {
                Json::Object(map) => {
                    for (name, v) in map {
                        entries.push((
                            key_from_string(key, name)?,
                            value_from_json(val, v, load_blob)?,
                        ));
                    }
                }
                Json::Array(pairs) => {
                    for pair in pairs {
                        entries.push((
                            value_from_json(key, field(pair, "key")?, load_blob)?,
                            value_from_json(val, field(pair, "value")?, load_blob)?,
                        ));
                    }
                }
                other => return Err(invalid(format!("expected a dictionary, got {other}"))),
            }
            Value::Map(entries)
        }
        TypeReader::Texture2D => {
            let format = i32::try_from(as_i64(field(doc, "format")?)?)
                .map_err(|_| invalid("texture format out of range"))?;
            let width = u32::try_from(as_i64(field(doc, "width")?)?)
                .map_err(|_| invalid("texture width out of range"))?;
            let height = u32::try_from(as_i64(field(doc, "height")?)?)
                .map_err(|_| invalid("texture height out of range"))?;
            let levels = as_array(field(doc, "export")?)?
                .iter()
                .map(|name| load_blob(as_str(name)?))
                .collect::<Result<_>>()?;
            Value::Texture(Texture {
                format,
                width,
                height,
                levels,
            })
        }
        TypeReader::SpriteFont => {
            let mut fields = Vec::with_capacity(8);
            for (name, field_reader) in sprite_font_fields() {
                let v = value_from_json(&field_reader, field(doc, name)?, load_blob)?;
                fields.push((name.to_string(), v));
            }
            Value::Struct(fields)
        }
        TypeReader::SoundEffect => {
            let (format, data) = wav_chunks(load_blob(as_str(field(doc, "export")?)?)?)?;
            Value::Sound(SoundEffect {
                format,
                data,
                loop_start: int(doc, "loopStart")?,
                loop_length: int(doc, "loopLength")?,
                duration: int(doc, "duration")?,
            })
        }
        TypeReader::Effect | TypeReader::TBin => {
            Value::Blob(load_blob(as_str(field(doc, "export")?)?)?)
        }
        TypeReader::BmFont => {
            let data = load_blob(as_str(field(doc, "export")?)?)?;
            Value::String(
                String::from_utf8(data).map_err(|_| invalid("font XML is not valid UTF-8"))?,
            )
        }
    };
    Ok(value)
}

fn key_from_string(reader: &TypeReader, name: &str) -> Result<Value> {
    let bad = || invalid(format!("\"{name}\" is not a valid {reader} key"));
    match reader {
        TypeReader::String => Ok(Value::String(name.to_string())),
        TypeReader::Char => parse_char(&Json::from(name)).map(Value::Char),
        TypeReader::Int32 => name.parse().map(Value::Int32).map_err(|_| bad()),
        TypeReader::UInt32 => name.parse().map(Value::UInt32).map_err(|_| bad()),
        _ => Err(bad()),
    }
}

// ---------------------------------------------------------------------------
// JSON accessors
// ---------------------------------------------------------------------------

fn invalid(msg: impl Into<String>) -> XnbError {
    XnbError::InvalidContent(msg.into())
}

fn field<'a>(doc: &'a Json, name: &str) -> Result<&'a Json> {
    doc.get(name)
        .ok_or_else(|| invalid(format!("missing field \"{name}\"")))
}

fn as_i64(doc: &Json) -> Result<i64> {
    doc.as_i64()
        .ok_or_else(|| invalid(format!("expected an integer, got {doc}")))
}

fn as_f64(doc: &Json) -> Result<f64> {
    match doc.as_str() {
        Some("NaN") => Ok(f64::NAN),
        Some("Infinity") => Ok(f64::INFINITY),
        Some("-Infinity") => Ok(f64::NEG_INFINITY),
        _ => doc
            .as_f64()
            .ok_or_else(|| invalid(format!("expected a number, got {doc}"))),
    }
}

fn as_str(doc: &Json) -> Result<&str> {
    doc.as_str()
        .ok_or_else(|| invalid(format!("expected a string, got {doc}")))
}

fn as_array(doc: &Json) -> Result<&Vec<Json>> {
    doc.as_array()
        .ok_or_else(|| invalid(format!("expected an array, got {doc}")))
}

fn float(doc: &Json, name: &str) -> Result<f32> {
    Ok(as_f64(field(doc, name)?)? as f32)
}

fn int(doc: &Json, name: &str) -> Result<i32> {
    i32::try_from(as_i64(field(doc, name)?)?)
        .map_err(|_| invalid(format!("\"{name}\" out of range")))
}

fn parse_char(doc: &Json) -> Result<char> {
    let s = as_str(doc)?;
    let mut chars = s.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(c),
        _ => Err(invalid(format!("expected a single character, got \"{s}\""))),
    }
}
