// Decoded object graph.

/// A texture and its raw surface data, one entry per mip level.
#[derive(Debug, Clone, PartialEq)]
pub struct Texture {
    pub format: i32,
    pub width: u32,
    pub height: u32,
    pub levels: Vec<Vec<u8>>,
}

/// A sound effect: the WAVEFORMATEX header and PCM samples as stored, plus
/// loop points in samples and the duration in milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoundEffect {
    pub format: Vec<u8>,
    pub data: Vec<u8>,
    pub loop_start: i32,
    pub loop_length: i32,
    pub duration: i32,
}

/// A value produced by a `TypeReader`.
///
/// The value carries no type of its own; the reader that produced it (or
/// will write it) supplies that.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Null reference or empty nullable.
    Null,
    Bool(bool),
    Char(char),
    Int32(i32),
    UInt32(u32),
    Single(f32),
    Double(f64),
    String(String),
    Vector2([f32; 2]),
    Vector3([f32; 3]),
    Vector4([f32; 4]),
    Rectangle {
        x: i32,
        y: i32,
        width: i32,
        height: i32,
    },
    /// Array or list elements.
    List(Vec<Value>),
    /// Dictionary entries in wire order.
    Map(Vec<(Value, Value)>),
    Texture(Texture),
    Sound(SoundEffect),
    /// Opaque payload (compiled effect, tile map).
    Blob(Vec<u8>),
    /// Named fields of a composite asset, in wire order.
    Struct(Vec<(String, Value)>),
}

impl Value {
    /// Look up a field of a `Struct` by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        match self {
            Value::Struct(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Short name of the variant, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "bool",
            Value::Char(_) => "char",
            Value::Int32(_) => "int32",
            Value::UInt32(_) => "uint32",
            Value::Single(_) => "single",
            Value::Double(_) => "double",
            Value::String(_) => "string",
            Value::Vector2(_) => "vector2",
            Value::Vector3(_) => "vector3",
            Value::Vector4(_) => "vector4",
            Value::Rectangle { .. } => "rectangle",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Texture(_) => "texture",
            Value::Sound(_) => "sound",
            Value::Blob(_) => "blob",
            Value::Struct(_) => "struct",
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int32(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}
