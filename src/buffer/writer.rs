// Growable little-endian byte sink for the pack path.

use crate::buffer::varint;

/// Append-only byte buffer with in-place patching for size fields.
#[derive(Debug, Clone, Default)]
pub struct BufferWriter {
    data: Vec<u8>,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            data: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.data
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    pub fn write_u8(&mut self, v: u8) {
        self.data.push(v);
    }

    pub fn write_bool(&mut self, v: bool) {
        self.data.push(u8::from(v));
    }

    pub fn write_i32(&mut self, v: i32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_u32(&mut self, v: u32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_f32(&mut self, v: f32) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_f64(&mut self, v: f64) {
        self.write_bytes(&v.to_le_bytes());
    }

    pub fn write_7bit_encoded_length(&mut self, v: u32) {
        varint::write_u32(&mut self.data, v);
    }

    pub fn write_length_prefixed_string(&mut self, s: &str) {
        self.write_7bit_encoded_length(s.len() as u32);
        self.write_bytes(s.as_bytes());
    }

    /// Drop everything written from `len` onwards.
    pub fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }

    /// Overwrite four bytes at `at` with `v` (LE). `at + 4` must be within
    /// the bytes already written.
    pub fn patch_u32(&mut self, at: usize, v: u32) {
        self.data[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }
}
