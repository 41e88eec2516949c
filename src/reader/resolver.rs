// Reader-table dispatch.
//
// Reference-typed values are prefixed with a 7-bit encoded index into the
// container's reader table. Index 0 is a null reference; index `n` selects
// `readers[n - 1]`.

use std::cell::Cell;

use log::trace;

use super::{TypeReader, Value};
use crate::buffer::{BufferWriter, ByteBitBuffer};
use crate::error::{Result, XnbError};

/// Deepest chain of nested reference reads accepted.
pub const MAX_NESTING: usize = 256;

/// The reader table of one container, in declaration order.
#[derive(Debug, Clone, Default)]
pub struct ReaderResolver {
    readers: Vec<TypeReader>,
    depth: Cell<usize>,
}

impl ReaderResolver {
    pub fn new(readers: Vec<TypeReader>) -> Self {
        Self {
            readers,
            depth: Cell::new(0),
        }
    }

    pub fn readers(&self) -> &[TypeReader] {
        &self.readers
    }

    pub fn len(&self) -> usize {
        self.readers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readers.is_empty()
    }

    /// Read an index, then a value with the reader it selects.
    ///
    /// Index 0 and indices past the table are both errors here.
    pub fn resolve(&self, buf: &mut ByteBitBuffer) -> Result<Value> {
        let index = buf.read_7bit_encoded_length()?;
        self.read_with(index, buf)
    }

    /// Like [`resolve`](Self::resolve), but index 0 yields [`Value::Null`].
    pub fn resolve_nullable(&self, buf: &mut ByteBitBuffer) -> Result<Value> {
        let index = buf.read_7bit_encoded_length()?;
        if index == 0 {
            return Ok(Value::Null);
        }
        self.read_with(index, buf)
    }

    /// Read the root object, which is always preceded by an index.
    pub fn read_root(&self, buf: &mut ByteBitBuffer) -> Result<Value> {
        self.resolve(buf)
    }

    /// 1-based wire index of `reader`.
    pub fn index_of(&self, reader: &TypeReader) -> Result<u32> {
        self.readers
            .iter()
            .position(|r| r == reader)
            .map(|i| i as u32 + 1)
            .ok_or_else(|| {
                XnbError::InvalidContent(format!("no {reader} reader in the reader table"))
            })
    }

    /// Write `reader`'s index followed by `value`.
    pub fn write_indexed(
        &self,
        w: &mut BufferWriter,
        reader: &TypeReader,
        value: &Value,
    ) -> Result<()> {
        w.write_7bit_encoded_length(self.index_of(reader)?);
        reader.write(w, value, self)
    }

    /// Write index 0 for a null, else behave like [`write_indexed`](Self::write_indexed).
    pub fn write_nullable(
        &self,
        w: &mut BufferWriter,
        reader: &TypeReader,
        value: &Value,
    ) -> Result<()> {
        if *value == Value::Null {
            w.write_7bit_encoded_length(0);
            return Ok(());
        }
        self.write_indexed(w, reader, value)
    }

    /// Write the root object with the first reader of the table.
    pub fn write_root(&self, w: &mut BufferWriter, value: &Value) -> Result<()> {
        let root = self
            .readers
            .first()
            .ok_or_else(|| XnbError::InvalidContent("empty reader table".into()))?;
        self.write_indexed(w, root, value)
    }

    fn read_with(&self, index: u32, buf: &mut ByteBitBuffer) -> Result<Value> {
        let reader = self.lookup(index)?;
        trace!("reader #{index}: {reader}");
        self.nested(|| reader.read(buf, self))
    }

    /// Run one level of value nesting, failing past [`MAX_NESTING`].
    pub(crate) fn nested<T>(&self, read: impl FnOnce() -> Result<T>) -> Result<T> {
        let depth = self.depth.get();
        if depth >= MAX_NESTING {
            return Err(XnbError::InvalidContent(format!(
                "values nested more than {MAX_NESTING} deep"
            )));
        }
        self.depth.set(depth + 1);
        let value = read();
        self.depth.set(depth);
        value
    }

    fn lookup(&self, index: u32) -> Result<&TypeReader> {
        match index.checked_sub(1) {
            Some(i) if (i as usize) < self.readers.len() => Ok(&self.readers[i as usize]),
            _ => Err(XnbError::InvalidReaderIndex {
                index,
                count: self.readers.len(),
            }),
        }
    }
}
