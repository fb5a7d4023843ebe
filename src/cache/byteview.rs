//! Byte View Module
//!
//! Immutable, cheaply clonable view over cached bytes.

use std::borrow::Cow;
use std::fmt;

use bytes::Bytes;
use thiserror::Error;

use crate::cache::CacheValue;

// == Byte View Errors ==
/// Range and offset failures raised by [`ByteView`] accessors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ByteViewError {
    #[error("index {index} out of range for view of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("invalid range {from}..{to} for view of length {len}")]
    InvalidRange { from: usize, to: usize, len: usize },

    #[error("view: invalid offset {0}")]
    InvalidOffset(i64),

    /// Fewer bytes than requested were available; `read` were copied.
    #[error("unexpected end of view after {read} bytes")]
    UnexpectedEof { read: usize },
}

// == Byte View ==
/// Immutable cache payload.
///
/// Built either from an owned byte buffer or an owned string; both land in
/// the same reference-counted buffer without copying. Slicing shares that
/// buffer, nothing ever mutates it.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ByteView {
    data: Bytes,
}

impl ByteView {
    /// Creates a view owning a copy of `b`, so the caller's buffer is never aliased.
    pub fn copy_from_slice(b: &[u8]) -> Self {
        Self {
            data: Bytes::copy_from_slice(b),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Read-only view of the underlying bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Returns an owned copy of the data.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data.to_vec()
    }

    /// The data as text, replacing invalid UTF-8 sequences.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.data)
    }

    /// Shares the underlying buffer.
    pub fn bytes(&self) -> Bytes {
        self.data.clone()
    }

    // == At ==
    /// Returns the byte at index `i`.
    pub fn at(&self, i: usize) -> Result<u8, ByteViewError> {
        self.data
            .get(i)
            .copied()
            .ok_or(ByteViewError::IndexOutOfRange {
                index: i,
                len: self.len(),
            })
    }

    // == Slice ==
    /// Returns a new view over `from..to` sharing the same buffer.
    pub fn slice(&self, from: usize, to: usize) -> Result<ByteView, ByteViewError> {
        if from > to || to > self.len() {
            return Err(ByteViewError::InvalidRange {
                from,
                to,
                len: self.len(),
            });
        }
        Ok(Self {
            data: self.data.slice(from..to),
        })
    }

    /// Returns a new view over `from..` sharing the same buffer.
    pub fn slice_from(&self, from: usize) -> Result<ByteView, ByteViewError> {
        self.slice(from, self.len())
    }

    // == Copy ==
    /// Copies `min(buf.len(), self.len())` bytes into `buf` and returns the count.
    pub fn copy_into(&self, buf: &mut [u8]) -> usize {
        let n = buf.len().min(self.len());
        buf[..n].copy_from_slice(&self.data[..n]);
        n
    }

    // == Equality ==
    pub fn equal(&self, other: &ByteView) -> bool {
        self.data == other.data
    }

    pub fn equal_bytes(&self, b: &[u8]) -> bool {
        self.data.as_ref() == b
    }

    pub fn equal_str(&self, s: &str) -> bool {
        self.data.as_ref() == s.as_bytes()
    }

    // == Read At ==
    /// Copies bytes starting at `offset` into `buf`.
    ///
    /// A short read (including `offset >= len`) reports
    /// [`ByteViewError::UnexpectedEof`] with the number of bytes that were
    /// copied; a negative offset reports [`ByteViewError::InvalidOffset`].
    pub fn read_at(&self, buf: &mut [u8], offset: i64) -> Result<usize, ByteViewError> {
        if offset < 0 {
            return Err(ByteViewError::InvalidOffset(offset));
        }
        let offset = offset as usize;
        if offset >= self.len() {
            return Err(ByteViewError::UnexpectedEof { read: 0 });
        }

        let n = self.slice_from(offset)?.copy_into(buf);
        if buf.len() > n {
            return Err(ByteViewError::UnexpectedEof { read: n });
        }
        Ok(n)
    }
}

impl CacheValue for ByteView {
    fn size(&self) -> usize {
        self.len()
    }
}

impl fmt::Debug for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ByteView").field(&self.to_string_lossy()).finish()
    }
}

impl fmt::Display for ByteView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl AsRef<[u8]> for ByteView {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl From<Vec<u8>> for ByteView {
    fn from(v: Vec<u8>) -> Self {
        Self { data: Bytes::from(v) }
    }
}

impl From<String> for ByteView {
    fn from(s: String) -> Self {
        Self { data: Bytes::from(s) }
    }
}

impl From<&str> for ByteView {
    fn from(s: &str) -> Self {
        Self::copy_from_slice(s.as_bytes())
    }
}

impl From<Bytes> for ByteView {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}
