//! Fixed-width binary state codec used by rollback snapshots.
//!
//! Every value is encoded through the bincode serde bridge with fixed-width
//! little-endian integers, so a [`rewind_math::Fixed`] always occupies
//! exactly 12 bytes (`u32` scale then `i64` raw) and a snapshot's layout
//! depends only on the shape of the state, never on the magnitudes in it.
//!
//! [`StateWriter`] appends values to a growable buffer; [`StateReader`]
//! consumes them in the same order from a borrowed slice.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Errors produced while encoding or decoding rollback state.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// A value could not be encoded.
    #[error("encode failed: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    /// The bytes did not decode as the expected type.
    #[error("decode failed at byte {offset}: {source}")]
    Decode {
        offset: usize,
        #[source]
        source: bincode::error::DecodeError,
    },

    /// A length-prefixed blob claimed more bytes than remain.
    #[error("blob of {len} bytes at byte {offset} overruns the {available} remaining")]
    Truncated {
        offset: usize,
        len: usize,
        available: usize,
    },

    /// The saved entity carries a different number of components.
    #[error("expected {expected} components, found {found}")]
    ComponentCount { expected: usize, found: usize },

    /// A component's saved tag does not match the component being loaded.
    #[error("expected component '{expected}', found '{found}'")]
    TagMismatch { expected: String, found: String },
}

#[inline]
fn config() -> impl bincode::config::Config {
    bincode::config::standard().with_fixed_int_encoding()
}

// ---------------------------------------------------------------------------
// StateWriter
// ---------------------------------------------------------------------------

/// Appends fixed-width encoded values to a byte buffer.
#[derive(Debug, Default)]
pub struct StateWriter {
    buf: Vec<u8>,
}

impl StateWriter {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Encode `value` and append it.
    pub fn write<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<(), CodecError> {
        let bytes = bincode::serde::encode_to_vec(value, config())?;
        self.buf.extend_from_slice(&bytes);
        Ok(())
    }

    /// Append a `u32` length prefix followed by the raw bytes.
    pub fn write_blob(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.write(&(bytes.len() as u32))?;
        self.buf.extend_from_slice(bytes);
        Ok(())
    }

    /// Encode a nested section with its own writer and append it as a blob.
    pub fn write_section<F>(&mut self, f: F) -> Result<(), CodecError>
    where
        F: FnOnce(&mut StateWriter) -> Result<(), CodecError>,
    {
        let mut inner = StateWriter::new();
        f(&mut inner)?;
        self.write_blob(&inner.buf)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

// ---------------------------------------------------------------------------
// StateReader
// ---------------------------------------------------------------------------

/// Decodes values, in write order, from a borrowed byte slice.
#[derive(Debug)]
pub struct StateReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> StateReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    /// Decode the next value.
    pub fn read<T: DeserializeOwned>(&mut self) -> Result<T, CodecError> {
        let (value, used) = bincode::serde::decode_from_slice(&self.bytes[self.pos..], config())
            .map_err(|source| CodecError::Decode {
                offset: self.pos,
                source,
            })?;
        self.pos += used;
        Ok(value)
    }

    /// Read a `u32` length prefix and borrow that many bytes.
    pub fn read_blob(&mut self) -> Result<&'a [u8], CodecError> {
        let len = self.read::<u32>()? as usize;
        let available = self.remaining();
        if len > available {
            return Err(CodecError::Truncated {
                offset: self.pos,
                len,
                available,
            });
        }
        let start = self.pos;
        self.pos += len;
        Ok(&self.bytes[start..self.pos])
    }

    /// Byte offset of the next value.
    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos >= self.bytes.len()
    }
}
