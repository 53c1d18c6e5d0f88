//! Encoder state
//!
//! The encoder writes everything inline: no outgoing string/traits/object
//! references are emitted, which the wire format permits (a reference-free
//! stream is always decodable). The depth guard is what keeps a cyclic
//! value graph from recursing forever without a reference table.

use bytes::Bytes;

use crate::amf::decoder::MAX_NESTING_DEPTH;
use crate::amf::io::ByteWriter;
use crate::error::CodecError;

/// AMF encoder over a growable buffer
pub struct Encoder {
    pub(crate) writer: ByteWriter,
    pub(crate) depth: usize,
}

impl Encoder {
    pub fn new() -> Self {
        Self {
            writer: ByteWriter::new(),
            depth: 0,
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            writer: ByteWriter::with_capacity(capacity),
            depth: 0,
        }
    }

    /// Take the encoded bytes, leaving the encoder reusable
    pub fn finish(&mut self) -> Bytes {
        self.writer.finish()
    }

    /// Current encoded length
    pub fn len(&self) -> usize {
        self.writer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.writer.is_empty()
    }

    pub(crate) fn enter(&mut self) -> Result<(), CodecError> {
        if self.depth >= MAX_NESTING_DEPTH {
            return Err(CodecError::NestingTooDeep);
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }
}

impl Default for Encoder {
    fn default() -> Self {
        Self::new()
    }
}
