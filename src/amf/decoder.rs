//! Decoder state
//!
//! One `Decoder` serves a whole remoting bundle: it owns the byte reader,
//! the current dialect version, and the three reference tables (strings,
//! traits, objects). References on the wire point into earlier bytes of the
//! same region, so the tables have to ride along with the reader.
//!
//! The dialect-specific value readers live in `amf0.rs` and `amf3.rs` as
//! further `impl Decoder` blocks.

use bytes::Bytes;
use std::rc::Rc;

use crate::amf::io::ByteReader;
use crate::amf::registry::{TypeRegistry, TypeShape};
use crate::amf::value::{ClassDef, Value};
use crate::error::{CodecError, RefTable};

/// Maximum nesting depth for objects/arrays (prevents stack overflow)
pub(crate) const MAX_NESTING_DEPTH: usize = 64;

/// AMF decoder: byte reader plus per-bundle reference state
pub struct Decoder {
    pub(crate) reader: ByteReader,

    /// Current dialect: AMF3 iff 3, AMF0 otherwise. Reassigned once the
    /// bundle preamble is read.
    pub(crate) amf_version: u16,

    pub(crate) string_table: Vec<String>,
    pub(crate) class_table: Vec<Rc<ClassDef>>,
    pub(crate) object_table: Vec<Value>,

    pub(crate) registry: TypeRegistry,

    /// Reset the reference tables at the start of each bundle message
    pub(crate) reset_per_message: bool,

    pub(crate) depth: usize,
}

impl Decoder {
    /// Create a decoder over the given bytes, starting in the given dialect
    pub fn new(data: Bytes, amf_version: u16) -> Self {
        Self {
            reader: ByteReader::new(data),
            amf_version,
            string_table: Vec::new(),
            class_table: Vec::new(),
            object_table: Vec::new(),
            registry: TypeRegistry::new(),
            reset_per_message: true,
            depth: 0,
        }
    }

    /// Register a record shape for a wire class name (see `TypeShape`)
    pub fn register_type(&mut self, class_name: impl Into<String>, shape: TypeShape) {
        self.registry.register(class_name, shape);
    }

    /// Control whether reference tables reset between bundle messages.
    ///
    /// Defaults to true; disabling restores the carry-over behavior some
    /// legacy producers rely on.
    pub fn set_reset_per_message(&mut self, enabled: bool) {
        self.reset_per_message = enabled;
    }

    /// Current dialect version
    pub fn amf_version(&self) -> u16 {
        self.amf_version
    }

    pub(crate) fn use_amf3(&self) -> bool {
        self.amf_version == 3
    }

    /// Whether an error has been latched
    pub fn errored(&self) -> bool {
        self.reader.errored()
    }

    /// The latched first error, if any
    pub fn error(&self) -> Option<&CodecError> {
        self.reader.error()
    }

    /// Remove and return the latched first error
    pub fn take_error(&mut self) -> Option<CodecError> {
        self.reader.take_error()
    }

    /// Bytes not yet consumed
    pub fn remaining(&self) -> usize {
        self.reader.remaining()
    }

    /// Clear the three reference tables
    pub fn reset_tables(&mut self) {
        self.string_table.clear();
        self.class_table.clear();
        self.object_table.clear();
    }

    /// Read one value in the current dialect
    pub fn read_value(&mut self) -> Value {
        if self.amf_version == 0 {
            self.read_value_amf0()
        } else {
            self.read_value_amf3()
        }
    }

    /// Latch an error and hand back the placeholder for the failed slot
    pub(crate) fn fail_value(&mut self, err: CodecError) -> Value {
        self.reader.fail(err);
        Value::Null
    }

    /// Enter one nesting level; latches `NestingTooDeep` past the cap
    pub(crate) fn enter(&mut self) -> bool {
        if self.depth >= MAX_NESTING_DEPTH {
            self.reader.fail(CodecError::NestingTooDeep);
            return false;
        }
        self.depth += 1;
        true
    }

    pub(crate) fn leave(&mut self) {
        self.depth -= 1;
    }

    pub(crate) fn store_object(&mut self, value: Value) {
        self.object_table.push(value);
    }

    pub(crate) fn object_by_ref(&mut self, index: usize) -> Value {
        match self.object_table.get(index) {
            Some(value) => value.clone(),
            None => self.fail_value(CodecError::BadReference {
                table: RefTable::Objects,
                index,
                len: self.object_table.len(),
            }),
        }
    }

    /// Read a u16-length-prefixed UTF-8 string (bundle framing and AMF0)
    pub(crate) fn read_utf8(&mut self) -> String {
        let len = self.reader.read_u16() as usize;
        if self.reader.errored() {
            return String::new();
        }
        self.read_utf8_known_length(len)
    }

    /// Read a UTF-8 string of a known byte length
    pub(crate) fn read_utf8_known_length(&mut self, len: usize) -> String {
        let bytes = self.reader.read_bytes(len);
        if self.reader.errored() {
            return String::new();
        }
        match std::str::from_utf8(&bytes) {
            Ok(s) => s.to_string(),
            Err(_) => {
                // Lossy conversion keeps the decode going; the latch still
                // reports the stream as malformed.
                self.reader.fail(CodecError::InvalidUtf8);
                String::from_utf8_lossy(&bytes).into_owned()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decoder(bytes: &[u8], version: u16) -> Decoder {
        Decoder::new(Bytes::copy_from_slice(bytes), version)
    }

    #[test]
    fn test_read_utf8() {
        let mut d = decoder(&[0x00, 0x05, b'H', b'e', b'l', b'l', b'o'], 0);
        assert_eq!(d.read_utf8(), "Hello");
        assert!(!d.errored());
    }

    #[test]
    fn test_read_utf8_truncated() {
        let mut d = decoder(&[0x00, 0x05, b'H', b'i'], 0);
        assert_eq!(d.read_utf8(), "");
        assert_eq!(d.error(), Some(&CodecError::Truncated));
    }

    #[test]
    fn test_read_utf8_invalid_is_lossy_but_latched() {
        let mut d = decoder(&[0x00, 0x02, 0xFF, 0xFE], 0);
        let s = d.read_utf8();
        assert!(!s.is_empty());
        assert_eq!(d.error(), Some(&CodecError::InvalidUtf8));
    }

    #[test]
    fn test_object_ref_out_of_range() {
        let mut d = decoder(&[], 3);
        let v = d.object_by_ref(1);
        assert_eq!(v, Value::Null);
        assert_eq!(
            d.take_error(),
            Some(CodecError::BadReference {
                table: RefTable::Objects,
                index: 1,
                len: 0,
            })
        );
    }

    #[test]
    fn test_reset_tables() {
        let mut d = decoder(&[], 3);
        d.string_table.push("x".to_string());
        d.store_object(Value::Null);
        d.reset_tables();
        assert!(d.string_table.is_empty());
        assert!(d.object_table.is_empty());
        assert!(d.class_table.is_empty());
    }

    #[test]
    fn test_depth_guard() {
        let mut d = decoder(&[], 3);
        for _ in 0..MAX_NESTING_DEPTH {
            assert!(d.enter());
        }
        assert!(!d.enter());
        assert_eq!(d.take_error(), Some(CodecError::NestingTooDeep));
    }
}
