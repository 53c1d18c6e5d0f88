//! AMF0 value encoding and decoding
//!
//! AMF0 is the legacy Flash dialect. Remoting envelopes only exercise a
//! small subset of it: number, boolean, string, anonymous object, null,
//! undefined, and the avm-plus escape that hands the next value to AMF3
//! while keeping the current reference tables. The remaining markers are
//! recognized and refused rather than decoded into garbage.
//!
//! Type markers:
//! ```text
//! 0x00 - Number (IEEE 754 double)
//! 0x01 - Boolean
//! 0x02 - String (UTF-8, 16-bit length prefix)
//! 0x03 - Object (name/value pairs until a zero-length name)
//! 0x04 - MovieClip (reserved, not supported)
//! 0x05 - Null
//! 0x06 - Undefined
//! 0x07 - Reference (not supported)
//! 0x08 - ECMA Array (not supported)
//! 0x09 - Object End
//! 0x0A - Strict Array (not supported)
//! 0x0B - Date (not supported)
//! 0x0C - Long String (not supported)
//! 0x0D - Unsupported
//! 0x0E - RecordSet (reserved, not supported)
//! 0x0F - XML Document (not supported)
//! 0x10 - Typed Object (not supported)
//! 0x11 - AVM+ (switch to AMF3)
//! ```

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::amf::decoder::Decoder;
use crate::amf::encoder::Encoder;
use crate::amf::value::Value;
use crate::error::CodecError;

// AMF0 type markers
const MARKER_NUMBER: u8 = 0x00;
const MARKER_BOOLEAN: u8 = 0x01;
const MARKER_STRING: u8 = 0x02;
const MARKER_OBJECT: u8 = 0x03;
const MARKER_MOVIE_CLIP: u8 = 0x04;
const MARKER_NULL: u8 = 0x05;
const MARKER_UNDEFINED: u8 = 0x06;
const MARKER_REFERENCE: u8 = 0x07;
const MARKER_ECMA_ARRAY: u8 = 0x08;
const MARKER_OBJECT_END: u8 = 0x09;
const MARKER_STRICT_ARRAY: u8 = 0x0A;
const MARKER_DATE: u8 = 0x0B;
const MARKER_LONG_STRING: u8 = 0x0C;
const MARKER_UNSUPPORTED: u8 = 0x0D;
const MARKER_RECORDSET: u8 = 0x0E;
const MARKER_XML_DOCUMENT: u8 = 0x0F;
const MARKER_TYPED_OBJECT: u8 = 0x10;
pub(crate) const MARKER_AVMPLUS: u8 = 0x11;

impl Decoder {
    /// Decode a single AMF0 value
    pub fn read_value_amf0(&mut self) -> Value {
        let marker = self.reader.read_u8();
        if self.reader.errored() {
            return Value::Null;
        }

        if !self.enter() {
            return Value::Null;
        }
        let value = match marker {
            MARKER_NUMBER => Value::Double(self.reader.read_f64()),
            MARKER_BOOLEAN => Value::Boolean(self.reader.read_u8() != 0),
            MARKER_STRING => Value::String(self.read_utf8()),
            MARKER_OBJECT => self.read_object_amf0(),
            MARKER_NULL => Value::Null,
            MARKER_UNDEFINED => Value::Undefined,
            // The escape keeps the current reference tables.
            MARKER_AVMPLUS => self.read_value_amf3(),
            MARKER_MOVIE_CLIP => self.fail_value(CodecError::Unsupported("movie clip")),
            MARKER_REFERENCE => self.fail_value(CodecError::Unsupported("amf0 reference")),
            MARKER_ECMA_ARRAY => self.fail_value(CodecError::Unsupported("ecma array")),
            MARKER_OBJECT_END => self.fail_value(CodecError::Unsupported("stray object end")),
            MARKER_STRICT_ARRAY => self.fail_value(CodecError::Unsupported("strict array")),
            MARKER_DATE => self.fail_value(CodecError::Unsupported("date")),
            MARKER_LONG_STRING => self.fail_value(CodecError::Unsupported("long string")),
            MARKER_UNSUPPORTED => self.fail_value(CodecError::Unsupported("unsupported marker")),
            MARKER_RECORDSET => self.fail_value(CodecError::Unsupported("recordset")),
            MARKER_XML_DOCUMENT => self.fail_value(CodecError::Unsupported("xml document")),
            MARKER_TYPED_OBJECT => self.fail_value(CodecError::Unsupported("typed object")),
            other => self.fail_value(CodecError::UnknownMarker(other)),
        };
        self.leave();
        value
    }

    fn read_object_amf0(&mut self) -> Value {
        let map = Rc::new(RefCell::new(HashMap::new()));

        loop {
            if self.reader.errored() {
                break;
            }
            let name = self.read_utf8();

            // A zero-length name terminates the object; the standard
            // trailing end marker is consumed when present.
            if name.is_empty() {
                if self.reader.peek_u8() == Some(MARKER_OBJECT_END) {
                    self.reader.read_u8();
                }
                break;
            }

            let value = self.read_value_amf0();
            map.borrow_mut().insert(name, value);
        }

        Value::Object(map)
    }
}

impl Encoder {
    /// Encode a single AMF0 value.
    ///
    /// Values the AMF0 subset cannot express (arrays, typed objects,
    /// strings past the u16 length prefix) go through the AVM+ escape.
    pub fn write_value_amf0(&mut self, value: &Value) -> Result<(), CodecError> {
        self.enter()?;
        let result = self.write_value_amf0_inner(value);
        self.leave();
        result
    }

    fn write_value_amf0_inner(&mut self, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Null => self.writer.write_u8(MARKER_NULL),
            Value::Undefined => self.writer.write_u8(MARKER_UNDEFINED),
            Value::Boolean(b) => {
                self.writer.write_u8(MARKER_BOOLEAN);
                self.writer.write_u8(u8::from(*b));
            }
            Value::Double(n) => {
                self.writer.write_u8(MARKER_NUMBER);
                self.writer.write_f64(*n);
            }
            Value::Integer(i) => {
                // AMF0 has no integer type.
                self.writer.write_u8(MARKER_NUMBER);
                self.writer.write_f64(f64::from(*i));
            }
            Value::String(s) if s.len() <= 0xFFFF => {
                self.writer.write_u8(MARKER_STRING);
                self.write_utf8(s);
            }
            Value::Object(map) => {
                self.writer.write_u8(MARKER_OBJECT);
                for (name, value) in map.borrow().iter() {
                    self.write_utf8(name);
                    self.write_value_amf0(value)?;
                }
                self.writer.write_u16(0);
                self.writer.write_u8(MARKER_OBJECT_END);
            }
            Value::String(_) | Value::Array(_) | Value::Typed(_) => {
                self.writer.write_u8(MARKER_AVMPLUS);
                self.write_value_amf3(value)?;
            }
        }
        Ok(())
    }

    /// Write a UTF-8 string with a 16-bit length prefix (no type marker)
    pub(crate) fn write_utf8(&mut self, s: &str) {
        self.writer.write_u16(s.len() as u16);
        self.writer.write_slice(s.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn unhex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    fn decode(data: &[u8]) -> (Value, Option<CodecError>) {
        let mut decoder = Decoder::new(Bytes::copy_from_slice(data), 0);
        let value = decoder.read_value_amf0();
        (value, decoder.take_error())
    }

    fn encode(value: &Value) -> Vec<u8> {
        let mut encoder = Encoder::new();
        encoder.write_value_amf0(value).unwrap();
        encoder.finish().to_vec()
    }

    #[test]
    fn test_number_roundtrip() {
        let value = Value::Double(42.5);
        let (decoded, err) = decode(&encode(&value));
        assert_eq!(err, None);
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_boolean() {
        let (decoded, err) = decode(&unhex("0101"));
        assert_eq!(err, None);
        assert_eq!(decoded, Value::Boolean(true));

        // Any non-zero byte reads as true.
        let (decoded, _) = decode(&unhex("01ff"));
        assert_eq!(decoded, Value::Boolean(true));

        let (decoded, _) = decode(&unhex("0100"));
        assert_eq!(decoded, Value::Boolean(false));
    }

    #[test]
    fn test_string() {
        let (decoded, err) = decode(&unhex("02000548656c6c6f"));
        assert_eq!(err, None);
        assert_eq!(decoded, Value::String("Hello".into()));

        assert_eq!(encode(&Value::String("Hello".into())), unhex("02000548656c6c6f"));
    }

    #[test]
    fn test_null_and_undefined_distinct() {
        let (null, _) = decode(&unhex("05"));
        let (undefined, _) = decode(&unhex("06"));
        assert_eq!(null, Value::Null);
        assert_eq!(undefined, Value::Undefined);

        assert_eq!(encode(&Value::Null), unhex("05"));
        assert_eq!(encode(&Value::Undefined), unhex("06"));
    }

    #[test]
    fn test_object_roundtrip() {
        let mut fields = HashMap::new();
        fields.insert("name".to_string(), Value::String("test".into()));
        fields.insert("value".to_string(), Value::Double(123.0));
        let value = Value::object(fields);

        let (decoded, err) = decode(&encode(&value));
        assert_eq!(err, None);
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_object_end_without_marker() {
        // name "a" -> number 1.0, then a zero-length name with no trailing
        // 0x09: the zero-length name alone terminates.
        let (decoded, err) = decode(&unhex("03000161003ff00000000000000000"));
        assert_eq!(err, None);
        match decoded {
            Value::Object(map) => {
                let map = map.borrow();
                assert_eq!(map.len(), 1);
                assert_eq!(map.get("a"), Some(&Value::Double(1.0)));
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_integer_becomes_number() {
        let encoded = encode(&Value::Integer(7));
        let (decoded, err) = decode(&encoded);
        assert_eq!(err, None);
        assert_eq!(decoded, Value::Double(7.0));
    }

    #[test]
    fn test_avmplus_escape_decodes_amf3() {
        // 0x11 escape followed by an AMF3 integer.
        let (decoded, err) = decode(&unhex("110401"));
        assert_eq!(err, None);
        assert_eq!(decoded, Value::Integer(1));
    }

    #[test]
    fn test_array_escapes_to_amf3() {
        let value: Value = vec![1u32, 2, 3].into();
        let encoded = encode(&value);
        assert_eq!(encoded[0], MARKER_AVMPLUS);

        let (decoded, err) = decode(&encoded);
        assert_eq!(err, None);
        assert_eq!(decoded, value);
    }

    #[test]
    fn test_long_string_escapes_to_amf3() {
        let long = "x".repeat(70_000);
        let value = Value::String(long.clone());
        let encoded = encode(&value);
        assert_eq!(encoded[0], MARKER_AVMPLUS);

        let (decoded, err) = decode(&encoded);
        assert_eq!(err, None);
        assert_eq!(decoded, Value::String(long));
    }

    #[test]
    fn test_unsupported_markers_refused() {
        for (marker, what) in [
            ("07", "amf0 reference"),
            ("08", "ecma array"),
            ("0a", "strict array"),
            ("0b", "date"),
            ("0c", "long string"),
            ("0f", "xml document"),
            ("10", "typed object"),
        ] {
            let (value, err) = decode(&unhex(marker));
            assert_eq!(value, Value::Null);
            assert_eq!(err, Some(CodecError::Unsupported(what)), "marker {}", marker);
        }
    }

    #[test]
    fn test_unknown_marker() {
        let (_, err) = decode(&unhex("7f"));
        assert_eq!(err, Some(CodecError::UnknownMarker(0x7F)));
    }
}
