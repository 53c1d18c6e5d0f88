//! AMF3 value encoding and decoding
//!
//! AMF3 is the compact ActionScript 3 dialect. Every reference-capable
//! value (string, object, array, traits) starts with a U29 whose low bit
//! separates inline data (low bit set, remaining bits are a length or
//! traits flags) from a back-reference into one of the decoder's tables.
//!
//! Type markers:
//! ```text
//! 0x00 - Undefined
//! 0x01 - Null
//! 0x02 - False
//! 0x03 - True
//! 0x04 - Integer (U29)
//! 0x05 - Double (IEEE 754)
//! 0x06 - String (UTF-8, U29 length/reference)
//! 0x07 - XML Document (not supported)
//! 0x08 - Date (not supported)
//! 0x09 - Array (dense + associative portions)
//! 0x0A - Object (traits + static/dynamic fields)
//! 0x0B - AVM+ XML (not supported)
//! 0x0C - ByteArray (not supported)
//! ```

use bytes::Bytes;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::amf::amf0::MARKER_AVMPLUS;
use crate::amf::decoder::Decoder;
use crate::amf::encoder::Encoder;
use crate::amf::value::{AvmArray, AvmObject, ClassDef, Value};
use crate::error::{CodecError, RefTable};

// AMF3 type markers
const MARKER_UNDEFINED: u8 = 0x00;
const MARKER_NULL: u8 = 0x01;
const MARKER_FALSE: u8 = 0x02;
const MARKER_TRUE: u8 = 0x03;
const MARKER_INTEGER: u8 = 0x04;
const MARKER_DOUBLE: u8 = 0x05;
const MARKER_STRING: u8 = 0x06;
const MARKER_XML: u8 = 0x07;
const MARKER_DATE: u8 = 0x08;
pub(crate) const MARKER_ARRAY: u8 = 0x09;
const MARKER_OBJECT: u8 = 0x0A;
const MARKER_AVMPLUS_XML: u8 = 0x0B;
const MARKER_BYTE_ARRAY: u8 = 0x0C;

impl Decoder {
    /// Decode a single AMF3 value
    pub fn read_value_amf3(&mut self) -> Value {
        let mut marker = self.reader.read_u8();
        if self.reader.errored() {
            return Value::Null;
        }

        // Flash Player 9 will sometimes wrap data as an AMF0 value, which
        // just means an extra avm-plus marker we can unambiguously skip.
        if marker == MARKER_AVMPLUS {
            marker = self.reader.read_u8();
            if self.reader.errored() {
                return Value::Null;
            }
        }

        if !self.enter() {
            return Value::Null;
        }
        let value = match marker {
            MARKER_UNDEFINED => Value::Undefined,
            MARKER_NULL => Value::Null,
            MARKER_FALSE => Value::Boolean(false),
            MARKER_TRUE => Value::Boolean(true),
            MARKER_INTEGER => Value::Integer(self.reader.read_u29()),
            MARKER_DOUBLE => Value::Double(self.reader.read_f64()),
            MARKER_STRING => Value::String(self.read_string_amf3()),
            MARKER_ARRAY => self.read_array_amf3(),
            MARKER_OBJECT => self.read_object_amf3(),
            MARKER_XML => self.fail_value(CodecError::Unsupported("xml")),
            MARKER_DATE => self.fail_value(CodecError::Unsupported("date")),
            MARKER_AVMPLUS_XML => self.fail_value(CodecError::Unsupported("avm+ xml")),
            MARKER_BYTE_ARRAY => self.fail_value(CodecError::Unsupported("byte array")),
            other => self.fail_value(CodecError::UnknownMarker(other)),
        };
        self.leave();
        value
    }

    /// Decode an AMF3 string with string-table semantics.
    ///
    /// The empty string is always inline and never enters the table; it
    /// doubles as the terminator for dynamic-field and associative lists.
    pub(crate) fn read_string_amf3(&mut self) -> String {
        let ref_bits = self.reader.read_u29();
        if self.reader.errored() {
            return String::new();
        }

        // Low bit clear means a reference into the string table.
        if ref_bits & 1 == 0 {
            let index = (ref_bits >> 1) as usize;
            return match self.string_table.get(index) {
                Some(s) => s.clone(),
                None => {
                    self.reader.fail(CodecError::BadReference {
                        table: RefTable::Strings,
                        index,
                        len: self.string_table.len(),
                    });
                    String::new()
                }
            };
        }

        let len = (ref_bits >> 1) as usize;
        if len == 0 {
            return String::new();
        }

        let s = self.read_utf8_known_length(len);
        if self.reader.errored() {
            return s;
        }
        self.string_table.push(s.clone());
        s
    }

    fn read_object_amf3(&mut self) -> Value {
        let ref_bits = self.reader.read_u29();
        if self.reader.errored() {
            return Value::Null;
        }

        if ref_bits & 1 == 0 {
            return self.object_by_ref((ref_bits >> 1) as usize);
        }

        let class = match self.read_class_definition_amf3(ref_bits) {
            Some(class) => class,
            None => return Value::Null,
        };

        if class.externalizable {
            return self.fail_value(CodecError::Unsupported("externalizable object"));
        }

        // An anonymous class yields a plain map; static properties fold in
        // by name alongside any dynamic fields.
        if class.name.is_empty() {
            let map = Rc::new(RefCell::new(HashMap::new()));
            self.store_object(Value::Object(map.clone()));

            for property in class.properties.iter() {
                if self.reader.errored() {
                    break;
                }
                let value = self.read_value_amf3();
                map.borrow_mut().insert(property.clone(), value);
            }
            if class.dynamic {
                loop {
                    let name = self.read_string_amf3();
                    if name.is_empty() {
                        break;
                    }
                    let value = self.read_value_amf3();
                    map.borrow_mut().insert(name, value);
                }
            }
            return Value::Object(map);
        }

        let object = Rc::new(RefCell::new(AvmObject::new(class.clone())));
        // Store before decoding contents so a self-referential field
        // resolves to this same object.
        self.store_object(Value::Typed(object.clone()));

        for _ in 0..class.properties.len() {
            if self.reader.errored() {
                break;
            }
            let value = self.read_value_amf3();
            object.borrow_mut().static_fields.push(value);
        }

        if class.dynamic {
            loop {
                let name = self.read_string_amf3();
                if name.is_empty() {
                    break;
                }
                let value = self.read_value_amf3();
                object.borrow_mut().dynamic_fields.insert(name, value);
            }
        }

        if self.registry.contains(&class.name) {
            self.registry.project(&mut object.borrow_mut());
        }

        Value::Typed(object)
    }

    fn read_class_definition_amf3(&mut self, ref_bits: u32) -> Option<Rc<ClassDef>> {
        // Bit 1 clear means a reference to an existing class definition.
        if ref_bits & 2 == 0 {
            let index = (ref_bits >> 2) as usize;
            return match self.class_table.get(index) {
                Some(class) => Some(class.clone()),
                None => {
                    self.reader.fail(CodecError::BadReference {
                        table: RefTable::Traits,
                        index,
                        len: self.class_table.len(),
                    });
                    None
                }
            };
        }

        let name = self.read_string_amf3();
        let externalizable = ref_bits & 4 != 0;
        let dynamic = ref_bits & 8 != 0;
        let property_count = (ref_bits >> 4) as usize;

        let mut properties = Vec::with_capacity(property_count.min(64));
        for _ in 0..property_count {
            if self.reader.errored() {
                break;
            }
            properties.push(self.read_string_amf3());
        }

        let class = Rc::new(ClassDef {
            name,
            externalizable,
            dynamic,
            properties,
        });
        // Identical contents appearing twice inline still get two entries.
        self.class_table.push(class.clone());
        Some(class)
    }

    fn read_array_amf3(&mut self) -> Value {
        let ref_bits = self.reader.read_u29();
        if self.reader.errored() {
            return Value::Null;
        }

        if ref_bits & 1 == 0 {
            return self.object_by_ref((ref_bits >> 1) as usize);
        }

        let element_count = (ref_bits >> 1) as usize;

        let array = Rc::new(RefCell::new(AvmArray::default()));
        self.store_object(Value::Array(array.clone()));

        // Associative entries come first, terminated by the empty key.
        let mut key = self.read_string_amf3();
        while !key.is_empty() {
            let value = self.read_value_amf3();
            array.borrow_mut().fields.insert(key, value);
            key = self.read_string_amf3();
        }

        array
            .borrow_mut()
            .elements
            .reserve(element_count.min(1024));
        for _ in 0..element_count {
            if self.reader.errored() {
                break;
            }
            let value = self.read_value_amf3();
            array.borrow_mut().elements.push(value);
        }

        Value::Array(array)
    }
}

impl Encoder {
    /// Encode a single AMF3 value
    pub fn write_value_amf3(&mut self, value: &Value) -> Result<(), CodecError> {
        self.enter()?;
        let result = self.write_value_amf3_inner(value);
        self.leave();
        result
    }

    fn write_value_amf3_inner(&mut self, value: &Value) -> Result<(), CodecError> {
        match value {
            Value::Undefined => self.writer.write_u8(MARKER_UNDEFINED),
            Value::Null => self.writer.write_u8(MARKER_NULL),
            Value::Boolean(false) => self.writer.write_u8(MARKER_FALSE),
            Value::Boolean(true) => self.writer.write_u8(MARKER_TRUE),
            Value::Integer(i) => {
                self.writer.write_u8(MARKER_INTEGER);
                self.writer.write_u29(*i);
            }
            Value::Double(n) => {
                self.writer.write_u8(MARKER_DOUBLE);
                self.writer.write_f64(*n);
            }
            Value::String(s) => {
                self.writer.write_u8(MARKER_STRING);
                self.write_string_amf3(s);
            }
            Value::Array(array) => {
                self.writer.write_u8(MARKER_ARRAY);
                let array = array.borrow();
                self.writer
                    .write_u29(((array.elements.len() as u32) << 1) | 1);
                for (key, value) in array.fields.iter() {
                    self.write_string_amf3(key);
                    self.write_value_amf3(value)?;
                }
                self.write_string_amf3("");
                for element in array.elements.iter() {
                    self.write_value_amf3(element)?;
                }
            }
            Value::Object(map) => {
                self.writer.write_u8(MARKER_OBJECT);
                // Inline object, inline traits, dynamic, zero statics.
                self.writer.write_u29(0x0B);
                self.write_string_amf3("");
                let map = map.borrow();
                for (name, value) in map.iter() {
                    self.write_string_amf3(name);
                    self.write_value_amf3(value)?;
                }
                self.write_string_amf3("");
            }
            Value::Typed(object) => {
                let object = object.borrow();
                let class = &object.class;
                if class.externalizable {
                    return Err(CodecError::Unsupported("externalizable object"));
                }
                self.writer.write_u8(MARKER_OBJECT);

                let mut bits: u32 = 0x03; // inline object, inline traits
                if class.dynamic {
                    bits |= 0x08;
                }
                bits |= (class.properties.len() as u32) << 4;
                self.writer.write_u29(bits);

                self.write_string_amf3(&class.name);
                for name in class.properties.iter() {
                    self.write_string_amf3(name);
                }
                for value in object.static_fields.iter() {
                    self.write_value_amf3(value)?;
                }
                if class.dynamic {
                    for (name, value) in object.dynamic_fields.iter() {
                        self.write_string_amf3(name);
                        self.write_value_amf3(value)?;
                    }
                    self.write_string_amf3("");
                }
            }
        }
        Ok(())
    }

    /// Write an AMF3 string inline (no outgoing references)
    pub(crate) fn write_string_amf3(&mut self, s: &str) {
        self.writer.write_u29(((s.len() as u32) << 1) | 1);
        self.writer.write_slice(s.as_bytes());
    }
}

/// Decode one AMF3 value from a byte slice.
///
/// Returns the best-effort value and the latched first error, which is
/// `None` iff the decode was clean.
pub fn decode_value_amf3(data: &[u8]) -> (Value, Option<CodecError>) {
    let mut decoder = Decoder::new(Bytes::copy_from_slice(data), 3);
    let value = decoder.read_value_amf3();
    (value, decoder.take_error())
}

/// Encode one value as AMF3
pub fn encode_value_amf3(value: &Value) -> Result<Bytes, CodecError> {
    let mut encoder = Encoder::new();
    encoder.write_value_amf3(value)?;
    Ok(encoder.finish())
}
