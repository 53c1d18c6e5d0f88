//! AMF (Action Message Format) implementation
//!
//! AMF is Adobe's binary serialization format used by Flash/Flex remoting.
//! Two wire dialects coexist: AMF0 (legacy) and AMF3 (compact,
//! reference-encoded). Remoting envelopes mostly speak AMF0 and escape
//! into AMF3 per value via the avm-plus marker (0x11).
//!
//! The `Decoder` carries the per-bundle reference tables; the dialect
//! codecs in `amf0` and `amf3` are `impl` blocks on it because AMF3
//! references point at earlier bytes of the same region regardless of
//! which dialect introduced them.

pub mod amf0;
pub mod amf3;
pub mod decoder;
pub mod encoder;
pub mod io;
pub mod registry;
pub mod value;

pub use amf3::{decode_value_amf3, encode_value_amf3};
pub use decoder::Decoder;
pub use encoder::Encoder;
pub use registry::{TypeRegistry, TypeShape};
pub use value::{ArrayRef, AvmArray, AvmObject, ClassDef, MapRef, ObjectRef, Value};
