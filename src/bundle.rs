//! Remoting bundle framing
//!
//! The envelope around AMF values: a two-byte version preamble, a
//! u16-counted header list, and a u16-counted message list. Reference: the
//! envelope description at osflash.org/documentation/amf/envelopes/remoting.
//!
//! The preamble's version selects the dialect for every value in the
//! bundle: AMF3 iff the version is 3, AMF0 otherwise (Flash Player 9
//! always sends 3). The per-header and per-message byte lengths are
//! advisory; decoding never trusts them to bound reads.
//!
//! Request bodies are not bare values: real Flash clients frame the
//! arguments as a strict array with a plain u32 element count and no
//! reference bit. The decoder peeks for that shape and falls back to a
//! bare value, and replies are written as bare values.

use bytes::Bytes;

use crate::amf::decoder::Decoder;
use crate::amf::encoder::Encoder;
use crate::amf::value::Value;
use crate::amf::amf3::MARKER_ARRAY;
use crate::error::CodecError;

/// A decoded remoting envelope
#[derive(Debug, Clone, PartialEq, Default)]
pub struct MessageBundle {
    pub amf_version: u16,
    pub headers: Vec<AmfHeader>,
    pub messages: Vec<AmfMessage>,
}

/// A bundle header: name, must-understand flag, and one value
#[derive(Debug, Clone, PartialEq)]
pub struct AmfHeader {
    pub name: String,
    pub must_understand: bool,
    pub value: Value,
}

/// A single request or response within a bundle
#[derive(Debug, Clone, PartialEq)]
pub struct AmfMessage {
    pub target_uri: String,
    pub response_uri: String,
    pub body: Value,
}

impl AmfMessage {
    /// Build the reply to this message.
    ///
    /// A successful reply answers on `<target>/onResult`, a failed one on
    /// `<target>/onStatus`; the response URI is cleared either way.
    pub fn reply(&self, body: Value, success: bool) -> AmfMessage {
        let suffix = if success { "/onResult" } else { "/onStatus" };
        AmfMessage {
            target_uri: format!("{}{}", self.target_uri, suffix),
            response_uri: String::new(),
            body,
        }
    }
}

impl Decoder {
    /// Decode a whole remoting bundle.
    ///
    /// Returns the best-effort bundle; the latched first error stays on
    /// the decoder for `take_error`. A preamble version above 9 aborts
    /// immediately.
    pub fn read_bundle(&mut self) -> MessageBundle {
        let mut bundle = MessageBundle::default();

        let amf_version = self.reader.read_u16();
        bundle.amf_version = amf_version;

        // The preamble indicates what kind of player connected: 0x00 for
        // Flash Player 8 and below, 0x01 for FlashCom/FMS, 0x03 for Flash
        // Player 9. Anything past 9 is not a remoting stream.
        if amf_version > 0x09 {
            self.reader.fail(CodecError::MalformedPreamble(amf_version));
            return bundle;
        }

        // The decoder starts in AMF0 until the preamble says otherwise.
        self.amf_version = amf_version;

        let header_count = self.reader.read_u16();
        for _ in 0..header_count {
            if self.errored() {
                break;
            }
            let name = self.read_utf8();
            let must_understand = self.reader.read_u8() != 0;
            let _byte_length = self.reader.read_u32();
            let value = self.read_value();
            tracing::debug!(header = %name, must_understand, "read bundle header");
            bundle.headers.push(AmfHeader {
                name,
                must_understand,
                value,
            });
        }

        let message_count = self.reader.read_u16();
        for _ in 0..message_count {
            if self.errored() {
                break;
            }
            if self.reset_per_message {
                self.reset_tables();
            }

            let target_uri = self.read_utf8();
            let response_uri = self.read_utf8();
            let _byte_length = self.reader.read_u32();
            let body = self.read_message_body();
            tracing::debug!(target = %target_uri, response = %response_uri, "read bundle message");
            bundle.messages.push(AmfMessage {
                target_uri,
                response_uri,
                body,
            });
        }

        bundle
    }

    // Request bodies carry a strict array of arguments framed with a raw
    // u32 count and no reference bit. Anything not starting with the
    // array marker decodes as a bare value.
    fn read_message_body(&mut self) -> Value {
        if self.reader.peek_u8() != Some(MARKER_ARRAY) {
            return self.read_value();
        }
        self.reader.read_u8();

        let count = self.reader.read_u32() as usize;
        let mut args = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            if self.errored() {
                break;
            }
            args.push(self.read_value());
        }
        Value::dense_array(args)
    }
}

impl Encoder {
    /// Encode a whole remoting bundle.
    ///
    /// Values are written in the bundle's dialect; message bodies are bare
    /// values (the response-direction shape). Byte lengths are computed
    /// for real via a scratch encoder.
    pub fn write_bundle(&mut self, bundle: &MessageBundle) -> Result<(), CodecError> {
        self.writer.write_u16(bundle.amf_version);

        self.writer.write_u16(bundle.headers.len() as u16);
        for header in bundle.headers.iter() {
            self.write_utf8(&header.name);
            self.writer.write_u8(u8::from(header.must_understand));
            let payload = encode_in_dialect(bundle.amf_version, &header.value)?;
            self.writer.write_u32(payload.len() as u32);
            self.writer.write_slice(&payload);
        }

        self.writer.write_u16(bundle.messages.len() as u16);
        for message in bundle.messages.iter() {
            self.write_utf8(&message.target_uri);
            self.write_utf8(&message.response_uri);
            let payload = encode_in_dialect(bundle.amf_version, &message.body)?;
            self.writer.write_u32(payload.len() as u32);
            self.writer.write_slice(&payload);
        }

        Ok(())
    }
}

fn encode_in_dialect(amf_version: u16, value: &Value) -> Result<Bytes, CodecError> {
    let mut scratch = Encoder::new();
    if amf_version == 3 {
        scratch.write_value_amf3(value)?;
    } else {
        scratch.write_value_amf0(value)?;
    }
    Ok(scratch.finish())
}

/// Decode a remoting bundle from a byte slice.
///
/// Returns the best-effort bundle and the latched first error, which is
/// `None` iff the decode was clean.
pub fn decode_bundle(data: &[u8]) -> (MessageBundle, Option<CodecError>) {
    let mut decoder = Decoder::new(Bytes::copy_from_slice(data), 0);
    let bundle = decoder.read_bundle();
    (bundle, decoder.take_error())
}

/// Encode a remoting bundle to bytes
pub fn encode_bundle(bundle: &MessageBundle) -> Result<Bytes, CodecError> {
    let mut encoder = Encoder::new();
    encoder.write_bundle(bundle)?;
    Ok(encoder.finish())
}
