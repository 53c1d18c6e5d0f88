//! amf-rs: AMF codec and remoting gateway library
//!
//! This library implements Adobe's Action Message Format as used by
//! Flash/Flex remoting:
//! - AMF3 value encoding/decoding with the string/traits/object reference
//!   tables, U29 variable-length integers, class traits, dynamic objects
//!   and mixed arrays
//! - The AMF0 subset remoting preambles use, plus the AVM+ escape into
//!   AMF3
//! - The remoting envelope (version preamble, headers, messages) with the
//!   non-standard count-framed request bodies real Flash clients send
//! - A small HTTP gateway that serves `application/x-amf` POST requests
//!
//! # Example: decoding a value
//!
//! ```
//! use amf_rs::{decode_value_amf3, Value};
//!
//! let (value, err) = decode_value_amf3(&[0x04, 0x2A]);
//! assert_eq!(err, None);
//! assert_eq!(value, Value::Integer(42));
//! ```
//!
//! # Example: a gateway
//!
//! ```no_run
//! use amf_rs::bundle::AmfMessage;
//! use amf_rs::gateway::{GatewayConfig, HandlerResult, RemotingGateway, RemotingHandler};
//! use amf_rs::Value;
//!
//! struct EchoHandler;
//!
//! #[async_trait::async_trait]
//! impl RemotingHandler for EchoHandler {
//!     fn handle_message(&self, message: &AmfMessage) -> HandlerResult {
//!         HandlerResult::Result(message.body.clone())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gateway = RemotingGateway::new(GatewayConfig::default(), EchoHandler);
//!     gateway.run().await?;
//!     Ok(())
//! }
//! ```

pub mod amf;
pub mod bundle;
pub mod error;
pub mod flex;
pub mod gateway;

// Re-export main types for convenience
pub use amf::{decode_value_amf3, encode_value_amf3};
pub use amf::{ClassDef, Decoder, Encoder, TypeShape, Value};
pub use bundle::{decode_bundle, encode_bundle, AmfHeader, AmfMessage, MessageBundle};
pub use error::{CodecError, Error, RefTable, Result};
pub use gateway::{GatewayConfig, HandlerResult, RemotingGateway, RemotingHandler};
