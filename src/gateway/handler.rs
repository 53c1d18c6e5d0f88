//! Remoting handler trait
//!
//! The main extension point for gateway applications. Implement this trait
//! to answer remoting calls and to install type registrations.
//!
//! Connection-level hooks are async; the per-message callback is
//! synchronous because decoded value trees are single-threaded and live
//! only between reading the request body and writing the reply.

use async_trait::async_trait;
use std::net::SocketAddr;

use crate::amf::decoder::Decoder;
use crate::amf::value::Value;
use crate::bundle::AmfMessage;

/// Outcome of handling one remoting message
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    /// Successful call; replied on `<target>/onResult`
    Result(Value),

    /// Runtime error; replied on `<target>/onStatus`
    Status(Value),
}

impl HandlerResult {
    /// Check if the result is a success
    pub fn is_result(&self) -> bool {
        matches!(self, HandlerResult::Result(_))
    }

    /// The reply body, whichever way the call went
    pub fn into_body(self) -> Value {
        match self {
            HandlerResult::Result(value) | HandlerResult::Status(value) => value,
        }
    }
}

/// Handler trait for remoting gateways
///
/// # Example
///
/// ```ignore
/// use amf_rs::gateway::{HandlerResult, RemotingHandler};
/// use amf_rs::bundle::AmfMessage;
/// use amf_rs::Value;
///
/// struct EchoHandler;
///
/// #[async_trait::async_trait]
/// impl RemotingHandler for EchoHandler {
///     fn handle_message(&self, message: &AmfMessage) -> HandlerResult {
///         HandlerResult::Result(message.body.clone())
///     }
/// }
/// ```
#[async_trait]
pub trait RemotingHandler: Send + Sync + 'static {
    /// Called when a new connection is accepted
    ///
    /// Return false to close the connection immediately. Use this for
    /// IP-based rate limiting or blocklists.
    async fn on_connection(&self, _peer_addr: SocketAddr) -> bool {
        true
    }

    /// Install type registrations on a fresh decoder.
    ///
    /// The gateway registers the Flex RemotingMessage shape by default;
    /// override to add application classes.
    fn register_types(&self, decoder: &mut Decoder) {
        decoder.register_type(
            crate::flex::class_names::REMOTING_MESSAGE,
            crate::flex::remoting_message_shape(),
        );
    }

    /// Answer one remoting message
    fn handle_message(&self, message: &AmfMessage) -> HandlerResult;

    /// Called after the reply bundle has been written
    async fn on_reply_sent(&self, _peer_addr: SocketAddr, _bytes: usize) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_result() {
        let ok = HandlerResult::Result(Value::String("hello".into()));
        assert!(ok.is_result());
        assert_eq!(ok.into_body(), Value::String("hello".into()));

        let failed = HandlerResult::Status(Value::Null);
        assert!(!failed.is_result());
        assert_eq!(failed.into_body(), Value::Null);
    }
}
