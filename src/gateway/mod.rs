//! HTTP remoting gateway
//!
//! Wraps the codec in the outer surface a Flash/Flex client expects: an
//! HTTP POST endpoint speaking `application/x-amf`. The gateway decodes
//! the request bundle, hands each message to the application handler, and
//! answers with an AMF3 reply bundle on the `/onResult` / `/onStatus`
//! target convention.

pub mod config;
pub mod connection;
pub mod handler;
pub mod listener;

pub use config::GatewayConfig;
pub use handler::{HandlerResult, RemotingHandler};
pub use listener::RemotingGateway;
