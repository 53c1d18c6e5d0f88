//! Echo remoting gateway example
//!
//! Run with: cargo run --example gateway_server
//!
//! Serves an AMF remoting endpoint on http://localhost:8082/. Every
//! request message is answered on its `/onResult` target with a greeting,
//! which is what the simplest Flex RemoteObject round-trip expects.

use amf_rs::bundle::AmfMessage;
use amf_rs::gateway::{GatewayConfig, HandlerResult, RemotingGateway, RemotingHandler};
use amf_rs::Value;

struct HelloHandler;

#[async_trait::async_trait]
impl RemotingHandler for HelloHandler {
    fn handle_message(&self, message: &AmfMessage) -> HandlerResult {
        println!("call on {}", message.target_uri);
        HandlerResult::Result(Value::String("hello".into()))
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("amf_rs=debug".parse()?),
        )
        .init();

    let config = GatewayConfig::default();
    println!("Starting AMF gateway on {}", config.bind_addr);

    let gateway = RemotingGateway::new(config, HelloHandler);

    tokio::select! {
        result = gateway.run() => {
            if let Err(e) = result {
                eprintln!("Gateway error: {}", e);
            }
        }
        _ = tokio::signal::ctrl_c() => {
            println!("\nShutting down...");
        }
    }

    Ok(())
}
