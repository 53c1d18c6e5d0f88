//! Gateway configuration

use std::net::SocketAddr;
use std::time::Duration;

/// Gateway configuration options
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// Maximum accepted HTTP body size in bytes
    pub max_body_size: usize,

    /// A request must arrive in full within this time
    pub request_timeout: Duration,

    /// Enable TCP_NODELAY
    pub tcp_nodelay: bool,

    /// Reset codec reference tables between bundle messages
    pub reset_tables_per_message: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8082".parse().unwrap(),
            max_connections: 0, // Unlimited
            max_body_size: 4 * 1024 * 1024, // 4MB
            request_timeout: Duration::from_secs(30),
            tcp_nodelay: true,
            reset_tables_per_message: true,
        }
    }
}

impl GatewayConfig {
    /// Create a new config with a custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the maximum HTTP body size
    pub fn max_body_size(mut self, bytes: usize) -> Self {
        self.max_body_size = bytes;
        self
    }

    /// Set the request timeout
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    /// Keep reference tables across bundle messages (legacy behavior)
    pub fn keep_tables_across_messages(mut self) -> Self {
        self.reset_tables_per_message = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GatewayConfig::default();
        assert_eq!(config.bind_addr.port(), 8082);
        assert_eq!(config.max_connections, 0);
        assert!(config.reset_tables_per_message);
    }

    #[test]
    fn test_builders() {
        let config = GatewayConfig::default()
            .max_connections(16)
            .max_body_size(1024)
            .keep_tables_across_messages();
        assert_eq!(config.max_connections, 16);
        assert_eq!(config.max_body_size, 1024);
        assert!(!config.reset_tables_per_message);
    }
}
