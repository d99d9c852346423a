//! Command-line / environment configuration for both binaries

use clap::Parser;

/// Default port shared by relay and client
pub const DEFAULT_PORT: u16 = 12345;

/// Relay startup options
#[derive(Debug, Clone, Parser)]
#[command(name = "chat_server", about = "Real-time TCP chat relay")]
pub struct ServerConfig {
    /// Address to bind
    #[arg(long, env = "SERVER_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to bind
    #[arg(long, env = "SERVER_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Client startup options
#[derive(Debug, Clone, Parser)]
#[command(name = "chat_client", about = "Terminal client for the chat relay")]
pub struct ClientConfig {
    /// Relay host
    #[arg(long, env = "CLIENT_HOST", default_value = "localhost")]
    pub host: String,

    /// Relay port
    #[arg(long, env = "CLIENT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,
}

impl ClientConfig {
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_flags() {
        let config = ServerConfig::parse_from(["chat_server", "--host", "0.0.0.0", "--port", "9000"]);
        assert_eq!(config.bind_addr(), "0.0.0.0:9000");
    }

    #[test]
    fn test_client_flags() {
        let config = ClientConfig::parse_from(["chat_client", "--host", "chat.local", "--port", "4000"]);
        assert_eq!(config.server_addr(), "chat.local:4000");
    }
}
