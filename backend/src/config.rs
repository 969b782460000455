//! Server configuration.
//!
//! Every setting can come from a command-line flag or an environment
//! variable (a `.env` file is loaded first by the binary).

use clap::Args;
use std::net::{IpAddr, SocketAddr};

use crate::error::{ServerError, ServerResult};
use crate::parser::DEFAULT_UPLOAD_LIMIT;

/// Settings for `csvmatrix serve`.
#[derive(Debug, Clone, Args)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "CSVMATRIX_HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, env = "CSVMATRIX_PORT", default_value_t = 8080)]
    pub port: u16,

    /// Largest accepted request body, in bytes
    #[arg(long, env = "CSVMATRIX_MAX_UPLOAD_SIZE", default_value_t = DEFAULT_UPLOAD_LIMIT)]
    pub max_upload_size: u64,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, env = "CSVMATRIX_LOG", default_value = "info")]
    pub log_level: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            max_upload_size: DEFAULT_UPLOAD_LIMIT,
            log_level: "info".to_string(),
        }
    }
}

impl ServerConfig {
    /// Resolve `host` and `port` into a socket address.
    pub fn socket_addr(&self) -> ServerResult<SocketAddr> {
        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|_| ServerError::InvalidAddress(self.host.clone()))?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.max_upload_size, 10485760);
        assert_eq!(config.socket_addr().unwrap().to_string(), "0.0.0.0:8080");
    }

    #[test]
    fn test_ipv6_host() {
        let config = ServerConfig {
            host: "::1".into(),
            port: 9000,
            ..ServerConfig::default()
        };
        assert_eq!(config.socket_addr().unwrap().to_string(), "[::1]:9000");
    }

    #[test]
    fn test_invalid_host() {
        let config = ServerConfig {
            host: "not an address".into(),
            ..ServerConfig::default()
        };
        assert!(matches!(
            config.socket_addr(),
            Err(ServerError::InvalidAddress(_))
        ));
    }
}
