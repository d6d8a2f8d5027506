// Server configuration

use crate::log::Logger;
use crate::log_error;
use crate::utils::{get_env_bool, get_env_string, get_env_u32};

/// RTMP server configuration
pub struct RtmpServerConfiguration {
    /// Address to bind the TCP listener to
    pub bind_address: String,

    /// Port to listen on
    pub port: u32,

    /// Log requests?
    pub log_requests: bool,

    /// Use the crypto-validated handshake variant?
    pub crypto_handshake: bool,
}

impl RtmpServerConfiguration {
    /// Loads configuration from environment variables
    pub fn load_from_env(logger: &Logger) -> Result<RtmpServerConfiguration, ()> {
        let port = get_env_u32("RTMP_PORT", 1935);

        if port == 0 || port > 65535 {
            log_error!(logger, format!("RTMP_PORT has an invalid value: {}", port));
            return Err(());
        }

        Ok(RtmpServerConfiguration {
            bind_address: get_env_string("BIND_ADDRESS", "0.0.0.0"),
            port,
            log_requests: get_env_bool("LOG_REQUESTS", true),
            crypto_handshake: get_env_bool("CRYPTO_HANDSHAKE", true),
        })
    }

    /// Configuration with defaults, for embedding and tests
    pub fn defaults() -> RtmpServerConfiguration {
        RtmpServerConfiguration {
            bind_address: "127.0.0.1".to_string(),
            port: 1935,
            log_requests: false,
            crypto_handshake: false,
        }
    }

    /// Address for the TCP listener
    pub fn get_tcp_listen_addr(&self) -> String {
        format!("{}:{}", self.bind_address, self.port)
    }
}
