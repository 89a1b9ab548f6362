//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Default allowed client origin (the Vite dev server on the LAN)
pub const DEFAULT_ORIGIN: &str = "http://192.168.1.42:5173";

/// Default bind address when neither PORT nor SERVER_ADDR is set
pub const DEFAULT_SERVER_ADDR: &str = "0.0.0.0:3000";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Allowed client origins for CORS (comma-separated in ORIGIN)
    pub client_origin: String,
    /// Directory served as static assets
    pub static_dir: PathBuf,

    /// Overwrite the id of relayed position events with the sender's id
    pub strict_ids: bool,
    /// Inbound frames per second per connection, 0 = unlimited
    pub input_rate_limit: u32,
    /// Capacity of each connection's outbound queue
    pub outbound_buffer: usize,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let server_addr = if let Ok(port) = env::var("PORT") {
            format!("0.0.0.0:{}", port)
        } else {
            env::var("SERVER_ADDR").unwrap_or_else(|_| DEFAULT_SERVER_ADDR.to_string())
        };

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress(server_addr.clone()))?,

            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            client_origin: env::var("ORIGIN").unwrap_or_else(|_| DEFAULT_ORIGIN.to_string()),
            static_dir: env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("public")),

            strict_ids: parse_var("STRICT_IDS", false)?,
            input_rate_limit: parse_var("INPUT_RATE_LIMIT", 0)?,
            outbound_buffer: parse_var("OUTBOUND_BUFFER", 256)?,
        })
    }

    /// Allowed origins, trimmed, empty entries removed
    pub fn allowed_origins(&self) -> Vec<&str> {
        self.client_origin
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_addr: ([0, 0, 0, 0], 3000).into(),
            log_level: "info".to_string(),
            client_origin: DEFAULT_ORIGIN.to_string(),
            static_dir: PathBuf::from("public"),
            strict_ids: false,
            input_rate_limit: 0,
            outbound_buffer: 256,
        }
    }
}

fn parse_var<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value: raw }),
        Err(_) => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid server address format: {0}")]
    InvalidAddress(String),

    #[error("Invalid value for {name}: {value:?}")]
    Invalid { name: &'static str, value: String },
}
