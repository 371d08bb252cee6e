//! Server configuration.
//!
//! Loaded from environment variables with defaults. All settings can be
//! overridden via `NESTLY_*` variables.

use std::net::SocketAddr;
use std::time::Duration;

/// Upstream used when `NESTLY_SHORTENER_URL` is unset.
pub const DEFAULT_SHORTENER_URL: &str = "https://tinyurl.com/api-create.php";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the HTTP listener to.
    pub bind_addr: SocketAddr,
    /// Upstream shortener endpoint; `?url=` is appended.
    pub shortener_url: String,
    /// Upper bound on one upstream call.
    pub shorten_timeout: Duration,
    /// Log level filter (e.g. `info`, `debug`).
    pub log_level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// - `PORT`: port to bind on all interfaces (hosting-platform convention)
    /// - `NESTLY_BIND_ADDR`: full bind address (overrides `PORT`, default `127.0.0.1:8787`)
    /// - `NESTLY_SHORTENER_URL`: upstream shortener (default: TinyURL)
    /// - `NESTLY_SHORTEN_TIMEOUT_SECS`: upstream timeout (default `10`)
    /// - `NESTLY_LOG_LEVEL`: log filter (default `info`)
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from any variable source. Unparseable values
    /// fall back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let default_addr = SocketAddr::from(([127, 0, 0, 1], 8787));
        let bind_addr = if let Some(addr) = lookup("NESTLY_BIND_ADDR") {
            addr.parse().unwrap_or(default_addr)
        } else if let Some(port) = lookup("PORT") {
            port.parse()
                .map_or(default_addr, |port: u16| SocketAddr::from(([0, 0, 0, 0], port)))
        } else {
            default_addr
        };

        let shortener_url =
            lookup("NESTLY_SHORTENER_URL").unwrap_or_else(|| DEFAULT_SHORTENER_URL.to_owned());

        let shorten_timeout = lookup("NESTLY_SHORTEN_TIMEOUT_SECS")
            .and_then(|v| v.parse().ok())
            .map_or(Duration::from_secs(10), Duration::from_secs);

        let log_level = lookup("NESTLY_LOG_LEVEL").unwrap_or_else(|| "info".to_owned());

        Self {
            bind_addr,
            shortener_url,
            shorten_timeout,
            log_level,
        }
    }
}
