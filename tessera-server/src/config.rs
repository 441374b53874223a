//! Server configuration module
//!
//! Handles loading configuration from environment variables with sensible
//! defaults. The one setting without a safe fallback is the relying-party
//! origin: the app id is derived from it and U2F refuses insecure origins.

use std::net::SocketAddr;

use url::Url;

use tessera_core::derive_app_id;

/// Server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port (default: 3000)
    pub port: u16,
    /// Server host (default: 127.0.0.1)
    pub host: [u8; 4],
    /// Relying-party origin the app id is derived from (default:
    /// https://localhost:3000; must be https)
    pub origin: Url,
    /// Allowed CORS origins, comma-separated (default: allow all in dev)
    pub allowed_origins: Option<Vec<String>>,
    /// Request body limit in KB (default: 64 - token responses are small)
    pub body_limit_kb: usize,
    /// Request timeout in seconds (default: 30)
    pub timeout_secs: u64,
    /// Enable rate limiting (default: false for tests, true when loaded from env)
    pub rate_limit_enabled: bool,
    /// Rate limit: requests per second (default: 10)
    pub rate_limit_per_sec: u64,
    /// Rate limit: burst size (default: 20)
    pub rate_limit_burst: u32,
    /// Allow the deterministic mock crypto provider (default: false, enable
    /// with TESSERA_ALLOW_MOCK_CRYPTO=true)
    pub allow_mock_crypto: bool,
    /// Database connection pool maximum connections (default: 20)
    pub database_max_connections: u32,
    /// Database connection pool minimum connections (default: 2)
    pub database_min_connections: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 3000,
            host: [127, 0, 0, 1],
            origin: Url::parse("https://localhost:3000").expect("static origin"),
            allowed_origins: None, // None = allow all (dev mode)
            body_limit_kb: 64,
            timeout_secs: 30,
            rate_limit_enabled: false, // Disabled by default (for tests)
            rate_limit_per_sec: 10,
            rate_limit_burst: 20,
            allow_mock_crypto: true, // Enabled by default for tests; from_env() defaults to false
            database_max_connections: 20,
            database_min_connections: 2,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables:
    /// - `PORT`, `HOST`
    /// - `TESSERA_ORIGIN` - relying-party origin (https required)
    /// - `ALLOWED_ORIGINS` - comma-separated CORS allow-list
    /// - `BODY_LIMIT_KB`, `REQUEST_TIMEOUT_SECS`
    /// - `RATE_LIMIT_ENABLED`, `RATE_LIMIT_PER_SEC`, `RATE_LIMIT_BURST`
    /// - `TESSERA_ALLOW_MOCK_CRYPTO`
    /// - `DATABASE_MAX_CONNECTIONS`, `DATABASE_MIN_CONNECTIONS`
    pub fn from_env() -> Self {
        let port = std::env::var("PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .unwrap_or(3000);

        let host = std::env::var("HOST")
            .ok()
            .map(|h| {
                if h == "0.0.0.0" {
                    [0, 0, 0, 0]
                } else {
                    [127, 0, 0, 1]
                }
            })
            .unwrap_or([127, 0, 0, 1]);

        let origin = std::env::var("TESSERA_ORIGIN")
            .ok()
            .and_then(|o| Url::parse(&o).ok())
            .unwrap_or_else(|| Url::parse("https://localhost:3000").expect("static origin"));

        let allowed_origins = std::env::var("ALLOWED_ORIGINS").ok().map(|origins| {
            origins
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        });

        let body_limit_kb = std::env::var("BODY_LIMIT_KB")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(64);

        let timeout_secs = std::env::var("REQUEST_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        // Rate limiting enabled by default in production, can be disabled
        // with RATE_LIMIT_ENABLED=false
        let rate_limit_enabled = std::env::var("RATE_LIMIT_ENABLED")
            .map(|v| v.to_lowercase() != "false")
            .unwrap_or(true);

        let rate_limit_per_sec = std::env::var("RATE_LIMIT_PER_SEC")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(10);

        let rate_limit_burst = std::env::var("RATE_LIMIT_BURST")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        let allow_mock_crypto = std::env::var("TESSERA_ALLOW_MOCK_CRYPTO")
            .map(|v| v.to_lowercase() == "true")
            .unwrap_or(false);

        let database_max_connections = std::env::var("DATABASE_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(20);

        let database_min_connections = std::env::var("DATABASE_MIN_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(2);

        Self {
            port,
            host,
            origin,
            allowed_origins,
            body_limit_kb,
            timeout_secs,
            rate_limit_enabled,
            rate_limit_per_sec,
            rate_limit_burst,
            allow_mock_crypto,
            database_max_connections,
            database_min_connections,
        }
    }

    /// Get socket address from config
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::from((self.host, self.port))
    }

    /// Derive the U2F app id from the configured origin.
    ///
    /// Fails for non-https origins; there is no insecure fallback.
    pub fn app_id(&self) -> tessera_core::Result<String> {
        derive_app_id(&self.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.port, 3000);
        assert!(config.allow_mock_crypto);
        assert!(!config.rate_limit_enabled);
    }

    #[test]
    fn test_default_app_id() {
        let config = Config::default();
        assert_eq!(config.app_id().unwrap(), "https://localhost:3000");
    }

    #[test]
    fn test_insecure_origin_never_yields_app_id() {
        let config = Config {
            origin: Url::parse("http://localhost:3000").unwrap(),
            ..Config::default()
        };
        assert!(config.app_id().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let config = Config {
            port: 8443,
            host: [0, 0, 0, 0],
            ..Config::default()
        };
        assert_eq!(config.socket_addr().to_string(), "0.0.0.0:8443");
    }
}
