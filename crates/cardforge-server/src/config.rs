//! Server configuration loaded from environment variables.
//!
//! All settings have sensible defaults so the server can start with zero
//! configuration for local development.  The config is constructed once in
//! `main` and passed by `Arc` to every component that needs it; there is no
//! process-wide settings global.

use std::net::SocketAddr;
use std::path::PathBuf;

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Human-readable application name.
    /// Env: `APP_NAME`
    /// Default: `"Card Generator API"`
    pub app_name: String,

    /// Host interface to bind the HTTP server to.
    /// Env: `HOST`
    /// Default: `0.0.0.0`
    pub host: String,

    /// TCP port for the HTTP server.
    /// Env: `PORT`
    /// Default: `8000`
    pub port: u16,

    /// Debug mode: raises the default log level when `RUST_LOG` is unset.
    /// Env: `DEBUG` (true/false)
    /// Default: `false`
    pub debug: bool,

    /// Allowed CORS origins.  An empty list allows any origin.
    /// Env: `CORS_ORIGINS` (comma-separated)
    /// Default: `http://localhost:3000,http://127.0.0.1:3000`
    pub cors_origins: Vec<String>,

    /// Directory holding the SQLite database file.
    /// Env: `DATABASE_DIR`
    /// Default: `data/database`
    pub database_dir: PathBuf,

    /// Database file name inside `database_dir`.
    /// Env: `DATABASE_NAME`
    /// Default: `cards.db`
    pub database_file: String,

    /// Root directory for uploaded files.
    /// Env: `UPLOAD_DIR`
    /// Default: `data/upload`
    pub upload_dir: PathBuf,

    /// Maximum upload size in bytes.
    /// Env: `MAX_UPLOAD_SIZE`
    /// Default: 10 MiB
    pub max_upload_size: usize,

    /// Allowed upload file extensions (lowercase, without the dot).
    /// Env: `ALLOWED_EXTENSIONS` (comma-separated)
    /// Default: `jpg,jpeg,png,gif,webp,svg`
    pub allowed_extensions: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: "Card Generator API".to_string(),
            host: "0.0.0.0".to_string(),
            port: 8000,
            debug: false,
            cors_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
            database_dir: PathBuf::from("data/database"),
            database_file: "cards.db".to_string(),
            upload_dir: PathBuf::from("data/upload"),
            max_upload_size: 10 * 1024 * 1024, // 10 MiB
            allowed_extensions: split_list("jpg,jpeg,png,gif,webp,svg"),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(name) = std::env::var("APP_NAME") {
            if !name.trim().is_empty() {
                config.app_name = name;
            }
        }

        if let Ok(host) = std::env::var("HOST") {
            if !host.trim().is_empty() {
                config.host = host;
            }
        }

        if let Ok(port) = std::env::var("PORT") {
            if let Ok(parsed) = port.parse::<u16>() {
                config.port = parsed;
            } else {
                tracing::warn!(value = %port, "Invalid PORT, using default");
            }
        }

        if let Ok(val) = std::env::var("DEBUG") {
            config.debug = val == "true" || val == "1";
        }

        if let Ok(origins) = std::env::var("CORS_ORIGINS") {
            config.cors_origins = split_list(&origins);
        }

        if let Ok(dir) = std::env::var("DATABASE_DIR") {
            config.database_dir = PathBuf::from(dir);
        }

        if let Ok(name) = std::env::var("DATABASE_NAME") {
            if !name.trim().is_empty() {
                config.database_file = name;
            }
        }

        if let Ok(dir) = std::env::var("UPLOAD_DIR") {
            config.upload_dir = PathBuf::from(dir);
        }

        if let Ok(size) = std::env::var("MAX_UPLOAD_SIZE") {
            if let Ok(parsed) = size.parse::<usize>() {
                config.max_upload_size = parsed;
            } else {
                tracing::warn!(value = %size, "Invalid MAX_UPLOAD_SIZE, using default");
            }
        }

        if let Ok(exts) = std::env::var("ALLOWED_EXTENSIONS") {
            let parsed: Vec<String> = split_list(&exts)
                .into_iter()
                .map(|e| e.to_lowercase())
                .collect();
            if parsed.is_empty() {
                tracing::warn!("Empty ALLOWED_EXTENSIONS, using default");
            } else {
                config.allowed_extensions = parsed;
            }
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter,
        // so we do not store it here.

        config
    }

    /// Default tracing filter used when `RUST_LOG` is not set.
    pub fn log_filter(&self) -> &'static str {
        if self.debug {
            "debug"
        } else {
            "info"
        }
    }

    /// Socket address the HTTP server binds to.
    pub fn socket_addr(&self) -> SocketAddr {
        let host = self.host.parse().unwrap_or_else(|_| {
            tracing::warn!(value = %self.host, "Invalid HOST, binding 0.0.0.0");
            [0, 0, 0, 0].into()
        });
        SocketAddr::new(host, self.port)
    }
}

/// Split a comma-separated env value into trimmed entries.  Case is
/// preserved; CORS origins are case-sensitive for path/host comparison.
fn split_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.port, 8000);
        assert_eq!(config.max_upload_size, 10 * 1024 * 1024);
        assert_eq!(config.allowed_extensions.len(), 6);
        assert!(config.allowed_extensions.contains(&"png".to_string()));
    }

    #[test]
    fn test_log_filter_follows_debug_flag() {
        let mut config = AppConfig::default();
        assert_eq!(config.log_filter(), "info");

        config.debug = true;
        assert_eq!(config.log_filter(), "debug");
    }

    #[test]
    fn test_socket_addr() {
        let config = AppConfig::default();
        assert_eq!(config.socket_addr(), "0.0.0.0:8000".parse().unwrap());
    }

    #[test]
    fn test_split_list_trims_and_preserves_case() {
        assert_eq!(
            split_list(" https://App.example.com , http://other "),
            vec!["https://App.example.com", "http://other"]
        );
        assert!(split_list("").is_empty());
    }

    #[test]
    fn test_env_extensions_lowercased_origins_untouched() {
        std::env::set_var("CORS_ORIGINS", "https://App.Example.com");
        std::env::set_var("ALLOWED_EXTENSIONS", "PNG, Jpg");

        let config = AppConfig::from_env();

        std::env::remove_var("CORS_ORIGINS");
        std::env::remove_var("ALLOWED_EXTENSIONS");

        assert_eq!(config.cors_origins, vec!["https://App.Example.com"]);
        assert_eq!(config.allowed_extensions, vec!["png", "jpg"]);
    }
}
