// Configuration types module
// Defines all configuration-related data structures

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Host used when `listen` is called with an empty host
    pub host: String,
    /// Port used when `listen` is called with port 0
    pub port: u16,
    /// Tokio worker threads (defaults to the number of CPU cores)
    #[serde(default)]
    pub workers: Option<usize>,
    /// Upper bound on concurrently served connections
    #[serde(default)]
    pub max_connections: Option<usize>,
    /// Pending-connection queue length passed to `listen(2)`
    #[serde(default = "default_backlog")]
    pub backlog: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            workers: None,
            max_connections: None,
            backlog: default_backlog(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub access_log: bool,
    /// Access log format (combined, common, json, or custom pattern)
    #[serde(default = "default_access_log_format")]
    pub access_log_format: String,
    /// Log request headers at debug level
    #[serde(default)]
    pub show_headers: bool,
    /// Log file path (optional, stdout if not set)
    #[serde(default)]
    pub log_file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            access_log: true,
            access_log_format: default_access_log_format(),
            show_headers: false,
            log_file: None,
        }
    }
}

const fn default_backlog() -> u32 {
    1024
}

#[allow(clippy::missing_const_for_fn)]
fn default_access_log_format() -> String {
    "combined".to_string()
}

/// HTTP protocol configuration
#[derive(Debug, Deserialize, Clone)]
pub struct HttpConfig {
    /// Value of the `Server` header
    pub server_name: String,
    /// Media type for files whose extension is absent or unknown
    pub default_content_type: String,
    /// Extension overrides merged over the built-in table, e.g. `".md" = "text/markdown"`
    #[serde(default)]
    pub content_types: HashMap<String, String>,
    /// Supported protocol versions and the methods each one allows
    #[serde(default = "default_versions")]
    pub versions: BTreeMap<String, Vec<String>>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            server_name: default_server_name(),
            default_content_type: "application/octet-stream".to_string(),
            content_types: HashMap::new(),
            versions: default_versions(),
        }
    }
}

fn default_server_name() -> String {
    format!("proteus/{}", env!("CARGO_PKG_VERSION"))
}

fn default_versions() -> BTreeMap<String, Vec<String>> {
    let methods = |list: &[&str]| list.iter().map(ToString::to_string).collect::<Vec<_>>();

    BTreeMap::from([
        ("1.0".to_string(), methods(&["GET", "HEAD", "POST"])),
        (
            "1.1".to_string(),
            methods(&[
                "GET", "HEAD", "POST", "PUT", "DELETE", "CONNECT", "OPTIONS", "TRACE", "PATCH",
            ]),
        ),
    ])
}
