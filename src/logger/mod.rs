//! Logger module
//!
//! Provides logging utilities for the HTTP server including:
//! - Subscriber initialisation (stdout or file)
//! - Server lifecycle logging
//! - Access logging with multiple formats

mod format;

pub use format::AccessLogEntry;

use crate::config::LoggingConfig;
use std::fs::OpenOptions;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Target used for access log lines, so they can be filtered separately
pub const ACCESS_TARGET: &str = "proteus::access";

/// Initialize the global tracing subscriber
///
/// Should be called once at application startup. `RUST_LOG` takes precedence
/// over `logging.level`.
pub fn init(config: &LoggingConfig) -> std::io::Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let writer = match config.log_file.as_deref() {
        Some(path) => {
            // Create parent directories if they don't exist
            if let Some(parent) = Path::new(path).parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            BoxMakeWriter::new(Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stdout),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(config.log_file.is_none())
        .try_init()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::AlreadyExists, e.to_string()))
}

pub fn log_server_start(addr: &SocketAddr, config: &crate::Config) {
    tracing::info!(
        address = %addr,
        log_level = %config.logging.level,
        workers = ?config.server.workers,
        max_connections = ?config.server.max_connections,
        "Web server is listening at http://{addr}"
    );
}

pub fn log_connection_accepted(peer_addr: &SocketAddr) {
    tracing::debug!(peer_addr = %peer_addr, "A new client has connected to the server");
}

pub fn log_connection_error(peer_addr: &SocketAddr, err: &crate::Error) {
    if err.is_parse_error() {
        tracing::warn!(peer_addr = %peer_addr, error = %err, "Dropping connection with unparseable request");
    } else {
        tracing::error!(peer_addr = %peer_addr, error = %err, "Failed to serve connection");
    }
}

pub fn log_headers(headers: &crate::http::Headers, show: bool) {
    if show {
        for (name, value) in headers.iter() {
            tracing::debug!(header = name, value, "request header");
        }
    }
}

/// Log formatted access log entry
pub fn log_access(entry: &AccessLogEntry, format: &str) {
    tracing::info!(target: ACCESS_TARGET, "{}", entry.format(format));
}
