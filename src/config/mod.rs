// Configuration module entry point
// Loads layered configuration: file, environment, then defaults

mod types;

use std::net::SocketAddr;

pub use types::{Config, HttpConfig, LoggingConfig, ServerConfig};

impl Config {
    /// Load configuration from the default `config.toml` (optional)
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from specified file path (without extension)
    ///
    /// Missing files are not an error; environment variables prefixed with
    /// `PROTEUS` (e.g. `PROTEUS_SERVER__PORT=9000`) override file values.
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(config::Environment::with_prefix("PROTEUS").separator("__"))
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("server.backlog", 1024)?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("logging.show_headers", false)?
            .set_default("http.server_name", format!("proteus/{}", env!("CARGO_PKG_VERSION")))?
            .set_default("http.default_content_type", "application/octet-stream")?
            .build()?;

        settings.try_deserialize()
    }

    pub fn socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let cfg = Config::default();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.http.default_content_type, "application/octet-stream");
        assert_eq!(cfg.http.versions.len(), 2);
        assert!(cfg.http.versions["1.1"].contains(&"PATCH".to_string()));
        assert_eq!(cfg.socket_addr().unwrap().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proteus.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
[server]
port = 9090
backlog = 64

[http]
default_content_type = "text/plain"

[http.content_types]
".md" = "text/markdown"

[http.versions]
"1.1" = ["GET", "HEAD"]
"#
        )
        .unwrap();

        let stem = path.with_extension("");
        let cfg = Config::load_from(stem.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.server.backlog, 64);
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.http.default_content_type, "text/plain");
        assert_eq!(cfg.http.content_types[".md"], "text/markdown");
        assert_eq!(cfg.http.versions.len(), 1);
        assert_eq!(cfg.http.versions["1.1"], vec!["GET", "HEAD"]);
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let cfg = Config::load_from("/nonexistent/proteus-config").unwrap();
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.server.backlog, 1024);
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert!(cfg.http.versions.contains_key("1.0"));
    }
}
