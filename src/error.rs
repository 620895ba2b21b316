//! Error types shared by the parser, the router and the connection handler.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong between accepting bytes and writing a response.
///
/// Parse errors abort the connection without a response, registration errors
/// are returned to whoever registers the route, and request-time errors are
/// turned into an error response by the connection handler.
#[derive(Debug, Error)]
pub enum Error {
    /// The request line could not be read as `METHOD TARGET VERSION`.
    #[error("malformed request line: {0}")]
    MalformedRequestLine(String),

    /// A header line has no `:` separator, an empty name, or the header block was cut short.
    #[error("malformed header: {0}")]
    MalformedHeader(String),

    #[error("route already registered: {method} {path}")]
    DuplicateRoute { method: String, path: String },

    #[error("invalid route pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("no route for {method} {path}")]
    RouteNotFound { method: String, path: String },

    #[error("method {method} not allowed for HTTP/{version}")]
    MethodNotAllowed { method: String, version: String },

    /// A header or status change was attempted after the header block went out.
    #[error("header '{0}' changed after headers were sent")]
    LateHeaderWrite(String),

    /// A header name or value that cannot be written on the wire.
    #[error("invalid header '{0}'")]
    InvalidHeader(String),

    #[error("unrecognized status code {0}")]
    InvalidStatus(u16),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for errors raised while reading the request head.
    pub const fn is_parse_error(&self) -> bool {
        matches!(self, Self::MalformedRequestLine(_) | Self::MalformedHeader(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        let err = Error::DuplicateRoute {
            method: "GET".to_string(),
            path: "/user/:name".to_string(),
        };
        assert_eq!(err.to_string(), "route already registered: GET /user/:name");

        let err = Error::MethodNotAllowed {
            method: "PATCH".to_string(),
            version: "1.0".to_string(),
        };
        assert_eq!(err.to_string(), "method PATCH not allowed for HTTP/1.0");
    }

    #[test]
    fn test_parse_error_classification() {
        assert!(Error::MalformedRequestLine("x".into()).is_parse_error());
        assert!(Error::MalformedHeader("x".into()).is_parse_error());
        assert!(!Error::InvalidStatus(999).is_parse_error());
    }
}
