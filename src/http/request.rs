//! HTTP request parsing module
//!
//! Reads the request line and header block from a connection and leaves the
//! rest of the stream unread as the request body.

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, ReadBuf, Take};

use crate::error::{Error, Result};
use crate::http::Headers;
use crate::routing::PathSegments;

/// Connection input as seen by the parser
pub type BoxedReader = Box<dyn AsyncBufRead + Send + Sync + Unpin>;

/// Longest request or header line accepted, terminator included
const MAX_LINE_LENGTH: u64 = 8 * 1024;
const MAX_HEADERS: usize = 100;
/// Blank lines tolerated ahead of the request line
const MAX_LEADING_EMPTY_LINES: usize = 4;

/// A parsed request: head fully read, body left on the wire
pub struct Request {
    method: String,
    raw_path: String,
    version: String,
    headers: Headers,
    segments: PathSegments,
    body: Body,
}

impl Request {
    /// Parse the request head from `reader`
    ///
    /// The method is upper-cased and the version is stored without its
    /// `HTTP/` prefix (`"1.1"`). Nothing past the blank line is consumed.
    pub async fn read_from<R>(reader: R) -> Result<Self>
    where
        R: AsyncBufRead + Send + Sync + Unpin + 'static,
    {
        let mut reader: BoxedReader = Box::new(reader);
        let (method, raw_path, version) = read_request_line(&mut reader).await?;
        let headers = read_headers(&mut reader).await?;
        let body = Body::new(reader, body_length(&headers));

        Ok(Self {
            method,
            raw_path,
            version,
            headers,
            segments: PathSegments::default(),
            body,
        })
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Request target exactly as received, query string included
    pub fn raw_path(&self) -> &str {
        &self.raw_path
    }

    /// Request target without query string or fragment
    pub fn path(&self) -> &str {
        self.raw_path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
    }

    pub fn query(&self) -> Option<&str> {
        let (_, rest) = self.raw_path.split_once('?')?;
        Some(rest.split('#').next().unwrap_or_default())
    }

    /// Declared protocol version without the `HTTP/` prefix
    pub fn version(&self) -> &str {
        &self.version
    }

    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Path parameters bound while matching the route
    pub const fn segments(&self) -> &PathSegments {
        &self.segments
    }

    pub(crate) fn set_segments(&mut self, segments: PathSegments) {
        self.segments = segments;
    }

    /// Unread request body, limited to `Content-Length`
    pub fn body(&mut self) -> &mut Body {
        &mut self.body
    }

    /// Read the whole body into memory
    pub async fn read_body(&mut self) -> Result<Vec<u8>> {
        let mut data = Vec::new();
        self.body.read_to_end(&mut data).await?;
        Ok(data)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("raw_path", &self.raw_path)
            .field("version", &self.version)
            .field("headers", &self.headers)
            .field("segments", &self.segments)
            .finish_non_exhaustive()
    }
}

/// Request body reader
///
/// Yields at most `Content-Length` bytes; requests without one have an empty
/// body. Chunked transfer coding is not decoded.
pub struct Body {
    inner: Take<BoxedReader>,
}

impl Body {
    fn new(reader: BoxedReader, length: u64) -> Self {
        Self {
            inner: reader.take(length),
        }
    }

    /// Bytes left to read
    pub fn remaining(&self) -> u64 {
        self.inner.limit()
    }
}

impl AsyncRead for Body {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

/// Outcome of reading one protocol line
enum Line {
    /// Terminator stripped
    Complete(Vec<u8>),
    /// Stream ended before a `\n`
    Truncated,
    /// No `\n` within `MAX_LINE_LENGTH` bytes
    TooLong,
}

async fn read_line(reader: &mut BoxedReader) -> io::Result<Line> {
    let mut line = Vec::new();
    let mut limited = (&mut *reader).take(MAX_LINE_LENGTH);
    limited.read_until(b'\n', &mut line).await?;

    if line.last() != Some(&b'\n') {
        return Ok(if line.len() as u64 >= MAX_LINE_LENGTH {
            Line::TooLong
        } else {
            Line::Truncated
        });
    }
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    Ok(Line::Complete(line))
}

async fn read_request_line(reader: &mut BoxedReader) -> Result<(String, String, String)> {
    let mut skipped = 0;
    let line = loop {
        let line = match read_line(reader).await? {
            Line::Complete(line) => line,
            Line::Truncated => {
                return Err(Error::MalformedRequestLine(
                    "stream ended before the request line was terminated".to_string(),
                ))
            }
            Line::TooLong => {
                return Err(Error::MalformedRequestLine(format!(
                    "request line longer than {MAX_LINE_LENGTH} bytes"
                )))
            }
        };
        if !line.is_empty() {
            break line;
        }
        skipped += 1;
        if skipped > MAX_LEADING_EMPTY_LINES {
            return Err(Error::MalformedRequestLine(
                "too many empty lines before the request line".to_string(),
            ));
        }
    };

    let line = String::from_utf8(line)
        .map_err(|_| Error::MalformedRequestLine("request line is not valid UTF-8".to_string()))?;

    let tokens: Vec<&str> = line.split_whitespace().collect();
    let &[method, path, version] = tokens.as_slice() else {
        return Err(Error::MalformedRequestLine(format!(
            "expected METHOD PATH VERSION, got '{}'",
            line.trim()
        )));
    };

    let version = match version.get(..5) {
        Some(prefix) if prefix.eq_ignore_ascii_case("HTTP/") && version.len() > 5 => &version[5..],
        _ => {
            return Err(Error::MalformedRequestLine(format!(
                "missing protocol version in '{}'",
                line.trim()
            )))
        }
    };

    Ok((
        method.to_ascii_uppercase(),
        path.to_string(),
        version.to_string(),
    ))
}

async fn read_headers(reader: &mut BoxedReader) -> Result<Headers> {
    let mut headers = Headers::new();

    loop {
        let line = match read_line(reader).await? {
            Line::Complete(line) => line,
            Line::Truncated => {
                return Err(Error::MalformedHeader(
                    "stream ended before the end of the header block".to_string(),
                ))
            }
            Line::TooLong => {
                return Err(Error::MalformedHeader(format!(
                    "header line longer than {MAX_LINE_LENGTH} bytes"
                )))
            }
        };
        if line.is_empty() {
            return Ok(headers);
        }
        if headers.len() >= MAX_HEADERS {
            return Err(Error::MalformedHeader(format!(
                "more than {MAX_HEADERS} header lines"
            )));
        }

        let line = String::from_utf8(line)
            .map_err(|_| Error::MalformedHeader("header line is not valid UTF-8".to_string()))?;
        let Some((name, value)) = line.split_once(':') else {
            return Err(Error::MalformedHeader(format!("missing ':' in '{line}'")));
        };

        let name = name.trim();
        if name.is_empty() || name.contains(char::is_whitespace) {
            return Err(Error::MalformedHeader(format!("invalid header name in '{line}'")));
        }
        headers.append(name, value.trim());
    }
}

fn body_length(headers: &Headers) -> u64 {
    if headers.contains("transfer-encoding") {
        return 0;
    }
    headers
        .get("content-length")
        .and_then(|len| len.trim().parse().ok())
        .unwrap_or(0)
}
