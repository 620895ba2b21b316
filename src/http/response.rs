//! HTTP response writing module
//!
//! A `Response` is built incrementally: status and headers can change until
//! the first body write, which puts the status line and header block on the
//! wire. From then on only body bytes are written.

use ::http::header::{HeaderName, HeaderValue};
use ::http::StatusCode;
use chrono::Utc;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufWriter};

use crate::error::{Error, Result};
use crate::http::Headers;

/// Connection output as seen by the response writer
pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// IMF-fixdate, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`
const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";

pub struct Response {
    version: String,
    status: StatusCode,
    /// Unrecognized code from the last `status` call, reported at flush
    invalid_status: Option<u16>,
    headers: Headers,
    writer: BufWriter<BoxedWriter>,
    headers_sent: bool,
    head_only: bool,
    body_bytes: u64,
}

impl Response {
    /// A `200 OK` response for protocol `version` (e.g. `"1.1"`)
    pub fn new<W>(writer: W, version: impl Into<String>) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let writer: BoxedWriter = Box::new(writer);
        Self {
            version: version.into(),
            status: StatusCode::OK,
            invalid_status: None,
            headers: Headers::new(),
            writer: BufWriter::new(writer),
            headers_sent: false,
            head_only: false,
            body_bytes: 0,
        }
    }

    /// Discard body writes (responses to HEAD)
    pub(crate) fn set_head_only(&mut self, head_only: bool) {
        self.head_only = head_only;
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    /// Set the status code; the reason phrase follows from it
    ///
    /// An unrecognized code is remembered and reported when the headers are
    /// flushed. Ignored once headers have been sent.
    pub fn status(&mut self, code: u16) -> &mut Self {
        if self.headers_sent {
            late_write(":status");
            return self;
        }
        match StatusCode::from_u16(code)
            .ok()
            .filter(|status| status.canonical_reason().is_some())
        {
            Some(status) => {
                self.status = status;
                self.invalid_status = None;
            }
            None => self.invalid_status = Some(code),
        }
        self
    }

    pub fn status_code(&self) -> u16 {
        self.invalid_status.unwrap_or_else(|| self.status.as_u16())
    }

    pub fn status_text(&self) -> &'static str {
        self.status.canonical_reason().unwrap_or_default()
    }

    /// Fails with the code from an unrecognized `status` call that has not
    /// been replaced yet
    pub fn check_status(&self) -> Result<()> {
        match self.invalid_status {
            Some(code) if !self.headers_sent => Err(Error::InvalidStatus(code)),
            _ => Ok(()),
        }
    }

    /// Add or replace a header
    ///
    /// Names and values that are not valid on the wire (e.g. containing CR or
    /// LF) are logged and dropped.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        if self.headers_sent {
            late_write(name);
        } else if validate_header(name, &value) {
            self.headers.insert(name, value);
        }
        self
    }

    /// Add a header line, keeping existing values for the same name
    pub fn append_header(&mut self, name: &str, value: impl Into<String>) -> &mut Self {
        let value = value.into();
        if self.headers_sent {
            late_write(name);
        } else if validate_header(name, &value) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn remove_header(&mut self, name: &str) -> &mut Self {
        if self.headers_sent {
            late_write(name);
        } else {
            self.headers.remove(name);
        }
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    pub const fn headers(&self) -> &Headers {
        &self.headers
    }

    pub const fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Body bytes written so far
    pub const fn body_bytes(&self) -> u64 {
        self.body_bytes
    }

    /// Write body bytes, sending the status line and headers first if needed
    pub async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.send_headers().await?;
        if !self.head_only {
            self.writer.write_all(bytes).await?;
            self.body_bytes += bytes.len() as u64;
        }
        Ok(())
    }

    /// Stream a reader into the body, returning the number of bytes copied
    pub async fn write_from<R>(&mut self, reader: &mut R) -> Result<u64>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        self.send_headers().await?;
        if self.head_only {
            return Ok(0);
        }
        let copied = tokio::io::copy(reader, &mut self.writer).await?;
        self.body_bytes += copied;
        Ok(copied)
    }

    /// Put the status line and header block on the wire (once)
    pub async fn send_headers(&mut self) -> Result<()> {
        if self.headers_sent {
            return Ok(());
        }
        self.check_status()?;
        if !self.headers.contains("date") {
            self.headers
                .insert("Date", Utc::now().format(HTTP_DATE).to_string());
        }

        let head = self.serialize_head();
        self.writer.write_all(head.as_bytes()).await?;
        self.headers_sent = true;
        Ok(())
    }

    /// Complete the response: send headers if nothing was written, then flush
    /// and close the output
    pub async fn finish(&mut self) -> Result<()> {
        if !self.headers_sent && !self.head_only && !self.headers.contains("content-length") {
            self.headers.insert("Content-Length", "0");
        }
        self.send_headers().await?;
        self.writer.flush().await?;
        self.writer.shutdown().await?;
        Ok(())
    }

    fn serialize_head(&self) -> String {
        let mut head = format!(
            "HTTP/{} {} {}\r\n",
            self.version,
            self.status.as_u16(),
            self.status_text()
        );
        for (name, value) in self.headers.iter() {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str("\r\n");
        }
        head.push_str("\r\n");
        head
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Response")
            .field("version", &self.version)
            .field("status", &self.status_code())
            .field("headers", &self.headers)
            .field("headers_sent", &self.headers_sent)
            .field("body_bytes", &self.body_bytes)
            .finish_non_exhaustive()
    }
}

fn validate_header(name: &str, value: &str) -> bool {
    if HeaderName::from_bytes(name.as_bytes()).is_ok() && HeaderValue::from_str(value).is_ok() {
        return true;
    }
    let err = Error::InvalidHeader(name.escape_debug().to_string());
    tracing::warn!(error = %err, value = %value.escape_debug(), "dropping header");
    false
}

fn late_write(name: &str) {
    let err = Error::LateHeaderWrite(name.to_string());
    tracing::warn!(error = %err, "ignoring header change after headers were sent");
}
