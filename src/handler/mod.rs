//! Request handler module
//!
//! Handler function types, the default error page, and static file serving.

pub mod static_files;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::Result;
use crate::http::{Request, Response};

/// Future returned by a handler, borrowing the request and response
pub type HandlerFuture<'a> = Pin<Box<dyn Future<Output = Result<()>> + Send + 'a>>;

/// A route handler
///
/// ```ignore
/// let hello = proteus::handler(|req, res| {
///     Box::pin(async move {
///         let name = req.segments().first("name").unwrap_or("stranger").to_string();
///         res.set_header("Content-Type", "text/plain");
///         res.write(format!("hello {name}").as_bytes()).await
///     })
/// });
/// ```
pub type Handler =
    Arc<dyn for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync>;

/// Wrap a closure or function as a [`Handler`]
pub fn handler<F>(f: F) -> Handler
where
    F: for<'a> Fn(&'a mut Request, &'a mut Response) -> HandlerFuture<'a> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Default error page: `CODE TEXT` as plain text
///
/// The connection handler sets the status (and `Allow` for 405) before
/// calling it.
pub fn error_page<'a>(_request: &'a mut Request, response: &'a mut Response) -> HandlerFuture<'a> {
    Box::pin(async move {
        let body = format!("{} {}", response.status_code(), response.status_text());
        response
            .set_header("Content-Type", "text/plain; charset=utf-8")
            .set_header("Content-Length", body.len().to_string());
        response.write(body.as_bytes()).await
    })
}
