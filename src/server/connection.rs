// Connection handling module
// Serves exactly one request per connection, then closes it

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpStream;
use tokio::sync::OwnedSemaphorePermit;

use super::{AppState, ShutdownSignal};
use crate::error::{Error, Result};
use crate::handler::static_files;
use crate::http::{Request, Response};
use crate::logger::{self, AccessLogEntry};
use crate::routing::RouteTarget;

/// Serve an accepted TCP connection in its own task.
///
/// The task ends when the response is finished or when `cancel` fires; the
/// connection permit, if any, is released with it.
pub fn spawn_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    state: Arc<AppState>,
    mut cancel: ShutdownSignal,
    permit: Option<OwnedSemaphorePermit>,
) {
    logger::log_connection_accepted(&peer_addr);

    tokio::spawn(async move {
        let _permit = permit;
        let (reader, writer) = stream.into_split();

        tokio::select! {
            result = handle_connection(reader, writer, peer_addr, &state) => {
                if let Err(err) = result {
                    logger::log_connection_error(&peer_addr, &err);
                }
            }
            () = cancel.cancelled() => {
                tracing::debug!(peer_addr = %peer_addr, "Connection cancelled by shutdown");
            }
        }
    });
}

/// Read one request from `reader`, answer it on `writer`.
///
/// A request that cannot be parsed gets no response; the error is returned
/// for the caller to log and the connection is simply dropped.
pub async fn handle_connection<R, W>(
    reader: R,
    writer: W,
    peer_addr: SocketAddr,
    state: &AppState,
) -> Result<()>
where
    R: AsyncRead + Send + Sync + Unpin + 'static,
    W: AsyncWrite + Send + Unpin + 'static,
{
    let mut request = Request::read_from(BufReader::new(reader)).await?;
    let started = Instant::now();
    logger::log_headers(request.headers(), state.config.logging.show_headers);

    let version = state.versions.negotiate(request.version());
    let mut response = Response::new(writer, version.as_str());
    response
        .set_header("Server", state.config.http.server_name.as_str())
        .set_header("Connection", "close");
    response.set_head_only(request.method() == "HEAD");

    // an unrecognized status left by a handler that wrote nothing
    let outcome = match dispatch(&mut request, &mut response, state, &version).await {
        Ok(()) => response.check_status(),
        Err(err) => Err(err),
    };
    if let Err(err) = outcome {
        recover(err, &mut request, &mut response, state, &version).await?;
    }
    response.finish().await?;

    if state.config.logging.access_log {
        let entry =
            AccessLogEntry::from_exchange(&peer_addr, &request, &response, started.elapsed());
        logger::log_access(&entry, &state.config.logging.access_log_format);
    }
    Ok(())
}

async fn dispatch(
    request: &mut Request,
    response: &mut Response,
    state: &AppState,
    version: &str,
) -> Result<()> {
    if !state.versions.is_method_allowed(version, request.method()) {
        return Err(Error::MethodNotAllowed {
            method: request.method().to_string(),
            version: version.to_string(),
        });
    }

    match state.router.match_request(request)? {
        RouteTarget::Static { file, content_type } => {
            static_files::serve_file(request, response, &file, &content_type).await
        }
        RouteTarget::Dynamic(handler) => handler(request, response).await,
    }
}

/// Turn a request-time error into an error response, if still possible
async fn recover(
    err: Error,
    request: &mut Request,
    response: &mut Response,
    state: &AppState,
    version: &str,
) -> Result<()> {
    if response.headers_sent() {
        tracing::error!(error = %err, path = request.path(), "Handler failed after headers were sent");
        return Ok(());
    }

    match &err {
        Error::RouteNotFound { .. } => {
            tracing::debug!(error = %err, "No route");
            response.status(404);
        }
        Error::MethodNotAllowed { .. } => {
            tracing::debug!(error = %err, "Method rejected");
            let allowed = state.versions.allowed_methods(version).join(", ");
            response.status(405).set_header("Allow", allowed);
        }
        _ => {
            tracing::error!(error = %err, path = request.path(), "Handler failed");
            response.status(500);
        }
    }

    (state.error_handler)(request, response).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::handler::{handler, HandlerFuture};
    use crate::server::{Server, ServerBuilder};
    use tokio::io::{duplex, split, AsyncReadExt, AsyncWriteExt};

    fn greet<'a>(req: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
        Box::pin(async move {
            let name = req.segments().first("name").unwrap_or_default().to_string();
            res.set_header("Content-Type", "text/plain");
            res.write(format!("hello {name}").as_bytes()).await
        })
    }

    fn failing<'a>(_: &'a mut Request, _: &'a mut Response) -> HandlerFuture<'a> {
        Box::pin(async { Err(Error::Io(std::io::Error::other("boom"))) })
    }

    fn bogus_status<'a>(_: &'a mut Request, res: &'a mut Response) -> HandlerFuture<'a> {
        Box::pin(async move {
            res.status(799);
            Ok(())
        })
    }

    fn server(static_dir: &std::path::Path) -> Server {
        let mut config = Config::default();
        config.logging.access_log = false;
        let mut builder = ServerBuilder::new(config);
        builder
            .static_files("/files", static_dir)
            .unwrap()
            .get("/user/:name", handler(greet))
            .unwrap()
            .get("/fail", handler(failing))
            .unwrap()
            .get("/bogus", handler(bogus_status))
            .unwrap();
        builder.build()
    }

    async fn exchange(server: &Server, raw: &[u8]) -> (Result<()>, String) {
        let (mut client, conn) = duplex(64 * 1024);
        let (reader, writer) = split(conn);
        client.write_all(raw).await.unwrap();

        let peer = "127.0.0.1:50000".parse().unwrap();
        let result = handle_connection(reader, writer, peer, server.state()).await;

        let mut out = String::new();
        client.read_to_string(&mut out).await.unwrap();
        (result, out)
    }

    #[tokio::test]
    async fn test_dynamic_route() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());
        let (result, out) = exchange(&server, b"GET /user/alice HTTP/1.1\r\nHost: x\r\n\r\n").await;

        result.unwrap();
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.contains("Connection: close\r\n"));
        assert!(out.contains("Server: proteus/"));
        assert!(out.ends_with("\r\n\r\nhello alice"));
    }

    #[tokio::test]
    async fn test_static_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("notes.txt"), "static body").unwrap();
        let server = server(dir.path());

        let (_, out) = exchange(&server, b"GET /files/notes.txt HTTP/1.1\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.contains("Content-Type: text/plain; charset=utf-8\r\n"));
        assert!(out.contains("Content-Length: 11\r\n"));
        assert!(out.ends_with("static body"));

        let (_, out) = exchange(&server, b"HEAD /files/notes.txt HTTP/1.1\r\n\r\n").await;
        assert!(out.contains("Content-Length: 11\r\n"));
        assert!(out.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn test_missing_route_and_missing_file_are_404() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());

        for raw in [
            &b"GET /nowhere HTTP/1.1\r\n\r\n"[..],
            b"GET /files/absent.txt HTTP/1.1\r\n\r\n",
            b"GET /user HTTP/1.1\r\n\r\n",
        ] {
            let (result, out) = exchange(&server, raw).await;
            result.unwrap();
            assert!(out.starts_with("HTTP/1.1 404 Not Found\r\n"), "{out}");
            assert!(out.ends_with("404 Not Found"));
        }
    }

    #[tokio::test]
    async fn test_method_not_allowed_for_version() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());

        let (_, out) = exchange(&server, b"DELETE /user/alice HTTP/1.0\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.0 405 Method Not Allowed\r\n"));
        assert!(out.contains("Allow: GET, HEAD, POST\r\n"));

        // allowed by the version table but not registered: 404
        let (_, out) = exchange(&server, b"DELETE /user/alice HTTP/1.1\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 404 Not Found\r\n"));

        let (_, out) = exchange(&server, b"BREW /user/alice HTTP/1.1\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 405 "));
    }

    #[tokio::test]
    async fn test_unsupported_version_negotiates_down() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());

        let (_, out) = exchange(&server, b"GET /user/bob HTTP/2.0\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));

        let (_, out) = exchange(&server, b"GET /user/bob HTTP/1.0\r\n\r\n").await;
        assert!(out.starts_with("HTTP/1.0 200 OK\r\n"));
    }

    #[tokio::test]
    async fn test_handler_error_becomes_500() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());

        let (result, out) = exchange(&server, b"GET /fail HTTP/1.1\r\n\r\n").await;
        result.unwrap();
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"));
    }

    #[tokio::test]
    async fn test_unrecognized_status_without_body_becomes_500() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());

        let (result, out) = exchange(&server, b"GET /bogus HTTP/1.1\r\n\r\n").await;
        result.unwrap();
        assert!(out.starts_with("HTTP/1.1 500 Internal Server Error\r\n"), "{out}");
        assert!(!out.contains("799"));
        assert!(out.ends_with("500 Internal Server Error"));
    }

    #[tokio::test]
    async fn test_connection_future_is_send() {
        fn assert_send<T: Send>(_: &T) {}

        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());
        let (_client, conn) = duplex(1024);
        let (reader, writer) = split(conn);
        let peer = "127.0.0.1:50000".parse().unwrap();
        let fut = handle_connection(reader, writer, peer, server.state());
        assert_send(&fut);
    }

    #[tokio::test]
    async fn test_malformed_request_gets_no_response() {
        let dir = tempfile::tempdir().unwrap();
        let server = server(dir.path());

        let (result, out) = exchange(&server, b"GARBAGE\r\n\r\n").await;
        assert!(matches!(result, Err(Error::MalformedRequestLine(_))));
        assert!(out.is_empty());
    }
}
