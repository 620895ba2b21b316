// Server module entry point
// Route registration, listening, the accept loop and shutdown

pub mod connection;
pub mod listener;
mod shutdown;
pub mod signal;

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Semaphore;

use crate::config::Config;
use crate::error::Result;
use crate::handler::{self, Handler};
use crate::http::{ContentTypes, Versions};
use crate::logger;
use crate::routing::{Router, RouterBuilder};

pub use listener::bind_listener;
pub use shutdown::{Shutdown, ShutdownSignal};

/// State shared read-only by every connection task
pub struct AppState {
    pub config: Config,
    pub router: Router,
    pub versions: Versions,
    pub error_handler: Handler,
}

/// Collects routes and settings, then freezes them into a [`Server`]
pub struct ServerBuilder {
    config: Config,
    router: RouterBuilder,
    error_handler: Handler,
}

impl fmt::Debug for ServerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerBuilder")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ServerBuilder {
    pub fn new(config: Config) -> Self {
        let content_types = ContentTypes::with_overrides(
            config.http.default_content_type.as_str(),
            &config.http.content_types,
        );
        Self {
            config,
            router: RouterBuilder::new(content_types),
            error_handler: handler::handler(handler::error_page),
        }
    }

    /// Serve files under `dir` for GET and HEAD requests below `prefix`
    pub fn static_files(&mut self, prefix: &str, dir: impl Into<PathBuf>) -> Result<&mut Self> {
        let dir = dir.into();
        self.router.add_static_route("GET", prefix, dir.clone())?;
        self.router.add_static_route("HEAD", prefix, dir)?;
        Ok(self)
    }

    /// Register `handler` for `method` on `pattern` (e.g. `/user/:name`)
    pub fn route(&mut self, method: &str, pattern: &str, handler: Handler) -> Result<&mut Self> {
        self.router.add_dynamic_route(method, pattern, handler)?;
        Ok(self)
    }

    pub fn get(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self> {
        self.route("GET", pattern, handler)
    }

    pub fn head(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self> {
        self.route("HEAD", pattern, handler)
    }

    pub fn post(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self> {
        self.route("POST", pattern, handler)
    }

    pub fn put(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self> {
        self.route("PUT", pattern, handler)
    }

    pub fn delete(&mut self, pattern: &str, handler: Handler) -> Result<&mut Self> {
        self.route("DELETE", pattern, handler)
    }

    /// Replace the handler that renders 404, 405 and 500 responses
    ///
    /// It is called with the status (and `Allow` for 405) already set.
    pub fn error_handler(&mut self, handler: Handler) -> &mut Self {
        self.error_handler = handler;
        self
    }

    pub fn build(self) -> Server {
        let versions = Versions::from_config(&self.config.http);
        Server {
            state: Arc::new(AppState {
                config: self.config,
                router: self.router.build(),
                versions,
                error_handler: self.error_handler,
            }),
        }
    }
}

/// A configured server with a frozen route table
pub struct Server {
    state: Arc<AppState>,
}

impl Server {
    pub fn builder(config: Config) -> ServerBuilder {
        ServerBuilder::new(config)
    }

    pub fn config(&self) -> &Config {
        &self.state.config
    }

    pub fn router(&self) -> &Router {
        &self.state.router
    }

    pub(crate) fn state(&self) -> &AppState {
        &self.state
    }

    /// Bind `host:port` and serve until SIGINT or SIGTERM
    ///
    /// An empty `host` or a zero `port` falls back to the configured value.
    pub async fn listen(&self, host: &str, port: u16) -> Result<()> {
        let addr = self.resolve_addr(host, port).await?;
        let listener = bind_listener(addr, self.state.config.server.backlog)?;

        let shutdown = Shutdown::new();
        signal::spawn_signal_handler(shutdown.clone());
        self.serve(listener, shutdown).await
    }

    /// Accept connections on `listener` until `shutdown` is triggered
    pub async fn serve(&self, listener: TcpListener, shutdown: Shutdown) -> Result<()> {
        let addr = listener.local_addr()?;
        logger::log_server_start(&addr, &self.state.config);

        let limit = self
            .state
            .config
            .server
            .max_connections
            .map(|max| Arc::new(Semaphore::new(max)));
        let mut stop = shutdown.subscribe();

        loop {
            let permit = match &limit {
                Some(semaphore) => tokio::select! {
                    permit = Arc::clone(semaphore).acquire_owned() => permit.ok(),
                    () = stop.cancelled() => break,
                },
                None => None,
            };

            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer_addr)) => connection::spawn_connection(
                        stream,
                        peer_addr,
                        Arc::clone(&self.state),
                        shutdown.subscribe(),
                        permit,
                    ),
                    Err(e) => tracing::error!(error = %e, "Failed to accept connection"),
                },
                () = stop.cancelled() => break,
            }
        }

        tracing::info!(address = %addr, "Server stopped accepting connections");
        Ok(())
    }

    async fn resolve_addr(&self, host: &str, port: u16) -> Result<SocketAddr> {
        let server = &self.state.config.server;
        let host = match host.trim() {
            "" => server.host.as_str(),
            host => host,
        };
        let port = if port == 0 { server.port } else { port };

        tokio::net::lookup_host((host, port))
            .await?
            .next()
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::AddrNotAvailable,
                    format!("no address found for {host}:{port}"),
                )
                .into()
            })
    }
}
