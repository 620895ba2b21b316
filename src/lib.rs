//! proteus: a small HTTP/1.x server library
//!
//! Requests are parsed straight off the socket, matched against static file
//! mappings and a tree of `:param` routes, and answered through an
//! incrementally written [`Response`]. One request per connection.

pub mod config;
pub mod error;
pub mod handler;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;

pub use config::Config;
pub use error::{Error, Result};
pub use handler::{handler, Handler, HandlerFuture};
pub use http::{Request, Response};
pub use routing::PathSegments;
pub use server::{Server, ServerBuilder, Shutdown};
