//! HTTP protocol layer module
//!
//! Wire-level request parsing and response writing, plus the lookup tables
//! (media types, versions) they rely on. Nothing here knows
//! about routing.

mod headers;
pub mod mime;
pub mod request;
pub mod response;
pub mod version;

pub use headers::Headers;
pub use mime::ContentTypes;
pub use request::{Body, Request};
pub use response::Response;
pub use version::Versions;
