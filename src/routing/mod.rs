//! Routing module
//!
//! Provides the routing engine:
//! - Path segment parsing for patterns and request paths
//! - A route tree for dynamic routes with `:param` segments
//! - Prefix-based static file mappings, tried before the tree

mod params;
pub mod router;
pub mod segments;
pub mod tree;

pub use params::PathSegments;
pub use router::{RouteMatch, RouteTarget, Router, RouterBuilder, StaticRoute};
pub use segments::segments;
pub use tree::RouteTree;
