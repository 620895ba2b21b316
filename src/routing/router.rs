//! Request router
//!
//! Static file mappings are scanned first, by prefix; dynamic routes are
//! resolved through the [`RouteTree`]. Routes are registered on a
//! [`RouterBuilder`] and frozen into a [`Router`] before serving starts.

use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::handler::Handler;
use crate::http::{ContentTypes, Request};
use crate::routing::segments::segments;
use crate::routing::tree::RouteTree;
use crate::routing::PathSegments;

/// One static file mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticRoute {
    pub method: String,
    /// Normalised: leading `/`, no trailing `/` (except the root)
    pub prefix: String,
    pub target: PathBuf,
}

impl StaticRoute {
    /// Request path left over after the prefix, if the prefix matches on a
    /// segment boundary
    fn strip<'p>(&self, path: &'p str) -> Option<&'p str> {
        if self.prefix == "/" {
            return Some(path);
        }
        let rest = path.strip_prefix(self.prefix.as_str())?;
        (rest.is_empty() || rest.starts_with('/')).then_some(rest)
    }
}

/// What a matched request should be answered with
#[derive(Clone)]
pub enum RouteTarget {
    /// Serve a file from disk
    Static { file: PathBuf, content_type: String },
    /// Call a registered handler
    Dynamic(Handler),
}

impl fmt::Debug for RouteTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Static { file, content_type } => f
                .debug_struct("Static")
                .field("file", file)
                .field("content_type", content_type)
                .finish(),
            Self::Dynamic(_) => f.write_str("Dynamic(..)"),
        }
    }
}

/// A successful match: the target plus any bound path parameters
#[derive(Debug, Clone)]
pub struct RouteMatch {
    pub target: RouteTarget,
    pub segments: PathSegments,
}

/// Collects routes during setup
pub struct RouterBuilder {
    statics: Vec<StaticRoute>,
    tree: RouteTree<Handler>,
    content_types: ContentTypes,
}

impl RouterBuilder {
    pub fn new(content_types: ContentTypes) -> Self {
        Self {
            statics: Vec::new(),
            tree: RouteTree::new(),
            content_types,
        }
    }

    /// Map requests under `prefix` to files under `target`
    pub fn add_static_route(
        &mut self,
        method: &str,
        prefix: &str,
        target: impl Into<PathBuf>,
    ) -> Result<()> {
        let method = method.trim().to_ascii_uppercase();
        let prefix = normalize_prefix(prefix);

        if self
            .statics
            .iter()
            .any(|route| route.method == method && route.prefix == prefix)
        {
            return Err(Error::DuplicateRoute {
                method,
                path: prefix,
            });
        }

        self.statics.push(StaticRoute {
            method,
            prefix,
            target: target.into(),
        });
        Ok(())
    }

    /// Attach `handler` to `method` on a pattern such as `/user/:name`
    pub fn add_dynamic_route(&mut self, method: &str, pattern: &str, handler: Handler) -> Result<()> {
        let method = method.trim().to_ascii_uppercase();
        self.tree.insert(&method, pattern.trim(), handler)
    }

    pub fn build(self) -> Router {
        Router {
            statics: self.statics,
            tree: self.tree,
            content_types: self.content_types,
        }
    }
}

/// Immutable route table shared by all connections
pub struct Router {
    statics: Vec<StaticRoute>,
    tree: RouteTree<Handler>,
    content_types: ContentTypes,
}

impl Router {
    pub fn static_routes(&self) -> &[StaticRoute] {
        &self.statics
    }

    pub const fn content_types(&self) -> &ContentTypes {
        &self.content_types
    }

    /// Resolve `method` and `path` (no query string) to a route
    pub fn match_route(&self, method: &str, path: &str) -> Result<RouteMatch> {
        if let Some((route, rest)) = self.match_static(method, path) {
            return self.static_target(route, rest, method, path);
        }

        self.tree
            .lookup(method, path)
            .map(|(handler, segments)| RouteMatch {
                target: RouteTarget::Dynamic(handler.clone()),
                segments,
            })
            .ok_or_else(|| not_found(method, path))
    }

    /// Match a parsed request, binding its path parameters
    pub fn match_request(&self, request: &mut Request) -> Result<RouteTarget> {
        let RouteMatch { target, segments } = self.match_route(request.method(), request.path())?;
        request.set_segments(segments);
        Ok(target)
    }

    /// Longest matching prefix; the earliest registration wins a tie
    fn match_static<'p>(&self, method: &str, path: &'p str) -> Option<(&StaticRoute, &'p str)> {
        let mut best: Option<(&StaticRoute, &'p str)> = None;
        for route in self.statics.iter().filter(|route| route.method == method) {
            let Some(rest) = route.strip(path) else {
                continue;
            };
            if best.map_or(true, |(current, _)| route.prefix.len() > current.prefix.len()) {
                best = Some((route, rest));
            }
        }
        best
    }

    fn static_target(
        &self,
        route: &StaticRoute,
        rest: &str,
        method: &str,
        path: &str,
    ) -> Result<RouteMatch> {
        let mut file = route.target.clone();
        for segment in segments(rest) {
            match segment {
                "." => {}
                ".." => {
                    tracing::warn!(path, "path traversal attempt blocked");
                    return Err(not_found(method, path));
                }
                segment => file.push(segment),
            }
        }

        let content_type = self.content_types.for_path(&file).to_string();
        Ok(RouteMatch {
            target: RouteTarget::Static { file, content_type },
            segments: PathSegments::new(),
        })
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("statics", &self.statics)
            .finish_non_exhaustive()
    }
}

fn normalize_prefix(prefix: &str) -> String {
    let trimmed = prefix.trim().trim_end_matches('/');
    if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{trimmed}")
    }
}

fn not_found(method: &str, path: &str) -> Error {
    Error::RouteNotFound {
        method: method.to_string(),
        path: path.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{handler, HandlerFuture};
    use crate::http::Response;
    use std::path::Path;
    use std::sync::Arc;

    fn ok<'a>(_: &'a mut Request, _: &'a mut Response) -> HandlerFuture<'a> {
        Box::pin(async { Ok(()) })
    }

    fn builder() -> RouterBuilder {
        RouterBuilder::new(ContentTypes::new("application/octet-stream"))
    }

    fn static_file(m: &RouteMatch) -> (&Path, &str) {
        match &m.target {
            RouteTarget::Static { file, content_type } => (file.as_path(), content_type.as_str()),
            RouteTarget::Dynamic(_) => panic!("expected a static target"),
        }
    }

    fn dynamic_handler(m: &RouteMatch) -> &Handler {
        match &m.target {
            RouteTarget::Dynamic(handler) => handler,
            RouteTarget::Static { .. } => panic!("expected a dynamic target"),
        }
    }

    #[test]
    fn test_static_content_types() {
        let mut b = builder();
        b.add_static_route("GET", "/files", "/srv/files").unwrap();
        let router = b.build();

        let m = router.match_route("GET", "/files/report.pdf").unwrap();
        assert_eq!(
            static_file(&m),
            (Path::new("/srv/files/report.pdf"), "application/pdf")
        );
        assert!(m.segments.is_empty());

        let m = router.match_route("GET", "/files/unknown.xyz").unwrap();
        assert_eq!(static_file(&m).1, "application/octet-stream");

        let m = router.match_route("GET", "/files/docs//a.txt").unwrap();
        assert_eq!(static_file(&m).0, Path::new("/srv/files/docs/a.txt"));
    }

    #[test]
    fn test_static_prefix_respects_segment_boundary() {
        let mut b = builder();
        b.add_static_route("GET", "/files/", "/srv/files").unwrap();
        let router = b.build();

        assert!(router.match_route("GET", "/files").is_ok());
        assert!(router.match_route("GET", "/filesystem").is_err());
        assert!(router.match_route("POST", "/files/a.txt").is_err());
    }

    #[test]
    fn test_longest_static_prefix_wins() {
        let mut b = builder();
        b.add_static_route("GET", "/", "/srv/root").unwrap();
        b.add_static_route("GET", "/assets", "/srv/assets").unwrap();
        let router = b.build();

        let m = router.match_route("GET", "/assets/app.js").unwrap();
        assert_eq!(static_file(&m).0, Path::new("/srv/assets/app.js"));

        let m = router.match_route("GET", "/index.html").unwrap();
        assert_eq!(static_file(&m).0, Path::new("/srv/root/index.html"));
    }

    #[test]
    fn test_static_traversal_rejected() {
        let mut b = builder();
        b.add_static_route("GET", "/files", "/srv/files").unwrap();
        let router = b.build();

        let err = router.match_route("GET", "/files/../etc/passwd").unwrap_err();
        assert!(matches!(err, Error::RouteNotFound { .. }));
    }

    #[test]
    fn test_duplicate_static_route() {
        let mut b = builder();
        b.add_static_route("GET", "/files", "/a").unwrap();
        let err = b.add_static_route("get", "/files/", "/b").unwrap_err();
        assert!(matches!(err, Error::DuplicateRoute { .. }));
        b.add_static_route("HEAD", "/files", "/a").unwrap();
        assert_eq!(b.build().static_routes().len(), 2);
    }

    #[test]
    fn test_dynamic_routes() {
        let user = handler(ok);
        let mut b = builder();
        b.add_dynamic_route("GET", "/user/:name", Arc::clone(&user)).unwrap();
        let router = b.build();

        let alice = router.match_route("GET", "/user/alice").unwrap();
        let bob = router.match_route("GET", "/user/bob").unwrap();
        assert!(Arc::ptr_eq(dynamic_handler(&alice), &user));
        assert!(Arc::ptr_eq(dynamic_handler(&bob), &user));
        assert_eq!(alice.segments.get("name").unwrap(), ["alice"]);
        assert_eq!(bob.segments.get("name").unwrap(), ["bob"]);

        for path in ["/user", "/user/alice/extra"] {
            let err = router.match_route("GET", path).unwrap_err();
            assert!(matches!(err, Error::RouteNotFound { .. }));
        }
        assert!(router.match_route("POST", "/user/alice").is_err());
    }

    #[test]
    fn test_duplicate_dynamic_route_keeps_first() {
        let first = handler(ok);
        let mut b = builder();
        b.add_dynamic_route("GET", "/user/:name", Arc::clone(&first)).unwrap();
        let err = b
            .add_dynamic_route("GET", " /user/:name ", handler(ok))
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateRoute { .. }));

        let router = b.build();
        let m = router.match_route("GET", "/user/x").unwrap();
        assert!(Arc::ptr_eq(dynamic_handler(&m), &first));
    }

    #[test]
    fn test_static_takes_precedence() {
        let mut b = builder();
        b.add_static_route("GET", "/files", "/srv/files").unwrap();
        b.add_dynamic_route("GET", "/files/:name", handler(ok)).unwrap();
        let router = b.build();

        let m = router.match_route("GET", "/files/a.txt").unwrap();
        assert!(matches!(m.target, RouteTarget::Static { .. }));
        assert!(router.match_route("POST", "/files/a.txt").is_err());
    }

    #[tokio::test]
    async fn test_match_request_binds_segments() {
        let mut b = builder();
        b.add_dynamic_route("get", "/user/:name", handler(ok)).unwrap();
        let router = b.build();

        let mut request = Request::read_from(&b"GET /user/carol?x=1 HTTP/1.1\r\n\r\n"[..])
            .await
            .unwrap();
        let target = router.match_request(&mut request).unwrap();
        assert!(matches!(target, RouteTarget::Dynamic(_)));
        assert_eq!(request.segments().first("name"), Some("carol"));
    }
}
