//! Dynamic route tree
//!
//! One node per pattern segment. Each node keeps its literal children in
//! registration order plus at most one parameter child, and a handler per
//! method for patterns ending there. Lookups walk the tree once: a literal
//! child always wins over the parameter child and nothing is retried.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::routing::segments::{pattern_segments, segments, PatternSegment};
use crate::routing::PathSegments;

struct Node<H> {
    /// Literal text, or the parameter name for a parameter node
    segment: String,
    handlers: HashMap<String, H>,
    children: Vec<Node<H>>,
    param_child: Option<Box<Node<H>>>,
}

impl<H> Node<H> {
    fn new(segment: &str) -> Self {
        Self {
            segment: segment.to_string(),
            handlers: HashMap::new(),
            children: Vec::new(),
            param_child: None,
        }
    }

    fn literal_child(&self, segment: &str) -> Option<&Self> {
        self.children.iter().find(|child| child.segment == segment)
    }

    fn literal_child_mut(&mut self, segment: &str) -> &mut Self {
        let index = match self.children.iter().position(|c| c.segment == segment) {
            Some(index) => index,
            None => {
                self.children.push(Self::new(segment));
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Existing child a pattern segment maps onto
    fn pattern_child(&self, segment: PatternSegment<'_>) -> Option<&Self> {
        match segment {
            PatternSegment::Literal(literal) => self.literal_child(literal),
            PatternSegment::Param(_) => self.param_child.as_deref(),
        }
    }
}

/// Method + pattern to handler tree, generic over the handler type
pub struct RouteTree<H> {
    root: Node<H>,
}

impl<H> Default for RouteTree<H> {
    fn default() -> Self {
        Self {
            root: Node::new(""),
        }
    }
}

impl<H> RouteTree<H> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for `method` on `pattern`
    ///
    /// Either the whole pattern is added or, on error, the tree is left as it
    /// was.
    pub fn insert(&mut self, method: &str, pattern: &str, handler: H) -> Result<()> {
        let parsed: Vec<PatternSegment<'_>> = pattern_segments(pattern).collect();
        self.check(method, pattern, &parsed)?;

        let mut node = &mut self.root;
        for segment in parsed {
            node = match segment {
                PatternSegment::Literal(literal) => node.literal_child_mut(literal),
                PatternSegment::Param(name) => &mut **node
                    .param_child
                    .get_or_insert_with(|| Box::new(Node::new(name))),
            };
        }
        node.handlers.insert(method.to_string(), handler);
        Ok(())
    }

    /// Walk the existing tree along `parsed` without changing it
    fn check(&self, method: &str, pattern: &str, parsed: &[PatternSegment<'_>]) -> Result<()> {
        let mut node = Some(&self.root);

        for &segment in parsed {
            if let PatternSegment::Param(name) = segment {
                if name.is_empty() {
                    return Err(invalid_pattern(pattern, "parameter name is empty".to_string()));
                }
                if let Some(existing) = node.and_then(|n| n.param_child.as_deref()) {
                    if existing.segment != name {
                        return Err(invalid_pattern(
                            pattern,
                            format!(
                                "parameter ':{name}' conflicts with ':{}' at the same position",
                                existing.segment
                            ),
                        ));
                    }
                }
            }
            node = node.and_then(|n| n.pattern_child(segment));
        }

        if node.is_some_and(|n| n.handlers.contains_key(method)) {
            return Err(Error::DuplicateRoute {
                method: method.to_string(),
                path: pattern.to_string(),
            });
        }
        Ok(())
    }

    /// Resolve a request path, binding parameters along the way
    pub fn lookup(&self, method: &str, path: &str) -> Option<(&H, PathSegments)> {
        let mut node = &self.root;
        let mut params = PathSegments::new();

        for segment in segments(path) {
            if let Some(child) = node.literal_child(segment) {
                node = child;
            } else if let Some(child) = node.param_child.as_deref() {
                params.push(&child.segment, segment);
                node = child;
            } else {
                return None;
            }
        }

        node.handlers.get(method).map(|handler| (handler, params))
    }
}

fn invalid_pattern(pattern: &str, reason: String) -> Error {
    Error::InvalidPattern {
        pattern: pattern.to_string(),
        reason,
    }
}
