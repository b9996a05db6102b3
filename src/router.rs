//! Route table and pattern matching.
//!
//! A route pattern has the form `"METHOD path"` or just `"path"`; with no
//! method the route matches any method. Within the path, `*` matches one
//! segment, and `**` (or a trailing `*`) matches the whole remainder.
//! Dispatch walks the table in insertion order and the first route whose
//! method and path both match wins, which makes precedence explicit and
//! lets a catch-all route sit at the end of the table.

use std::sync::Arc;

use crate::handler::Handler;
use crate::http::request::Method;

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    /// Exact segment match, case-sensitive
    Literal(String),
    /// `*` in a non-final position: matches exactly one segment
    Wildcard,
    /// `**` anywhere or `*` in final position: matches the rest of the path
    Remainder,
}

/// A parsed route pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    method: Option<String>,
    segments: Vec<Segment>,
}

impl Pattern {
    /// Parses `"METHOD path"` or `"path"`.
    ///
    /// # Example
    ///
    /// ```
    /// # use burrow::router::Pattern;
    /// # use burrow::http::request::Method;
    /// let pattern = Pattern::parse("GET /fish/*");
    /// assert!(pattern.matches(&Method::GET, "/fish/chips"));
    /// assert!(!pattern.matches(&Method::POST, "/fish/chips"));
    /// ```
    pub fn parse(pattern: &str) -> Self {
        let pattern = pattern.trim();
        let (method, path) = match pattern.split_once(' ') {
            Some((method, path)) => (Some(method), path.trim_start()),
            None => (None, pattern),
        };

        // A method pattern of "*" means any method, same as omitting it.
        let method = method
            .filter(|m| *m != "*")
            .map(|m| m.to_ascii_uppercase());

        let raw: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let last = raw.len().saturating_sub(1);
        let segments = raw
            .iter()
            .enumerate()
            .map(|(i, s)| match *s {
                "**" => Segment::Remainder,
                "*" if i == last => Segment::Remainder,
                "*" => Segment::Wildcard,
                literal => Segment::Literal(literal.to_string()),
            })
            .collect();

        Self { method, segments }
    }

    /// Whether `method` and `path` satisfy this pattern. The method
    /// comparison is case-insensitive; path segments are case-sensitive.
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        if let Some(wanted) = &self.method {
            if !wanted.eq_ignore_ascii_case(method.as_str()) {
                return false;
            }
        }

        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        let mut index = 0;

        for segment in &self.segments {
            match segment {
                Segment::Remainder => return true,
                Segment::Wildcard => {
                    if index >= segments.len() {
                        return false;
                    }
                    index += 1;
                }
                Segment::Literal(literal) => {
                    if segments.get(index).copied() != Some(literal.as_str()) {
                        return false;
                    }
                    index += 1;
                }
            }
        }

        index == segments.len()
    }
}

struct Route {
    pattern: Pattern,
    handler: Arc<dyn Handler>,
}

/// Ordered list of `(pattern, handler)` entries; first match wins.
#[derive(Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Appends a route. Routes are immutable once appended; precedence is
    /// append order.
    pub fn append(&mut self, pattern: &str, handler: Arc<dyn Handler>) {
        self.routes.push(Route {
            pattern: Pattern::parse(pattern),
            handler,
        });
    }

    /// Returns the handler of the first matching route, if any.
    pub fn find(&self, method: &Method, path: &str) -> Option<Arc<dyn Handler>> {
        self.routes
            .iter()
            .find(|route| route.pattern.matches(method, path))
            .map(|route| Arc::clone(&route.handler))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
