//! Path segment parsing
//!
//! Splits a URL path on `/` into its non-empty components. Registration
//! patterns additionally treat a leading `:` as a parameter placeholder.

/// Marks a parameter segment in a route pattern (`/user/:name`)
pub const PARAM_MARKER: char = ':';

/// Non-empty `/`-separated segments of `path`, in order
///
/// Leading, trailing and repeated separators produce no segments, so `""`,
/// `"/"` and `"//"` all yield nothing (the root).
pub fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|segment| !segment.is_empty())
}

/// One segment of a route pattern
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternSegment<'a> {
    Literal(&'a str),
    /// Parameter name, marker stripped (may be empty; callers reject that)
    Param(&'a str),
}

impl<'a> PatternSegment<'a> {
    pub fn parse(segment: &'a str) -> Self {
        segment
            .strip_prefix(PARAM_MARKER)
            .map_or(Self::Literal(segment), Self::Param)
    }
}

/// Segments of a registration pattern with placeholders recognised
pub fn pattern_segments(pattern: &str) -> impl Iterator<Item = PatternSegment<'_>> {
    segments(pattern).map(PatternSegment::parse)
}
