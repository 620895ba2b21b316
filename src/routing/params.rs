//! Path parameters bound during route matching

/// Parameter name to the values bound for it, in binding order
///
/// A name reused at several depths of a pattern collects one value per depth.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathSegments {
    bindings: Vec<(String, Vec<String>)>,
}

impl PathSegments {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind another value to `name`
    pub fn push(&mut self, name: &str, value: &str) {
        match self.bindings.iter_mut().find(|(n, _)| n == name) {
            Some((_, values)) => values.push(value.to_string()),
            None => self
                .bindings
                .push((name.to_string(), vec![value.to_string()])),
        }
    }

    /// All values bound to `name`
    pub fn get(&self, name: &str) -> Option<&[String]> {
        self.bindings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    /// First value bound to `name`
    pub fn first(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(|values| values.first())
            .map(String::as_str)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.bindings.iter().map(|(name, _)| name.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }
}
