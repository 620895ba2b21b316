//! Supported protocol versions and the methods each one allows

use std::collections::BTreeMap;

use crate::config::HttpConfig;

/// Version used when the table has no parseable entry
const FALLBACK_VERSION: &str = "1.1";

/// Allowed-methods table keyed by version identifier (`"1.0"`, `"1.1"`)
#[derive(Debug, Clone)]
pub struct Versions {
    table: BTreeMap<String, Vec<String>>,
}

impl Versions {
    /// Build the table, upper-casing and trimming method names
    pub fn new<I, M>(table: I) -> Self
    where
        I: IntoIterator<Item = (String, M)>,
        M: IntoIterator<Item = String>,
    {
        Self {
            table: table
                .into_iter()
                .map(|(version, methods)| {
                    let methods = methods
                        .into_iter()
                        .map(|m| m.trim().to_ascii_uppercase())
                        .filter(|m| !m.is_empty())
                        .collect();
                    (version.trim().to_string(), methods)
                })
                .collect(),
        }
    }

    pub fn from_config(config: &HttpConfig) -> Self {
        Self::new(config.versions.clone())
    }

    /// Supported version identifiers
    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    fn lookup(&self, version: &str) -> Option<&[String]> {
        self.table
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(version.trim()))
            .map(|(_, methods)| methods.as_slice())
    }

    pub fn is_supported(&self, version: &str) -> bool {
        self.lookup(version).is_some()
    }

    /// Highest supported version by numeric comparison
    pub fn highest(&self) -> &str {
        self.table
            .keys()
            .filter_map(|key| key.parse::<f64>().ok().map(|n| (n, key.as_str())))
            .max_by(|a, b| a.0.total_cmp(&b.0))
            .map_or(FALLBACK_VERSION, |(_, key)| key)
    }

    /// Version to answer a request with
    ///
    /// A supported version is echoed unchanged; anything else falls back to
    /// the highest supported version.
    pub fn negotiate(&self, requested: &str) -> String {
        if self.is_supported(requested) {
            requested.trim().to_string()
        } else {
            self.highest().to_string()
        }
    }

    /// Ordered method list for `version` (empty for unsupported versions)
    pub fn allowed_methods(&self, version: &str) -> &[String] {
        self.lookup(version).unwrap_or(&[])
    }

    pub fn is_method_allowed(&self, version: &str, method: &str) -> bool {
        self.allowed_methods(version)
            .iter()
            .any(|allowed| allowed == method.trim())
    }
}

impl Default for Versions {
    fn default() -> Self {
        Self::from_config(&HttpConfig::default())
    }
}
