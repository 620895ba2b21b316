//! MIME type detection module
//!
//! Maps a file extension (lowercase, leading dot included) to a Content-Type,
//! falling back to a configured default.

use std::collections::HashMap;
use std::path::Path;

const BUILTIN: &[(&str, &str)] = &[
    // Text
    (".html", "text/html; charset=utf-8"),
    (".htm", "text/html; charset=utf-8"),
    (".css", "text/css"),
    (".csv", "text/csv"),
    (".txt", "text/plain; charset=utf-8"),
    (".md", "text/plain; charset=utf-8"),
    (".xml", "application/xml"),
    // JavaScript/WASM
    (".js", "application/javascript"),
    (".mjs", "application/javascript"),
    (".json", "application/json"),
    (".wasm", "application/wasm"),
    // Images
    (".png", "image/png"),
    (".jpg", "image/jpeg"),
    (".jpeg", "image/jpeg"),
    (".gif", "image/gif"),
    (".svg", "image/svg+xml"),
    (".ico", "image/x-icon"),
    (".webp", "image/webp"),
    // Video
    (".mp4", "video/mp4"),
    (".webm", "video/webm"),
    (".ogv", "video/ogg"),
    (".mov", "video/quicktime"),
    (".avi", "video/x-msvideo"),
    // Audio
    (".mp3", "audio/mpeg"),
    (".wav", "audio/wav"),
    (".flac", "audio/flac"),
    (".m4a", "audio/mp4"),
    // Fonts
    (".woff", "font/woff"),
    (".woff2", "font/woff2"),
    (".ttf", "font/ttf"),
    (".otf", "font/otf"),
    // Documents
    (".pdf", "application/pdf"),
    (".zip", "application/zip"),
    (".gz", "application/gzip"),
    (".tar", "application/x-tar"),
];

/// Extension to media type lookup table
#[derive(Debug, Clone)]
pub struct ContentTypes {
    types: HashMap<String, String>,
    default: String,
}

impl ContentTypes {
    /// Built-in table with `default` for unknown extensions
    pub fn new(default: impl Into<String>) -> Self {
        Self {
            types: BUILTIN
                .iter()
                .map(|(ext, ty)| ((*ext).to_string(), (*ty).to_string()))
                .collect(),
            default: default.into(),
        }
    }

    /// Built-in table merged with `overrides`
    ///
    /// Override keys are normalised, so `"MD"`, `"md"` and `".md"` are equivalent.
    pub fn with_overrides<'a>(
        default: impl Into<String>,
        overrides: impl IntoIterator<Item = (&'a String, &'a String)>,
    ) -> Self {
        let mut table = Self::new(default);
        for (ext, ty) in overrides {
            table.insert(ext, ty.clone());
        }
        table
    }

    pub fn insert(&mut self, extension: &str, media_type: impl Into<String>) {
        self.types
            .insert(normalize_extension(extension), media_type.into());
    }

    /// Media type for an extension such as `".pdf"`
    pub fn get(&self, extension: &str) -> Option<&str> {
        self.types
            .get(&normalize_extension(extension))
            .map(String::as_str)
    }

    /// Media type for a file path, or the default
    pub fn for_path(&self, path: &Path) -> &str {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.get(ext))
            .unwrap_or(&self.default)
    }

    pub fn default_type(&self) -> &str {
        &self.default
    }
}

fn normalize_extension(extension: &str) -> String {
    let ext = extension.trim().to_ascii_lowercase();
    if ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}
