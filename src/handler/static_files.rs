//! Static file serving module
//!
//! Streams a file resolved by a static route, with its media type and length.

use std::path::Path;

use tokio::fs::{self, File};

use crate::error::{Error, Result};
use crate::http::{Request, Response};

/// What a filesystem path points at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathKind {
    File,
    Directory,
    Missing,
}

/// Classify `path`, following symlinks; unreadable paths count as missing
pub async fn path_kind(path: &Path) -> PathKind {
    match fs::metadata(path).await {
        Ok(meta) if meta.is_file() => PathKind::File,
        Ok(meta) if meta.is_dir() => PathKind::Directory,
        _ => PathKind::Missing,
    }
}

/// Serve `file` as the response body
///
/// Anything but a regular file is reported as `RouteNotFound`, which the
/// connection handler turns into a 404.
pub async fn serve_file(
    request: &Request,
    response: &mut Response,
    file: &Path,
    content_type: &str,
) -> Result<()> {
    if path_kind(file).await != PathKind::File {
        tracing::debug!(file = %file.display(), "static target is not a regular file");
        return Err(Error::RouteNotFound {
            method: request.method().to_string(),
            path: request.path().to_string(),
        });
    }

    let mut source = File::open(file).await?;
    let length = source.metadata().await?.len();

    response
        .set_header("Content-Type", content_type)
        .set_header("Content-Length", length.to_string());
    response.write_from(&mut source).await?;
    Ok(())
}
