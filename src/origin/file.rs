//! Local-file origin.

use std::path::{Component, Path, PathBuf};

use axum::http::{HeaderMap, StatusCode};
use bytes::Bytes;
use tracing::warn;

use super::OriginResponse;
use crate::error::{ConfigError, OriginError, Result};

/// Serves files below a fixed root directory.
///
/// A request path never resolves outside the root: `..`, absolute and
/// prefix components are rejected before touching the filesystem, and the
/// canonical target (after symlinks) must still lie under the canonical root.
#[derive(Debug, Clone)]
pub struct FileOrigin {
    root: PathBuf,
}

impl FileOrigin {
    /// Opens `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> std::result::Result<Self, ConfigError> {
        let root = root.as_ref();
        let invalid = |reason: String| ConfigError::InvalidValue {
            name: "FILE_ROOT",
            value: root.display().to_string(),
            reason,
        };

        let canonical = std::fs::canonicalize(root).map_err(|e| invalid(e.to_string()))?;
        if !canonical.is_dir() {
            return Err(invalid("not a directory".to_string()));
        }
        Ok(Self { root: canonical })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Maps a request path to a candidate file path under the root.
    ///
    /// Returns `None` for traversal attempts and for paths naming the root
    /// itself.
    pub fn resolve_path(&self, request_path: &str) -> Option<PathBuf> {
        let relative = Path::new(request_path.trim_start_matches('/'));
        let mut resolved = self.root.clone();
        let mut depth = 0usize;

        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => return None,
            }
        }

        (depth > 0).then_some(resolved)
    }

    /// Reads the whole file named by `request_path`.
    pub async fn fetch(&self, request_path: &str) -> Result<OriginResponse> {
        let not_found = || OriginError::NotFound(request_path.to_string());

        let Some(candidate) = self.resolve_path(request_path) else {
            warn!(path = %request_path, "rejected path outside file root");
            return Err(not_found());
        };

        let canonical = tokio::fs::canonicalize(&candidate)
            .await
            .map_err(|_| not_found())?;
        if !canonical.starts_with(&self.root) {
            warn!(path = %request_path, "rejected symlink escaping file root");
            return Err(not_found());
        }

        let metadata = tokio::fs::metadata(&canonical).await.map_err(|_| not_found())?;
        if !metadata.is_file() {
            return Err(not_found());
        }

        let data = tokio::fs::read(&canonical).await.map_err(|_| not_found())?;
        Ok(OriginResponse {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Bytes::from(data),
        })
    }
}
