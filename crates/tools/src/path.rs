//! Path validation for file-touching tools.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PathValidationError {
    #[error("Path traversal detected in '{path}'")]
    PathTraversal { path: String },

    #[error("Failed to canonicalize '{path}': {reason}")]
    CanonicalizeFailed { path: String, reason: String },

    #[error("Path '{path}' matches forbidden prefix '{pattern}'")]
    ForbiddenPath { path: String, pattern: String },

    #[error("Path '{path}' is outside the allowed roots")]
    OutsideAllowedRoots { path: String },
}

/// Validate a path against an allowlist of roots and a denylist of
/// prefixes.
///
/// The raw input is rejected on any `..` component before touching the
/// filesystem; existing paths are then canonicalized so symlinks cannot
/// escape the allowed roots. An empty `allowed_roots` allows everything
/// not explicitly forbidden.
pub fn validate_path(
    path: &str,
    allowed_roots: &[String],
    forbidden_paths: &[String],
) -> Result<PathBuf, PathValidationError> {
    let normalized = path.replace('\\', "/");
    if normalized.contains("../") || normalized.contains("/..") || normalized == ".." {
        return Err(PathValidationError::PathTraversal { path: path.into() });
    }

    let input = Path::new(path);
    let canonical = if input.exists() {
        input
            .canonicalize()
            .map_err(|e| PathValidationError::CanonicalizeFailed {
                path: path.into(),
                reason: e.to_string(),
            })?
    } else {
        input.to_path_buf()
    };
    let canonical_str = canonical.to_string_lossy().replace('\\', "/");

    for forbidden in forbidden_paths {
        if canonical_str.starts_with(forbidden.as_str()) {
            return Err(PathValidationError::ForbiddenPath {
                path: path.into(),
                pattern: forbidden.clone(),
            });
        }
    }

    if !allowed_roots.is_empty()
        && !allowed_roots
            .iter()
            .any(|root| canonical_str.starts_with(root.as_str()))
    {
        return Err(PathValidationError::OutsideAllowedRoots { path: path.into() });
    }

    Ok(canonical)
}
