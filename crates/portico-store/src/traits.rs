//! Content resolution abstractions.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use crate::error::StoreError;
use crate::types::Content;

/// Maximum length for a content identifier.
pub const MAX_CONTENT_ID_LENGTH: usize = 128;

/// Regex pattern for valid content identifiers.
static CONTENT_ID_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_-]+$").ok());

/// Resolves content identifiers to stored content.
///
/// Resolution is content-addressed: the same identifier always yields the
/// same bytes. Unknown identifiers resolve to `None`; only malformed
/// identifiers are an error.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Resolve an identifier to its content.
    ///
    /// With `as_bytes` set, content is returned as raw bytes; otherwise the
    /// store returns text where the content decodes as UTF-8.
    async fn resolve(&self, id: &str, as_bytes: bool) -> Result<Option<Content>, StoreError>;
}

/// Validate a content identifier.
pub fn validate_content_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() {
        return Err(StoreError::InvalidIdentifier(
            "content identifier cannot be empty".into(),
        ));
    }

    if id.len() > MAX_CONTENT_ID_LENGTH {
        return Err(StoreError::InvalidIdentifier(format!(
            "content identifier exceeds maximum length of {MAX_CONTENT_ID_LENGTH} characters"
        )));
    }

    // Check for path traversal
    if id.contains("..") || id.contains('/') || id.contains('\\') {
        return Err(StoreError::InvalidIdentifier(
            "content identifier contains invalid characters".into(),
        ));
    }

    let Some(pattern) = CONTENT_ID_PATTERN.as_ref() else {
        return Err(StoreError::InvalidIdentifier(
            "content identifier validation unavailable".into(),
        ));
    };

    if !pattern.is_match(id) {
        return Err(StoreError::InvalidIdentifier(
            "content identifier must contain only letters, numbers, underscores, and dashes"
                .into(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validate_valid_ids() {
        assert!(validate_content_id("abc123").is_ok());
        assert!(validate_content_id("a").is_ok());
        assert!(validate_content_id("snapshot_2024-01").is_ok());
        assert!(validate_content_id(&"f".repeat(MAX_CONTENT_ID_LENGTH)).is_ok());
    }

    #[test]
    fn validate_invalid_empty() {
        assert!(validate_content_id("").is_err());
    }

    #[test]
    fn validate_invalid_too_long() {
        let long_id = "a".repeat(MAX_CONTENT_ID_LENGTH + 1);
        assert!(validate_content_id(&long_id).is_err());
    }

    #[test]
    fn validate_invalid_path_traversal() {
        assert!(validate_content_id("..").is_err());
        assert!(validate_content_id("../etc").is_err());
        assert!(validate_content_id("foo/bar").is_err());
        assert!(validate_content_id("foo\\bar").is_err());
    }

    #[test]
    fn validate_invalid_pattern() {
        assert!(validate_content_id("abc 123").is_err()); // whitespace
        assert!(validate_content_id("abc.html").is_err()); // extension separator
        assert!(validate_content_id("abc#1").is_err()); // punctuation
    }
}
