use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::traits::{validate_content_id, ContentStore};
use crate::types::Content;

/// In-memory content-addressed store.
///
/// Inserting content derives its identifier from a SHA-256 digest, so the
/// same bytes always live under the same identifier and repeated resolution
/// is byte-identical.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert content, returning its derived identifier.
    pub async fn insert(&self, content: impl Into<Bytes>) -> String {
        let content = content.into();
        let id = hex::encode(Sha256::digest(&content));

        let mut entries = self.entries.write().await;
        entries.insert(id.clone(), content);
        id
    }

    /// Insert content under an explicit identifier.
    ///
    /// Replaces any existing entry for the identifier. Intended for fixtures
    /// and development stores where identifiers are hand-assigned.
    pub async fn insert_named(
        &self,
        id: &str,
        content: impl Into<Bytes>,
    ) -> Result<(), StoreError> {
        validate_content_id(id)?;

        let mut entries = self.entries.write().await;
        entries.insert(id.to_owned(), content.into());
        Ok(())
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl ContentStore for MemoryStore {
    async fn resolve(&self, id: &str, as_bytes: bool) -> Result<Option<Content>, StoreError> {
        validate_content_id(id)?;

        let entries = self.entries.read().await;
        let Some(bytes) = entries.get(id) else {
            return Ok(None);
        };

        if as_bytes {
            return Ok(Some(Content::Binary(bytes.clone())));
        }

        match String::from_utf8(bytes.to_vec()) {
            Ok(text) => Ok(Some(Content::Text(text))),
            Err(_) => Ok(Some(Content::Binary(bytes.clone()))),
        }
    }
}
