use std::collections::BTreeMap;

use andor_core::Document;
use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::record::validate_key;
use crate::traits::{DocumentPredicate, DocumentStore};

/// In-process store backed by a sorted map. Contents vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    docs: RwLock<BTreeMap<String, Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored documents.
    pub async fn len(&self) -> usize {
        self.docs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.docs.read().await.is_empty()
    }
}

fn not_found(key: &str) -> StoreError {
    StoreError::NotFound {
        key: key.to_string(),
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn has(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.docs.read().await.contains_key(key))
    }

    async fn create(&self, key: &str, doc: Document) -> Result<(), StoreError> {
        validate_key(key)?;
        let mut docs = self.docs.write().await;
        if docs.contains_key(key) {
            return Err(StoreError::AlreadyExists {
                key: key.to_string(),
            });
        }
        docs.insert(key.to_string(), doc);
        Ok(())
    }

    async fn read(&self, key: &str) -> Result<Document, StoreError> {
        self.docs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| not_found(key))
    }

    async fn update(&self, key: &str, doc: Document) -> Result<(), StoreError> {
        let mut docs = self.docs.write().await;
        let slot = docs.get_mut(key).ok_or_else(|| not_found(key))?;
        *slot = doc;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.docs
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| not_found(key))
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.docs.read().await.keys().cloned().collect())
    }

    async fn key_filter(&self, predicate: DocumentPredicate<'_>) -> Result<Vec<String>, StoreError> {
        Ok(self
            .docs
            .read()
            .await
            .iter()
            .filter(|(_, doc)| predicate(doc))
            .map(|(key, _)| key.clone())
            .collect())
    }
}
