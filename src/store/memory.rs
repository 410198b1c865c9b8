use std::{
    collections::BTreeMap,
    sync::{Arc, Mutex, MutexGuard},
};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::StoreError;

use super::{
    merge_document,
    paths::{CollectionPath, DocumentPath},
    DocumentBackend,
};

/// Keeps documents in process memory. Clones share the same documents.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    documents: Arc<Mutex<BTreeMap<DocumentPath, Value>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn documents(&self) -> Result<MutexGuard<'_, BTreeMap<DocumentPath, Value>>, StoreError> {
        self.documents
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".into()))
    }
}

#[async_trait]
impl DocumentBackend for MemoryStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Value>, StoreError> {
        Ok(self.documents()?.get(path).cloned())
    }

    async fn list(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<(DocumentPath, Value)>, StoreError> {
        Ok(self
            .documents()?
            .iter()
            .filter(|(path, _)| &path.parent() == collection)
            .map(|(path, value)| (path.clone(), value.clone()))
            .collect())
    }

    async fn set(&self, path: &DocumentPath, document: Value) -> Result<(), StoreError> {
        self.documents()?.insert(path.clone(), document);
        Ok(())
    }

    async fn merge(
        &self,
        path: &DocumentPath,
        patch: Value,
        upsert: bool,
    ) -> Result<(), StoreError> {
        let mut documents = self.documents()?;
        match documents.get_mut(path) {
            Some(existing) => merge_document(existing, patch),
            None if upsert => {
                documents.insert(path.clone(), patch);
            }
            None => return Err(StoreError::NotFound(path.clone())),
        }
        Ok(())
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError> {
        self.documents()?.remove(path);
        Ok(())
    }
}
