//! Storage is organized as a tree of JSON documents, addressed the same way regardless of
//! where they live:
//!  - `users/{uid}/timeEntries/{id}` holds time entries.
//!  - `users/{uid}/projects/{id}` holds projects.
//!  - `users/{uid}/settings/user-settings` holds the settings singleton.
//!
//! [DocumentStore] is the typed contract the tracker talks to. Any [DocumentBackend] (raw JSON
//! documents) gets it for free, see [memory::MemoryStore] and [file_store::FileStore].

pub mod entities;
pub mod feed;
pub mod file_store;
pub mod memory;
pub mod paths;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{instrument, warn};
use uuid::Uuid;

use crate::error::StoreError;

use entities::{
    EntryId, NewProject, NewTimeEntry, Project, ProjectId, ProjectPatch, SettingsPatch, TimeEntry,
    UserId, UserSettings,
};
use paths::{CollectionPath, DocumentPath};

/// Operations the tracker needs from the external store.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The single entry with unset end time, most recent by start time.
    async fn open_entry(&self, user: &UserId) -> Result<Option<TimeEntry>, StoreError>;

    /// Entries whose start time lies in `[from, to]`, most recent first.
    async fn entries_between(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>, StoreError>;

    async fn create_entry(
        &self,
        user: &UserId,
        entry: NewTimeEntry,
    ) -> Result<EntryId, StoreError>;

    /// Partial update that only touches `endTime`.
    async fn set_entry_end(
        &self,
        user: &UserId,
        id: &EntryId,
        end_time: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    async fn delete_entry(&self, user: &UserId, id: &EntryId) -> Result<(), StoreError>;

    async fn projects(&self, user: &UserId) -> Result<Vec<Project>, StoreError>;

    async fn create_project(
        &self,
        user: &UserId,
        project: NewProject,
    ) -> Result<ProjectId, StoreError>;

    async fn update_project(
        &self,
        user: &UserId,
        id: &ProjectId,
        patch: ProjectPatch,
    ) -> Result<(), StoreError>;

    async fn delete_project(&self, user: &UserId, id: &ProjectId) -> Result<(), StoreError>;

    async fn settings(&self, user: &UserId) -> Result<Option<UserSettings>, StoreError>;

    /// Creates the settings document on first use, merges into it afterwards.
    async fn upsert_settings(
        &self,
        user: &UserId,
        patch: SettingsPatch,
    ) -> Result<(), StoreError>;
}

/// Untyped document storage.
#[async_trait]
pub trait DocumentBackend: Send + Sync {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Value>, StoreError>;

    /// All documents of a collection. Unreadable documents are skipped.
    async fn list(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<(DocumentPath, Value)>, StoreError>;

    async fn set(&self, path: &DocumentPath, document: Value) -> Result<(), StoreError>;

    /// Merges `patch` into the stored document. Missing documents are created when `upsert` is
    /// set and reported as [StoreError::NotFound] otherwise.
    async fn merge(
        &self,
        path: &DocumentPath,
        patch: Value,
        upsert: bool,
    ) -> Result<(), StoreError>;

    /// Deleting a missing document is not an error.
    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError>;
}

/// Recursively merges object fields of `patch` into `target`. Non-object values replace.
pub fn merge_document(target: &mut Value, patch: Value) {
    match (target, patch) {
        (Value::Object(target), Value::Object(patch)) => {
            for (key, value) in patch {
                match target.get_mut(&key) {
                    Some(existing) => merge_document(existing, value),
                    None => {
                        target.insert(key, value);
                    }
                }
            }
        }
        (target, patch) => *target = patch,
    }
}

fn new_document_id() -> String {
    Uuid::new_v4().simple().to_string()
}

fn encode(path: &DocumentPath, value: &impl Serialize) -> Result<Value, StoreError> {
    serde_json::to_value(value).map_err(|source| StoreError::Malformed {
        path: path.clone(),
        source,
    })
}

fn decode<T: DeserializeOwned>(path: &DocumentPath, value: Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|source| StoreError::Malformed {
        path: path.clone(),
        source,
    })
}

/// Decodes a collection, dropping documents that don't fit the schema.
fn decode_all<T: DeserializeOwned>(documents: Vec<(DocumentPath, Value)>) -> Vec<T> {
    documents
        .into_iter()
        .filter_map(|(path, value)| match decode(&path, value) {
            Ok(v) => Some(v),
            Err(e) => {
                // ignore illegal documents, they might be left over from older versions
                warn!("Skipping document: {e}");
                None
            }
        })
        .collect()
}

#[async_trait]
impl<B: DocumentBackend> DocumentStore for B {
    #[instrument(skip(self))]
    async fn open_entry(&self, user: &UserId) -> Result<Option<TimeEntry>, StoreError> {
        let documents = self.list(&CollectionPath::time_entries(user)).await?;
        Ok(decode_all::<TimeEntry>(documents)
            .into_iter()
            .filter(TimeEntry::is_open)
            .max_by_key(|entry| entry.start_time))
    }

    async fn entries_between(
        &self,
        user: &UserId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<TimeEntry>, StoreError> {
        let documents = self.list(&CollectionPath::time_entries(user)).await?;
        let mut entries = decode_all::<TimeEntry>(documents)
            .into_iter()
            .filter(|entry| entry.start_time >= from && entry.start_time <= to)
            .collect::<Vec<_>>();
        entries.sort_by(|a, b| b.start_time.cmp(&a.start_time));
        Ok(entries)
    }

    #[instrument(skip(self, entry))]
    async fn create_entry(
        &self,
        user: &UserId,
        entry: NewTimeEntry,
    ) -> Result<EntryId, StoreError> {
        let id = EntryId::from(new_document_id());
        let path = CollectionPath::time_entries(user).doc(&id);
        let document = encode(&path, &entry.with_id(id.clone()))?;
        self.set(&path, document).await?;
        Ok(id)
    }

    #[instrument(skip(self))]
    async fn set_entry_end(
        &self,
        user: &UserId,
        id: &EntryId,
        end_time: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let path = CollectionPath::time_entries(user).doc(id);
        let patch = serde_json::json!({ "endTime": end_time.timestamp_millis() });
        self.merge(&path, patch, false).await
    }

    async fn delete_entry(&self, user: &UserId, id: &EntryId) -> Result<(), StoreError> {
        self.delete(&CollectionPath::time_entries(user).doc(id)).await
    }

    async fn projects(&self, user: &UserId) -> Result<Vec<Project>, StoreError> {
        let documents = self.list(&CollectionPath::projects(user)).await?;
        let mut projects = decode_all::<Project>(documents);
        projects.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(projects)
    }

    async fn create_project(
        &self,
        user: &UserId,
        project: NewProject,
    ) -> Result<ProjectId, StoreError> {
        let id = ProjectId::from(new_document_id());
        let path = CollectionPath::projects(user).doc(&id);
        let document = encode(&path, &project.with_id(id.clone(), user.clone()))?;
        self.set(&path, document).await?;
        Ok(id)
    }

    async fn update_project(
        &self,
        user: &UserId,
        id: &ProjectId,
        patch: ProjectPatch,
    ) -> Result<(), StoreError> {
        let path = CollectionPath::projects(user).doc(id);
        let patch = encode(&path, &patch)?;
        self.merge(&path, patch, false).await
    }

    async fn delete_project(&self, user: &UserId, id: &ProjectId) -> Result<(), StoreError> {
        self.delete(&CollectionPath::projects(user).doc(id)).await
    }

    async fn settings(&self, user: &UserId) -> Result<Option<UserSettings>, StoreError> {
        let path = DocumentPath::user_settings(user);
        self.get(&path)
            .await?
            .map(|value| decode(&path, value))
            .transpose()
    }

    #[instrument(skip(self))]
    async fn upsert_settings(
        &self,
        user: &UserId,
        patch: SettingsPatch,
    ) -> Result<(), StoreError> {
        let path = DocumentPath::user_settings(user);
        let patch = encode(&path, &patch)?;
        self.merge(&path, patch, true).await
    }
}
