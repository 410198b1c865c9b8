use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use fs4::tokio::AsyncFileExt;
use futures::{stream, StreamExt};
use serde_json::Value;
use tokio::fs::File;
use tracing::{debug, warn};

use crate::error::StoreError;

use super::{
    merge_document,
    paths::{CollectionPath, DocumentPath},
    DocumentBackend,
};

const LOCK_FILE: &str = ".lock";
const DOCUMENT_EXTENSION: &str = "json";
const CONCURRENT_READS: usize = 4;

/// Stores every document as a JSON file: `users/u1/timeEntries/abc` lives in
/// `<root>/users/u1/timeEntries/abc.json`. Each collection directory has a lock file, held
/// exclusively by writers and shared by readers, so several processes can use the same root.
pub struct FileStore {
    root: PathBuf,
}

/// Held lock of a collection. Dropping it closes the file which also releases the lock.
struct CollectionLock {
    file: File,
    path: PathBuf,
}

impl CollectionLock {
    async fn release(self) -> Result<(), StoreError> {
        self.file
            .unlock_async()
            .await
            .map_err(|e| StoreError::io(&self.path, e))
    }
}

impl FileStore {
    pub fn new(root: PathBuf) -> Result<Self, std::io::Error> {
        std::fs::create_dir_all(&root)?;

        Ok(Self { root })
    }

    fn collection_dir(&self, collection: &CollectionPath) -> Result<PathBuf, StoreError> {
        let mut dir = self.root.clone();
        for segment in collection.checked_segments()? {
            dir.push(segment);
        }
        Ok(dir)
    }

    fn document_file(&self, path: &DocumentPath) -> Result<PathBuf, StoreError> {
        path.checked_segments()?;
        let dir = self.collection_dir(&path.parent())?;
        Ok(dir.join(format!("{}.{DOCUMENT_EXTENSION}", path.id())))
    }

    async fn lock_collection(
        &self,
        collection: &CollectionPath,
        exclusive: bool,
    ) -> Result<CollectionLock, StoreError> {
        let dir = self.collection_dir(collection)?;
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let path = dir.join(LOCK_FILE);
        let file = File::options()
            .write(true)
            .create(true)
            .read(true)
            .truncate(false)
            .open(&path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        let locked = if exclusive {
            file.lock_exclusive()
        } else {
            file.lock_shared()
        };
        locked.map_err(|e| StoreError::io(&path, e))?;

        Ok(CollectionLock { file, path })
    }

    async fn read_document(
        path: &DocumentPath,
        file: &Path,
    ) -> Result<Option<Value>, StoreError> {
        debug!("Reading {file:?}");
        let bytes = match tokio::fs::read(file).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(file, e)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                path: path.clone(),
                source,
            })
    }

    /// Writes through a temporary file so readers never see half written documents.
    async fn write_document(
        path: &DocumentPath,
        file: &Path,
        document: &Value,
    ) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(document).map_err(|source| {
            StoreError::Malformed {
                path: path.clone(),
                source,
            }
        })?;
        let temporary = file.with_extension("json.tmp");
        tokio::fs::write(&temporary, bytes)
            .await
            .map_err(|e| StoreError::io(&temporary, e))?;
        tokio::fs::rename(&temporary, file)
            .await
            .map_err(|e| StoreError::io(file, e))
    }

    async fn document_files(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<(DocumentPath, PathBuf)>, StoreError> {
        let dir = self.collection_dir(collection)?;
        let mut read_dir = match tokio::fs::read_dir(&dir).await {
            Ok(v) => v,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
            Err(e) => return Err(StoreError::io(&dir, e)),
        };

        let mut files = vec![];
        while let Some(item) = read_dir
            .next_entry()
            .await
            .map_err(|e| StoreError::io(&dir, e))?
        {
            let file = item.path();
            if file.extension().and_then(|v| v.to_str()) != Some(DOCUMENT_EXTENSION) {
                continue;
            }
            let Some(id) = file.file_stem().and_then(|v| v.to_str()) else {
                continue;
            };
            files.push((collection.doc(id), file.clone()));
        }
        Ok(files)
    }
}

#[async_trait]
impl DocumentBackend for FileStore {
    async fn get(&self, path: &DocumentPath) -> Result<Option<Value>, StoreError> {
        let file = self.document_file(path)?;
        let lock = self.lock_collection(&path.parent(), false).await?;
        let result = Self::read_document(path, &file).await;
        lock.release().await?;
        result
    }

    async fn list(
        &self,
        collection: &CollectionPath,
    ) -> Result<Vec<(DocumentPath, Value)>, StoreError> {
        let lock = self.lock_collection(collection, false).await?;
        let files = match self.document_files(collection).await {
            Ok(files) => files,
            Err(e) => {
                lock.release().await?;
                return Err(e);
            }
        };

        let documents = stream::iter(files)
            .map(|(path, file)| async move {
                let document = Self::read_document(&path, &file).await;
                (path, document)
            })
            .buffered(CONCURRENT_READS)
            .filter_map(|(path, document)| async move {
                match document {
                    Ok(Some(v)) => Some((path, v)),
                    Ok(None) => None,
                    Err(e) => {
                        // ignore broken documents. Might happen after an interrupted write
                        warn!("Skipping {path}: {e}");
                        None
                    }
                }
            })
            .collect::<Vec<_>>()
            .await;

        lock.release().await?;
        Ok(documents)
    }

    async fn set(&self, path: &DocumentPath, document: Value) -> Result<(), StoreError> {
        let file = self.document_file(path)?;
        let lock = self.lock_collection(&path.parent(), true).await?;
        let result = Self::write_document(path, &file, &document).await;
        lock.release().await?;
        result
    }

    async fn merge(
        &self,
        path: &DocumentPath,
        patch: Value,
        upsert: bool,
    ) -> Result<(), StoreError> {
        let file = self.document_file(path)?;
        let lock = self.lock_collection(&path.parent(), true).await?;
        let result = async {
            let document = match Self::read_document(path, &file).await? {
                Some(mut existing) => {
                    merge_document(&mut existing, patch);
                    existing
                }
                None if upsert => patch,
                None => return Err(StoreError::NotFound(path.clone())),
            };
            Self::write_document(path, &file, &document).await
        }
        .await;
        lock.release().await?;
        result
    }

    async fn delete(&self, path: &DocumentPath) -> Result<(), StoreError> {
        let file = self.document_file(path)?;
        let lock = self.lock_collection(&path.parent(), true).await?;
        let result = match tokio::fs::remove_file(&file).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::io(&file, e)),
        };
        lock.release().await?;
        result
    }
}
