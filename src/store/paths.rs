use std::fmt::Display;

use crate::error::StoreError;

use super::entities::UserId;

pub const TIME_ENTRIES: &str = "timeEntries";
pub const PROJECTS: &str = "projects";
pub const SETTINGS: &str = "settings";
pub const USER_SETTINGS_DOCUMENT: &str = "user-settings";

/// Slash separated location of a collection, e.g. `users/u1/timeEntries`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);

/// Slash separated location of a single document, e.g. `users/u1/timeEntries/abc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocumentPath(String);

impl CollectionPath {
    fn user_scoped(user: &UserId, collection: &str) -> Self {
        Self(format!("users/{user}/{collection}"))
    }

    pub fn time_entries(user: &UserId) -> Self {
        Self::user_scoped(user, TIME_ENTRIES)
    }

    pub fn projects(user: &UserId) -> Self {
        Self::user_scoped(user, PROJECTS)
    }

    pub fn settings(user: &UserId) -> Self {
        Self::user_scoped(user, SETTINGS)
    }

    pub fn doc(&self, id: impl Display) -> DocumentPath {
        DocumentPath(format!("{}/{id}", self.0))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Path segments, rejecting anything that could escape the store root.
    pub fn checked_segments(&self) -> Result<Vec<&str>, StoreError> {
        checked_segments(&self.0)
    }
}

impl DocumentPath {
    pub fn user_settings(user: &UserId) -> Self {
        CollectionPath::settings(user).doc(USER_SETTINGS_DOCUMENT)
    }

    /// The collection this document lives in.
    pub fn parent(&self) -> CollectionPath {
        match self.0.rsplit_once('/') {
            Some((parent, _)) => CollectionPath(parent.to_string()),
            None => CollectionPath(String::new()),
        }
    }

    /// Identifier of the document inside its collection.
    pub fn id(&self) -> &str {
        self.0.rsplit_once('/').map_or(self.0.as_str(), |(_, id)| id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn checked_segments(&self) -> Result<Vec<&str>, StoreError> {
        checked_segments(&self.0)
    }
}

fn checked_segments(path: &str) -> Result<Vec<&str>, StoreError> {
    let segments = path.split('/').collect::<Vec<_>>();
    let illegal = segments.iter().any(|segment| {
        segment.is_empty()
            || *segment == "."
            || *segment == ".."
            || segment.contains(['\\', ':', '\0'])
    });
    if illegal {
        Err(StoreError::InvalidPath(path.to_string()))
    } else {
        Ok(segments)
    }
}

impl Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Display for DocumentPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
