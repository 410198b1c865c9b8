//! Error types shared by the tracker and the stores.
//!
//! Validation failures never touch the store. Store failures may arrive after local state has
//! already changed; nothing is rolled back.

use std::{io, path::PathBuf};

use thiserror::Error;

use crate::store::paths::DocumentPath;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("You must be logged in")]
    NoUser,

    #[error("Please enter a description for your time entry")]
    EmptyDescription,

    #[error("A timer is already running, stop it first")]
    AlreadyRunning,

    #[error("Project name must be at least {min} characters")]
    ProjectNameTooShort { min: usize },

    #[error("Pomodoro duration must be between {min} and {max} minutes, got {value}")]
    PomodoroOutOfRange { value: u32, min: u32, max: u32 },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Malformed document {path}: {source}")]
    Malformed {
        path: DocumentPath,
        #[source]
        source: serde_json::Error,
    },

    #[error("Document {0} not found")]
    NotFound(DocumentPath),

    #[error("Invalid document path {0}")]
    InvalidPath(String),

    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

#[derive(Error, Debug)]
pub enum TrackerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Background write was aborted: {0}")]
    Aborted(#[from] tokio::task::JoinError),
}
