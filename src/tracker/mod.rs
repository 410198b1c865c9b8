//! Everything that acts on behalf of a user: the timer session, projects, settings and entry
//! history. Operations receive a [TrackerContext] instead of reaching for global state.

pub mod entries;
pub mod projects;
pub mod reconcile;
pub mod session;
pub mod settings;
pub mod shutdown;
pub mod stopwatch;

use std::sync::Arc;

use crate::{
    error::ValidationError,
    store::{entities::UserId, DocumentStore},
};

/// Current user and the store handle every tracker operation works with.
#[derive(Clone)]
pub struct TrackerContext {
    pub user: Option<UserId>,
    pub store: Arc<dyn DocumentStore>,
}

impl TrackerContext {
    pub fn new(user: Option<UserId>, store: Arc<dyn DocumentStore>) -> Self {
        Self { user, store }
    }

    pub fn require_user(&self) -> Result<&UserId, ValidationError> {
        self.user.as_ref().ok_or(ValidationError::NoUser)
    }
}
