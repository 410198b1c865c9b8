use std::{fmt::Display, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

macro_rules! document_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize, Clone)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.into())
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self(value.into())
            }
        }
    };
}

document_id!(
    /// Identifier of the user owning every document below `users/{uid}`.
    UserId
);
document_id!(EntryId);
document_id!(ProjectId);

/// Display fields of a project copied into a time entry when the entry is created. Later edits
/// of the project don't reach already created entries.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
pub struct ProjectSnapshot {
    pub name: String,
    pub color: String,
}

impl From<&Project> for ProjectSnapshot {
    fn from(project: &Project) -> Self {
        Self {
            name: project.name.clone(),
            color: project.color.clone(),
        }
    }
}

/// Stored time entry. An entry without `end_time` is the one currently running.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct TimeEntry {
    pub id: EntryId,
    pub description: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub start_time: DateTime<Utc>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub end_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub project_id: Option<ProjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project: Option<ProjectSnapshot>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_billable: bool,
    pub user_id: UserId,
}

impl TimeEntry {
    pub fn is_open(&self) -> bool {
        self.end_time.is_none()
    }

    /// Tracked duration. Open entries are measured up to `now`.
    pub fn duration_at(&self, now: DateTime<Utc>) -> Duration {
        (self.end_time.unwrap_or(now) - self.start_time).max(Duration::zero())
    }
}

/// Everything needed to create a [TimeEntry] except the identifier, which the store assigns.
/// New entries are always open and carry no tags.
#[derive(PartialEq, Eq, Debug, Clone)]
pub struct NewTimeEntry {
    pub description: String,
    pub start_time: DateTime<Utc>,
    pub project_id: Option<ProjectId>,
    pub project: Option<ProjectSnapshot>,
    pub is_billable: bool,
    pub user_id: UserId,
}

impl NewTimeEntry {
    pub fn with_id(self, id: EntryId) -> TimeEntry {
        TimeEntry {
            id,
            description: self.description,
            start_time: self.start_time,
            end_time: None,
            project_id: self.project_id,
            project: self.project,
            tags: vec![],
            is_billable: self.is_billable,
            user_id: self.user_id,
        }
    }
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub color: String,
    pub user_id: UserId,
}

#[derive(PartialEq, Eq, Debug, Clone)]
pub struct NewProject {
    pub name: String,
    pub description: Option<String>,
    pub color: String,
}

impl NewProject {
    pub fn with_id(self, id: ProjectId, user_id: UserId) -> Project {
        Project {
            id,
            name: self.name,
            description: self.description,
            color: self.color,
            user_id,
        }
    }
}

/// Partial project update. Absent fields are left untouched.
#[derive(PartialEq, Eq, Debug, Serialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ProjectPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone, Copy, Default, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    Light,
    #[default]
    Dark,
    System,
}

impl Display for Theme {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Theme::Light => write!(f, "light"),
            Theme::Dark => write!(f, "dark"),
            Theme::System => write!(f, "system"),
        }
    }
}

pub const DEFAULT_POMODORO_MINUTES: u32 = 25;

fn default_pomodoro() -> u32 {
    DEFAULT_POMODORO_MINUTES
}

/// Per user settings singleton stored at `users/{uid}/settings/user-settings`.
#[derive(PartialEq, Eq, Debug, Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct UserSettings {
    #[serde(default)]
    pub theme: Theme,
    #[serde(default = "default_pomodoro")]
    pub pomodoro_duration: u32,
    #[serde(default)]
    pub reminder_enabled: bool,
}

impl Default for UserSettings {
    fn default() -> Self {
        Self {
            theme: Theme::default(),
            pomodoro_duration: DEFAULT_POMODORO_MINUTES,
            reminder_enabled: false,
        }
    }
}

/// Settings upsert. Only present fields are written.
#[derive(PartialEq, Eq, Debug, Serialize, Default, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SettingsPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub theme: Option<Theme>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pomodoro_duration: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminder_enabled: Option<bool>,
}

impl SettingsPatch {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
