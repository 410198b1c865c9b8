use std::ops::RangeInclusive;

use crate::{
    error::{TrackerError, ValidationError},
    store::entities::{SettingsPatch, UserSettings},
};

use super::TrackerContext;

pub const POMODORO_MINUTES: RangeInclusive<u32> = 5..=60;

/// Stored settings, or the defaults when the user never saved any.
pub async fn load_settings(context: &TrackerContext) -> Result<UserSettings, TrackerError> {
    let user = context.require_user()?;
    Ok(context.store.settings(user).await?.unwrap_or_default())
}

fn validate(patch: &SettingsPatch) -> Result<(), ValidationError> {
    match patch.pomodoro_duration {
        Some(value) if !POMODORO_MINUTES.contains(&value) => {
            Err(ValidationError::PomodoroOutOfRange {
                value,
                min: *POMODORO_MINUTES.start(),
                max: *POMODORO_MINUTES.end(),
            })
        }
        _ => Ok(()),
    }
}

/// Merges `patch` into the stored settings and returns the result.
pub async fn save_settings(
    context: &TrackerContext,
    patch: SettingsPatch,
) -> Result<UserSettings, TrackerError> {
    let user = context.require_user()?;
    validate(&patch)?;
    if !patch.is_empty() {
        context.store.upsert_settings(user, patch).await?;
    }
    load_settings(context).await
}
