use tracing::info;

use crate::{
    error::{TrackerError, ValidationError},
    store::entities::{NewProject, Project, ProjectId, ProjectPatch},
};

use super::TrackerContext;

/// Display tokens projects can be colored with.
pub const PROJECT_COLORS: [&str; 9] = [
    "red", "orange", "yellow", "green", "teal", "blue", "indigo", "purple", "pink",
];

pub const MIN_PROJECT_NAME: usize = 2;

fn validate_name(name: &str) -> Result<String, ValidationError> {
    let name = name.trim();
    if name.chars().count() < MIN_PROJECT_NAME {
        return Err(ValidationError::ProjectNameTooShort {
            min: MIN_PROJECT_NAME,
        });
    }
    Ok(name.to_string())
}

fn default_color(existing: usize) -> &'static str {
    PROJECT_COLORS[existing % PROJECT_COLORS.len()]
}

pub async fn list_projects(context: &TrackerContext) -> Result<Vec<Project>, TrackerError> {
    let user = context.require_user()?;
    Ok(context.store.projects(user).await?)
}

/// Creates a project. Without an explicit color the next palette color is picked.
pub async fn create_project(
    context: &TrackerContext,
    name: &str,
    description: Option<String>,
    color: Option<String>,
) -> Result<ProjectId, TrackerError> {
    let user = context.require_user()?;
    let name = validate_name(name)?;

    let color = match color {
        Some(color) => color,
        None => {
            let existing = context.store.projects(user).await?.len();
            default_color(existing).to_string()
        }
    };

    let id = context
        .store
        .create_project(
            user,
            NewProject {
                name,
                description: description.filter(|d| !d.trim().is_empty()),
                color,
            },
        )
        .await?;
    info!("Created project {id}");
    Ok(id)
}

/// Applies `patch` to the project. A present name goes through the same validation as on
/// creation.
pub async fn edit_project(
    context: &TrackerContext,
    id: &ProjectId,
    mut patch: ProjectPatch,
) -> Result<(), TrackerError> {
    let user = context.require_user()?;
    if let Some(name) = &patch.name {
        patch.name = Some(validate_name(name)?);
    }
    context.store.update_project(user, id, patch).await?;
    Ok(())
}

/// Entries referencing the project keep their snapshot.
pub async fn delete_project(context: &TrackerContext, id: &ProjectId) -> Result<(), TrackerError> {
    let user = context.require_user()?;
    context.store.delete_project(user, id).await?;
    info!("Deleted project {id}");
    Ok(())
}
