use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    backend::{Backend, BackendError, Bucket},
    models::{
        project::{NewProject, Project, ProjectChanges},
        session::Session,
        upload::UploadFile,
    },
    services::auth::{AuthError, require_admin},
};

const PATTERN_CONTENT_TYPE: &str = "application/pdf";

/// Splits a comma-separated tag field. Segments are trimmed and lowercased,
/// empty ones dropped; order and duplicates are kept.
pub fn parse_tags(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_lowercase())
        .filter(|t| !t.is_empty())
        .collect()
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
}

fn non_empty(file: Option<UploadFile>) -> Option<UploadFile> {
    file.filter(|f| !f.is_empty())
}

fn as_pattern(mut file: UploadFile) -> UploadFile {
    file.content_type = PATTERN_CONTENT_TYPE.to_string();
    file
}

/// Uploads under a fresh `<namespace>/<uuid>.<ext>` path and returns that path.
fn upload(backend: &impl Backend, bucket: Bucket, file: &UploadFile) -> Result<String, BackendError> {
    let path = format!("{}/{}.{}", bucket.namespace(), Uuid::new_v4(), file.extension());
    backend.upload_object(bucket, &path, file)?;
    Ok(path)
}

/// Removes objects uploaded by a mutation that did not complete.
fn compensate(backend: &impl Backend, uploaded: &[(Bucket, String)]) {
    for (bucket, path) in uploaded {
        match backend.remove_object(*bucket, path) {
            Ok(()) => info!(bucket = bucket.name(), path = %path, "Removed orphaned upload"),
            Err(e) => warn!(bucket = bucket.name(), path = %path, error = %e, "Failed to remove orphaned upload"),
        }
    }
}

/// Best-effort removal of an object the row no longer references.
fn remove_superseded(backend: &impl Backend, bucket: Bucket, path: &str) {
    if let Err(e) = backend.remove_object(bucket, path) {
        warn!(bucket = bucket.name(), path, error = %e, "Failed to remove stored object");
    }
}

pub fn list_projects(backend: &impl Backend) -> Result<Vec<Project>, BackendError> {
    backend.list_projects()
}

#[derive(Debug, Error)]
pub enum GetProjectError {
    #[error("Project not found.")]
    ProjectNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[from] BackendError),
}

pub fn get_project(backend: &impl Backend, id: Uuid) -> Result<Project, GetProjectError> {
    backend
        .find_project(id)?
        .ok_or(GetProjectError::ProjectNotFound(id))
}

#[derive(Debug, Error)]
pub enum CreateProjectError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Project name is required.")]
    MissingName,

    #[error("An image is required.")]
    MissingImage,

    #[error("Image upload failed: {0}")]
    ImageUpload(#[source] BackendError),

    #[error("Pattern upload failed: {0}")]
    PatternUpload(#[source] BackendError),

    #[error("Database error: {0}")]
    Database(#[source] BackendError),
}

pub struct CreateProjectParameters {
    pub name: String,
    pub description: Option<String>,
    /// Comma-separated tags as typed in the form
    pub tags: String,
    pub image: Option<UploadFile>,
    pub pattern: Option<UploadFile>,
}

pub fn create_project(
    backend: &impl Backend,
    session: Option<&Session>,
    parameters: CreateProjectParameters,
) -> Result<Project, CreateProjectError> {
    require_admin(backend, session)?;

    // 1. Validate
    let name = parameters.name.trim().to_string();
    if name.is_empty() {
        return Err(CreateProjectError::MissingName);
    }
    let image = non_empty(parameters.image).ok_or(CreateProjectError::MissingImage)?;
    let pattern = non_empty(parameters.pattern).map(as_pattern);

    // 2. Upload image
    let image_path =
        upload(backend, Bucket::Images, &image).map_err(CreateProjectError::ImageUpload)?;
    let mut uploaded = vec![(Bucket::Images, image_path.clone())];

    // 3. Upload pattern
    let pattern_path = match &pattern {
        Some(file) => match upload(backend, Bucket::Patterns, file) {
            Ok(path) => {
                uploaded.push((Bucket::Patterns, path.clone()));
                Some(path)
            }
            Err(e) => {
                compensate(backend, &uploaded);
                return Err(CreateProjectError::PatternUpload(e));
            }
        },
        None => None,
    };

    // 4. Insert row
    let new_project = NewProject {
        name,
        description: normalize_description(parameters.description),
        image_path,
        pattern_path,
        tags: parse_tags(&parameters.tags),
    };

    match backend.insert_project(&new_project) {
        Ok(project) => {
            info!(id = %project.id, name = %project.name, "Created project");
            Ok(project)
        }
        Err(e) => {
            compensate(backend, &uploaded);
            Err(CreateProjectError::Database(e))
        }
    }
}

#[derive(Debug, Error)]
pub enum UpdateProjectError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Project name is required.")]
    MissingName,

    #[error("Project not found.")]
    ProjectNotFound(Uuid),

    #[error("Image upload failed: {0}")]
    ImageUpload(#[source] BackendError),

    #[error("Pattern upload failed: {0}")]
    PatternUpload(#[source] BackendError),

    #[error("Database error: {0}")]
    Database(#[source] BackendError),
}

/// Field edits for an existing project. `None` keeps the stored value.
pub struct UpdateProjectParameters {
    pub id: Uuid,
    pub name: Option<String>,
    /// An empty description clears it
    pub description: Option<String>,
    /// Comma-separated, replaces the whole set
    pub tags: Option<String>,
    /// Replacement image; `None` keeps the current one
    pub image: Option<UploadFile>,
    /// Replacement pattern; `None` keeps the current one
    pub pattern: Option<UploadFile>,
}

pub fn update_project(
    backend: &impl Backend,
    session: Option<&Session>,
    parameters: UpdateProjectParameters,
) -> Result<Project, UpdateProjectError> {
    require_admin(backend, session)?;

    let name = parameters.name.map(|n| n.trim().to_string());
    if name.as_deref().is_some_and(str::is_empty) {
        return Err(UpdateProjectError::MissingName);
    }

    let current = backend
        .find_project(parameters.id)
        .map_err(UpdateProjectError::Database)?
        .ok_or(UpdateProjectError::ProjectNotFound(parameters.id))?;

    let mut uploaded = Vec::new();

    let image_path = match non_empty(parameters.image) {
        Some(file) => {
            let path =
                upload(backend, Bucket::Images, &file).map_err(UpdateProjectError::ImageUpload)?;
            uploaded.push((Bucket::Images, path.clone()));
            path
        }
        None => current.image_path.clone(),
    };

    let pattern_path = match non_empty(parameters.pattern).map(as_pattern) {
        Some(file) => match upload(backend, Bucket::Patterns, &file) {
            Ok(path) => {
                uploaded.push((Bucket::Patterns, path.clone()));
                Some(path)
            }
            Err(e) => {
                compensate(backend, &uploaded);
                return Err(UpdateProjectError::PatternUpload(e));
            }
        },
        None => current.pattern_path.clone(),
    };

    let changes = ProjectChanges {
        name: name.unwrap_or_else(|| current.name.clone()),
        description: match parameters.description {
            Some(description) => normalize_description(Some(description)),
            None => current.description.clone(),
        },
        image_path,
        pattern_path,
        tags: match parameters.tags {
            Some(tags) => parse_tags(&tags),
            None => current.tags.clone(),
        },
    };

    let updated = match backend.update_project(current.id, &changes) {
        Ok(project) => project,
        Err(e) => {
            compensate(backend, &uploaded);
            return Err(UpdateProjectError::Database(e));
        }
    };

    // Old objects go only once the row points at their replacements
    if updated.image_path != current.image_path {
        remove_superseded(backend, Bucket::Images, &current.image_path);
    }
    if let Some(previous) = &current.pattern_path
        && updated.pattern_path.as_ref() != Some(previous)
    {
        remove_superseded(backend, Bucket::Patterns, previous);
    }

    info!(id = %updated.id, "Updated project");
    Ok(updated)
}

#[derive(Debug, Error)]
pub enum DeleteProjectError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("Project not found.")]
    ProjectNotFound(Uuid),

    #[error("Database error: {0}")]
    Database(#[source] BackendError),
}

pub struct DeleteProjectParameters {
    pub id: Uuid,
}

pub fn delete_project(
    backend: &impl Backend,
    session: Option<&Session>,
    parameters: DeleteProjectParameters,
) -> Result<Project, DeleteProjectError> {
    require_admin(backend, session)?;

    let project = backend
        .find_project(parameters.id)
        .map_err(DeleteProjectError::Database)?
        .ok_or(DeleteProjectError::ProjectNotFound(parameters.id))?;

    remove_superseded(backend, Bucket::Images, &project.image_path);
    if let Some(pattern_path) = &project.pattern_path {
        remove_superseded(backend, Bucket::Patterns, pattern_path);
    }

    backend
        .delete_project(project.id)
        .map_err(DeleteProjectError::Database)?;

    info!(id = %project.id, name = %project.name, "Deleted project");
    Ok(project)
}
