use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::backend::{Backend, BackendError, Bucket};

#[derive(Debug, Error)]
pub enum PatternUrlError {
    #[error("Project not found.")]
    ProjectNotFound(Uuid),

    #[error("No pattern for this project.")]
    NoPattern(Uuid),

    #[error("Could not generate download link.")]
    SigningFailed(#[source] BackendError),
}

/// Time-limited download link for a project's pattern PDF.
pub fn pattern_download_url(
    backend: &impl Backend,
    id: Uuid,
    expires_in: u64,
) -> Result<String, PatternUrlError> {
    let project = match backend.find_project(id) {
        Ok(Some(project)) => project,
        Ok(None) => return Err(PatternUrlError::ProjectNotFound(id)),
        Err(e) => {
            warn!(%id, error = %e, "Project lookup failed");
            return Err(PatternUrlError::ProjectNotFound(id));
        }
    };

    let pattern_path = project
        .pattern_path
        .ok_or(PatternUrlError::NoPattern(id))?;

    backend
        .signed_url(Bucket::Patterns, &pattern_path, expires_in)
        .map_err(|e| {
            warn!(%id, error = %e, "Signing pattern URL failed");
            PatternUrlError::SigningFailed(e)
        })
}
