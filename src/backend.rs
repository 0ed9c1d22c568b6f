use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    project::{NewProject, Project, ProjectChanges},
    session::{Session, User},
    upload::UploadFile,
};

#[cfg(test)]
pub mod memory;
pub mod supabase;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: ureq::Error,
    },

    #[error("{endpoint} responded with HTTP {status}: {message}")]
    Api {
        endpoint: String,
        status: u16,
        message: String,
    },

    #[error("Unexpected response from {endpoint}: {reason}")]
    Decode { endpoint: String, reason: String },
}

/// Object storage buckets used by the gallery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bucket {
    /// Public-read project photos
    Images,
    /// Private pattern PDFs, only reachable through signed URLs
    Patterns,
}

impl Bucket {
    pub fn name(self) -> &'static str {
        match self {
            Bucket::Images => "project-images",
            Bucket::Patterns => "project-patterns",
        }
    }

    /// Folder new objects are written under.
    pub fn namespace(self) -> &'static str {
        match self {
            Bucket::Images => "images",
            Bucket::Patterns => "patterns",
        }
    }
}

/// The hosted backend: the `projects` table, object storage, and auth.
pub trait Backend {
    /// All projects, newest first.
    fn list_projects(&self) -> Result<Vec<Project>, BackendError>;
    fn find_project(&self, id: Uuid) -> Result<Option<Project>, BackendError>;
    fn insert_project(&self, project: &NewProject) -> Result<Project, BackendError>;
    fn update_project(&self, id: Uuid, changes: &ProjectChanges) -> Result<Project, BackendError>;
    fn delete_project(&self, id: Uuid) -> Result<(), BackendError>;

    fn upload_object(
        &self,
        bucket: Bucket,
        path: &str,
        file: &UploadFile,
    ) -> Result<(), BackendError>;
    fn remove_object(&self, bucket: Bucket, path: &str) -> Result<(), BackendError>;
    fn signed_url(&self, bucket: Bucket, path: &str, expires_in: u64)
    -> Result<String, BackendError>;
    fn public_url(&self, bucket: Bucket, path: &str) -> String;

    fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError>;
    /// `None` when the token is rejected.
    fn get_user(&self, access_token: &str) -> Result<Option<User>, BackendError>;
    fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;
}
