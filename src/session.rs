use std::path::PathBuf;

use thiserror::Error;

use crate::models::session::Session;

pub mod json;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Failed to load session from '{path}': {source}")]
    LoadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse session from '{path}': {source}")]
    ParseFailed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to save session to '{path}': {source}")]
    SaveFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize session to JSON: {source}")]
    SerializeFailed {
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to remove session file '{path}': {source}")]
    ClearFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where the signed-in admin session lives between commands.
pub trait SessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError>;
    fn save(&self, session: &Session) -> Result<(), SessionError>;
    fn clear(&self) -> Result<(), SessionError>;
}
