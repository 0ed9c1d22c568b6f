use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
    backend::{Backend, BackendError},
    models::session::{Session, User},
    session::{SessionError, SessionStore},
};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Unauthorized")]
    Unauthorized,

    #[error("Could not verify session: {0}")]
    Backend(#[from] BackendError),
}

/// Gate for every mutation. A missing or expired session is rejected
/// without contacting the backend.
pub fn require_admin(backend: &impl Backend, session: Option<&Session>) -> Result<User, AuthError> {
    let session = match session {
        Some(session) if !session.is_expired() => session,
        Some(_) => {
            debug!("Session expired");
            return Err(AuthError::Unauthorized);
        }
        None => return Err(AuthError::Unauthorized),
    };

    backend
        .get_user(&session.access_token)?
        .ok_or(AuthError::Unauthorized)
}

/// Like `require_admin`, but only answers whether admin affordances should show.
pub fn current_admin(backend: &impl Backend, session: Option<&Session>) -> Option<User> {
    match require_admin(backend, session) {
        Ok(user) => Some(user),
        Err(AuthError::Unauthorized) => None,
        Err(e) => {
            warn!(error = %e, "Treating session as signed out");
            None
        }
    }
}

#[derive(Debug, Error)]
pub enum SignInError {
    #[error("Email and password are required.")]
    MissingCredentials,

    #[error("Invalid email or password.")]
    InvalidCredentials,

    #[error("Sign-in failed: {0}")]
    Backend(BackendError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

pub struct SignInParameters {
    pub email: String,
    pub password: String,
}

pub fn sign_in(
    backend: &impl Backend,
    store: &impl SessionStore,
    parameters: SignInParameters,
) -> Result<Session, SignInError> {
    let email = parameters.email.trim();
    if email.is_empty() || parameters.password.is_empty() {
        return Err(SignInError::MissingCredentials);
    }

    let session = backend
        .sign_in(email, &parameters.password)
        .map_err(|e| match e {
            BackendError::Api { status: 400 | 401, .. } => SignInError::InvalidCredentials,
            other => SignInError::Backend(other),
        })?;

    store.save(&session)?;
    info!(user = %session.user.id, "Signed in");

    Ok(session)
}

/// Signs out remotely when possible and always forgets the local session.
pub fn sign_out(
    backend: &impl Backend,
    store: &impl SessionStore,
) -> Result<Option<User>, SessionError> {
    let Some(session) = store.load()? else {
        return Ok(None);
    };

    if let Err(e) = backend.sign_out(&session.access_token) {
        warn!(error = %e, "Remote sign-out failed, clearing local session anyway");
    }
    store.clear()?;

    Ok(Some(session.user))
}
