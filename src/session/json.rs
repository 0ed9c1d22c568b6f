use std::{
    fs::{self, OpenOptions, rename, write},
    io::ErrorKind,
    path::PathBuf,
};

use fs2::FileExt;
use serde_json::to_string_pretty;
use uuid::Uuid;

use crate::{
    models::session::Session,
    session::{SessionError, SessionStore},
};

pub struct JsonSessionStore {
    path: PathBuf,
}

impl JsonSessionStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn lock_path(&self) -> PathBuf {
        self.path.with_extension("lock")
    }

    fn lock(&self) -> Result<fs::File, SessionError> {
        let lock_file_path = self.lock_path();
        let lock_file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_file_path)
            .map_err(|e| SessionError::SaveFailed {
                path: lock_file_path.clone(),
                source: e,
            })?;
        lock_file
            .lock_exclusive()
            .map_err(|e| SessionError::SaveFailed {
                path: lock_file_path,
                source: e,
            })?;
        Ok(lock_file)
    }
}

impl SessionStore for JsonSessionStore {
    fn load(&self) -> Result<Option<Session>, SessionError> {
        match fs::read_to_string(&self.path) {
            Ok(content) => {
                let session: Session =
                    serde_json::from_str(&content).map_err(|e| SessionError::ParseFailed {
                        path: self.path.clone(),
                        source: e,
                    })?;
                Ok(Some(session))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SessionError::LoadFailed {
                path: self.path.clone(),
                source: e,
            }),
        }
    }

    fn save(&self, session: &Session) -> Result<(), SessionError> {
        let json =
            to_string_pretty(session).map_err(|e| SessionError::SerializeFailed { source: e })?;

        let unique_temp = format!("{}.tmp.{}", self.path.display(), Uuid::new_v4());
        let temp_path = PathBuf::from(&unique_temp);
        write(&temp_path, json).map_err(|e| SessionError::SaveFailed {
            path: temp_path.clone(),
            source: e,
        })?;

        let lock_file = self.lock()?;

        rename(&temp_path, &self.path).map_err(|e| SessionError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        lock_file.unlock().map_err(|e| SessionError::SaveFailed {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }

    fn clear(&self) -> Result<(), SessionError> {
        let lock_file = self.lock()?;

        match fs::remove_file(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(SessionError::ClearFailed {
                    path: self.path.clone(),
                    source: e,
                });
            }
        }

        lock_file.unlock().map_err(|e| SessionError::ClearFailed {
            path: self.path.clone(),
            source: e,
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use jiff::{SignedDuration, Timestamp};

    use crate::models::session::User;

    fn session() -> Session {
        Session {
            access_token: String::from("access"),
            refresh_token: String::from("refresh"),
            expires_at: Timestamp::now() + SignedDuration::from_hours(1),
            user: User {
                id: Uuid::new_v4(),
                email: Some(String::from("maker@example.com")),
            },
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::new(dir.path().join("session.json"));
        let session = session();

        if store.save(&session).is_err() {
            panic!("Should correctly save the session");
        }
        match store.load() {
            Ok(Some(loaded)) => assert_eq!(loaded, session),
            _ => panic!("Should correctly load the saved session"),
        }
    }

    #[test]
    fn test_load_missing_file_is_signed_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::new(dir.path().join("session.json"));

        assert!(matches!(store.load(), Ok(None)));
    }

    #[test]
    fn test_load_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{ this is not valid json }").unwrap();

        let store = JsonSessionStore::new(path);

        match store.load() {
            Err(SessionError::ParseFailed { .. }) => {}
            _ => panic!("Expected ParseFailed error, got something else"),
        }
    }

    #[test]
    fn test_clear_removes_session_and_tolerates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::new(dir.path().join("session.json"));

        store.save(&session()).unwrap();
        store.clear().unwrap();

        assert!(matches!(store.load(), Ok(None)));
        store.clear().unwrap();
    }

    #[test]
    fn test_save_leaves_no_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonSessionStore::new(dir.path().join("session.json"));

        store.save(&session()).unwrap();
        store.save(&session()).unwrap();

        let leftovers = fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_name().to_string_lossy().contains(".tmp."))
            .count();
        assert_eq!(leftovers, 0);
    }
}
