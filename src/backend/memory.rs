//! In-memory `Backend` that records every call, for service and handler tests.

use std::{
    collections::{BTreeMap, HashMap},
    sync::{Mutex, MutexGuard},
};

use jiff::{SignedDuration, Timestamp};
use uuid::Uuid;

use crate::{
    backend::{Backend, BackendError, Bucket},
    models::{
        project::{NewProject, Project, ProjectChanges},
        session::{Session, User},
        upload::UploadFile,
    },
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListProjects,
    FindProject(Uuid),
    InsertProject,
    UpdateProject(Uuid),
    DeleteProject(Uuid),
    Upload(Bucket, String),
    Remove(Bucket, String),
    Sign(Bucket, String),
    SignIn(String),
    GetUser,
    SignOut,
}

impl Call {
    pub fn is_storage(&self) -> bool {
        matches!(self, Call::Upload(..) | Call::Remove(..) | Call::Sign(..))
    }

    pub fn is_table(&self) -> bool {
        matches!(
            self,
            Call::ListProjects
                | Call::FindProject(_)
                | Call::InsertProject
                | Call::UpdateProject(_)
                | Call::DeleteProject(_)
        )
    }
}

#[derive(Default)]
struct Failures {
    upload: Option<Bucket>,
    find: bool,
    insert: bool,
    update: bool,
    sign: bool,
}

#[derive(Default)]
struct State {
    rows: Vec<Project>,
    objects: BTreeMap<(Bucket, String), Vec<u8>>,
    tokens: HashMap<String, User>,
    calls: Vec<Call>,
    failures: Failures,
}

#[derive(Default)]
pub struct MemoryBackend {
    state: Mutex<State>,
}

pub const ADMIN_EMAIL: &str = "maker@example.com";
pub const ADMIN_PASSWORD: &str = "granny-square";

fn injected(endpoint: &str) -> BackendError {
    BackendError::Api {
        endpoint: endpoint.to_string(),
        status: 500,
        message: String::from("injected failure"),
    }
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap()
    }

    /// Seeds a row together with the objects it references.
    pub fn with_project(self, project: Project) -> Self {
        {
            let mut state = self.state();
            state
                .objects
                .insert((Bucket::Images, project.image_path.clone()), vec![1]);
            if let Some(pattern) = &project.pattern_path {
                state.objects.insert((Bucket::Patterns, pattern.clone()), vec![1]);
            }
            state.rows.push(project);
        }
        self
    }

    pub fn failing_uploads_to(self, bucket: Bucket) -> Self {
        self.state().failures.upload = Some(bucket);
        self
    }

    pub fn failing_lookups(self) -> Self {
        self.state().failures.find = true;
        self
    }

    pub fn failing_inserts(self) -> Self {
        self.state().failures.insert = true;
        self
    }

    pub fn failing_updates(self) -> Self {
        self.state().failures.update = true;
        self
    }

    pub fn failing_signatures(self) -> Self {
        self.state().failures.sign = true;
        self
    }

    /// A session whose token the backend accepts.
    pub fn admin_session(&self) -> Session {
        let user = User {
            id: Uuid::new_v4(),
            email: Some(ADMIN_EMAIL.to_string()),
        };
        let token = Uuid::new_v4().to_string();
        self.state().tokens.insert(token.clone(), user.clone());
        Session {
            access_token: token,
            refresh_token: String::from("refresh"),
            expires_at: Timestamp::now() + SignedDuration::from_hours(1),
            user,
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state().calls.clone()
    }

    /// Calls other than auth checks.
    pub fn data_calls(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| c.is_storage() || c.is_table())
            .collect()
    }

    pub fn rows(&self) -> Vec<Project> {
        self.state().rows.clone()
    }

    pub fn has_object(&self, bucket: Bucket, path: &str) -> bool {
        self.state()
            .objects
            .contains_key(&(bucket, path.to_string()))
    }

    pub fn object_paths(&self, bucket: Bucket) -> Vec<String> {
        self.state()
            .objects
            .keys()
            .filter(|(b, _)| *b == bucket)
            .map(|(_, path)| path.clone())
            .collect()
    }
}

impl Backend for MemoryBackend {
    fn list_projects(&self) -> Result<Vec<Project>, BackendError> {
        let mut state = self.state();
        state.calls.push(Call::ListProjects);
        let mut rows = state.rows.clone();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    fn find_project(&self, id: Uuid) -> Result<Option<Project>, BackendError> {
        let mut state = self.state();
        state.calls.push(Call::FindProject(id));
        if state.failures.find {
            return Err(injected("projects.find"));
        }
        Ok(state.rows.iter().find(|p| p.id == id).cloned())
    }

    fn insert_project(&self, project: &NewProject) -> Result<Project, BackendError> {
        let mut state = self.state();
        state.calls.push(Call::InsertProject);
        if state.failures.insert {
            return Err(injected("projects.insert"));
        }
        let row = Project {
            id: Uuid::new_v4(),
            name: project.name.clone(),
            description: project.description.clone(),
            image_path: project.image_path.clone(),
            pattern_path: project.pattern_path.clone(),
            tags: project.tags.clone(),
            created_at: Timestamp::now(),
        };
        state.rows.push(row.clone());
        Ok(row)
    }

    fn update_project(&self, id: Uuid, changes: &ProjectChanges) -> Result<Project, BackendError> {
        let mut state = self.state();
        state.calls.push(Call::UpdateProject(id));
        if state.failures.update {
            return Err(injected("projects.update"));
        }
        let row = state
            .rows
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| BackendError::Decode {
                endpoint: String::from("projects.update"),
                reason: String::from("no row returned"),
            })?;
        row.name = changes.name.clone();
        row.description = changes.description.clone();
        row.image_path = changes.image_path.clone();
        row.pattern_path = changes.pattern_path.clone();
        row.tags = changes.tags.clone();
        Ok(row.clone())
    }

    fn delete_project(&self, id: Uuid) -> Result<(), BackendError> {
        let mut state = self.state();
        state.calls.push(Call::DeleteProject(id));
        state.rows.retain(|p| p.id != id);
        Ok(())
    }

    fn upload_object(
        &self,
        bucket: Bucket,
        path: &str,
        file: &UploadFile,
    ) -> Result<(), BackendError> {
        let mut state = self.state();
        state.calls.push(Call::Upload(bucket, path.to_string()));
        if state.failures.upload == Some(bucket) {
            return Err(injected("storage.upload"));
        }
        state
            .objects
            .insert((bucket, path.to_string()), file.bytes.clone());
        Ok(())
    }

    fn remove_object(&self, bucket: Bucket, path: &str) -> Result<(), BackendError> {
        let mut state = self.state();
        state.calls.push(Call::Remove(bucket, path.to_string()));
        state.objects.remove(&(bucket, path.to_string()));
        Ok(())
    }

    fn signed_url(
        &self,
        bucket: Bucket,
        path: &str,
        expires_in: u64,
    ) -> Result<String, BackendError> {
        let mut state = self.state();
        state.calls.push(Call::Sign(bucket, path.to_string()));
        if state.failures.sign {
            return Err(injected("storage.sign"));
        }
        Ok(format!(
            "memory://{}/{}?expires_in={}",
            bucket.name(),
            path,
            expires_in
        ))
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!("memory://{}/{}", bucket.name(), path)
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        self.state().calls.push(Call::SignIn(email.to_string()));
        if email != ADMIN_EMAIL || password != ADMIN_PASSWORD {
            return Err(BackendError::Api {
                endpoint: String::from("auth.token"),
                status: 400,
                message: String::from("Invalid login credentials"),
            });
        }
        Ok(self.admin_session())
    }

    fn get_user(&self, access_token: &str) -> Result<Option<User>, BackendError> {
        let mut state = self.state();
        state.calls.push(Call::GetUser);
        Ok(state.tokens.get(access_token).cloned())
    }

    fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let mut state = self.state();
        state.calls.push(Call::SignOut);
        state.tokens.remove(access_token);
        Ok(())
    }
}
