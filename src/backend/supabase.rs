use jiff::{SignedDuration, Timestamp};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::debug;
use ureq::{Agent, Body, http::Response};
use uuid::Uuid;

use crate::{
    backend::{Backend, BackendError, Bucket},
    config::Config,
    models::{
        project::{NewProject, Project, ProjectChanges},
        session::{Session, User},
        upload::UploadFile,
    },
};

/// `Backend` over the Supabase REST endpoints (PostgREST, Storage, GoTrue).
///
/// Table and storage calls use the service role key; auth calls use the
/// anon key like a browser client would.
#[derive(Clone)]
pub struct SupabaseBackend {
    base_url: String,
    anon_key: String,
    service_key: String,
    agent: Agent,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: User,
}

#[derive(Serialize)]
struct SignRequest {
    #[serde(rename = "expiresIn")]
    expires_in: u64,
}

#[derive(Deserialize)]
struct SignResponse {
    #[serde(rename = "signedURL")]
    signed_url: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: Option<String>,
    error_description: Option<String>,
    msg: Option<String>,
    error: Option<String>,
}

impl SupabaseBackend {
    pub fn new(base_url: &str, anon_key: &str, service_key: &str) -> Self {
        let agent = Agent::new_with_config(
            ureq::config::Config::builder()
                .http_status_as_error(false)
                .build(),
        );

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            service_key: service_key.to_string(),
            agent,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(
            &config.supabase_url,
            &config.supabase_anon_key,
            &config.supabase_service_key,
        )
    }

    fn rest_url(&self, query: &str) -> String {
        format!("{}/rest/v1/projects{}", self.base_url, query)
    }

    fn object_url(&self, bucket: Bucket, path: &str) -> String {
        format!("{}/storage/v1/object/{}/{}", self.base_url, bucket.name(), path)
    }

    fn service_bearer(&self) -> String {
        format!("Bearer {}", self.service_key)
    }
}

fn transport(endpoint: &str) -> impl FnOnce(ureq::Error) -> BackendError + '_ {
    move |source| BackendError::Transport {
        endpoint: endpoint.to_string(),
        source,
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(|e| e.message.or(e.error_description).or(e.msg).or(e.error))
        .unwrap_or_else(|| body.trim().to_string())
}

fn ensure_success(endpoint: &str, response: &mut Response<Body>) -> Result<(), BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }

    let body = response.body_mut().read_to_string().unwrap_or_default();
    Err(BackendError::Api {
        endpoint: endpoint.to_string(),
        status: status.as_u16(),
        message: error_message(&body),
    })
}

fn read_json<T: DeserializeOwned>(
    endpoint: &str,
    mut response: Response<Body>,
) -> Result<T, BackendError> {
    ensure_success(endpoint, &mut response)?;
    response
        .body_mut()
        .read_json()
        .map_err(|e| BackendError::Decode {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
}

fn single_row(endpoint: &str, rows: Vec<Project>) -> Result<Project, BackendError> {
    rows.into_iter().next().ok_or_else(|| BackendError::Decode {
        endpoint: endpoint.to_string(),
        reason: String::from("no row returned"),
    })
}

impl Backend for SupabaseBackend {
    fn list_projects(&self) -> Result<Vec<Project>, BackendError> {
        let endpoint = "projects.list";
        let response = self
            .agent
            .get(&self.rest_url("?select=*&order=created_at.desc"))
            .header("apikey", &self.service_key)
            .header("Authorization", &self.service_bearer())
            .call()
            .map_err(transport(endpoint))?;

        read_json(endpoint, response)
    }

    fn find_project(&self, id: Uuid) -> Result<Option<Project>, BackendError> {
        let endpoint = "projects.find";
        let response = self
            .agent
            .get(&self.rest_url(&format!("?select=*&id=eq.{id}")))
            .header("apikey", &self.service_key)
            .header("Authorization", &self.service_bearer())
            .call()
            .map_err(transport(endpoint))?;

        let rows: Vec<Project> = read_json(endpoint, response)?;
        Ok(rows.into_iter().next())
    }

    fn insert_project(&self, project: &NewProject) -> Result<Project, BackendError> {
        let endpoint = "projects.insert";
        debug!(name = %project.name, "Inserting project row");
        let response = self
            .agent
            .post(&self.rest_url(""))
            .header("apikey", &self.service_key)
            .header("Authorization", &self.service_bearer())
            .header("Prefer", "return=representation")
            .send_json(project)
            .map_err(transport(endpoint))?;

        single_row(endpoint, read_json(endpoint, response)?)
    }

    fn update_project(&self, id: Uuid, changes: &ProjectChanges) -> Result<Project, BackendError> {
        let endpoint = "projects.update";
        debug!(%id, "Updating project row");
        let response = self
            .agent
            .patch(&self.rest_url(&format!("?id=eq.{id}")))
            .header("apikey", &self.service_key)
            .header("Authorization", &self.service_bearer())
            .header("Prefer", "return=representation")
            .send_json(changes)
            .map_err(transport(endpoint))?;

        single_row(endpoint, read_json(endpoint, response)?)
    }

    fn delete_project(&self, id: Uuid) -> Result<(), BackendError> {
        let endpoint = "projects.delete";
        debug!(%id, "Deleting project row");
        let mut response = self
            .agent
            .delete(&self.rest_url(&format!("?id=eq.{id}")))
            .header("apikey", &self.service_key)
            .header("Authorization", &self.service_bearer())
            .call()
            .map_err(transport(endpoint))?;

        ensure_success(endpoint, &mut response)
    }

    fn upload_object(
        &self,
        bucket: Bucket,
        path: &str,
        file: &UploadFile,
    ) -> Result<(), BackendError> {
        let endpoint = "storage.upload";
        debug!(bucket = bucket.name(), path, bytes = file.bytes.len(), "Uploading object");
        let mut response = self
            .agent
            .post(&self.object_url(bucket, path))
            .header("apikey", &self.service_key)
            .header("Authorization", &self.service_bearer())
            .header("Content-Type", &file.content_type)
            .header("x-upsert", "false")
            .send(&file.bytes[..])
            .map_err(transport(endpoint))?;

        ensure_success(endpoint, &mut response)
    }

    fn remove_object(&self, bucket: Bucket, path: &str) -> Result<(), BackendError> {
        let endpoint = "storage.remove";
        debug!(bucket = bucket.name(), path, "Removing object");
        let mut response = self
            .agent
            .delete(&self.object_url(bucket, path))
            .header("apikey", &self.service_key)
            .header("Authorization", &self.service_bearer())
            .call()
            .map_err(transport(endpoint))?;

        ensure_success(endpoint, &mut response)
    }

    fn signed_url(
        &self,
        bucket: Bucket,
        path: &str,
        expires_in: u64,
    ) -> Result<String, BackendError> {
        let endpoint = "storage.sign";
        let url = format!(
            "{}/storage/v1/object/sign/{}/{}",
            self.base_url,
            bucket.name(),
            path
        );
        let response = self
            .agent
            .post(&url)
            .header("apikey", &self.service_key)
            .header("Authorization", &self.service_bearer())
            .send_json(&SignRequest { expires_in })
            .map_err(transport(endpoint))?;

        let signed: SignResponse = read_json(endpoint, response)?;
        Ok(format!("{}/storage/v1{}", self.base_url, signed.signed_url))
    }

    fn public_url(&self, bucket: Bucket, path: &str) -> String {
        format!(
            "{}/storage/v1/object/public/{}/{}",
            self.base_url,
            bucket.name(),
            path
        )
    }

    fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let endpoint = "auth.token";
        let response = self
            .agent
            .post(&format!("{}/auth/v1/token?grant_type=password", self.base_url))
            .header("apikey", &self.anon_key)
            .send_json(&Credentials { email, password })
            .map_err(transport(endpoint))?;

        let token: TokenResponse = read_json(endpoint, response)?;
        let expires_at = Timestamp::now()
            .checked_add(SignedDuration::from_secs(token.expires_in))
            .map_err(|e| BackendError::Decode {
                endpoint: endpoint.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Session {
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at,
            user: token.user,
        })
    }

    fn get_user(&self, access_token: &str) -> Result<Option<User>, BackendError> {
        let endpoint = "auth.user";
        let response = self
            .agent
            .get(&format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", &format!("Bearer {access_token}"))
            .call()
            .map_err(transport(endpoint))?;

        match response.status().as_u16() {
            401 | 403 => Ok(None),
            _ => read_json(endpoint, response).map(Some),
        }
    }

    fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let endpoint = "auth.logout";
        let mut response = self
            .agent
            .post(&format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .header("Authorization", &format!("Bearer {access_token}"))
            .send_empty()
            .map_err(transport(endpoint))?;

        ensure_success(endpoint, &mut response)
    }
}
