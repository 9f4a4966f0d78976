//! REST persistence client. The persistence API is the store of record for
//! jobs, candidates, activities and users; this service never keeps its own
//! copy beyond the lifetime of a request or batch.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::models::activity::Activity;
use crate::models::candidate::Candidate;
use crate::models::job::{Job, JobCounters};
use crate::models::user::{LoginRequest, RegisterRequest, User};

pub mod collection;

pub use collection::Collection;

use collection::{decode, decode_optional, read_json};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Server error ({status}): {body}")]
    Server { status: u16, body: String },

    #[error("Invalid server response: {0}")]
    InvalidResponse(String),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Client for the persistence API: three record collections plus the
/// user auth/profile routes.
#[derive(Clone)]
pub struct RestStore {
    client: Client,
    base_url: String,
    pub jobs: Collection<Job>,
    pub candidates: Collection<Candidate>,
    pub activities: Collection<Activity>,
}

impl RestStore {
    pub fn new(base_url: &str) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");
        let base_url = base_url.trim_end_matches('/').to_string();

        Self {
            jobs: Collection::new(client.clone(), &base_url, "jobs"),
            candidates: Collection::new(client.clone(), &base_url, "candidates"),
            activities: Collection::new(client.clone(), &base_url, "activities"),
            client,
            base_url,
        }
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<User, StoreError> {
        let response = self
            .client
            .post(format!("{}/auth/register", self.base_url))
            .json(request)
            .send()
            .await?;
        decode(read_json(response).await?)
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<User, StoreError> {
        let response = self
            .client
            .post(format!("{}/auth/login", self.base_url))
            .json(request)
            .send()
            .await?;
        decode(read_json(response).await?)
    }

    /// Re-reads a user from the server of record. `None` if it no longer exists.
    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let response = self
            .client
            .get(format!("{}/users/{user_id}", self.base_url))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        decode_optional(read_json(response).await?)
    }

    pub async fn update_user(&self, user_id: &str, updates: &Value) -> Result<User, StoreError> {
        let response = self
            .client
            .patch(format!("{}/users/{user_id}", self.base_url))
            .json(updates)
            .send()
            .await?;
        decode(read_json(response).await?)
    }
}

/// The persistence calls the batch orchestrator depends on.
/// Carried as `Arc<dyn PipelineStore>` so tests can substitute an in-memory store.
#[async_trait]
pub trait PipelineStore: Send + Sync {
    async fn fetch_jobs(&self, user_id: Option<&str>) -> Result<Vec<Job>, StoreError>;

    async fn insert_candidate(
        &self,
        user_id: Option<&str>,
        candidate: &Candidate,
    ) -> Result<(), StoreError>;

    /// Writes both counters of a job. `NotFound` if the job is gone.
    async fn update_job_counters(
        &self,
        user_id: Option<&str>,
        job_id: &str,
        counters: JobCounters,
    ) -> Result<(), StoreError>;
}

#[async_trait]
impl PipelineStore for RestStore {
    async fn fetch_jobs(&self, user_id: Option<&str>) -> Result<Vec<Job>, StoreError> {
        self.jobs.find(user_id, &[]).await
    }

    async fn insert_candidate(
        &self,
        user_id: Option<&str>,
        candidate: &Candidate,
    ) -> Result<(), StoreError> {
        let stored = self.candidates.insert_one(user_id, candidate).await?;
        debug!("Candidate {} stored", stored.id);
        Ok(())
    }

    async fn update_job_counters(
        &self,
        user_id: Option<&str>,
        job_id: &str,
        counters: JobCounters,
    ) -> Result<(), StoreError> {
        let patch = serde_json::to_value(counters)?;
        match self.jobs.update_one(user_id, job_id, patch).await? {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(format!("Job {job_id}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};

    use axum::{
        extract::{Path, Query, State},
        http::StatusCode as AxumStatus,
        routing::{get, patch, post},
        Json, Router,
    };
    use serde_json::json;

    use crate::models::candidate::CandidateStatus;

    #[derive(Default)]
    struct MockDb {
        jobs: Vec<Value>,
        candidates: Vec<Value>,
        last_job_query: Option<std::collections::HashMap<String, String>>,
    }

    type Db = Arc<Mutex<MockDb>>;

    async fn list_jobs(
        State(db): State<Db>,
        Query(params): Query<std::collections::HashMap<String, String>>,
    ) -> Json<Value> {
        let mut db = db.lock().unwrap();
        db.last_job_query = Some(params);
        Json(Value::Array(db.jobs.clone()))
    }

    async fn patch_job(
        State(db): State<Db>,
        Path(id): Path<String>,
        Json(updates): Json<Value>,
    ) -> Json<Value> {
        let mut db = db.lock().unwrap();
        let Some(job) = db.jobs.iter_mut().find(|j| j["id"] == id.as_str()) else {
            // Mirrors the real API: 200 with a null body for unknown ids.
            return Json(Value::Null);
        };
        for (k, v) in updates.as_object().unwrap() {
            job[k] = v.clone();
        }
        Json(job.clone())
    }

    async fn delete_job(State(db): State<Db>, Path(id): Path<String>) -> AxumStatus {
        if id == "j-broken" {
            return AxumStatus::INTERNAL_SERVER_ERROR;
        }
        let mut db = db.lock().unwrap();
        let before = db.jobs.len();
        db.jobs.retain(|j| j["id"] != id.as_str());
        if db.jobs.len() == before {
            AxumStatus::NOT_FOUND
        } else {
            AxumStatus::NO_CONTENT
        }
    }

    async fn insert_candidate(State(db): State<Db>, Json(doc): Json<Value>) -> Json<Value> {
        db.lock().unwrap().candidates.push(doc.clone());
        Json(doc)
    }

    async fn login(Json(body): Json<Value>) -> (AxumStatus, Json<Value>) {
        if body["password"] == "secret" {
            (
                AxumStatus::OK,
                Json(json!({"_id": "65ab", "name": "Riley", "email": body["email"]})),
            )
        } else {
            (
                AxumStatus::UNAUTHORIZED,
                Json(json!({"error": "Invalid credentials"})),
            )
        }
    }

    async fn spawn_mock(db: Db) -> String {
        let router = Router::new()
            .route("/api/jobs", get(list_jobs))
            .route("/api/jobs/:id", patch(patch_job).delete(delete_job))
            .route("/api/candidates", post(insert_candidate))
            .route("/api/auth/login", post(login))
            .with_state(db);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}/api")
    }

    fn seeded() -> Db {
        Arc::new(Mutex::new(MockDb {
            jobs: vec![json!({
                "_id": "65f0",
                "id": "j-1",
                "title": "Senior Rust Engineer",
                "location": "Berlin",
                "applicantsCount": 5,
                "matchesCount": 2,
                "skills": ["Rust"]
            })],
            ..Default::default()
        }))
    }

    fn candidate() -> Candidate {
        Candidate {
            id: "c-1-0".to_string(),
            name: "Ada".to_string(),
            role: "Engineer".to_string(),
            company: "Extracted Profile".to_string(),
            location: "Berlin".to_string(),
            applied_date: "Oct 19, 2026".to_string(),
            status: CandidateStatus::New,
            match_score: 90,
            avatar: None,
            associated_jd_id: Some("j-1".to_string()),
            analysis: Some("Strong".to_string()),
            resume_base64: Some(String::new()),
            resume_mime_type: Some("application/pdf".to_string()),
            user_id: None,
        }
    }

    #[tokio::test]
    async fn test_fetch_jobs_scopes_by_user() {
        let db = seeded();
        let store = RestStore::new(&spawn_mock(db.clone()).await);

        let jobs = store.fetch_jobs(Some("u-7")).await.unwrap();

        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].applicants_count, 5);
        let query = db.lock().unwrap().last_job_query.clone().unwrap();
        assert_eq!(query.get("userId").map(String::as_str), Some("u-7"));
    }

    #[tokio::test]
    async fn test_insert_candidate_sends_camel_case_with_user() {
        let db = seeded();
        let store = RestStore::new(&spawn_mock(db.clone()).await);

        store
            .insert_candidate(Some("u-7"), &candidate())
            .await
            .unwrap();

        let stored = db.lock().unwrap().candidates[0].clone();
        assert_eq!(stored["associatedJdId"], "j-1");
        assert_eq!(stored["resumeBase64"], "");
        assert_eq!(stored["userId"], "u-7");
    }

    #[tokio::test]
    async fn test_update_job_counters_patches_both_fields() {
        let db = seeded();
        let store = RestStore::new(&spawn_mock(db.clone()).await);

        store
            .update_job_counters(
                None,
                "j-1",
                JobCounters {
                    applicants_count: 6,
                    matches_count: 3,
                },
            )
            .await
            .unwrap();

        let job = db.lock().unwrap().jobs[0].clone();
        assert_eq!(job["applicantsCount"], 6);
        assert_eq!(job["matchesCount"], 3);
    }

    #[tokio::test]
    async fn test_update_counters_of_missing_job_is_not_found() {
        let store = RestStore::new(&spawn_mock(seeded()).await);

        let err = store
            .update_job_counters(
                None,
                "j-gone",
                JobCounters {
                    applicants_count: 1,
                    matches_count: 0,
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StoreError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_login_normalizes_id_and_maps_rejection() {
        let store = RestStore::new(&spawn_mock(seeded()).await);

        let user = store
            .login(&LoginRequest {
                email: "r@example.com".to_string(),
                password: "secret".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(user.id, "65ab");

        let err = store
            .login(&LoginRequest {
                email: "r@example.com".to_string(),
                password: "wrong".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Rejected { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_delete_distinguishes_missing_from_server_failure() {
        let db = seeded();
        let store = RestStore::new(&spawn_mock(db.clone()).await);

        assert!(store.jobs.delete_one("j-1").await.unwrap());
        assert!(db.lock().unwrap().jobs.is_empty());
        assert!(!store.jobs.delete_one("j-1").await.unwrap());

        let err = store.jobs.delete_one("j-broken").await.unwrap_err();
        assert!(matches!(err, StoreError::Server { status: 500, .. }));
    }
}
