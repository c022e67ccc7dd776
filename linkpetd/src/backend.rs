//! Remote pet service.
//!
//! The driver only talks to the [`Backend`] trait. [`HttpBackend`] is the
//! production implementation over the LinkPet REST API; tests script their
//! own.

use std::time::Duration;

use async_trait::async_trait;
use linkpet::snapshot::{DiaryEntry, EntitySnapshot};
use serde::{Deserialize, Serialize};
use thiserror::Error;

const USER_HEADER: &str = "X-User-ID";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend returned {code}: {detail}")]
    Status { code: u16, detail: String },

    #[error("malformed response: {0}")]
    Decode(String),

    #[error("no pet for this user")]
    NoEntity,
}

impl BackendError {
    /// The backend refused the request itself, as opposed to being
    /// unreachable or unreadable.
    pub fn is_rejection(&self) -> bool {
        matches!(self, BackendError::Status { code, .. } if (400..500).contains(code))
    }
}

#[async_trait]
pub trait Backend: Send + Sync {
    /// Current snapshot of the user's pet.
    async fn fetch_snapshot(&self) -> Result<EntitySnapshot, BackendError>;

    /// All diary entries for `pet_id`, in whatever order the backend keeps.
    async fn fetch_entries(&self, pet_id: u64) -> Result<Vec<DiaryEntry>, BackendError>;

    async fn acknowledge_entries(&self, pet_id: u64, last_seen_id: u64)
        -> Result<(), BackendError>;

    /// Submits one hatching answer. Returns the pet as updated by the backend.
    async fn advance_incubation(
        &self,
        pet_id: u64,
        question_index: usize,
        answer_index: u32,
    ) -> Result<EntitySnapshot, BackendError>;

    /// Claims an egg. A dead egg is reset; a living pet is returned as is.
    async fn claim_egg(&self) -> Result<EntitySnapshot, BackendError>;

    /// Names a freshly hatched pet, which sends it on its first trip.
    async fn name_pet(&self, pet_id: u64, name: &str) -> Result<EntitySnapshot, BackendError>;
}

#[derive(Debug, Serialize)]
struct ReadDiaryBody {
    last_read_diary_id: u64,
}

#[derive(Debug, Serialize)]
struct HeatBody {
    question_index: usize,
    answer_index: u32,
}

#[derive(Debug, Serialize)]
struct ClaimBody {}

#[derive(Debug, Serialize)]
struct NameBody<'a> {
    name: &'a str,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: serde_json::Value,
}

pub struct HttpBackend {
    base_url: String,
    user_id: Option<String>,
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new(
        base_url: impl Into<String>,
        user_id: Option<String>,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .timeout(timeout)
            .build()
            .map_err(|e| BackendError::Transport(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id,
            client,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn with_user(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.user_id {
            Some(id) => req.header(USER_HEADER, id),
            None => req,
        }
    }

    async fn send<T: serde::de::DeserializeOwned>(
        &self,
        req: reqwest::RequestBuilder,
    ) -> Result<T, BackendError> {
        let resp = self
            .with_user(req)
            .send()
            .await
            .map_err(|e| BackendError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                code: status.as_u16(),
                detail: error_detail(&text),
            });
        }

        resp.json::<T>()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}

/// Pulls the `detail` field out of an error body, falling back to the raw text.
fn error_detail(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(ErrorBody {
            detail: serde_json::Value::String(s),
        }) => s,
        Ok(ErrorBody { detail }) => detail.to_string(),
        Err(_) if body.trim().is_empty() => "no detail".to_string(),
        Err(_) => body.trim().to_string(),
    }
}

#[async_trait]
impl Backend for HttpBackend {
    async fn fetch_snapshot(&self) -> Result<EntitySnapshot, BackendError> {
        let pets: Vec<EntitySnapshot> = self.send(self.client.get(self.url("/pet/my/all"))).await?;
        pets.into_iter().next().ok_or(BackendError::NoEntity)
    }

    async fn fetch_entries(&self, pet_id: u64) -> Result<Vec<DiaryEntry>, BackendError> {
        let req = self
            .client
            .get(self.url("/trip/diaries"))
            .query(&[("pet_id", pet_id)]);
        self.send(req).await
    }

    async fn acknowledge_entries(
        &self,
        _pet_id: u64,
        last_seen_id: u64,
    ) -> Result<(), BackendError> {
        let req = self
            .client
            .post(self.url("/pet/read_diary"))
            .json(&ReadDiaryBody {
                last_read_diary_id: last_seen_id,
            });
        // The updated pet comes back; the next poll picks it up.
        let _: EntitySnapshot = self.send(req).await?;
        Ok(())
    }

    async fn advance_incubation(
        &self,
        _pet_id: u64,
        question_index: usize,
        answer_index: u32,
    ) -> Result<EntitySnapshot, BackendError> {
        let req = self.client.post(self.url("/pet/heat")).json(&HeatBody {
            question_index,
            answer_index,
        });
        self.send(req).await
    }

    async fn claim_egg(&self) -> Result<EntitySnapshot, BackendError> {
        let req = self.client.post(self.url("/pet/claim")).json(&ClaimBody {});
        self.send(req).await
    }

    async fn name_pet(&self, _pet_id: u64, name: &str) -> Result<EntitySnapshot, BackendError> {
        let req = self.client.post(self.url("/pet/name")).json(&NameBody { name });
        self.send(req).await
    }
}
