//! REST client for the cloud document store
//!
//! Collections live under `{base}/users/{uid}/{collection}`, records under
//! `.../{id}`. The server is expected to return 409 for a create on an
//! existing id and 404 for a lookup or update on an absent one; those map
//! onto the [`RemoteError`] kinds the sync engine branches on.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::error::{RemoteError, RemoteResult};
use crate::models::{ItemId, Syncable, UserId};

use super::RemoteStore;

/// HTTP-backed remote store, one instance shared by every family
#[derive(Clone)]
pub struct HttpRemoteStore {
    base_url: String,
    client: reqwest::Client,
}

impl HttpRemoteStore {
    /// Build a client for the given API base URL
    pub fn new(base_url: impl Into<String>) -> RemoteResult<Self> {
        let client = reqwest::Client::builder().build()?;
        Self::with_client(base_url, client)
    }

    /// Build against an already-configured client (timeouts, auth headers)
    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> RemoteResult<Self> {
        Ok(Self {
            base_url: normalize_endpoint(base_url.into())?,
            client,
        })
    }

    fn collection_url(&self, user: &UserId, collection: &str) -> String {
        format!(
            "{}/users/{}/{}",
            self.base_url,
            urlencoding::encode(user.as_str()),
            collection
        )
    }

    fn record_url(&self, user: &UserId, collection: &str, id: &ItemId) -> String {
        format!("{}/{id}", self.collection_url(user, collection))
    }

    async fn check(response: reqwest::Response) -> RemoteResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(status_error(status, &body))
    }
}

#[async_trait]
impl<T: Syncable> RemoteStore<T> for HttpRemoteStore {
    async fn create(&self, user: &UserId, record: &T) -> RemoteResult<T> {
        let response = self
            .client
            .post(self.collection_url(user, T::TABLE))
            .json(record)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn get_all(&self, user: &UserId) -> RemoteResult<Vec<T>> {
        let response = self
            .client
            .get(self.collection_url(user, T::TABLE))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn get_one(&self, user: &UserId, id: &ItemId) -> RemoteResult<T> {
        let response = self
            .client
            .get(self.record_url(user, T::TABLE, id))
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn update(&self, user: &UserId, record: &T) -> RemoteResult<T> {
        let response = self
            .client
            .put(self.record_url(user, T::TABLE, record.id()))
            .json(record)
            .send()
            .await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn delete(&self, user: &UserId, id: &ItemId) -> RemoteResult<()> {
        let response = self
            .client
            .delete(self.record_url(user, T::TABLE, id))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }

    async fn delete_all(&self, user: &UserId) -> RemoteResult<()> {
        let response = self
            .client
            .delete(self.collection_url(user, T::TABLE))
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

fn status_error(status: StatusCode, body: &str) -> RemoteError {
    match status {
        StatusCode::NOT_FOUND => RemoteError::NotFound,
        StatusCode::CONFLICT => RemoteError::Conflict,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RemoteError::Unauthorized,
        StatusCode::TOO_MANY_REQUESTS | StatusCode::INSUFFICIENT_STORAGE => {
            RemoteError::QuotaExceeded
        }
        _ => RemoteError::Api {
            status: status.as_u16(),
            message: parse_api_error(status, body),
        },
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> String {
    if let Ok(payload) = serde_json::from_str::<ApiErrorBody>(body) {
        if let Some(message) = payload.message.or(payload.error) {
            return message.trim().to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.is_empty() {
        format!("HTTP {}", status.as_u16())
    } else {
        trimmed.to_string()
    }
}

fn normalize_endpoint(raw: String) -> RemoteResult<String> {
    let endpoint = raw.trim();
    if endpoint.is_empty() {
        return Err(RemoteError::InvalidConfiguration(
            "endpoint must not be empty".to_string(),
        ));
    }
    if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
        Ok(endpoint.trim_end_matches('/').to_string())
    } else {
        Err(RemoteError::InvalidConfiguration(
            "endpoint must include http:// or https://".to_string(),
        ))
    }
}
