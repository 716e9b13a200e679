// src/repositories/identity_repo.rs
use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, InvalidHeaderValue};
use thiserror::Error;

use crate::models::user::IdentityUser;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("identity provider error: {0}")]
    Provider(String),
    #[error("invalid secret key: {0}")]
    InvalidKey(#[from] InvalidHeaderValue),
}

/// User directory of the external identity provider.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Batched lookup by id. Ids without a matching user are simply absent.
    async fn get_user_list(&self, user_ids: &[String], limit: usize) -> Result<Vec<IdentityUser>, IdentityError>;
    async fn get_user_by_username(&self, username: &str) -> Result<Option<IdentityUser>, IdentityError>;
}

/// Clerk-compatible Backend API client (`GET /v1/users`).
#[derive(Clone)]
pub struct ClerkIdentityRepo {
    client: Client,
    base_url: String,
    headers: HeaderMap,
}

impl ClerkIdentityRepo {
    pub fn new(client: Client, base_url: &str, secret_key: &str) -> Result<Self, IdentityError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_str(&format!("Bearer {}", secret_key))?);
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            headers,
        })
    }

    fn users_url(&self) -> String {
        format!("{}/v1/users", self.base_url)
    }

    async fn fetch_users(&self, query: &[(&str, String)]) -> Result<Vec<IdentityUser>, IdentityError> {
        let resp = self
            .client
            .get(self.users_url())
            .headers(self.headers.clone())
            .query(query)
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        if !status.is_success() {
            return Err(IdentityError::Provider(format!("{} -> {}", status.as_u16(), text)));
        }

        let users: Vec<IdentityUser> = serde_json::from_str(&text)?;
        debug!("identity provider returned {} users", users.len());
        Ok(users)
    }
}

#[async_trait]
impl IdentityProvider for ClerkIdentityRepo {
    async fn get_user_list(&self, user_ids: &[String], limit: usize) -> Result<Vec<IdentityUser>, IdentityError> {
        if user_ids.is_empty() {
            return Ok(Vec::new());
        }

        let mut query: Vec<(&str, String)> = user_ids.iter().map(|id| ("user_id", id.clone())).collect();
        query.push(("limit", limit.to_string()));
        self.fetch_users(&query).await
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<IdentityUser>, IdentityError> {
        let query = [("username", username.to_string()), ("limit", "1".to_string())];
        let users = self.fetch_users(&query).await?;
        Ok(users.into_iter().next())
    }
}
