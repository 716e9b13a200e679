// src/services/rate_limiter.rs
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use log::{debug, warn};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};
use thiserror::Error;
use uuid::Uuid;

use crate::error::ApiError;

pub const POST_CREATE_TOKENS: u32 = 1;
pub const POST_CREATE_WINDOW: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("counter service error: {0}")]
    Backend(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitOutcome {
    pub success: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Unix time in milliseconds when this call leaves the trailing window.
    pub reset_ms: i64,
}

/// Check-and-consume against a per-identifier quota.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    async fn limit(&self, identifier: &str) -> Result<RateLimitOutcome, RateLimitError>;
}

/// Fails with [`ApiError::TooManyRequests`] when `identifier` has used up its quota.
pub async fn enforce_rate_limit(limiter: &dyn RateLimiter, identifier: &str) -> Result<(), ApiError> {
    let outcome = limiter.limit(identifier).await?;
    if outcome.success {
        debug!("rate limit ok for {} ({} left)", identifier, outcome.remaining);
        Ok(())
    } else {
        warn!(
            "rate limit exceeded for {} (limit {}, resets at {})",
            identifier, outcome.limit, outcome.reset_ms
        );
        Err(ApiError::TooManyRequests)
    }
}

// Runs atomically on the counter service. Every granted call is a member of one
// sorted set scored by its time, so the quota covers exactly the trailing window.
// Returns -1 when denied, otherwise the remaining tokens.
const SLIDING_WINDOW_SCRIPT: &str = r#"
local key = KEYS[1]
local tokens = tonumber(ARGV[1])
local now = tonumber(ARGV[2])
local window = tonumber(ARGV[3])
local member = ARGV[4]

redis.call("ZREMRANGEBYSCORE", key, "-inf", now - window)
local used = redis.call("ZCARD", key)
if used >= tokens then
  return -1
end

redis.call("ZADD", key, now, member)
redis.call("PEXPIRE", key, window)
return tokens - used - 1
"#;

#[derive(Deserialize)]
struct CommandResponse {
    result: Option<Value>,
    error: Option<String>,
}

/// Sliding-window limiter backed by an Upstash-compatible Redis REST endpoint.
#[derive(Clone)]
pub struct UpstashRateLimiter {
    client: Client,
    url: String,
    token: String,
    prefix: String,
    tokens: u32,
    window: Duration,
}

impl UpstashRateLimiter {
    pub fn new(client: Client, url: &str, token: &str, prefix: &str, tokens: u32, window: Duration) -> Self {
        Self {
            client,
            url: url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            prefix: prefix.to_string(),
            tokens,
            window,
        }
    }

    fn key(&self, identifier: &str) -> String {
        format!("{}:{}", self.prefix, identifier)
    }

    fn window_ms(&self) -> i64 {
        (self.window.as_millis() as i64).max(1)
    }

    fn command(&self, identifier: &str, now_ms: i64) -> Value {
        json!([
            "EVAL",
            SLIDING_WINDOW_SCRIPT,
            "1",
            self.key(identifier),
            self.tokens.to_string(),
            now_ms.to_string(),
            self.window_ms().to_string(),
            format!("{}-{}", now_ms, Uuid::new_v4().simple()),
        ])
    }

    async fn limit_at(&self, identifier: &str, now_ms: i64) -> Result<RateLimitOutcome, RateLimitError> {
        let resp = self
            .client
            .post(&self.url)
            .bearer_auth(&self.token)
            .json(&self.command(identifier, now_ms))
            .send()
            .await?;

        let status = resp.status();
        let text = resp.text().await?;
        let parsed: CommandResponse = serde_json::from_str(&text)
            .map_err(|e| RateLimitError::Backend(format!("{} -> {} ({})", status.as_u16(), text, e)))?;

        if let Some(err) = parsed.error {
            return Err(RateLimitError::Backend(err));
        }
        if !status.is_success() {
            return Err(RateLimitError::Backend(format!("{} -> {}", status.as_u16(), text)));
        }

        let remaining = parsed
            .result
            .as_ref()
            .and_then(Value::as_i64)
            .ok_or_else(|| RateLimitError::Backend(format!("unexpected result: {}", text)))?;

        Ok(RateLimitOutcome {
            success: remaining >= 0,
            limit: self.tokens,
            remaining: remaining.max(0) as u32,
            reset_ms: now_ms + self.window_ms(),
        })
    }
}

#[async_trait]
impl RateLimiter for UpstashRateLimiter {
    async fn limit(&self, identifier: &str) -> Result<RateLimitOutcome, RateLimitError> {
        self.limit_at(identifier, Utc::now().timestamp_millis()).await
    }
}
