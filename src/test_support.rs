//! In-memory stand-ins for the external collaborators, used by unit tests.
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::{EncodingKey, Header, encode};
use uuid::Uuid;

use crate::AppState;
use crate::models::post::{NewPost, Post};
use crate::models::user::{IdentityUser, SessionClaims};
use crate::repositories::identity_repo::{IdentityError, IdentityProvider};
use crate::repositories::post_repository::{PostStore, RepoError};
use crate::services::rate_limiter::{RateLimitError, RateLimitOutcome, RateLimiter};

pub const TEST_SECRET: &[u8] = b"test-session-secret";

pub fn session_token(user_id: &str) -> String {
    let claims = SessionClaims {
        sub: user_id.to_string(),
        exp: (Utc::now().timestamp() + 3600) as u64,
        sid: Some("sess_1".into()),
        azp: None,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(TEST_SECRET)).unwrap()
}

pub fn user(id: &str, username: Option<&str>) -> IdentityUser {
    IdentityUser {
        id: id.to_string(),
        username: username.map(str::to_string),
        image_url: Some(format!("https://img.example/{id}.png")),
        profile_image_url: None,
    }
}

pub fn post_by(author_id: &str, content: &str) -> Post {
    Post {
        id: Uuid::new_v4(),
        content: content.to_string(),
        author_id: author_id.to_string(),
        created_at: Utc::now(),
    }
}

#[derive(Default)]
pub struct MemoryPostStore {
    posts: Mutex<Vec<Post>>,
}

impl MemoryPostStore {
    pub fn insert(&self, post: Post) {
        self.posts.lock().unwrap().push(post);
    }

    pub fn len(&self) -> usize {
        self.posts.lock().unwrap().len()
    }

    fn next_timestamp(posts: &[Post]) -> DateTime<Utc> {
        let now = Utc::now();
        match posts.iter().map(|p| p.created_at).max() {
            Some(last) if last >= now => last + chrono::Duration::milliseconds(1),
            _ => now,
        }
    }
}

#[async_trait]
impl PostStore for MemoryPostStore {
    async fn list_recent(&self, limit: i64) -> Result<Vec<Post>, RepoError> {
        let mut posts = self.posts.lock().unwrap().clone();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        posts.truncate(limit.max(0) as usize);
        Ok(posts)
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Post>, RepoError> {
        // same id parsing as the Postgres store
        let Ok(id) = Uuid::parse_str(id) else {
            return Ok(None);
        };
        let posts = self.posts.lock().unwrap();
        Ok(posts.iter().find(|p| p.id == id).cloned())
    }

    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Post>, RepoError> {
        let mut posts: Vec<Post> = self
            .posts
            .lock()
            .unwrap()
            .iter()
            .filter(|p| p.author_id == author_id)
            .cloned()
            .collect();
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(posts)
    }

    async fn create(&self, post: NewPost) -> Result<Post, RepoError> {
        let mut posts = self.posts.lock().unwrap();
        let created = Post {
            id: Uuid::new_v4(),
            content: post.content().to_string(),
            author_id: post.author_id().to_string(),
            created_at: Self::next_timestamp(&posts),
        };
        posts.push(created.clone());
        Ok(created)
    }
}

pub struct StaticIdentityProvider {
    users: Vec<IdentityUser>,
    calls: Mutex<Vec<Vec<String>>>,
    username_calls: Mutex<Vec<String>>,
}

impl StaticIdentityProvider {
    pub fn new(users: Vec<IdentityUser>) -> Self {
        Self {
            users,
            calls: Mutex::new(Vec::new()),
            username_calls: Mutex::new(Vec::new()),
        }
    }

    /// Id lists passed to every `get_user_list` call so far.
    pub fn batch_calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }

    /// Usernames passed to every `get_user_by_username` call so far.
    pub fn username_lookups(&self) -> Vec<String> {
        self.username_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for StaticIdentityProvider {
    async fn get_user_list(&self, user_ids: &[String], limit: usize) -> Result<Vec<IdentityUser>, IdentityError> {
        self.calls.lock().unwrap().push(user_ids.to_vec());
        Ok(self
            .users
            .iter()
            .filter(|u| user_ids.contains(&u.id))
            .take(limit)
            .cloned()
            .collect())
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<IdentityUser>, IdentityError> {
        self.username_calls.lock().unwrap().push(username.to_string());
        Ok(self
            .users
            .iter()
            .find(|u| u.username.as_deref().is_some_and(|name| name.eq_ignore_ascii_case(username)))
            .cloned())
    }
}

/// Trailing-window counter kept in process memory.
pub struct MemoryRateLimiter {
    tokens: u32,
    window: Duration,
    hits: Mutex<HashMap<String, Vec<Instant>>>,
}

impl MemoryRateLimiter {
    pub fn new(tokens: u32, window: Duration) -> Self {
        Self {
            tokens,
            window,
            hits: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl RateLimiter for MemoryRateLimiter {
    async fn limit(&self, identifier: &str) -> Result<RateLimitOutcome, RateLimitError> {
        let now = Instant::now();
        let mut hits = self.hits.lock().unwrap();
        let entry = hits.entry(identifier.to_string()).or_default();
        entry.retain(|t| now.duration_since(*t) < self.window);

        let used = entry.len() as u32;
        let success = used < self.tokens;
        if success {
            entry.push(now);
        }
        Ok(RateLimitOutcome {
            success,
            limit: self.tokens,
            remaining: self.tokens.saturating_sub(entry.len() as u32),
            reset_ms: Utc::now().timestamp_millis() + self.window.as_millis() as i64,
        })
    }
}

pub struct TestHarness {
    pub state: AppState,
    pub posts: Arc<MemoryPostStore>,
    pub identity: Arc<StaticIdentityProvider>,
}

/// State wired to in-memory fakes. Users `u1` (alice) and `u2` (bob) exist;
/// `u3` exists but has no username.
pub fn harness() -> TestHarness {
    let posts = Arc::new(MemoryPostStore::default());
    let identity = Arc::new(StaticIdentityProvider::new(vec![
        user("u1", Some("alice")),
        user("u2", Some("bob")),
        user("u3", None),
    ]));
    let limiter = Arc::new(MemoryRateLimiter::new(1, Duration::from_secs(600)));

    let state = AppState {
        posts: posts.clone(),
        identity: identity.clone(),
        rate_limiter: limiter,
    };
    TestHarness { state, posts, identity }
}
