// src/repositories/post_repository.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use deadpool_postgres::{Pool, PoolError};
use log::debug;
use thiserror::Error;
use tokio_postgres::Row;
use uuid::Uuid;

use crate::models::post::{NewPost, Post};

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("pool error: {0}")]
    Pool(#[from] PoolError),
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),
}

/// Read/write access to the `posts` table.
#[async_trait]
pub trait PostStore: Send + Sync {
    /// Newest posts first, at most `limit` of them.
    async fn list_recent(&self, limit: i64) -> Result<Vec<Post>, RepoError>;
    async fn get_by_id(&self, id: &str) -> Result<Option<Post>, RepoError>;
    /// Every post of one author, newest first.
    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Post>, RepoError>;
    async fn create(&self, post: NewPost) -> Result<Post, RepoError>;
}

const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS posts (
    id UUID PRIMARY KEY,
    created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
    content VARCHAR(280) NOT NULL,
    author_id TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS posts_author_id_idx ON posts (author_id);
"#;

#[derive(Clone)]
pub struct PgPostRepository {
    pool: Pool,
}

impl PgPostRepository {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create the table and index if they do not exist yet.
    pub async fn ensure_schema(&self) -> Result<(), RepoError> {
        let client = self.pool.get().await?;
        client.batch_execute(SCHEMA).await?;
        Ok(())
    }
}

fn row_to_post(row: &Row) -> Result<Post, RepoError> {
    Ok(Post {
        id: row.try_get("id")?,
        content: row.try_get("content")?,
        author_id: row.try_get("author_id")?,
        created_at: row.try_get::<_, DateTime<Utc>>("created_at")?,
    })
}

#[async_trait]
impl PostStore for PgPostRepository {
    async fn list_recent(&self, limit: i64) -> Result<Vec<Post>, RepoError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, content, author_id, created_at FROM posts ORDER BY created_at DESC LIMIT $1",
                &[&limit],
            )
            .await?;
        rows.iter().map(row_to_post).collect()
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<Post>, RepoError> {
        // Ids are UUIDs; anything else cannot exist.
        let Ok(id) = Uuid::parse_str(id) else {
            debug!("get_by_id: {:?} is not a uuid", id);
            return Ok(None);
        };

        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                "SELECT id, content, author_id, created_at FROM posts WHERE id = $1",
                &[&id],
            )
            .await?;
        row.as_ref().map(row_to_post).transpose()
    }

    async fn list_by_author(&self, author_id: &str) -> Result<Vec<Post>, RepoError> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                "SELECT id, content, author_id, created_at FROM posts WHERE author_id = $1 ORDER BY created_at DESC",
                &[&author_id],
            )
            .await?;
        rows.iter().map(row_to_post).collect()
    }

    async fn create(&self, post: NewPost) -> Result<Post, RepoError> {
        let client = self.pool.get().await?;
        let id = Uuid::new_v4();
        let row = client
            .query_one(
                "INSERT INTO posts (id, content, author_id) VALUES ($1, $2, $3) \
                 RETURNING id, content, author_id, created_at",
                &[&id, &post.content(), &post.author_id()],
            )
            .await?;
        row_to_post(&row)
    }
}
