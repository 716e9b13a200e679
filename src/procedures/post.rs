use log::info;

use crate::AppState;
use crate::dtos::post_dtos::{CreatePostInput, FullPost, GetPostByIdInput, GetPostsByUserIdInput};
use crate::error::ApiError;
use crate::middleware::auth_extractor::Caller;
use crate::models::post::{NewPost, Post};
use crate::services::author_enrichment::add_user_data_to_posts;
use crate::services::rate_limiter::enforce_rate_limit;

/// Size of the global feed.
pub const FEED_LIMIT: i64 = 100;

/// `post.getAll`: the newest posts, newest first.
pub async fn get_all(state: &AppState) -> Result<Vec<FullPost>, ApiError> {
    let posts = state.posts.list_recent(FEED_LIMIT).await?;
    add_user_data_to_posts(state.identity.as_ref(), posts).await
}

/// `post.getById`
pub async fn get_by_id(state: &AppState, input: GetPostByIdInput) -> Result<FullPost, ApiError> {
    let post = state
        .posts
        .get_by_id(&input.id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Post not found".to_string()))?;

    add_user_data_to_posts(state.identity.as_ref(), vec![post])
        .await?
        .pop()
        .ok_or_else(|| ApiError::Internal("enrichment dropped a post".to_string()))
}

/// `post.getPostByUserId`: may be empty.
pub async fn get_posts_by_user_id(state: &AppState, input: GetPostsByUserIdInput) -> Result<Vec<FullPost>, ApiError> {
    let posts = state.posts.list_by_author(&input.user_id).await?;
    add_user_data_to_posts(state.identity.as_ref(), posts).await
}

/// `post.create`: authorization gate, then content validation, then the rate limit,
/// then the insert.
pub async fn create(state: &AppState, caller: &Caller, input: CreatePostInput) -> Result<Post, ApiError> {
    let user = caller.require()?;
    let new_post = NewPost::new(user.user_id.as_str(), input.content)?;

    enforce_rate_limit(state.rate_limiter.as_ref(), &user.user_id).await?;

    let post = state.posts.create(new_post).await?;
    info!("post {} created by {}", post.id, post.author_id);
    Ok(post)
}
