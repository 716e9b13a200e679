// src/services/author_enrichment.rs
use std::collections::{BTreeSet, HashMap};

use log::error;

use crate::dtos::post_dtos::FullPost;
use crate::error::ApiError;
use crate::models::post::Post;
use crate::models::user::{AuthorView, PublicUser};
use crate::repositories::identity_repo::IdentityProvider;

/// Most ids the identity provider accepts in one lookup.
pub const USER_LOOKUP_LIMIT: usize = 100;

/// Attach each post's author. A post whose author cannot be resolved (unknown id or
/// no public username) fails the whole batch.
pub async fn add_user_data_to_posts(
    identity: &dyn IdentityProvider,
    posts: Vec<Post>,
) -> Result<Vec<FullPost>, ApiError> {
    if posts.is_empty() {
        return Ok(Vec::new());
    }

    let author_ids: Vec<String> = posts
        .iter()
        .map(|p| p.author_id.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut authors: HashMap<String, AuthorView> = HashMap::with_capacity(author_ids.len());
    for chunk in author_ids.chunks(USER_LOOKUP_LIMIT) {
        let users = identity.get_user_list(chunk, USER_LOOKUP_LIMIT).await?;
        for user in users {
            if let Some(author) = PublicUser::from(user).into_author() {
                authors.insert(author.id.clone(), author);
            }
        }
    }

    posts
        .into_iter()
        .map(|post| match authors.get(&post.author_id) {
            Some(author) => Ok(FullPost {
                author: author.clone(),
                post,
            }),
            None => {
                error!("author {} for post {} not found", post.author_id, post.id);
                Err(ApiError::Internal("Author for post not found".to_string()))
            }
        })
        .collect()
}
