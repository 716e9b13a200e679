use serde::{Deserialize, Serialize};

use crate::models::post::Post;
use crate::models::user::AuthorView;

#[derive(Debug, Deserialize)]
pub struct CreatePostInput {
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct GetPostByIdInput {
    pub id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetPostsByUserIdInput {
    pub user_id: String,
}

/// A post paired with its resolved author. Response-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FullPost {
    pub post: Post,
    pub author: AuthorView,
}

/// Body of the compose form on the home page.
#[derive(Debug, Deserialize)]
pub struct ComposeForm {
    pub content: String,
}
