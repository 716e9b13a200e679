use std::borrow::Cow;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: Uuid,
    pub content: String,
    pub author_id: String,
    pub created_at: DateTime<Utc>,
}

/// A post that passed content validation and is ready to be persisted.
/// The only way to get one is [`NewPost::new`].
#[derive(Debug, Clone, Validate)]
pub struct NewPost {
    author_id: String,
    #[validate(
        custom(function = "validate_emoji_only"),
        length(min = 1, max = 280, message = "Content must be between 1 and 280 characters")
    )]
    content: String,
}

impl NewPost {
    pub fn new(author_id: impl Into<String>, content: impl Into<String>) -> Result<Self, ValidationErrors> {
        let post = Self {
            author_id: author_id.into(),
            content: content.into(),
        };
        post.validate()?;
        Ok(post)
    }

    pub fn author_id(&self) -> &str {
        &self.author_id
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

fn emoji_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(\p{Extended_Pictographic}|\p{Emoji_Component})+$").expect("emoji regex compiles")
    })
}

fn pictograph_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"[\p{Extended_Pictographic}\x{1F1E6}-\x{1F1FF}]").expect("pictograph regex compiles")
    })
}

/// True when `content` is made only of emoji code points, including joiners,
/// variation selectors, skin-tone modifiers and flag pairs. Strings made only of
/// emoji components (digits, `#`, `*`, a lone joiner) are rejected.
pub fn is_emoji_only(content: &str) -> bool {
    emoji_regex().is_match(content) && pictograph_regex().is_match(content)
}

fn validate_emoji_only(content: &str) -> Result<(), ValidationError> {
    if is_emoji_only(content) {
        Ok(())
    } else {
        Err(ValidationError::new("emoji").with_message(Cow::Borrowed("Only Emojis are Allowed")))
    }
}
