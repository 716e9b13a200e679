use serde::{Deserialize, Serialize};

/// User record as returned by the identity provider's Backend API.
/// Only the fields this service reads are kept.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IdentityUser {
    pub id: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    /// Older API versions only send this one.
    #[serde(default)]
    pub profile_image_url: Option<String>,
}

/// Client-safe projection of an identity record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: String,
    pub username: Option<String>,
    pub profile_picture: String,
}

/// Author fields attached to every post in a feed. Unlike [`PublicUser`] the
/// username is mandatory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorView {
    pub id: String,
    pub username: String,
    pub profile_picture: String,
}

impl From<IdentityUser> for PublicUser {
    fn from(user: IdentityUser) -> Self {
        let profile_picture = user
            .image_url
            .filter(|url| !url.trim().is_empty())
            .or(user.profile_image_url)
            .unwrap_or_default();
        Self {
            id: user.id,
            username: user.username.filter(|name| !name.trim().is_empty()),
            profile_picture,
        }
    }
}

impl PublicUser {
    /// `None` when the user has no public username and cannot be shown as an author.
    pub fn into_author(self) -> Option<AuthorView> {
        let username = self.username?;
        Some(AuthorView {
            id: self.id,
            username,
            profile_picture: self.profile_picture,
        })
    }
}

/// Claims of a provider-issued session token.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    /// subject / user id
    pub sub: String,
    pub exp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub azp: Option<String>,
}
