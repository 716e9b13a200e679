use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct GetUserByUsernameInput {
    pub username: String,
}
