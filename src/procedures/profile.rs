use crate::AppState;
use crate::dtos::profile_dtos::GetUserByUsernameInput;
use crate::error::ApiError;
use crate::models::user::PublicUser;

/// `profile.getUserByUsername`
pub async fn get_user_by_username(state: &AppState, input: GetUserByUsernameInput) -> Result<PublicUser, ApiError> {
    let username = input.username.trim();
    if username.is_empty() {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    let user = state
        .identity
        .get_user_by_username(username)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;
    Ok(PublicUser::from(user))
}
