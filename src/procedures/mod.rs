//! Typed procedures behind `/api/trpc/{procedure}` and the server-rendered pages.
//!
//! Public procedures take the shared [`AppState`](crate::AppState) only. Mutations also
//! take the [`Caller`](crate::middleware::auth_extractor::Caller) and pass it through
//! the authorization gate before doing anything else.
pub mod post;
pub mod profile;

use serde::de::DeserializeOwned;

use crate::error::ApiError;

/// Decode a procedure input. `None` is treated as JSON `null`, so procedures
/// without input accept it and procedures with input reject it.
pub fn parse_input<T: DeserializeOwned>(raw: Option<&str>) -> Result<T, ApiError> {
    let raw = raw.map(str::trim).filter(|s| !s.is_empty()).unwrap_or("null");
    serde_json::from_str(raw).map_err(|e| ApiError::BadRequest(format!("Invalid input: {}", e)))
}
