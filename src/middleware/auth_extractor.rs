// src/middleware/auth_extractor.rs
use actix_web::http::header::AUTHORIZATION;
use actix_web::{Error, FromRequest, HttpRequest, dev::Payload, web};
use futures::future::{Ready, ready};
use log::{debug, warn};

use crate::error::ApiError;
use crate::services::session_services::SessionVerifier;

/// Cookie the identity provider's frontend SDK stores the session token in.
pub const SESSION_COOKIE: &str = "__session";

/// Identity of whoever sent the request, if they have a valid session.
/// Extraction never fails: a missing or bad token is just an anonymous caller.
#[derive(Debug, Clone, Default)]
pub struct Caller {
    user_id: Option<String>,
}

/// Caller that passed [`Caller::require`].
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: String,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self { user_id: None }
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    /// Authorization gate for mutating procedures.
    pub fn require(&self) -> Result<AuthenticatedUser, ApiError> {
        match self.user_id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() => Ok(AuthenticatedUser { user_id: id.to_string() }),
            _ => Err(ApiError::Unauthorized),
        }
    }
}

#[cfg(test)]
impl Caller {
    pub fn signed_in(user_id: &str) -> Self {
        Self { user_id: Some(user_id.to_string()) }
    }
}

fn session_token(req: &HttpRequest) -> Option<String> {
    if let Some(value) = req.headers().get(AUTHORIZATION) {
        if let Some(token) = value.to_str().ok().and_then(|h| h.strip_prefix("Bearer ")) {
            return Some(token.trim().to_string());
        }
    }
    req.cookie(SESSION_COOKIE).map(|c| c.value().to_string())
}

impl FromRequest for Caller {
    type Error = Error;
    type Future = Ready<Result<Caller, Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let Some(token) = session_token(req).filter(|t| !t.is_empty()) else {
            return ready(Ok(Caller::anonymous()));
        };

        let Some(verifier) = req.app_data::<web::Data<SessionVerifier>>() else {
            warn!("no session verifier registered, treating caller as anonymous");
            return ready(Ok(Caller::anonymous()));
        };

        match verifier.verify(&token) {
            Ok(user_id) => ready(Ok(Caller { user_id: Some(user_id) })),
            Err(e) => {
                debug!("ignoring session token: {}", e);
                ready(Ok(Caller::anonymous()))
            }
        }
    }
}
