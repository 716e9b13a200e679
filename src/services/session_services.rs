// src/services/session_services.rs
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use thiserror::Error;

use crate::models::user::SessionClaims;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
    #[error("token has no subject")]
    MissingSubject,
}

/// Verifies session tokens issued by the identity provider and yields the caller id.
pub struct SessionVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl SessionVerifier {
    /// RS256 tokens, checked against the provider's PEM public key.
    pub fn from_rsa_pem(pem: &[u8]) -> Result<Self, SessionError> {
        Ok(Self {
            key: DecodingKey::from_rsa_pem(pem)?,
            validation: Validation::new(Algorithm::RS256),
        })
    }

    /// HS256 tokens with a shared secret.
    pub fn from_secret(secret: &[u8]) -> Self {
        Self {
            key: DecodingKey::from_secret(secret),
            validation: Validation::new(Algorithm::HS256),
        }
    }

    pub fn verify(&self, token: &str) -> Result<String, SessionError> {
        let data = decode::<SessionClaims>(token, &self.key, &self.validation)?;
        let sub = data.claims.sub.trim();
        if sub.is_empty() {
            return Err(SessionError::MissingSubject);
        }
        Ok(sub.to_string())
    }
}
