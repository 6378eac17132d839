use std::sync::Arc;

use crate::{db_helpers::Store, errors::RequestError};
use anyhow::{Context, Result};
use argon2::PasswordVerifier;
use argon2::{password_hash::SaltString, Argon2, PasswordHash};
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

const UNAUTHORIZED: &str = "Unauthorized";

#[derive(Debug, Serialize, Deserialize)]
struct AuthClaim {
    user_id: i64,
    iat: i64,
}

/// Issues and verifies stateless HS256 identity tokens.
///
/// Tokens carry no expiry: a token stays valid for as long as the signing
/// secret does.
#[derive(Clone)]
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl TokenService {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims.clear();
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    pub fn issue(&self, user_id: i64) -> Result<String> {
        let claim = AuthClaim {
            user_id,
            iat: OffsetDateTime::now_utc().unix_timestamp(),
        };
        jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claim, &self.encoding_key)
            .context("Failed to generate jwt token")
    }

    /// Returns the embedded user id, or `None` for a malformed or forged token.
    pub fn verify(&self, token: &str) -> Option<i64> {
        match jsonwebtoken::decode::<AuthClaim>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims.user_id),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected token");
                None
            }
        }
    }
}

/// The identity behind a valid bearer token whose user still exists.
/// Rejects the request with 401 otherwise.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub id: i64,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync + 'static,
{
    type Rejection = RequestError;
    async fn from_request_parts(
        parts: &mut Parts,
        _: &S,
    ) -> std::result::Result<Self, Self::Rejection> {
        let tokens = match parts.extensions.get::<Arc<TokenService>>() {
            Some(tokens) => tokens.clone(),
            None => {
                tracing::error!("TokenService extension is missing");
                return Err(RequestError::ServerError);
            }
        };

        let header = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .ok_or(RequestError::NotAuthorized(UNAUTHORIZED))?;
        let header = header.to_str().map_err(|_| {
            tracing::warn!("Authorization header is not valid ASCII");
            RequestError::NotAuthorized(UNAUTHORIZED)
        })?;

        let token = match header.strip_prefix("Bearer ") {
            Some(token) => token.trim(),
            None => {
                tracing::warn!("Authorization header without Bearer prefix");
                return Err(RequestError::NotAuthorized(UNAUTHORIZED));
            }
        };

        let user_id = match tokens.verify(token) {
            Some(id) => id,
            None => {
                tracing::warn!("Invalid bearer token");
                return Err(RequestError::NotAuthorized(UNAUTHORIZED));
            }
        };

        let store = match parts.extensions.get::<Arc<dyn Store>>() {
            Some(store) => store.clone(),
            None => {
                tracing::error!("Store extension is missing");
                return Err(RequestError::ServerError);
            }
        };
        match store.get_user_by_id(user_id).await? {
            Some(user) => Ok(AuthUser { id: user.id }),
            None => {
                tracing::warn!(user_id, "Token for a user that no longer exists");
                Err(RequestError::NotAuthorized(UNAUTHORIZED))
            }
        }
    }
}

pub async fn verify_password_argon2(password: String, hash: &str) -> Result<bool> {
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || {
        let hash = PasswordHash::new(hash.as_str())
            .map_err(|_| anyhow::anyhow!("Failed to parse password hash"))?;
        Ok(Argon2::default()
            .verify_password(password.as_bytes(), &hash)
            .is_ok())
    })
    .await
    .context("Failed to verify password")?
}

pub async fn hash_password_argon2(password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || {
        let salt = SaltString::generate(rand::thread_rng());
        let hash = PasswordHash::generate(Argon2::default(), password, salt.as_salt())
            .map_err(|_| anyhow::anyhow!("Failed to hash password"))?;
        Ok(hash.to_string())
    })
    .await
    .context("Failed to hash password")?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn issued_token_verifies_to_same_user() {
        let tokens = TokenService::new("test-secret");
        for uid in [1, 42, i64::MAX] {
            let token = tokens.issue(uid).unwrap();
            assert_eq!(tokens.verify(&token), Some(uid));
        }
    }

    #[test]
    fn tampered_token_is_invalid() {
        let tokens = TokenService::new("test-secret");
        let token = tokens.issue(7).unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_owned).collect();
        // Swap the payload for one claiming a different user.
        let forged = tokens.issue(8).unwrap();
        parts[1] = forged.split('.').nth(1).unwrap().to_owned();
        assert_eq!(tokens.verify(&parts.join(".")), None);
    }

    #[test]
    fn token_from_other_secret_is_invalid() {
        let token = TokenService::new("one").issue(3).unwrap();
        assert_eq!(TokenService::new("two").verify(&token), None);
    }

    #[test]
    fn malformed_input_is_invalid() {
        let tokens = TokenService::new("test-secret");
        assert_eq!(tokens.verify(""), None);
        assert_eq!(tokens.verify("invalid_token"), None);
        assert_eq!(tokens.verify("a.b.c"), None);
    }

    #[tokio::test]
    async fn password_hash_round_trip() {
        let hash = hash_password_argon2("password123".to_owned()).await.unwrap();
        assert!(verify_password_argon2("password123".to_owned(), &hash)
            .await
            .unwrap());
        assert!(!verify_password_argon2("wrong_password".to_owned(), &hash)
            .await
            .unwrap());
    }
}
