//! Bearer-token authentication plumbing.
//!
//! Thin wrappers over the jsonwebtoken and bcrypt collaborators: HS256
//! token issuance/verification and password hashing. The engine never sees
//! any of this; handlers receive a ready [`domain::Caller`].

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use common::Role;
use domain::Caller;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use store::Customer;

use crate::error::ApiError;

/// JWT claims carried by every issued token.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Customer email; the system-wide caller identity.
    pub sub: String,
    /// Display name, echoed back to clients.
    pub name: String,
    /// Role name, parsed back into [`Role`] on every request.
    pub role: String,
    pub iat: i64,
    pub exp: i64,
}

/// Keys and validation settings shared by all requests.
pub struct AuthContext {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl_secs: u64,
}

impl AuthContext {
    /// Creates an auth context from the configured HS256 secret.
    pub fn new(secret: &str, ttl_secs: u64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl_secs,
        }
    }

    /// Issues a token for the customer with the configured lifetime.
    pub fn issue_token(&self, customer: &Customer) -> Result<String, jsonwebtoken::errors::Error> {
        let now = chrono::Utc::now().timestamp();
        let claims = Claims {
            sub: customer.email.clone(),
            name: customer.name.clone(),
            role: customer.role.as_str().to_string(),
            iat: now,
            exp: now + self.ttl_secs as i64,
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
    }

    /// Decodes and validates a token, returning its claims.
    pub fn verify(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
    }
}

/// Hashes a password for storage.
pub fn hash_password(password: &str) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST)
}

/// Verifies a password against a stored hash. Any error counts as a
/// mismatch.
pub fn verify_password(password: &str, hash: &str) -> bool {
    bcrypt::verify(password, hash).unwrap_or(false)
}

/// The authenticated caller, extracted from the `Authorization` header.
///
/// Handlers take this as an argument; requests without a valid bearer
/// token are rejected with 401 before the handler body runs.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Caller);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let ctx = parts
            .extensions
            .get::<Arc<AuthContext>>()
            .cloned()
            .ok_or_else(|| ApiError::Internal("auth context not installed".to_string()))?;

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or_else(|| ApiError::Unauthorized("missing bearer token".to_string()))?;

        let claims = ctx
            .verify(token)
            .map_err(|_| ApiError::Unauthorized("invalid or expired token".to_string()))?;
        let role: Role = claims
            .role
            .parse()
            .map_err(|_| ApiError::Unauthorized("invalid or expired token".to_string()))?;

        Ok(AuthUser(Caller {
            email: claims.sub,
            role,
        }))
    }
}
