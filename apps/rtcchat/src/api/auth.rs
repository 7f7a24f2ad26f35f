//! # Authentication
//!
//! - Bearer JWTs (HS256) carrying the user's name and id
//! - bcrypt password hashing, run off the async runtime
//! - Admin token check (constant-time)
//! - Server-wide login rate limit

use crate::error::{ApiError, ApiResult};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rtcchat_core::{User, UserId};
use serde::{Deserialize, Serialize};
use std::num::NonZeroU32;
use subtle::ConstantTimeEq;

/// Header carrying the operator token for administrative mutations.
pub const ADMIN_TOKEN_HEADER: &str = "x-admin-token";

// =============================================================================
// TOKENS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub name: String,
    pub user_id: UserId,
    /// Expiry, seconds since the epoch.
    pub exp: u64,
}

/// Signs and checks session tokens.
pub struct TokenKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: chrono::Duration,
}

impl TokenKeys {
    pub fn new(secret: &str, ttl_days: u32) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl: chrono::Duration::days(i64::from(ttl_days)),
        }
    }

    pub fn issue(&self, user: &User) -> ApiResult<String> {
        let exp = (chrono::Utc::now() + self.ttl).timestamp();
        let claims = Claims {
            name: user.name.clone(),
            user_id: user.id,
            exp: u64::try_from(exp).unwrap_or(0),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign token");
            ApiError::Internal
        })
    }

    /// Claims of a valid, unexpired token.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        match decode::<Claims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(error = %e, "Rejected bearer token");
                None
            }
        }
    }
}

/// The token of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

// =============================================================================
// PASSWORDS
// =============================================================================

pub async fn hash_password(password: String, cost: u32) -> ApiResult<String> {
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing task failed");
            ApiError::Internal
        })?
        .map_err(|e| {
            tracing::error!(error = %e, "Password hashing failed");
            ApiError::Internal
        })
}

/// Compare a password with a stored hash. A malformed hash never matches.
pub async fn verify_password(password: String, hash: String) -> ApiResult<bool> {
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash).unwrap_or(false))
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Password check task failed");
            ApiError::Internal
        })
}

// =============================================================================
// ADMIN AND RATE LIMIT
// =============================================================================

/// Constant-time comparison of the presented admin token with the configured one.
pub fn admin_token_matches(expected: Option<&str>, presented: Option<&str>) -> bool {
    match (expected, presented) {
        (Some(expected), Some(presented)) if !expected.is_empty() => {
            expected.as_bytes().ct_eq(presented.as_bytes()).into()
        }
        _ => false,
    }
}

/// Server-wide quota on login attempts.
pub struct LoginLimiter {
    limiter: DefaultDirectRateLimiter,
}

impl LoginLimiter {
    pub fn per_minute(attempts: NonZeroU32) -> Self {
        Self {
            limiter: RateLimiter::direct(Quota::per_minute(attempts)),
        }
    }

    /// Take one attempt from the quota.
    pub fn check(&self) -> ApiResult<()> {
        self.limiter.check().map_err(|_| ApiError::RateLimited)
    }
}

// =============================================================================
// REQUEST IDENTITY
// =============================================================================

/// Who is calling, resolved once per request and handed to resolvers.
#[derive(Debug, Clone, Default)]
pub struct RequestAuth {
    pub user: Option<User>,
    /// The request carried the configured admin token.
    pub admin_token: bool,
}

impl RequestAuth {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn require_user(&self) -> ApiResult<&User> {
        self.user.as_ref().ok_or(ApiError::Unauthenticated)
    }
}
