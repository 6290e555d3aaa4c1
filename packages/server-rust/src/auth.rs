//! Optional caller identity for web requests.
//!
//! A missing `Authorization` header is an anonymous caller. A header that is
//! present but cannot be validated fails the request with 401.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use axum::http::{header, HeaderMap};
use fedithread_core::{Account, AccountProvider, Handle, RequestContext, WebError};
use jsonwebtoken::errors::ErrorKind as JwtErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::web::with_cancel;

/// Resolves the authenticated caller from request headers.
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    /// Returns `Ok(None)` for anonymous requests.
    ///
    /// # Errors
    ///
    /// [`WebError::Unauthorized`] when credentials are present but invalid.
    async fn resolve(
        &self,
        ctx: &RequestContext,
        headers: &HeaderMap,
    ) -> Result<Option<Account>, WebError>;
}

/// Treats every request as anonymous.
pub struct AnonymousResolver;

#[async_trait]
impl IdentityResolver for AnonymousResolver {
    async fn resolve(
        &self,
        _ctx: &RequestContext,
        _headers: &HeaderMap,
    ) -> Result<Option<Account>, WebError> {
        Ok(None)
    }
}

/// HS256 bearer token claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Username of a local account.
    pub sub: String,
    /// Expiry, seconds since the Unix epoch.
    pub exp: u64,
}

/// Validates HS256 bearer tokens and loads the named local account.
///
/// Without a secret, any presented token is rejected.
pub struct BearerTokenResolver {
    key: Option<DecodingKey>,
    validation: Validation,
    accounts: Arc<dyn AccountProvider>,
}

impl BearerTokenResolver {
    #[must_use]
    pub fn new(secret: Option<&[u8]>, accounts: Arc<dyn AccountProvider>) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub"]);
        validation.leeway = 0;
        Self {
            key: secret.map(DecodingKey::from_secret),
            validation,
            accounts,
        }
    }

    fn claims(&self, token: &str) -> Result<TokenClaims, WebError> {
        let Some(key) = &self.key else {
            return Err(WebError::Unauthorized("token authentication disabled".into()));
        };
        decode::<TokenClaims>(token, key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                JwtErrorKind::ExpiredSignature => WebError::Unauthorized("token expired".into()),
                _ => {
                    debug!(error = %e, "bearer token rejected");
                    WebError::Unauthorized("invalid token".into())
                }
            })
    }
}

#[async_trait]
impl IdentityResolver for BearerTokenResolver {
    async fn resolve(
        &self,
        ctx: &RequestContext,
        headers: &HeaderMap,
    ) -> Result<Option<Account>, WebError> {
        let Some(token) = bearer_token(headers)? else {
            return Ok(None);
        };
        let claims = self.claims(&token)?;
        let username = Handle::parse(&claims.sub)
            .map_err(|_| WebError::Unauthorized("invalid token subject".into()))?;

        match with_cancel(ctx, self.accounts.get_local_by_username(ctx, &username)).await {
            Ok(account) => Ok(Some(account)),
            Err(WebError::NotFound(_)) => Err(WebError::Unauthorized("unknown token subject".into())),
            Err(e) => Err(e),
        }
    }
}

/// Extracts the bearer token from the `Authorization` header.
///
/// # Errors
///
/// [`WebError::Unauthorized`] if the header is present but is not a
/// non-empty bearer token.
pub fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, WebError> {
    let Some(value) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let authz = value
        .to_str()
        .map(str::trim)
        .map_err(|_| WebError::Unauthorized("malformed Authorization header".into()))?;

    let token = authz
        .strip_prefix("Bearer ")
        .or_else(|| authz.strip_prefix("bearer "))
        .map(str::trim)
        .ok_or_else(|| WebError::Unauthorized("Authorization must be a Bearer token".into()))?;

    if token.is_empty() {
        return Err(WebError::Unauthorized("Bearer token is empty".into()));
    }
    Ok(Some(token.to_string()))
}

/// Issues a token for `username` expiring at `expires_at` (Unix seconds).
///
/// # Errors
///
/// Fails if the claims cannot be encoded.
pub fn issue_token(secret: &[u8], username: &str, expires_at: u64) -> anyhow::Result<String> {
    let claims = TokenClaims {
        sub: username.to_string(),
        exp: expires_at,
    };
    Ok(encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret),
    )?)
}

/// Current time in Unix seconds.
#[must_use]
pub fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_secs())
}
