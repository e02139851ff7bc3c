//! Bearer-token authentication with role checks.
//!
//! Token verification sits behind [`TokenVerifier`]; the shipped
//! [`JwtVerifier`] checks HS256 JWTs. [`require_user`] injects the verified
//! [`CurrentUser`] into request extensions and [`require_admin`] rejects
//! anyone whose role is not admin.

use std::fmt;

use async_trait::async_trait;
use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{error::ApiError, AppState};

/// Access level of an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Manages aliases and reference data.
    Admin,
    /// Reads reports and manages rental records.
    User,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Admin => write!(f, "admin"),
            Self::User => write!(f, "user"),
        }
    }
}

/// The authenticated caller, available to handlers as an extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// Subject identifier.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Access level.
    pub role: Role,
}

impl CurrentUser {
    /// Returns true for administrators.
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Reasons a token is rejected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    /// No `Authorization: Bearer` header.
    #[error("Missing bearer token")]
    MissingToken,
    /// Token expired.
    #[error("Token has expired")]
    Expired,
    /// Signature, format or claims are invalid.
    #[error("Invalid token: {0}")]
    InvalidToken(String),
    /// Token could not be signed.
    #[error("Failed to sign token: {0}")]
    Signing(String),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        Self::Unauthorized(err.to_string())
    }
}

/// Turns a bearer token into the user it was issued to.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verifies the token.
    async fn verify(&self, token: &str) -> Result<CurrentUser, AuthError>;
}

/// Claims carried by access tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user id).
    pub sub: String,
    /// Login name.
    pub username: String,
    /// Access level.
    pub role: Role,
    /// Expiration time (Unix timestamp).
    pub exp: usize,
    /// Issued at (Unix timestamp).
    pub iat: usize,
}

impl JwtClaims {
    /// Claims valid for `ttl_seconds` from now.
    pub fn new(sub: &str, username: &str, role: Role, ttl_seconds: i64) -> Self {
        let now = chrono::Utc::now();
        let exp = now + chrono::Duration::seconds(ttl_seconds);

        Self {
            sub: sub.to_string(),
            username: username.to_string(),
            role,
            exp: usize::try_from(exp.timestamp()).unwrap_or(0),
            iat: usize::try_from(now.timestamp()).unwrap_or(0),
        }
    }
}

/// Signs claims with HS256.
///
/// # Errors
///
/// Returns `AuthError::Signing` if encoding fails.
pub fn sign_token(claims: &JwtClaims, secret: &str) -> Result<String, AuthError> {
    encode(&Header::new(Algorithm::HS256), claims, &EncodingKey::from_secret(secret.as_bytes()))
        .map_err(|e| AuthError::Signing(e.to_string()))
}

/// HS256 JWT verifier.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    /// Creates a verifier for tokens signed with `secret`.
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        Self { key: DecodingKey::from_secret(secret.as_bytes()), validation }
    }

    fn decode(&self, token: &str) -> Result<JwtClaims, AuthError> {
        decode::<JwtClaims>(token, &self.key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                _ => AuthError::InvalidToken(e.to_string()),
            })
    }
}

#[async_trait]
impl TokenVerifier for JwtVerifier {
    async fn verify(&self, token: &str) -> Result<CurrentUser, AuthError> {
        let claims = self.decode(token)?;
        Ok(CurrentUser { id: claims.sub, username: claims.username, role: claims.role })
    }
}

/// Extracts the token from `Authorization: Bearer <token>`.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Rejects requests without a valid bearer token.
pub async fn require_user(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token =
        extract_bearer(req.headers()).map(str::to_owned).ok_or(AuthError::MissingToken)?;

    let user = state.verifier.verify(&token).await.map_err(|e| {
        warn!(error = %e, "Rejected bearer token");
        e
    })?;

    debug!(user = %user.username, role = %user.role, "Request authenticated");
    req.extensions_mut().insert(user);

    Ok(next.run(req).await)
}

/// Rejects authenticated requests from non-admin users.
///
/// Must run after [`require_user`].
pub async fn require_admin(req: Request<Body>, next: Next) -> Result<Response, ApiError> {
    let user = req
        .extensions()
        .get::<CurrentUser>()
        .ok_or_else(|| ApiError::Unauthorized(AuthError::MissingToken.to_string()))?;

    if !user.is_admin() {
        warn!(user = %user.username, "Admin route refused");
        return Err(ApiError::Forbidden("Administrator role required".to_string()));
    }

    Ok(next.run(req).await)
}
