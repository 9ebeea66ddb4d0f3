//! # Authentication & Authorization
//!
//! Bearer token middleware producing a [`CallerIdentity`] with an
//! [`AuthLevel`] and a [`PermissionSet`]. Routes declare the level and the
//! permission they need; the route registry checks them with [`authorize`]
//! before a route's validate phase runs.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {level}:{permissions}:{secret}   (permissions: comma list or "*")
//! Bearer {secret}                         (legacy: super, all permissions)
//! ```
//!
//! When no token is configured, authentication is disabled and every request
//! runs as a super-level caller holding every permission.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::{Authorization, HeaderMapExt};
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;

use crate::error::{AppError, ErrorBody, ErrorDetail};

// ── Auth Level ──────────────────────────────────────────────────────────────

/// Authentication levels, ordered by privilege.
///
/// The `Ord` derivation respects variant declaration order:
/// `None < User < Admin < Super`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthLevel {
    None,
    User,
    Admin,
    Super,
}

impl AuthLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::User => "user",
            Self::Admin => "admin",
            Self::Super => "super",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(Self::None),
            "user" => Some(Self::User),
            "admin" => Some(Self::Admin),
            "super" => Some(Self::Super),
            _ => None,
        }
    }
}

// ── Permissions ─────────────────────────────────────────────────────────────

/// Operation classes a route may require.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    List,
    Read,
    Add,
    Delete,
    Get,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Read => "read",
            Self::Add => "add",
            Self::Delete => "delete",
            Self::Get => "get",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "list" => Some(Self::List),
            "read" => Some(Self::Read),
            "add" => Some(Self::Add),
            "delete" => Some(Self::Delete),
            "get" => Some(Self::Get),
            _ => None,
        }
    }
}

/// The permissions granted to a caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PermissionSet {
    /// Wildcard grant (`*`).
    All,
    /// Explicit grants.
    Only(Vec<Permission>),
}

impl PermissionSet {
    pub fn allows(&self, permission: Permission) -> bool {
        match self {
            Self::All => true,
            Self::Only(granted) => granted.contains(&permission),
        }
    }

    fn parse(s: &str) -> Result<Self, String> {
        if s == "*" {
            return Ok(Self::All);
        }
        s.split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(|p| Permission::parse(p).ok_or_else(|| format!("unknown permission: {p}")))
            .collect::<Result<Vec<_>, _>>()
            .map(Self::Only)
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller, injected into request extensions
/// by [`auth_middleware`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    pub level: AuthLevel,
    pub permissions: PermissionSet,
}

impl CallerIdentity {
    /// A caller with every level and permission.
    pub fn superuser() -> Self {
        Self {
            level: AuthLevel::Super,
            permissions: PermissionSet::All,
        }
    }

    /// Check if the caller has at least the given level.
    pub fn has_level(&self, minimum: AuthLevel) -> bool {
        self.level >= minimum
    }
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present.
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

/// Check that the caller meets a route's declared level and permission.
pub fn authorize(
    caller: &CallerIdentity,
    level: AuthLevel,
    permission: Permission,
) -> Result<(), AppError> {
    if !caller.has_level(level) {
        return Err(AppError::Forbidden(format!(
            "auth level '{}' required, caller has '{}'",
            level.as_str(),
            caller.level.as_str()
        )));
    }
    if !caller.permissions.allows(permission) {
        return Err(AppError::Forbidden(format!(
            "permission '{}' required",
            permission.as_str()
        )));
    }
    Ok(())
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer secrets.
///
/// When lengths differ, performs a dummy comparison to avoid leaking length
/// information through timing variance.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token in format `{level}:{permissions}:{secret}` or
/// `{secret}` (legacy).
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();

    match parts.as_slice() {
        [secret] => {
            if constant_time_token_eq(secret, expected_secret) {
                Ok(CallerIdentity::superuser())
            } else {
                Err("invalid bearer token".into())
            }
        }
        [level, permissions, secret] => {
            if !constant_time_token_eq(secret, expected_secret) {
                return Err("invalid bearer token".into());
            }
            let level =
                AuthLevel::parse(level).ok_or_else(|| format!("unknown auth level: {level}"))?;
            let permissions = PermissionSet::parse(permissions)?;
            Ok(CallerIdentity { level, permissions })
        }
        _ => Err(
            "invalid token format, expected {level}:{permissions}:{secret} or {secret}".into(),
        ),
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Extract and validate the Bearer token from the Authorization header,
/// injecting the parsed [`CallerIdentity`] into request extensions.
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request
        .extensions()
        .get::<AuthConfig>()
        .and_then(|c| c.token.clone());

    let Some(expected) = expected_token else {
        request.extensions_mut().insert(CallerIdentity::superuser());
        return next.run(request).await;
    };

    let bearer = request.headers().typed_get::<Authorization<Bearer>>();
    match bearer {
        Some(Authorization(bearer)) => match parse_bearer_token(bearer.token(), &expected) {
            Ok(identity) => {
                request.extensions_mut().insert(identity);
                next.run(request).await
            }
            Err(msg) => {
                tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                unauthorized_response(&msg)
            }
        },
        None if request.headers().contains_key(header::AUTHORIZATION) => {
            tracing::warn!("authentication failed: non-Bearer authorization scheme");
            unauthorized_response("authorization header must use Bearer scheme")
        }
        None => {
            tracing::warn!("authentication failed: missing authorization header");
            unauthorized_response("missing authorization header")
        }
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
            details: None,
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
