//! # API Route Modules
//!
//! - `pattern`: path pattern compiler with constrained placeholders.
//! - `registry`: the [`Route`] contract, the ordered registry and the
//!   dispatcher that resolves, authorizes, validates and executes.
//! - `request`: parameter and body helpers shared by routes.
//! - `users`: the admin user routes.
//!
//! The whole registry is served by a single Axum catch-all under `/api/v1`.
//! The registry sees the raw request path with that prefix removed; path
//! parameters are decoded only after a pattern matches.

pub mod pattern;
pub mod registry;
pub mod request;
pub mod users;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{Method, Uri};
use axum::routing::any;
use axum::{Extension, Json, Router};
use serde_json::Value;

pub use pattern::{PathPattern, PatternError};
pub use registry::{Route, RouteContext, RouteDefinition, RouteRegistry, RouteRequest, Verb};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// Mount point of the route registry.
const API_PREFIX: &str = "/api/v1";

/// Build the registry holding every route this service exposes.
pub fn registry() -> Result<RouteRegistry, PatternError> {
    let mut registry = RouteRegistry::new();
    users::register(&mut registry)?;
    Ok(registry)
}

/// Build the router mounting the registry under `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route(&format!("{API_PREFIX}/{{*path}}"), any(dispatch))
}

/// Decode an optional JSON request body. Empty bodies are absent.
fn parse_body(bytes: &[u8]) -> Result<Option<Value>, AppError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|e| AppError::BadRequest(format!("request body is not valid JSON: {e}")))
}

async fn dispatch(
    State(state): State<AppState>,
    method: Method,
    uri: Uri,
    caller: Option<Extension<CallerIdentity>>,
    body: Bytes,
) -> Result<Json<Value>, AppError> {
    let body = parse_body(&body)?;
    let path = uri.path().strip_prefix(API_PREFIX).unwrap_or(uri.path());
    let ctx = RouteContext {
        store: state.store.clone(),
    };
    let caller = caller.map(|Extension(c)| c);
    let value = state
        .registry
        .dispatch(&method, path, caller.as_ref(), body, &ctx)
        .await?;
    Ok(Json(value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_none() {
        assert_eq!(parse_body(b"").unwrap(), None);
        assert_eq!(parse_body(b"  \n").unwrap(), None);
    }

    #[test]
    fn json_body_is_parsed() {
        assert_eq!(
            parse_body(br#"{"value":"1"}"#).unwrap(),
            Some(serde_json::json!({"value": "1"}))
        );
    }

    #[test]
    fn malformed_body_is_bad_request() {
        assert!(matches!(parse_body(b"{oops"), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn registry_builds() {
        assert_eq!(registry().unwrap().len(), 9);
    }
}
