//! Parameter and body helpers shared by the user routes.
//!
//! Every helper logs the rejection at error level before returning it, so a
//! failed validation leaves a trace even though the client only sees the
//! error body.

use serde_json::Value;
use userhub_core::{User, UserId};

use super::registry::{RouteContext, RouteRequest};
use crate::error::AppError;

impl RouteRequest {
    /// A non-empty path parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// A body field accepted as a string.
    ///
    /// Non-empty strings are taken as is and non-zero numbers in their
    /// decimal form. Empty strings, zero, booleans, null, arrays and objects
    /// count as absent.
    pub fn body_str(&self, name: &str) -> Option<String> {
        match self.body.as_ref()?.get(name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) if n.as_f64() != Some(0.0) => Some(n.to_string()),
            _ => None,
        }
    }
}

/// A required path parameter.
pub fn require_param<'a>(req: &'a RouteRequest, name: &str) -> Result<&'a str, AppError> {
    req.param(name).ok_or_else(|| {
        tracing::error!(field = name, "missing required field");
        AppError::MissingField(name.to_string())
    })
}

/// A required body field.
pub fn require_body_str(req: &RouteRequest, name: &str) -> Result<String, AppError> {
    req.body_str(name).ok_or_else(|| {
        tracing::error!(field = name, "missing required field");
        AppError::MissingField(name.to_string())
    })
}

/// Resolve the `:id` parameter to a stored user.
///
/// Checks presence before touching the store. A malformed or unknown id is
/// an invalid reference.
pub async fn load_user(req: &RouteRequest, ctx: &RouteContext) -> Result<User, AppError> {
    let raw = require_param(req, "id")?;
    let id: UserId = raw.parse().map_err(|e| {
        tracing::error!(user_id = raw, "invalid user ID");
        AppError::from(e)
    })?;
    match ctx.store.find_by_id(&id).await? {
        Some(user) => Ok(user),
        None => {
            tracing::error!(user_id = %id, "invalid user ID");
            Err(AppError::InvalidReference(format!("user {id} does not exist")))
        }
    }
}

/// Decode the JSON document carried as a string in `body.value`.
pub fn metadata_value(req: &RouteRequest) -> Result<Value, AppError> {
    let Some(Value::String(raw)) = req.body.as_ref().and_then(|b| b.get("value")) else {
        tracing::error!("metadata value is not a JSON string");
        return Err(AppError::InvalidJson(
            "value must be a JSON document encoded as a string".into(),
        ));
    };
    serde_json::from_str(raw).map_err(|e| {
        tracing::error!(error = %e, "invalid metadata JSON");
        AppError::InvalidJson(e.to_string())
    })
}
