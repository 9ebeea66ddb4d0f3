//! # Route Registry
//!
//! Declarative routes are registered in order and resolved by path pattern
//! and verb. The first route whose pattern matches the path and whose verb
//! matches the request wins.
//!
//! ## Request pipeline
//!
//! ```text
//! resolve (404 / 405) → authorize (401 / 403) → validate → exec → 200 JSON
//! ```
//!
//! Validation produces a per-request value that is handed to exec, so one
//! route instance serves any number of concurrent requests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;
use serde_json::Value;
use tracing::Instrument;
use userhub_core::UserStore;

use super::pattern::{PathPattern, PatternError};
use crate::auth::{authorize, AuthLevel, CallerIdentity, Permission};
use crate::error::AppError;

/// HTTP verbs a route can be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Get,
    Post,
    Put,
    Del,
}

impl Verb {
    /// Map an HTTP method onto a route verb. Unsupported methods yield `None`.
    ///
    /// HEAD is served by GET routes; the server drops the response body.
    pub fn from_method(method: &Method) -> Option<Self> {
        [
            (Method::GET, Self::Get),
            (Method::HEAD, Self::Get),
            (Method::POST, Self::Post),
            (Method::PUT, Self::Put),
            (Method::DELETE, Self::Del),
        ]
        .into_iter()
        .find_map(|(m, verb)| (m == method).then_some(verb))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Del => "DELETE",
        }
    }
}

impl std::fmt::Display for Verb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static description of a route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDefinition {
    pub name: &'static str,
    pub path: &'static str,
    pub verb: Verb,
    pub auth: AuthLevel,
    pub permission: Permission,
}

/// Collaborators available to every route.
#[derive(Clone)]
pub struct RouteContext {
    pub store: Arc<dyn UserStore>,
}

impl std::fmt::Debug for RouteContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteContext").finish_non_exhaustive()
    }
}

/// A resolved request as seen by a route.
#[derive(Debug, Clone, Default)]
pub struct RouteRequest {
    /// Values captured by the route's path placeholders.
    pub params: HashMap<String, String>,
    /// Parsed JSON body, `None` when the request had no body.
    pub body: Option<Value>,
}

/// A declarative route: a definition plus a validate phase and an exec phase.
///
/// `validate` rejects bad requests and produces the state `exec` needs
/// (typically the looked-up user). `exec` is only called when `validate`
/// succeeds.
#[async_trait]
pub trait Route: Send + Sync + 'static {
    /// State produced by `validate` and consumed by `exec`.
    type Validated: Send;

    fn definition(&self) -> RouteDefinition;

    async fn validate(
        &self,
        req: &RouteRequest,
        ctx: &RouteContext,
    ) -> Result<Self::Validated, AppError>;

    async fn exec(
        &self,
        req: &RouteRequest,
        validated: Self::Validated,
        ctx: &RouteContext,
    ) -> Result<Value, AppError>;
}

/// Object-safe form of [`Route`] stored by the registry.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, req: &RouteRequest, ctx: &RouteContext) -> Result<Value, AppError>;
}

#[async_trait]
impl<R: Route> Handler for R {
    async fn handle(&self, req: &RouteRequest, ctx: &RouteContext) -> Result<Value, AppError> {
        let validated = self.validate(req, ctx).await?;
        self.exec(req, validated, ctx).await
    }
}

struct RegisteredRoute {
    definition: RouteDefinition,
    pattern: PathPattern,
    handler: Arc<dyn Handler>,
}

/// Ordered collection of routes.
#[derive(Default)]
pub struct RouteRegistry {
    routes: Vec<RegisteredRoute>,
}

impl std::fmt::Debug for RouteRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.routes.iter().map(|r| &r.definition))
            .finish()
    }
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a route. Routes registered earlier take precedence.
    pub fn register<R: Route>(&mut self, route: R) -> Result<&mut Self, PatternError> {
        let definition = route.definition();
        let pattern = PathPattern::parse(definition.path)?;
        self.routes.push(RegisteredRoute {
            definition,
            pattern,
            handler: Arc::new(route),
        });
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered routes with their compiled patterns, in registration order.
    pub fn routes(&self) -> impl Iterator<Item = (&RouteDefinition, &PathPattern)> {
        self.routes.iter().map(|r| (&r.definition, &r.pattern))
    }

    /// Find the first route matching `path` and `verb`.
    ///
    /// A path that matches some pattern under a different verb is a 405;
    /// a path that matches no pattern is a 404.
    fn resolve(
        &self,
        method: &Method,
        path: &str,
    ) -> Result<(&RegisteredRoute, HashMap<String, String>), AppError> {
        let verb = Verb::from_method(method);
        let mut path_matched = false;
        for route in &self.routes {
            let Some(params) = route.pattern.matches(path) else {
                continue;
            };
            if Some(route.definition.verb) == verb {
                return Ok((route, params));
            }
            path_matched = true;
        }

        if path_matched {
            Err(AppError::MethodNotAllowed {
                method: method.to_string(),
                path: path.to_string(),
            })
        } else {
            Err(AppError::RouteNotFound(path.to_string()))
        }
    }

    /// Resolve, authorize, validate and execute a request.
    pub async fn dispatch(
        &self,
        method: &Method,
        path: &str,
        caller: Option<&CallerIdentity>,
        body: Option<Value>,
        ctx: &RouteContext,
    ) -> Result<Value, AppError> {
        let (route, params) = self.resolve(method, path)?;
        let definition = &route.definition;

        let span = tracing::info_span!(
            "route",
            route = definition.name,
            verb = %definition.verb,
            path = %path,
        );

        async {
            let caller = caller.ok_or_else(|| {
                AppError::Unauthorized("no caller identity in request context".into())
            })?;
            authorize(caller, definition.auth, definition.permission)?;

            let req = RouteRequest { params, body };
            let result = route.handler.handle(&req, ctx).await;
            if let Err(err) = &result {
                tracing::debug!(status = err.status().as_u16(), error = %err, "route rejected");
            }
            result
        }
        .instrument(span)
        .await
    }
}
