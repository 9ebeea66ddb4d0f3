//! # OpenAPI Specification Assembly
//!
//! Component schemas come from utoipa derives. Paths are generated from the
//! route registry at request time, so the document always lists exactly the
//! routes the dispatcher serves. Served at `/openapi.json`.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::path::{HttpMethod, OperationBuilder, ParameterBuilder, ParameterIn};
use utoipa::openapi::{OpenApi as OpenApiDoc, Required, ResponseBuilder};
use utoipa::OpenApi;

use crate::routes::{RouteRegistry, Verb};
use crate::state::AppState;

/// Static part of the OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "userhub API",
        version = "0.1.0",
        description = "Administrative API over users linked to social-app accounts: list, fetch, find by linked account, token refresh, create, delete and per-user metadata.",
        license(name = "AGPL-3.0-or-later")
    ),
    components(schemas(
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        crate::middleware::metrics::MetricsSnapshot,
        userhub_core::SocialApp,
        userhub_core::NewUser,
        userhub_core::TokenUpdate,
        userhub_core::UserDetails,
        userhub_core::AppIdentityDetails,
        userhub_core::ProfileImages,
        userhub_core::MetadataEntry,
    )),
    tags(
        (name = "users", description = "Admin user routes under /api/v1"),
    )
)]
pub struct ApiDoc;

fn http_method(verb: Verb) -> HttpMethod {
    match verb {
        Verb::Get => HttpMethod::Get,
        Verb::Post => HttpMethod::Post,
        Verb::Put => HttpMethod::Put,
        Verb::Del => HttpMethod::Delete,
    }
}

/// Build the full document: derived components plus one operation per route.
pub fn document(registry: &RouteRegistry) -> OpenApiDoc {
    let mut doc = ApiDoc::openapi();
    for (definition, pattern) in registry.routes() {
        let mut operation = OperationBuilder::new()
            .operation_id(Some(definition.name))
            .summary(Some(format!(
                "{} (auth: {}, permission: {})",
                definition.name,
                definition.auth.as_str(),
                definition.permission.as_str()
            )))
            .tag("users")
            .response(
                "200",
                ResponseBuilder::new()
                    .description("Route result as JSON")
                    .build(),
            )
            .response(
                "400",
                ResponseBuilder::new()
                    .description("Validation failure")
                    .build(),
            );

        for (name, allowed) in pattern.placeholders() {
            let description = allowed.map(|values| format!("one of: {}", values.join(", ")));
            operation = operation.parameter(
                ParameterBuilder::new()
                    .name(name)
                    .parameter_in(ParameterIn::Path)
                    .required(Required::True)
                    .description(description)
                    .build(),
            );
        }

        doc.paths.add_path_operation(
            format!("/api/v1/{}", pattern.openapi_path()),
            vec![http_method(definition.verb)],
            operation.build(),
        );
    }
    doc
}

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json: the generated OpenAPI specification.
async fn openapi_json(State(state): State<AppState>) -> Json<OpenApiDoc> {
    Json(document(&state.registry))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_every_route() {
        let registry = crate::routes::registry().unwrap();
        let doc = document(&registry);
        let json = serde_json::to_value(&doc).unwrap();
        let paths = json["paths"].as_object().unwrap();

        assert!(paths.contains_key("/api/v1/user"));
        assert!(paths.contains_key("/api/v1/user/{id}"));
        assert!(paths.contains_key("/api/v1/user/{app}/{id}"));
        assert!(paths.contains_key("/api/v1/user/{id}/{app}/token"));
        assert!(paths.contains_key("/api/v1/user/{id}/metadata/{key}"));

        let user = &paths["/api/v1/user"];
        assert_eq!(user["get"]["operationId"], "List");
        assert_eq!(user["post"]["operationId"], "Add");

        let metadata = &paths["/api/v1/user/{id}/metadata/{key}"];
        assert!(metadata.get("get").is_some());
        assert!(metadata.get("post").is_some());
        assert!(metadata.get("put").is_some());
    }

    #[test]
    fn document_includes_component_schemas() {
        let doc = ApiDoc::openapi();
        let json = serde_json::to_value(&doc).unwrap();
        let schemas = json["components"]["schemas"].as_object().unwrap();
        assert!(schemas.contains_key("UserDetails"));
        assert!(schemas.contains_key("ErrorBody"));
        assert!(schemas.contains_key("NewUser"));
    }
}
