//! # User Routes
//!
//! Admin routes over user records, mounted under `/api/v1`.
//!
//! | Route            | Verb   | Path                                             | Permission |
//! |------------------|--------|--------------------------------------------------|------------|
//! | `List`           | GET    | `user`                                           | list       |
//! | `Get`            | GET    | `user/:id`                                       | read       |
//! | `Find`           | GET    | `user/:app(twitter\|facebook\|google)/:id`       | read       |
//! | `UpdateToken`    | PUT    | `user/:id/:app(twitter\|facebook\|google)/token` | read       |
//! | `Add`            | POST   | `user`                                           | add        |
//! | `Delete`         | DELETE | `user/:id`                                       | delete     |
//! | `AddMetadata`    | POST   | `user/:id/metadata/:key`                         | add        |
//! | `UpdateMetadata` | PUT    | `user/:id/metadata/:key`                         | add        |
//! | `GetMetadata`    | GET    | `user/:id/metadata/:key`                         | get        |
//!
//! All routes require admin-level authentication.

use async_trait::async_trait;
use serde_json::{json, Value};
use userhub_core::{NewUser, SocialApp, TokenUpdate, User};

use super::pattern::PatternError;
use super::registry::{Route, RouteContext, RouteDefinition, RouteRegistry, RouteRequest, Verb};
use super::request::{load_user, metadata_value, require_body_str, require_param};
use crate::auth::{AuthLevel, Permission};
use crate::error::AppError;

/// Register every user route, in resolution order.
pub fn register(registry: &mut RouteRegistry) -> Result<(), PatternError> {
    registry
        .register(ListUsers)?
        .register(GetUser)?
        .register(FindUser)?
        .register(UpdateUserToken)?
        .register(AddUser)?
        .register(DeleteUser)?
        .register(AddUserMetadata)?
        .register(UpdateUserMetadata)?
        .register(GetUserMetadata)?;
    Ok(())
}

fn admin_route(
    name: &'static str,
    verb: Verb,
    path: &'static str,
    permission: Permission,
) -> RouteDefinition {
    RouteDefinition {
        name,
        path,
        verb,
        auth: AuthLevel::Admin,
        permission,
    }
}

fn social_app(req: &RouteRequest) -> Result<SocialApp, AppError> {
    require_param(req, "app")?
        .parse()
        .map_err(|e: userhub_core::ValidationError| AppError::InvalidField(e.to_string()))
}

// ── List ────────────────────────────────────────────────────────────────────

/// Every user, oldest first.
pub struct ListUsers;

#[async_trait]
impl Route for ListUsers {
    type Validated = ();

    fn definition(&self) -> RouteDefinition {
        admin_route("List", Verb::Get, "user", Permission::List)
    }

    async fn validate(&self, _req: &RouteRequest, _ctx: &RouteContext) -> Result<(), AppError> {
        Ok(())
    }

    async fn exec(
        &self,
        _req: &RouteRequest,
        _validated: (),
        ctx: &RouteContext,
    ) -> Result<Value, AppError> {
        let users = ctx.store.get_all().await?;
        let details: Vec<_> = users.iter().map(User::details).collect();
        Ok(serde_json::to_value(details)?)
    }
}

// ── Get ─────────────────────────────────────────────────────────────────────

pub struct GetUser;

#[async_trait]
impl Route for GetUser {
    type Validated = User;

    fn definition(&self) -> RouteDefinition {
        admin_route("Get", Verb::Get, "user/:id", Permission::Read)
    }

    async fn validate(&self, req: &RouteRequest, ctx: &RouteContext) -> Result<User, AppError> {
        load_user(req, ctx).await
    }

    async fn exec(
        &self,
        _req: &RouteRequest,
        user: User,
        _ctx: &RouteContext,
    ) -> Result<Value, AppError> {
        Ok(serde_json::to_value(user.details())?)
    }
}

// ── Find ────────────────────────────────────────────────────────────────────

/// Look a user up by linked account. A miss is a successful `false`.
pub struct FindUser;

#[async_trait]
impl Route for FindUser {
    type Validated = Option<User>;

    fn definition(&self) -> RouteDefinition {
        admin_route(
            "Find",
            Verb::Get,
            "user/:app(twitter|facebook|google)/:id",
            Permission::Read,
        )
    }

    async fn validate(
        &self,
        req: &RouteRequest,
        ctx: &RouteContext,
    ) -> Result<Option<User>, AppError> {
        let app = social_app(req)?;
        let app_id = require_param(req, "id")?;
        let user = ctx.store.get_by_app_id(app, app_id).await?;
        tracing::debug!(%app, app_id, found = ?user.as_ref().map(|u| u.id), "find user by app id");
        Ok(user)
    }

    async fn exec(
        &self,
        _req: &RouteRequest,
        user: Option<User>,
        _ctx: &RouteContext,
    ) -> Result<Value, AppError> {
        Ok(match user {
            Some(user) => json!({ "id": user.id }),
            None => Value::Bool(false),
        })
    }
}

// ── UpdateToken ─────────────────────────────────────────────────────────────

pub struct UpdateUserToken;

#[derive(Debug)]
pub struct TokenChange {
    user: User,
    app: SocialApp,
    update: TokenUpdate,
}

#[async_trait]
impl Route for UpdateUserToken {
    type Validated = TokenChange;

    fn definition(&self) -> RouteDefinition {
        admin_route(
            "UpdateToken",
            Verb::Put,
            "user/:id/:app(twitter|facebook|google)/token",
            Permission::Read,
        )
    }

    async fn validate(
        &self,
        req: &RouteRequest,
        ctx: &RouteContext,
    ) -> Result<TokenChange, AppError> {
        require_param(req, "id")?;
        let app = social_app(req)?;
        let update = TokenUpdate {
            token: require_body_str(req, "token")?,
            token_secret: require_body_str(req, "tokenSecret")?,
        };
        let user = load_user(req, ctx).await?;
        Ok(TokenChange { user, app, update })
    }

    async fn exec(
        &self,
        _req: &RouteRequest,
        change: TokenChange,
        ctx: &RouteContext,
    ) -> Result<Value, AppError> {
        let updated = ctx
            .store
            .update_token(&change.user.id, change.app, change.update)
            .await?;
        tracing::trace!(user_id = %change.user.id, app = %change.app, updated, "token update");
        Ok(Value::Bool(updated))
    }
}

// ── Add ─────────────────────────────────────────────────────────────────────

/// Create a user with its first linked account.
pub struct AddUser;

#[async_trait]
impl Route for AddUser {
    type Validated = NewUser;

    fn definition(&self) -> RouteDefinition {
        admin_route("Add", Verb::Post, "user", Permission::Add)
    }

    async fn validate(&self, req: &RouteRequest, _ctx: &RouteContext) -> Result<NewUser, AppError> {
        let username = require_body_str(req, "username")?;
        let app_name = require_body_str(req, "app")?;
        let app_id = require_body_str(req, "id")?;
        let token = require_body_str(req, "token")?;
        let token_secret = require_body_str(req, "tokenSecret")?;
        let profile_url = require_body_str(req, "profileUrl")?;
        let profile_img_url = require_body_str(req, "profileImgUrl")?;
        let banner_img_url = require_body_str(req, "bannerImgUrl")?;

        let app: SocialApp = app_name.parse().map_err(|e: userhub_core::ValidationError| {
            tracing::error!(app = %app_name, "unknown app");
            AppError::InvalidField(e.to_string())
        })?;

        Ok(NewUser {
            username,
            app,
            app_id,
            token,
            token_secret,
            profile_url,
            profile_img_url,
            banner_img_url,
        })
    }

    async fn exec(
        &self,
        _req: &RouteRequest,
        new: NewUser,
        ctx: &RouteContext,
    ) -> Result<Value, AppError> {
        let user = ctx.store.add(new).await?;
        tracing::trace!(user_id = %user.id, username = %user.username, "added user");
        Ok(serde_json::to_value(user.details())?)
    }
}

// ── Delete ──────────────────────────────────────────────────────────────────

pub struct DeleteUser;

#[async_trait]
impl Route for DeleteUser {
    type Validated = User;

    fn definition(&self) -> RouteDefinition {
        admin_route("Delete", Verb::Del, "user/:id", Permission::Delete)
    }

    async fn validate(&self, req: &RouteRequest, ctx: &RouteContext) -> Result<User, AppError> {
        load_user(req, ctx).await
    }

    async fn exec(
        &self,
        _req: &RouteRequest,
        user: User,
        ctx: &RouteContext,
    ) -> Result<Value, AppError> {
        if !ctx.store.rm(&user.id).await? {
            return Err(AppError::InvalidReference(format!(
                "user {} does not exist",
                user.id
            )));
        }
        tracing::trace!(user_id = %user.id, "removed user");
        Ok(Value::Bool(true))
    }
}

// ── Metadata ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct MetadataWriteRequest {
    user: User,
    key: String,
    value: Value,
}

async fn write_metadata(
    ctx: &RouteContext,
    write: MetadataWriteRequest,
) -> Result<Value, AppError> {
    let outcome = ctx
        .store
        .upsert_metadata(&write.user.id, &write.key, write.value)
        .await?;
    tracing::trace!(user_id = %write.user.id, key = %write.key, ?outcome, "metadata stored");
    Ok(Value::Bool(true))
}

/// Set a metadata key, creating or replacing it.
pub struct AddUserMetadata;

#[async_trait]
impl Route for AddUserMetadata {
    type Validated = MetadataWriteRequest;

    fn definition(&self) -> RouteDefinition {
        admin_route(
            "AddMetadata",
            Verb::Post,
            "user/:id/metadata/:key",
            Permission::Add,
        )
    }

    async fn validate(
        &self,
        req: &RouteRequest,
        ctx: &RouteContext,
    ) -> Result<MetadataWriteRequest, AppError> {
        let user = load_user(req, ctx).await?;
        let key = require_param(req, "key")?.to_string();
        let value = metadata_value(req)?;
        Ok(MetadataWriteRequest { user, key, value })
    }

    async fn exec(
        &self,
        _req: &RouteRequest,
        write: MetadataWriteRequest,
        ctx: &RouteContext,
    ) -> Result<Value, AppError> {
        write_metadata(ctx, write).await
    }
}

/// Replace the value of an existing metadata key.
pub struct UpdateUserMetadata;

#[async_trait]
impl Route for UpdateUserMetadata {
    type Validated = MetadataWriteRequest;

    fn definition(&self) -> RouteDefinition {
        admin_route(
            "UpdateMetadata",
            Verb::Put,
            "user/:id/metadata/:key",
            Permission::Add,
        )
    }

    async fn validate(
        &self,
        req: &RouteRequest,
        ctx: &RouteContext,
    ) -> Result<MetadataWriteRequest, AppError> {
        let user = load_user(req, ctx).await?;
        let key = require_param(req, "key")?.to_string();
        if user.find_metadata(&key).is_none() {
            tracing::error!(user_id = %user.id, key = %key, "metadata does not exist");
            return Err(AppError::MetadataMissing(key));
        }
        let value = metadata_value(req)?;
        Ok(MetadataWriteRequest { user, key, value })
    }

    async fn exec(
        &self,
        _req: &RouteRequest,
        write: MetadataWriteRequest,
        ctx: &RouteContext,
    ) -> Result<Value, AppError> {
        write_metadata(ctx, write).await
    }
}

pub struct GetUserMetadata;

#[async_trait]
impl Route for GetUserMetadata {
    type Validated = Value;

    fn definition(&self) -> RouteDefinition {
        admin_route(
            "GetMetadata",
            Verb::Get,
            "user/:id/metadata/:key",
            Permission::Get,
        )
    }

    async fn validate(&self, req: &RouteRequest, ctx: &RouteContext) -> Result<Value, AppError> {
        let user = load_user(req, ctx).await?;
        let key = require_param(req, "key")?;
        match user.find_metadata(key) {
            Some(entry) => Ok(entry.value.clone()),
            None => {
                tracing::error!(user_id = %user.id, key, "metadata not found");
                Err(AppError::MetadataNotFound(key.to_string()))
            }
        }
    }

    async fn exec(
        &self,
        _req: &RouteRequest,
        value: Value,
        _ctx: &RouteContext,
    ) -> Result<Value, AppError> {
        Ok(value)
    }
}
