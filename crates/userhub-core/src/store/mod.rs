//! # User Store Contract
//!
//! [`UserStore`] is the data-access collaborator behind every user route.
//! Route handlers hold it as `Arc<dyn UserStore>` and never see a concrete
//! backend.
//!
//! Reads return owned snapshots. Writes are keyed by [`UserId`] and report
//! [`StoreError::UserNotFound`] when the user vanished between a handler's
//! lookup and its write.

pub mod memory;

use async_trait::async_trait;

use crate::error::StoreError;
use crate::identity::{SocialApp, UserId};
use crate::user::{MetadataWrite, NewUser, TokenUpdate, User};

/// Persistence operations for user records.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Every user, oldest first.
    async fn get_all(&self) -> Result<Vec<User>, StoreError>;

    /// The user with `id`, if it exists.
    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    /// The user that has account `app_id` linked on `app`, if any.
    async fn get_by_app_id(&self, app: SocialApp, app_id: &str)
        -> Result<Option<User>, StoreError>;

    /// Create a user. Fails with [`StoreError::DuplicateIdentity`] if the
    /// account is already linked to another user.
    async fn add(&self, new: NewUser) -> Result<User, StoreError>;

    /// Delete a user. Returns `false` if it did not exist.
    async fn rm(&self, id: &UserId) -> Result<bool, StoreError>;

    /// Replace the token pair of the account linked on `app`.
    /// Returns `false` if the user has no account on `app`.
    async fn update_token(
        &self,
        id: &UserId,
        app: SocialApp,
        update: TokenUpdate,
    ) -> Result<bool, StoreError>;

    /// Insert or replace the metadata value stored under `key`.
    ///
    /// Values are held as parsed JSON, not as the text the client sent.
    /// Object key order is not preserved and a repeated key keeps its last
    /// value. Every backend, including Postgres `JSONB`, reads back a value
    /// equal to the one written.
    async fn upsert_metadata(
        &self,
        id: &UserId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<MetadataWrite, StoreError>;
}
