//! # In-Memory User Store
//!
//! Thread-safe, cloneable [`UserStore`] backed by a `HashMap`.
//!
//! All operations are synchronous under the hood (the RwLock is
//! `parking_lot`, not `tokio::sync`) because the lock is never held across
//! `.await` points. `parking_lot::RwLock` is non-poisonable, so a panicking
//! writer does not permanently corrupt the store.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::error::StoreError;
use crate::identity::{SocialApp, UserId};
use crate::store::UserStore;
use crate::user::{MetadataWrite, NewUser, TokenUpdate, User};

/// [`UserStore`] that keeps every record in process memory.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<UserId, User>>>,
}

impl InMemoryUserStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored users.
    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Apply `f` to the user under a single write lock.
    fn with_user_mut<R>(
        &self,
        id: &UserId,
        f: impl FnOnce(&mut User) -> R,
    ) -> Result<R, StoreError> {
        let mut guard = self.users.write();
        let user = guard.get_mut(id).ok_or(StoreError::UserNotFound(*id))?;
        Ok(f(user))
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn get_all(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.users.read().values().cloned().collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(users)
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().get(id).cloned())
    }

    async fn get_by_app_id(
        &self,
        app: SocialApp,
        app_id: &str,
    ) -> Result<Option<User>, StoreError> {
        Ok(self
            .users
            .read()
            .values()
            .find(|u| u.has_identity(app, app_id))
            .cloned())
    }

    async fn add(&self, new: NewUser) -> Result<User, StoreError> {
        let mut guard = self.users.write();
        if guard.values().any(|u| u.has_identity(new.app, &new.app_id)) {
            return Err(StoreError::DuplicateIdentity {
                app: new.app,
                app_id: new.app_id,
            });
        }
        let user = User::from_new(new);
        guard.insert(user.id, user.clone());
        tracing::trace!(user_id = %user.id, "user inserted");
        Ok(user)
    }

    async fn rm(&self, id: &UserId) -> Result<bool, StoreError> {
        Ok(self.users.write().remove(id).is_some())
    }

    async fn update_token(
        &self,
        id: &UserId,
        app: SocialApp,
        update: TokenUpdate,
    ) -> Result<bool, StoreError> {
        self.with_user_mut(id, |user| user.update_token(app, &update))
    }

    async fn upsert_metadata(
        &self,
        id: &UserId,
        key: &str,
        value: serde_json::Value,
    ) -> Result<MetadataWrite, StoreError> {
        self.with_user_mut(id, |user| user.upsert_metadata(key, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn new_user(app: SocialApp, app_id: &str) -> NewUser {
        NewUser {
            username: format!("user-{app_id}"),
            app,
            app_id: app_id.to_string(),
            token: "token".to_string(),
            token_secret: "secret".to_string(),
            profile_url: "https://example.com/profile".to_string(),
            profile_img_url: "https://example.com/p.png".to_string(),
            banner_img_url: "https://example.com/b.png".to_string(),
        }
    }

    #[tokio::test]
    async fn new_store_is_empty() {
        let store = InMemoryUserStore::new();
        assert!(store.is_empty());
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn metadata_is_stored_as_parsed_json() {
        let store = InMemoryUserStore::new();
        let user = store.add(new_user(SocialApp::Twitter, "1")).await.unwrap();
        let value: serde_json::Value =
            serde_json::from_str(r#"{"b": 1, "a": {"c": [1, 2]}, "b": 3}"#).unwrap();
        store.upsert_metadata(&user.id, "prefs", value).await.unwrap();

        let stored = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(
            stored.find_metadata("prefs").unwrap().value,
            json!({"a": {"c": [1, 2]}, "b": 3})
        );
    }

    #[tokio::test]
    async fn add_then_find_by_id() {
        let store = InMemoryUserStore::new();
        let user = store.add(new_user(SocialApp::Twitter, "1")).await.unwrap();
        let found = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(found, user);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn find_by_unknown_id_is_none() {
        let store = InMemoryUserStore::new();
        assert!(store.find_by_id(&UserId::new()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn get_by_app_id_matches_app_and_id() {
        let store = InMemoryUserStore::new();
        let user = store.add(new_user(SocialApp::Facebook, "fb-7")).await.unwrap();

        let hit = store
            .get_by_app_id(SocialApp::Facebook, "fb-7")
            .await
            .unwrap();
        assert_eq!(hit.map(|u| u.id), Some(user.id));

        let wrong_app = store.get_by_app_id(SocialApp::Google, "fb-7").await.unwrap();
        assert!(wrong_app.is_none());
    }

    #[tokio::test]
    async fn add_rejects_duplicate_identity() {
        let store = InMemoryUserStore::new();
        store.add(new_user(SocialApp::Twitter, "dup")).await.unwrap();
        let err = store
            .add(new_user(SocialApp::Twitter, "dup"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DuplicateIdentity { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn same_app_id_on_different_apps_is_allowed() {
        let store = InMemoryUserStore::new();
        store.add(new_user(SocialApp::Twitter, "42")).await.unwrap();
        store.add(new_user(SocialApp::Google, "42")).await.unwrap();
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn get_all_is_oldest_first() {
        let store = InMemoryUserStore::new();
        let first = store.add(new_user(SocialApp::Twitter, "a")).await.unwrap();
        let second = store.add(new_user(SocialApp::Twitter, "b")).await.unwrap();
        let all = store.get_all().await.unwrap();
        assert_eq!(all.len(), 2);
        if first.created_at != second.created_at {
            assert_eq!(all[0].id, first.id);
            assert_eq!(all[1].id, second.id);
        }
    }

    #[tokio::test]
    async fn rm_removes_and_reports() {
        let store = InMemoryUserStore::new();
        let user = store.add(new_user(SocialApp::Twitter, "1")).await.unwrap();
        assert!(store.rm(&user.id).await.unwrap());
        assert!(!store.rm(&user.id).await.unwrap());
        assert!(store.find_by_id(&user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn update_token_persists() {
        let store = InMemoryUserStore::new();
        let user = store.add(new_user(SocialApp::Twitter, "1")).await.unwrap();
        let update = TokenUpdate {
            token: "fresh".to_string(),
            token_secret: "fresh-secret".to_string(),
        };
        assert!(store
            .update_token(&user.id, SocialApp::Twitter, update.clone())
            .await
            .unwrap());
        assert!(!store
            .update_token(&user.id, SocialApp::Google, update)
            .await
            .unwrap());

        let stored = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.identity(SocialApp::Twitter).unwrap().token, "fresh");
    }

    #[tokio::test]
    async fn update_token_for_missing_user_errors() {
        let store = InMemoryUserStore::new();
        let update = TokenUpdate {
            token: "t".to_string(),
            token_secret: "s".to_string(),
        };
        let err = store
            .update_token(&UserId::new(), SocialApp::Twitter, update)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn upsert_metadata_persists() {
        let store = InMemoryUserStore::new();
        let user = store.add(new_user(SocialApp::Twitter, "1")).await.unwrap();
        let write = store
            .upsert_metadata(&user.id, "prefs", json!({"theme": "dark"}))
            .await
            .unwrap();
        assert_eq!(write, MetadataWrite::Created);

        let stored = store.find_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(
            stored.find_metadata("prefs").unwrap().value,
            json!({"theme": "dark"})
        );
    }

    #[tokio::test]
    async fn clones_share_data() {
        let store = InMemoryUserStore::new();
        let clone = store.clone();
        store.add(new_user(SocialApp::Twitter, "1")).await.unwrap();
        assert_eq!(clone.len(), 1);
    }
}
