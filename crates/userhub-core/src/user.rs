//! # User Model
//!
//! A [`User`] is a display name plus the social-app accounts linked to it
//! and a keyed list of metadata entries.
//!
//! ## Invariants
//!
//! - At most one [`AppIdentity`] per [`SocialApp`]; token updates rewrite
//!   that account in place.
//! - Metadata keys are unique within a user; entries keep insertion order.
//!
//! [`UserDetails`] is the client-facing projection. It omits OAuth tokens
//! and token secrets.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::identity::{SocialApp, UserId};

/// Credentials and profile data for one linked social-app account.
///
/// Custom `Debug` redacts the token pair to prevent credential leakage in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppIdentity {
    /// The app this account lives on.
    pub app: SocialApp,
    /// The account id on that app.
    pub app_id: String,
    /// The account's handle on that app.
    pub username: String,
    /// OAuth token.
    pub token: String,
    /// OAuth token secret.
    pub token_secret: String,
    /// Public profile page.
    pub profile_url: String,
    /// Avatar image.
    pub profile_img_url: String,
    /// Banner image.
    pub banner_img_url: String,
}

impl std::fmt::Debug for AppIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppIdentity")
            .field("app", &self.app)
            .field("app_id", &self.app_id)
            .field("username", &self.username)
            .field("token", &"[REDACTED]")
            .field("token_secret", &"[REDACTED]")
            .field("profile_url", &self.profile_url)
            .field("profile_img_url", &self.profile_img_url)
            .field("banner_img_url", &self.banner_img_url)
            .finish()
    }
}

/// One metadata value stored against a user under a unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MetadataEntry {
    /// Key, unique per user.
    pub key: String,
    /// Arbitrary JSON payload.
    pub value: serde_json::Value,
}

/// Outcome of [`User::upsert_metadata`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataWrite {
    /// The key did not exist and was appended.
    Created,
    /// The key existed and its value was replaced.
    Updated,
}

/// Replacement OAuth credentials for a linked app.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TokenUpdate {
    /// New OAuth token.
    pub token: String,
    /// New OAuth token secret.
    pub token_secret: String,
}

impl std::fmt::Debug for TokenUpdate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenUpdate")
            .field("token", &"[REDACTED]")
            .field("token_secret", &"[REDACTED]")
            .finish()
    }
}

/// Everything needed to create a user with its first linked app.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct NewUser {
    /// Display name, also used as the linked account's handle.
    pub username: String,
    /// The app the first account lives on.
    pub app: SocialApp,
    /// The account id on that app.
    #[serde(rename = "id")]
    pub app_id: String,
    /// OAuth token.
    pub token: String,
    /// OAuth token secret.
    pub token_secret: String,
    /// Public profile page.
    pub profile_url: String,
    /// Avatar image.
    pub profile_img_url: String,
    /// Banner image.
    pub banner_img_url: String,
}

impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("app", &self.app)
            .field("app_id", &self.app_id)
            .field("token", &"[REDACTED]")
            .field("token_secret", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

/// A user record as held by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// Record identifier.
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Linked social-app accounts, at most one per app.
    pub identities: Vec<AppIdentity>,
    /// Metadata entries in insertion order.
    pub metadata: Vec<MetadataEntry>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Build a fresh user record from creation input.
    pub fn from_new(new: NewUser) -> Self {
        let now = Utc::now();
        let identity = AppIdentity {
            app: new.app,
            app_id: new.app_id,
            username: new.username.clone(),
            token: new.token,
            token_secret: new.token_secret,
            profile_url: new.profile_url,
            profile_img_url: new.profile_img_url,
            banner_img_url: new.banner_img_url,
        };
        Self {
            id: UserId::new(),
            username: new.username,
            identities: vec![identity],
            metadata: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// The linked account for `app`, if any.
    pub fn identity(&self, app: SocialApp) -> Option<&AppIdentity> {
        self.identities.iter().find(|i| i.app == app)
    }

    /// Whether this user has the account `app_id` linked on `app`.
    pub fn has_identity(&self, app: SocialApp, app_id: &str) -> bool {
        self.identity(app).is_some_and(|i| i.app_id == app_id)
    }

    /// Replace the OAuth token pair for `app`.
    ///
    /// Returns `false` if the user has no account linked on `app`.
    pub fn update_token(&mut self, app: SocialApp, update: &TokenUpdate) -> bool {
        let Some(identity) = self.identities.iter_mut().find(|i| i.app == app) else {
            return false;
        };
        identity.token = update.token.clone();
        identity.token_secret = update.token_secret.clone();
        self.updated_at = Utc::now();
        true
    }

    /// Look up a metadata entry by key.
    pub fn find_metadata(&self, key: &str) -> Option<&MetadataEntry> {
        self.metadata.iter().find(|m| m.key == key)
    }

    /// Insert or replace the metadata value stored under `key`.
    pub fn upsert_metadata(
        &mut self,
        key: impl Into<String>,
        value: serde_json::Value,
    ) -> MetadataWrite {
        let key = key.into();
        self.updated_at = Utc::now();
        match self.metadata.iter_mut().find(|m| m.key == key) {
            Some(entry) => {
                entry.value = value;
                MetadataWrite::Updated
            }
            None => {
                self.metadata.push(MetadataEntry { key, value });
                MetadataWrite::Created
            }
        }
    }

    /// Project the user into its client-facing form.
    pub fn details(&self) -> UserDetails {
        UserDetails {
            id: self.id,
            username: self.username.clone(),
            auth: self.identities.iter().map(AppIdentityDetails::from).collect(),
            metadata: self.metadata.clone(),
        }
    }
}

/// Avatar and banner images of a linked account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ProfileImages {
    /// Avatar image.
    pub profile: String,
    /// Banner image.
    pub banner: String,
}

/// Public view of a linked account. Carries no credentials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppIdentityDetails {
    /// The app this account lives on.
    pub app: SocialApp,
    /// The account id on that app.
    pub app_id: String,
    /// The account's handle on that app.
    pub username: String,
    /// Public profile page.
    pub profile_url: String,
    /// Avatar and banner.
    pub images: ProfileImages,
}

impl From<&AppIdentity> for AppIdentityDetails {
    fn from(identity: &AppIdentity) -> Self {
        Self {
            app: identity.app,
            app_id: identity.app_id.clone(),
            username: identity.username.clone(),
            profile_url: identity.profile_url.clone(),
            images: ProfileImages {
                profile: identity.profile_img_url.clone(),
                banner: identity.banner_img_url.clone(),
            },
        }
    }
}

/// Client-facing projection of a [`User`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UserDetails {
    /// Record identifier.
    #[schema(value_type = String, format = Uuid)]
    pub id: UserId,
    /// Display name.
    pub username: String,
    /// Linked accounts without credentials.
    pub auth: Vec<AppIdentityDetails>,
    /// Metadata entries in insertion order.
    pub metadata: Vec<MetadataEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_new_user() -> NewUser {
        NewUser {
            username: "grassroots".to_string(),
            app: SocialApp::Twitter,
            app_id: "1234567".to_string(),
            token: "tok-abc".to_string(),
            token_secret: "sec-xyz".to_string(),
            profile_url: "https://twitter.com/grassroots".to_string(),
            profile_img_url: "https://img.example/p.png".to_string(),
            banner_img_url: "https://img.example/b.png".to_string(),
        }
    }

    #[test]
    fn from_new_links_first_identity() {
        let user = User::from_new(sample_new_user());
        assert_eq!(user.username, "grassroots");
        assert_eq!(user.identities.len(), 1);
        let identity = user.identity(SocialApp::Twitter).unwrap();
        assert_eq!(identity.app_id, "1234567");
        assert_eq!(identity.username, "grassroots");
        assert!(user.metadata.is_empty());
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn has_identity_matches_app_and_id() {
        let user = User::from_new(sample_new_user());
        assert!(user.has_identity(SocialApp::Twitter, "1234567"));
        assert!(!user.has_identity(SocialApp::Twitter, "7654321"));
        assert!(!user.has_identity(SocialApp::Google, "1234567"));
    }

    #[test]
    fn update_token_replaces_pair() {
        let mut user = User::from_new(sample_new_user());
        let update = TokenUpdate {
            token: "new-tok".to_string(),
            token_secret: "new-sec".to_string(),
        };
        assert!(user.update_token(SocialApp::Twitter, &update));
        let identity = user.identity(SocialApp::Twitter).unwrap();
        assert_eq!(identity.token, "new-tok");
        assert_eq!(identity.token_secret, "new-sec");
    }

    #[test]
    fn update_token_for_unlinked_app_is_false() {
        let mut user = User::from_new(sample_new_user());
        let update = TokenUpdate {
            token: "t".to_string(),
            token_secret: "s".to_string(),
        };
        assert!(!user.update_token(SocialApp::Facebook, &update));
    }

    #[test]
    fn upsert_metadata_creates_then_updates() {
        let mut user = User::from_new(sample_new_user());
        assert_eq!(
            user.upsert_metadata("prefs", json!({"a": 1})),
            MetadataWrite::Created
        );
        assert_eq!(
            user.upsert_metadata("prefs", json!({"a": 2})),
            MetadataWrite::Updated
        );
        assert_eq!(user.metadata.len(), 1);
        assert_eq!(user.find_metadata("prefs").unwrap().value, json!({"a": 2}));
    }

    #[test]
    fn metadata_keeps_insertion_order() {
        let mut user = User::from_new(sample_new_user());
        user.upsert_metadata("z", json!(1));
        user.upsert_metadata("a", json!(2));
        user.upsert_metadata("z", json!(3));
        let keys: Vec<&str> = user.metadata.iter().map(|m| m.key.as_str()).collect();
        assert_eq!(keys, vec!["z", "a"]);
    }

    #[test]
    fn find_metadata_absent_is_none() {
        let user = User::from_new(sample_new_user());
        assert!(user.find_metadata("missing").is_none());
    }

    #[test]
    fn details_omit_credentials() {
        let user = User::from_new(sample_new_user());
        let json = serde_json::to_string(&user.details()).unwrap();
        assert!(!json.contains("tok-abc"));
        assert!(!json.contains("sec-xyz"));
        assert!(!json.contains("token"));
    }

    #[test]
    fn details_wire_shape() {
        let mut user = User::from_new(sample_new_user());
        user.upsert_metadata("k", json!([1, 2]));
        let value = serde_json::to_value(user.details()).unwrap();
        assert_eq!(value["id"], json!(user.id.to_string()));
        assert_eq!(value["username"], "grassroots");
        assert_eq!(value["auth"][0]["app"], "twitter");
        assert_eq!(value["auth"][0]["appId"], "1234567");
        assert_eq!(value["auth"][0]["profileUrl"], "https://twitter.com/grassroots");
        assert_eq!(value["auth"][0]["images"]["profile"], "https://img.example/p.png");
        assert_eq!(value["auth"][0]["images"]["banner"], "https://img.example/b.png");
        assert_eq!(value["metadata"][0], json!({"key": "k", "value": [1, 2]}));
    }

    #[test]
    fn debug_redacts_tokens() {
        let user = User::from_new(sample_new_user());
        let debug = format!("{user:?}");
        assert!(!debug.contains("tok-abc"));
        assert!(!debug.contains("sec-xyz"));
        assert!(debug.contains("[REDACTED]"));
        assert!(!format!("{:?}", sample_new_user()).contains("tok-abc"));
    }

    #[test]
    fn new_user_deserializes_wire_names() {
        let new: NewUser = serde_json::from_value(json!({
            "username": "u",
            "app": "facebook",
            "id": "fb-1",
            "token": "t",
            "tokenSecret": "s",
            "profileUrl": "p",
            "profileImgUrl": "pi",
            "bannerImgUrl": "bi",
        }))
        .unwrap();
        assert_eq!(new.app, SocialApp::Facebook);
        assert_eq!(new.app_id, "fb-1");
        assert_eq!(new.token_secret, "s");
    }
}
