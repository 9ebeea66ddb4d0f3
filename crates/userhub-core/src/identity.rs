//! # Identity Newtypes
//!
//! [`UserId`] identifies a user record. [`SocialApp`] names the third-party
//! app an external account lives on.
//!
//! ## Validation
//!
//! Both types parse from strings via [`FromStr`] and reject anything that
//! is not a UUID or a known app name respectively.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ValidationError;

/// A unique identifier for a user record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Create a new random user identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a user identifier from an existing UUID.
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    /// Access the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for UserId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|_| ValidationError::InvalidUserId(s.to_string()))
    }
}

/// A third-party social app a user can link an account from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum SocialApp {
    /// twitter.com
    Twitter,
    /// facebook.com
    Facebook,
    /// google.com
    Google,
}

impl SocialApp {
    /// Every linkable app, in declaration order.
    pub const ALL: [SocialApp; 3] = [Self::Twitter, Self::Facebook, Self::Google];

    /// Return the lowercase wire name of this app.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Twitter => "twitter",
            Self::Facebook => "facebook",
            Self::Google => "google",
        }
    }
}

impl std::fmt::Display for SocialApp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SocialApp {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|app| app.as_str() == s)
            .ok_or_else(|| ValidationError::UnknownApp(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_id_new_is_unique() {
        assert_ne!(UserId::new(), UserId::new());
    }

    #[test]
    fn user_id_parses_uuid() {
        let uuid = Uuid::new_v4();
        let id: UserId = uuid.to_string().parse().unwrap();
        assert_eq!(id.as_uuid(), &uuid);
        assert_eq!(id.to_string(), uuid.to_string());
    }

    #[test]
    fn user_id_rejects_garbage() {
        let err = "5a1b2c".parse::<UserId>().unwrap_err();
        assert_eq!(err, ValidationError::InvalidUserId("5a1b2c".to_string()));
    }

    #[test]
    fn user_id_serializes_as_bare_string() {
        let id = UserId::from_uuid(Uuid::nil());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"00000000-0000-0000-0000-000000000000\"");
    }

    #[test]
    fn social_app_round_trips_through_str() {
        for app in SocialApp::ALL {
            assert_eq!(app.as_str().parse::<SocialApp>().unwrap(), app);
        }
    }

    #[test]
    fn social_app_is_case_sensitive() {
        assert!("Twitter".parse::<SocialApp>().is_err());
        assert!("myspace".parse::<SocialApp>().is_err());
    }

    #[test]
    fn social_app_serde_lowercase() {
        let json = serde_json::to_string(&SocialApp::Facebook).unwrap();
        assert_eq!(json, "\"facebook\"");
        let app: SocialApp = serde_json::from_str("\"google\"").unwrap();
        assert_eq!(app, SocialApp::Google);
    }
}
