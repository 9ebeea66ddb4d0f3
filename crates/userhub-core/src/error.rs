//! # Error Hierarchy
//!
//! Structured error types for userhub, built with `thiserror`.
//! No `Box<dyn Error>`, no `.unwrap()` outside tests.

use thiserror::Error;

use crate::identity::{SocialApp, UserId};

/// Validation errors for domain primitives parsed from untrusted input.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The user identifier is not a UUID.
    #[error("invalid user ID: \"{0}\" (expected a UUID)")]
    InvalidUserId(String),

    /// The app name is not one of the linkable social apps.
    #[error("unknown app: \"{0}\" (expected one of twitter, facebook, google)")]
    UnknownApp(String),
}

/// Errors raised by a [`UserStore`](crate::UserStore) backend.
#[derive(Error, Debug)]
pub enum StoreError {
    /// The user does not exist (anymore).
    #[error("user {0} not found")]
    UserNotFound(UserId),

    /// Another user already holds this linked identity.
    #[error("{app} account {app_id} is already linked to another user")]
    DuplicateIdentity {
        /// The social app.
        app: SocialApp,
        /// The external account id on that app.
        app_id: String,
    },

    /// The storage backend failed.
    #[error("storage backend error: {0}")]
    Backend(String),
}
