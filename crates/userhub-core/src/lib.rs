#![deny(missing_docs)]

//! # userhub-core: Foundational Types for userhub
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** A [`UserId`] is not a string and
//!    cannot be confused with an external social-app account id.
//!
//! 2. **One [`SocialApp`] enum.** The set of linkable apps is closed and
//!    listed by [`SocialApp::ALL`]; every app name read from a request or a
//!    database row is parsed against it.
//!
//! 3. **Secrets stay inside the model.** OAuth tokens live on
//!    [`AppIdentity`] and never appear in [`UserDetails`], the only
//!    projection handed to API clients.
//!
//! 4. **[`UserStore`] is the sole persistence seam.** Route handlers see the
//!    trait object, never a concrete backend.

pub mod error;
pub mod identity;
pub mod store;
pub mod user;

pub use error::{StoreError, ValidationError};
pub use identity::{SocialApp, UserId};
pub use store::memory::InMemoryUserStore;
pub use store::UserStore;
pub use user::{
    AppIdentity, AppIdentityDetails, MetadataEntry, MetadataWrite, NewUser, ProfileImages,
    TokenUpdate, User, UserDetails,
};
