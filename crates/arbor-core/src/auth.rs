// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Identity port for the auth collaborator.
//!
//! Credential validation happens outside this core. The gateway hands a
//! bearer credential to an [`IdentityProvider`] and either gets a
//! [`UserProfile`] back or rejects the request — identity is never silently
//! defaulted.

use arbor_graph::OwnerId;

/// Errors from the identity port.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    /// Identity missing or credential invalid.
    #[error("[AUTH_UNAUTHORIZED] identity missing or invalid")]
    Unauthorized,
}

/// The resolved identity: who owns the forest, plus the profile fields the
/// root resolver materializes the `self` member from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Owner identity; scopes every store query.
    pub owner: OwnerId,
    /// Display name.
    pub name: String,
    /// Photo resource reference.
    pub image_url: String,
}

/// Resolves a bearer credential to an identity.
pub trait IdentityProvider {
    /// Resolve `token` to a profile.
    ///
    /// # Errors
    ///
    /// [`AuthError::Unauthorized`] when the credential is unknown or invalid.
    fn resolve(&self, token: &str) -> Result<UserProfile, AuthError>;
}
