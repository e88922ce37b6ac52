// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Member-store port and error taxonomy.

use serde::{Deserialize, Serialize};

use arbor_graph::{Member, MemberId, OwnerId, Relation, RelationshipField, RelationshipSet};

use crate::auth::UserProfile;

/// Errors surfaced by store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A required field is missing or malformed. User-correctable.
    #[error("[STORE_VALIDATION] missing or invalid field: {field}")]
    Validation {
        /// The offending field.
        field: &'static str,
    },
    /// A referenced record does not exist for this owner.
    #[error("[STORE_NOT_FOUND] {what} not found")]
    NotFound {
        /// What failed to resolve.
        what: &'static str,
    },
    /// A uniqueness invariant would be violated (duplicate root).
    #[error("[STORE_CONFLICT] {0}")]
    Conflict(&'static str),
    /// I/O failure in a persistent adapter.
    #[error("[STORE_IO] {0}")]
    Io(#[from] std::io::Error),
    /// Serialization failure in a persistent adapter.
    #[error("[STORE_SERDE] {0}")]
    Serde(#[from] serde_json::Error),
    /// Catch-all adapter failure.
    #[error("[STORE_OTHER] {0}")]
    Other(String),
}

/// Fields of a member-to-be, as accepted by the creation surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberDraft {
    /// Display name (required, non-empty after trimming).
    pub name: String,
    /// Photo resource reference (required, non-empty after trimming).
    pub image_url: String,
    /// Declared relation.
    pub relation: Relation,
    /// Member this one attaches to; must resolve within the owner's forest.
    pub linked_to: Option<MemberId>,
    /// Optional presentation label; blank collapses to `None`.
    pub display_relation: Option<String>,
}

impl MemberDraft {
    /// Trim the draft and reject missing required fields.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`] naming the first empty required field.
    pub fn normalized(mut self) -> Result<Self, StoreError> {
        self.name = self.name.trim().to_string();
        if self.name.is_empty() {
            return Err(StoreError::Validation { field: "name" });
        }
        self.image_url = self.image_url.trim().to_string();
        if self.image_url.is_empty() {
            return Err(StoreError::Validation { field: "imageUrl" });
        }
        self.display_relation = self
            .display_relation
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty());
        Ok(self)
    }
}

/// The owning user's record as mirrored by the store: profile fields plus a
/// copy of the root member's relationship arrays.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserRecord {
    /// Identity of the user.
    pub owner: OwnerId,
    /// Display name.
    pub name: String,
    /// Photo resource reference.
    pub image_url: String,
    /// Mirror of the root member's arrays, maintained by the linker.
    #[serde(flatten)]
    pub relationships: RelationshipSet,
}

impl UserRecord {
    /// Fresh record for a profile, with empty arrays.
    pub fn new(profile: &UserProfile) -> Self {
        Self {
            owner: profile.owner.clone(),
            name: profile.name.clone(),
            image_url: profile.image_url.clone(),
            relationships: RelationshipSet::default(),
        }
    }
}

/// Persistence port for member forests, scoped by owner.
///
/// Absence is not an error for the read methods — a missing root or an
/// unknown filter id simply yields `Ok(None)`/an empty list. Error variants
/// are reserved for violated invariants and adapter failures.
pub trait MemberStore {
    /// Create a member in `owner`'s forest.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`] for missing required fields,
    /// [`StoreError::NotFound`] when `linked_to` does not resolve within the
    /// forest, [`StoreError::Conflict`] when a second root would be created.
    fn create(&mut self, owner: &OwnerId, draft: MemberDraft) -> Result<Member, StoreError>;

    /// All members for `owner`, or only those whose id appears in `filter`.
    /// Unknown ids in the filter are silently dropped.
    ///
    /// # Errors
    ///
    /// Adapter I/O or serialization failures.
    fn members_for(
        &self,
        owner: &OwnerId,
        filter: Option<&[MemberId]>,
    ) -> Result<Vec<Member>, StoreError>;

    /// Fetch one member of `owner`'s forest by id.
    ///
    /// # Errors
    ///
    /// Adapter I/O or serialization failures.
    fn member(&self, owner: &OwnerId, id: MemberId) -> Result<Option<Member>, StoreError>;

    /// The member with relation `self`, when materialized.
    ///
    /// # Errors
    ///
    /// Adapter I/O or serialization failures.
    fn find_root(&self, owner: &OwnerId) -> Result<Option<Member>, StoreError>;

    /// Idempotent set-insert of `other` into `field` of member `id`. Bumps
    /// `updated_at_ms` when an insert actually happens. Returns whether the
    /// entry was added.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when `id` does not resolve for `owner`.
    fn add_relationship(
        &mut self,
        owner: &OwnerId,
        id: MemberId,
        field: RelationshipField,
        other: MemberId,
    ) -> Result<bool, StoreError>;

    /// The mirrored user record, when present.
    ///
    /// # Errors
    ///
    /// Adapter I/O or serialization failures.
    fn user(&self, owner: &OwnerId) -> Result<Option<UserRecord>, StoreError>;

    /// Insert the user record if absent, refresh profile fields if present.
    /// Mirrored relationship arrays are never clobbered. Returns whether
    /// anything changed.
    ///
    /// # Errors
    ///
    /// Adapter I/O or serialization failures.
    fn upsert_user(&mut self, profile: &UserProfile) -> Result<bool, StoreError>;

    /// Idempotent set-insert into the mirrored user arrays.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no user record exists for `owner`.
    fn add_user_relationship(
        &mut self,
        owner: &OwnerId,
        field: RelationshipField,
        member: MemberId,
    ) -> Result<bool, StoreError>;
}

/// Milliseconds since the Unix epoch.
pub(crate) fn now_ms() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis();
    u64::try_from(millis).unwrap_or(u64::MAX)
}
