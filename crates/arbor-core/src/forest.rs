// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! One owner's forest: the member collection plus the mirrored user record.
//!
//! Every adapter delegates here, so the invariants — required fields, root
//! uniqueness, resolvable `linked_to`, idempotent set-inserts — are enforced
//! in exactly one place. The struct serializes as a whole; the filesystem
//! adapter persists one `Forest` per owner.

use serde::{Deserialize, Serialize};

use arbor_graph::{Member, MemberId, OwnerId, Relation, RelationshipField, RelationshipSet};

use crate::auth::UserProfile;
use crate::store::{now_ms, MemberDraft, StoreError, UserRecord};

/// A single owner's member collection, id counter, and user record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Forest {
    next_id: u64,
    members: Vec<Member>,
    #[serde(default)]
    user: Option<UserRecord>,
}

impl Forest {
    /// Empty forest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a member, enforcing the forest invariants.
    ///
    /// # Errors
    ///
    /// [`StoreError::Validation`] for missing required fields,
    /// [`StoreError::NotFound`] when `linked_to` does not resolve,
    /// [`StoreError::Conflict`] when the forest already has a root and the
    /// draft declares another.
    pub fn create_member(
        &mut self,
        owner: &OwnerId,
        draft: MemberDraft,
    ) -> Result<Member, StoreError> {
        let draft = draft.normalized()?;
        if draft.relation == Relation::Root && self.find_root().is_some() {
            return Err(StoreError::Conflict("forest already has a self member"));
        }
        if let Some(target) = draft.linked_to {
            if self.member(target).is_none() {
                return Err(StoreError::NotFound {
                    what: "linked member",
                });
            }
        }

        self.next_id += 1;
        let now = now_ms();
        let member = Member {
            id: MemberId(self.next_id),
            owner: owner.clone(),
            name: draft.name,
            image_url: draft.image_url,
            relation: draft.relation,
            display_relation: draft.display_relation,
            linked_to: draft.linked_to,
            relationships: RelationshipSet::default(),
            created_at_ms: now,
            updated_at_ms: now,
        };
        self.members.push(member.clone());
        Ok(member)
    }

    /// All members, or only those whose id appears in `filter`. Unknown ids
    /// in the filter are silently dropped.
    pub fn members(&self, filter: Option<&[MemberId]>) -> Vec<Member> {
        match filter {
            None => self.members.clone(),
            Some(ids) => self
                .members
                .iter()
                .filter(|m| ids.contains(&m.id))
                .cloned()
                .collect(),
        }
    }

    /// Fetch one member by id.
    pub fn member(&self, id: MemberId) -> Option<&Member> {
        self.members.iter().find(|m| m.id == id)
    }

    /// The root member, when materialized.
    pub fn find_root(&self) -> Option<&Member> {
        self.members.iter().find(|m| m.relation == Relation::Root)
    }

    /// Idempotent set-insert of `other` into `field` of member `id`. Bumps
    /// `updated_at_ms` only when an insert actually happens.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when `id` does not resolve.
    pub fn add_relationship(
        &mut self,
        id: MemberId,
        field: RelationshipField,
        other: MemberId,
    ) -> Result<bool, StoreError> {
        let member = self
            .members
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(StoreError::NotFound { what: "member" })?;
        let inserted = member.relationships.insert(field, other);
        if inserted {
            member.updated_at_ms = now_ms();
        }
        Ok(inserted)
    }

    /// The mirrored user record, when present.
    pub fn user(&self) -> Option<&UserRecord> {
        self.user.as_ref()
    }

    /// Insert the user record if absent, refresh profile fields if present.
    /// The mirrored arrays are preserved. Returns whether anything changed.
    pub fn upsert_user(&mut self, profile: &UserProfile) -> bool {
        match &mut self.user {
            None => {
                self.user = Some(UserRecord::new(profile));
                true
            }
            Some(record) => {
                if record.name == profile.name && record.image_url == profile.image_url {
                    return false;
                }
                record.name = profile.name.clone();
                record.image_url = profile.image_url.clone();
                true
            }
        }
    }

    /// Idempotent set-insert into the mirrored user arrays.
    ///
    /// # Errors
    ///
    /// [`StoreError::NotFound`] when no user record exists yet.
    pub fn add_user_relationship(
        &mut self,
        field: RelationshipField,
        member: MemberId,
    ) -> Result<bool, StoreError> {
        let record = self
            .user
            .as_mut()
            .ok_or(StoreError::NotFound { what: "user" })?;
        Ok(record.relationships.insert(field, member))
    }
}
