// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory member store.
//!
//! One [`Forest`] per owner, no persistence. Sufficient for tests and for
//! driving the services without a data directory; the filesystem adapter in
//! `arbor-store-fs` persists the same `Forest` shape.

use std::collections::HashMap;

use arbor_graph::{Member, MemberId, OwnerId, RelationshipField};

use crate::auth::UserProfile;
use crate::forest::Forest;
use crate::store::{MemberDraft, MemberStore, StoreError, UserRecord};

/// In-memory implementation of [`MemberStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    forests: HashMap<OwnerId, Forest>,
}

impl MemoryStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn forest(&self, owner: &OwnerId) -> Option<&Forest> {
        self.forests.get(owner)
    }

    fn forest_mut(&mut self, owner: &OwnerId) -> &mut Forest {
        self.forests.entry(owner.clone()).or_default()
    }
}

impl MemberStore for MemoryStore {
    fn create(&mut self, owner: &OwnerId, draft: MemberDraft) -> Result<Member, StoreError> {
        self.forest_mut(owner).create_member(owner, draft)
    }

    fn members_for(
        &self,
        owner: &OwnerId,
        filter: Option<&[MemberId]>,
    ) -> Result<Vec<Member>, StoreError> {
        Ok(self
            .forest(owner)
            .map(|f| f.members(filter))
            .unwrap_or_default())
    }

    fn member(&self, owner: &OwnerId, id: MemberId) -> Result<Option<Member>, StoreError> {
        Ok(self.forest(owner).and_then(|f| f.member(id)).cloned())
    }

    fn find_root(&self, owner: &OwnerId) -> Result<Option<Member>, StoreError> {
        Ok(self.forest(owner).and_then(Forest::find_root).cloned())
    }

    fn add_relationship(
        &mut self,
        owner: &OwnerId,
        id: MemberId,
        field: RelationshipField,
        other: MemberId,
    ) -> Result<bool, StoreError> {
        self.forest_mut(owner).add_relationship(id, field, other)
    }

    fn user(&self, owner: &OwnerId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.forest(owner).and_then(Forest::user).cloned())
    }

    fn upsert_user(&mut self, profile: &UserProfile) -> Result<bool, StoreError> {
        Ok(self.forest_mut(&profile.owner).upsert_user(profile))
    }

    fn add_user_relationship(
        &mut self,
        owner: &OwnerId,
        field: RelationshipField,
        member: MemberId,
    ) -> Result<bool, StoreError> {
        self.forest_mut(owner).add_user_relationship(field, member)
    }
}
