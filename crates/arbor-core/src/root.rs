// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Root resolver: find-or-create of the distinguished `self` member.
//!
//! The store enforces `(owner, self)` uniqueness, so two concurrent
//! resolutions cannot both materialize a root — the loser's create comes back
//! [`StoreError::Conflict`] and is resolved by re-fetching the winner's root.
//! The conflict never surfaces to the caller.

use arbor_graph::{Member, Relation};

use crate::auth::UserProfile;
use crate::store::{MemberDraft, MemberStore, StoreError};

/// Return the owner's root member, materializing it from the user's own
/// profile on first access.
///
/// # Errors
///
/// Store failures other than the duplicate-root conflict, which is absorbed.
pub fn resolve_root<S>(store: &mut S, profile: &UserProfile) -> Result<Member, StoreError>
where
    S: MemberStore + ?Sized,
{
    if let Some(root) = store.find_root(&profile.owner)? {
        return Ok(root);
    }

    let draft = MemberDraft {
        name: profile.name.clone(),
        image_url: profile.image_url.clone(),
        relation: Relation::Root,
        linked_to: None,
        display_relation: None,
    };
    match store.create(&profile.owner, draft) {
        Ok(root) => Ok(root),
        // Lost the race: another resolution created the root in between.
        Err(StoreError::Conflict(_)) => store
            .find_root(&profile.owner)?
            .ok_or(StoreError::NotFound { what: "root member" }),
        Err(err) => Err(err),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use crate::store::UserRecord;
    use arbor_graph::{MemberId, OwnerId, RelationshipField};

    fn profile() -> UserProfile {
        UserProfile {
            owner: OwnerId::new("u1"),
            name: "Me".into(),
            image_url: "img".into(),
        }
    }

    #[test]
    fn resolves_to_the_same_root_on_repeat_calls() {
        let mut store = MemoryStore::new();
        let first = resolve_root(&mut store, &profile()).unwrap();
        let second = resolve_root(&mut store, &profile()).unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(store.members_for(&profile().owner, None).unwrap().len(), 1);
    }

    #[test]
    fn materializes_from_the_profile() {
        let mut store = MemoryStore::new();
        let root = resolve_root(&mut store, &profile()).unwrap();
        assert_eq!(root.name, "Me");
        assert_eq!(root.image_url, "img");
        assert_eq!(root.relation, Relation::Root);
        assert!(root.linked_to.is_none());
    }

    #[test]
    fn returns_an_existing_root_untouched() {
        let mut store = MemoryStore::new();
        let existing = store
            .create(
                &profile().owner,
                MemberDraft {
                    name: "Pre-existing".into(),
                    image_url: "old".into(),
                    relation: Relation::Root,
                    linked_to: None,
                    display_relation: None,
                },
            )
            .unwrap();
        let resolved = resolve_root(&mut store, &profile()).unwrap();
        assert_eq!(resolved.id, existing.id);
        assert_eq!(resolved.name, "Pre-existing");
    }

    /// Store double replaying the losing side of a concurrent resolution:
    /// `find_root` misses once, then the create collides.
    struct RacingStore {
        inner: MemoryStore,
        misses_left: std::cell::Cell<u32>,
    }

    impl MemberStore for RacingStore {
        fn create(
            &mut self,
            owner: &OwnerId,
            draft: MemberDraft,
        ) -> Result<Member, StoreError> {
            self.inner.create(owner, draft)
        }

        fn members_for(
            &self,
            owner: &OwnerId,
            filter: Option<&[MemberId]>,
        ) -> Result<Vec<Member>, StoreError> {
            self.inner.members_for(owner, filter)
        }

        fn member(&self, owner: &OwnerId, id: MemberId) -> Result<Option<Member>, StoreError> {
            self.inner.member(owner, id)
        }

        fn find_root(&self, owner: &OwnerId) -> Result<Option<Member>, StoreError> {
            if self.misses_left.get() > 0 {
                self.misses_left.set(self.misses_left.get() - 1);
                return Ok(None);
            }
            self.inner.find_root(owner)
        }

        fn add_relationship(
            &mut self,
            owner: &OwnerId,
            id: MemberId,
            field: RelationshipField,
            other: MemberId,
        ) -> Result<bool, StoreError> {
            self.inner.add_relationship(owner, id, field, other)
        }

        fn user(&self, owner: &OwnerId) -> Result<Option<UserRecord>, StoreError> {
            self.inner.user(owner)
        }

        fn upsert_user(&mut self, profile: &UserProfile) -> Result<bool, StoreError> {
            self.inner.upsert_user(profile)
        }

        fn add_user_relationship(
            &mut self,
            owner: &OwnerId,
            field: RelationshipField,
            member: MemberId,
        ) -> Result<bool, StoreError> {
            self.inner.add_user_relationship(owner, field, member)
        }
    }

    #[test]
    fn duplicate_root_conflict_is_absorbed_by_refetch() {
        let mut inner = MemoryStore::new();
        let winner = inner
            .create(
                &profile().owner,
                MemberDraft {
                    name: "Winner".into(),
                    image_url: "img".into(),
                    relation: Relation::Root,
                    linked_to: None,
                    display_relation: None,
                },
            )
            .unwrap();

        let mut store = RacingStore {
            inner,
            misses_left: std::cell::Cell::new(1),
        };
        // The stale miss sends resolve_root down the create path; the store
        // reports the conflict; the resolver re-fetches the winner.
        let resolved = resolve_root(&mut store, &profile()).unwrap();
        assert_eq!(resolved.id, winner.id);
        assert_eq!(store.members_for(&profile().owner, None).unwrap().len(), 1);
    }
}
