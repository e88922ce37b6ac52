// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Relationship linker: bidirectional array maintenance on attach.
//!
//! When a member is created with a `linked_to` reference, the declared
//! relation determines which array on the linked member receives the new
//! member's id and which reciprocal array on the new member receives the
//! linked member's id (see [`Relation::link_fields`]). When the linked member
//! is the root, the linked-member-side update is mirrored onto the owning
//! user record so the root's relationships stay queryable from the profile.
//!
//! Relations without a mapping (self, husband) skip array maintenance — the
//! member persists anyway. Availability over consistency; the skip is logged.

use tracing::warn;

use arbor_graph::{Member, MemberId, OwnerId, Relation};

use crate::store::{MemberDraft, MemberStore, StoreError};

/// Create a member in `owner`'s forest and, when it declares a `linked_to`
/// reference, maintain the relationship arrays on both sides.
///
/// The root is materialized by the root resolver only; drafts declaring
/// relation `self` are rejected here.
///
/// # Errors
///
/// [`StoreError::Validation`] for missing fields or a `self` draft,
/// [`StoreError::NotFound`] when `linked_to` does not resolve.
pub fn create_linked<S>(
    store: &mut S,
    owner: &OwnerId,
    draft: MemberDraft,
) -> Result<Member, StoreError>
where
    S: MemberStore + ?Sized,
{
    if draft.relation == Relation::Root {
        return Err(StoreError::Validation { field: "relation" });
    }
    let member = store.create(owner, draft)?;
    if let Some(parent_id) = member.linked_to {
        attach(store, &member, parent_id)?;
    }
    Ok(member)
}

/// Maintain the relationship arrays for `member`, freshly attached to
/// `parent_id`.
///
/// Both updates are idempotent set-inserts, so re-attaching the same pair
/// (or replaying a retry) changes nothing.
///
/// # Errors
///
/// [`StoreError::NotFound`] when `parent_id` does not resolve for the
/// member's owner.
pub fn attach<S>(store: &mut S, member: &Member, parent_id: MemberId) -> Result<(), StoreError>
where
    S: MemberStore + ?Sized,
{
    let parent = store
        .member(&member.owner, parent_id)?
        .ok_or(StoreError::NotFound {
            what: "linked member",
        })?;

    let Some((on_parent, on_member)) = member.relation.link_fields() else {
        warn!(
            member = %member.id,
            relation = member.relation.as_str(),
            "relation has no link mapping; skipping relationship arrays"
        );
        return Ok(());
    };

    store.add_relationship(&member.owner, parent.id, on_parent, member.id)?;
    store.add_relationship(&member.owner, member.id, on_member, parent.id)?;

    if parent.relation == Relation::Root {
        store.add_user_relationship(&member.owner, on_parent, member.id)?;
    }
    Ok(())
}
