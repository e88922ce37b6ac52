// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Lookup index over a flat member set.
//!
//! Tree reconstruction is two-phase: build a [`MemberIndex`] once, then
//! resolve spouse/parents/children through bucket lookups instead of
//! re-scanning the flat list per question.

use std::collections::HashMap;

use crate::{Member, MemberId, Relation};

/// Role and id indices over one owner's flat member list.
///
/// Borrows the member slice; rebuild after any mutation. Buckets preserve the
/// slice order, so resolution is deterministic for a given listing.
#[derive(Debug)]
pub struct MemberIndex<'a> {
    members: &'a [Member],
    by_id: HashMap<MemberId, usize>,
    by_link: HashMap<MemberId, Vec<usize>>,
    unlinked: Vec<usize>,
    wives: Vec<usize>,
}

impl<'a> MemberIndex<'a> {
    /// Index a flat member set.
    pub fn build(members: &'a [Member]) -> Self {
        let mut by_id = HashMap::with_capacity(members.len());
        let mut by_link: HashMap<MemberId, Vec<usize>> = HashMap::new();
        let mut unlinked = Vec::new();
        let mut wives = Vec::new();
        for (pos, member) in members.iter().enumerate() {
            by_id.insert(member.id, pos);
            match member.linked_to {
                Some(target) => by_link.entry(target).or_default().push(pos),
                None => unlinked.push(pos),
            }
            if member.relation == Relation::Wife {
                wives.push(pos);
            }
        }
        Self {
            members,
            by_id,
            by_link,
            unlinked,
            wives,
        }
    }

    /// Look up a member by id.
    pub fn get(&self, id: MemberId) -> Option<&'a Member> {
        self.by_id.get(&id).map(|pos| &self.members[*pos])
    }

    /// Members whose `linked_to` points at `id`.
    pub fn linked_to(&self, id: MemberId) -> impl Iterator<Item = &'a Member> + '_ {
        self.by_link
            .get(&id)
            .into_iter()
            .flatten()
            .map(|pos| &self.members[*pos])
    }

    /// Members with no `linked_to` (root candidates in legacy data).
    pub fn unlinked(&self) -> impl Iterator<Item = &'a Member> + '_ {
        self.unlinked.iter().map(|pos| &self.members[*pos])
    }

    /// All members with relation `wife`, used by the mother-inference
    /// fallback.
    pub fn wives(&self) -> impl Iterator<Item = &'a Member> + '_ {
        self.wives.iter().map(|pos| &self.members[*pos])
    }

    /// The indexed slice.
    pub fn members(&self) -> &'a [Member] {
        self.members
    }
}
