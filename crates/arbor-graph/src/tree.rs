// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Tree reconstruction over a flat member set.
//!
//! Every resolution is two-tier: prefer the relationship arrays when they are
//! populated, fall back to `relation`/`linked_to` scanning for records
//! created before the arrays existed. The resolutions are exposed as free
//! functions so the inference rules stay testable without rendering a whole
//! tree.
//!
//! Recursion is over the tree, not the flat list: parents recurse with
//! [`TreeMode::AncestorsOnly`] (suppressing their spouse and descendant rows
//! so subtrees don't duplicate), children recurse with [`TreeMode::Full`].
//! Depth is capped at [`MAX_TREE_DEPTH`] so malformed cyclic `linked_to`
//! chains in imported data render as a truncated branch instead of hanging
//! the reconstruction.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{Member, MemberId, MemberIndex, Relation};

/// Recursion ceiling for [`build_tree`]. Real forests are nowhere near this
/// deep; only cyclic legacy data ever reaches it.
pub const MAX_TREE_DEPTH: usize = 32;

/// What a node renders around itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TreeMode {
    /// Ancestors, the self/spouse/sibling rail, and descendants.
    #[default]
    Full,
    /// Only the ancestor branch — used when recursing upward into a parent so
    /// its spouse and descendants don't duplicate subtrees already rendered.
    AncestorsOnly,
    /// Restriction flag suppressing the ancestor branch and sibling rail.
    DescendantsOnly,
}

/// Flat card data for one member, ready for a renderer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MemberCard {
    /// Member identifier.
    pub id: MemberId,
    /// Display name.
    pub name: String,
    /// Photo resource reference.
    pub image_url: String,
    /// Resolved display label ("Me", "Father", a custom override, …).
    pub label: String,
}

/// One rendered node: the member's card plus everything resolved around it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TreeNode {
    /// The member itself.
    pub card: MemberCard,
    /// Partner card, when resolved and requested.
    pub spouse: Option<MemberCard>,
    /// Father subtree (ancestors only).
    pub father: Option<Box<TreeNode>>,
    /// Display-mother subtree (ancestors only).
    pub mother: Option<Box<TreeNode>>,
    /// Sibling cards sharing the rail with this node. Never recursed.
    pub siblings: Vec<MemberCard>,
    /// Descendant subtrees, fully recursed.
    pub children: Vec<TreeNode>,
}

/// Outcome of parent resolution for one member.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolvedParents<'a> {
    /// Resolved father, if any.
    pub father: Option<&'a Member>,
    /// Explicit mother, if any.
    pub mother: Option<&'a Member>,
    /// Mother inferred through a wife pointing at the resolved father.
    pub inferred_mother: Option<&'a Member>,
}

/// Resolve the partner of `current`.
///
/// A member with relation wife/husband whose `linked_to` is `current` wins;
/// otherwise, when `current` itself is a wife/husband, the member it links
/// to.
pub fn resolve_spouse<'a>(index: &MemberIndex<'a>, current: &Member) -> Option<&'a Member> {
    if let Some(partner) = index
        .linked_to(current.id)
        .find(|m| m.relation.is_spouse())
    {
        return Some(partner);
    }
    if current.relation.is_spouse() {
        return current.linked_to.and_then(|id| index.get(id));
    }
    None
}

/// Resolve father and mother for `current`.
///
/// When either parent array is populated the first entries win and no
/// scanning happens. The legacy fallback scans for father/mother records
/// linked to `current` (or, for the root, unlinked records), then attempts
/// the wife-chain inference when no direct father was found.
pub fn resolve_parents<'a>(index: &MemberIndex<'a>, current: &Member) -> ResolvedParents<'a> {
    if current.relationships.has_parents() {
        return ResolvedParents {
            father: current
                .relationships
                .fathers
                .first()
                .and_then(|id| index.get(*id)),
            mother: current
                .relationships
                .mothers
                .first()
                .and_then(|id| index.get(*id)),
            inferred_mother: None,
        };
    }

    let is_root = current.relation == Relation::Root;
    let connected =
        |m: &Member| m.linked_to == Some(current.id) || (is_root && m.linked_to.is_none());

    let find_direct = |relation: Relation| {
        index
            .linked_to(current.id)
            .find(|m| m.relation == relation)
            .or_else(|| {
                if is_root {
                    index.unlinked().find(|m| m.relation == relation)
                } else {
                    None
                }
            })
    };

    let mut father = find_direct(Relation::Father);
    let mother = find_direct(Relation::Mother);

    let mut inferred_mother = None;
    if father.is_none() {
        for wife in index.wives() {
            let Some(candidate) = wife.linked_to.and_then(|id| index.get(id)) else {
                continue;
            };
            if candidate.relation == Relation::Father && connected(candidate) {
                father = Some(candidate);
                inferred_mother = Some(wife);
                break;
            }
        }
    }

    ResolvedParents {
        father,
        mother,
        inferred_mother,
    }
}

/// The mother slot actually rendered: explicit mother, else the wife-inferred
/// mother, else the resolved father's own spouse. First non-empty wins.
pub fn display_mother<'a>(
    index: &MemberIndex<'a>,
    parents: &ResolvedParents<'a>,
) -> Option<&'a Member> {
    parents
        .mother
        .or(parents.inferred_mother)
        .or_else(|| parents.father.and_then(|f| resolve_spouse(index, f)))
}

/// Resolve the children of `current` (and of its spouse).
///
/// Array tier: the deduplicated union of both partners' sons/daughters
/// arrays, ids that resolve nowhere silently dropped. Legacy tier: scan for
/// son/daughter records linked to either partner.
pub fn resolve_children<'a>(
    index: &MemberIndex<'a>,
    current: &Member,
    spouse: Option<&'a Member>,
) -> Vec<&'a Member> {
    let mut ids: Vec<MemberId> = current.relationships.child_ids().collect();
    if let Some(partner) = spouse {
        ids.extend(partner.relationships.child_ids());
    }

    if !ids.is_empty() {
        let mut seen = HashSet::new();
        return ids
            .into_iter()
            .filter(|id| seen.insert(*id))
            .filter_map(|id| index.get(id))
            .collect();
    }

    let mut seen = HashSet::new();
    let mut children: Vec<&'a Member> = index
        .linked_to(current.id)
        .filter(|m| m.relation.is_child() && seen.insert(m.id))
        .collect();
    if let Some(partner) = spouse {
        children.extend(
            index
                .linked_to(partner.id)
                .filter(|m| m.relation.is_child() && seen.insert(m.id)),
        );
    }
    children
}

/// Members sharing the rail with `current`: son/daughter records linked to
/// the resolved father or display mother, `current` excluded.
pub fn resolve_siblings<'a>(
    index: &MemberIndex<'a>,
    current: &Member,
    father: Option<&'a Member>,
    mother: Option<&'a Member>,
) -> Vec<&'a Member> {
    let mut seen = HashSet::new();
    let mut siblings = Vec::new();
    for parent in [father, mother].into_iter().flatten() {
        for m in index.linked_to(parent.id) {
            if m.relation.is_child() && m.id != current.id && seen.insert(m.id) {
                siblings.push(m);
            }
        }
    }
    siblings
}

/// Reconstruct the renderable tree rooted at `current`.
///
/// Pure function of the index — no I/O. `include_spouse` controls only
/// whether the partner card is emitted; the partner still participates in
/// child resolution either way.
pub fn build_tree(
    index: &MemberIndex<'_>,
    current: &Member,
    mode: TreeMode,
    include_spouse: bool,
) -> TreeNode {
    build_node(index, current, mode, include_spouse, 0)
}

fn build_node(
    index: &MemberIndex<'_>,
    current: &Member,
    mode: TreeMode,
    include_spouse: bool,
    depth: usize,
) -> TreeNode {
    let recurse = depth < MAX_TREE_DEPTH;
    let spouse = resolve_spouse(index, current);

    let (father, mother) = if matches!(mode, TreeMode::Full | TreeMode::AncestorsOnly) {
        let parents = resolve_parents(index, current);
        (parents.father, display_mother(index, &parents))
    } else {
        (None, None)
    };

    let siblings = if mode == TreeMode::Full {
        resolve_siblings(index, current, father, mother)
            .into_iter()
            .map(sibling_card)
            .collect()
    } else {
        Vec::new()
    };

    let children = if matches!(mode, TreeMode::Full | TreeMode::DescendantsOnly) && recurse {
        resolve_children(index, current, spouse)
            .into_iter()
            .map(|child| build_node(index, child, TreeMode::Full, true, depth + 1))
            .collect()
    } else {
        Vec::new()
    };

    let ancestor = |parent: &Member| {
        Box::new(build_node(
            index,
            parent,
            TreeMode::AncestorsOnly,
            false,
            depth + 1,
        ))
    };

    TreeNode {
        card: card(current),
        spouse: include_spouse.then(|| spouse.map(card)).flatten(),
        father: recurse.then(|| father.map(ancestor)).flatten(),
        mother: recurse.then(|| mother.map(ancestor)).flatten(),
        siblings,
        children,
    }
}

fn card(member: &Member) -> MemberCard {
    MemberCard {
        id: member.id,
        name: member.name.clone(),
        image_url: member.image_url.clone(),
        label: member.label(),
    }
}

fn sibling_card(member: &Member) -> MemberCard {
    MemberCard {
        id: member.id,
        name: member.name.clone(),
        image_url: member.image_url.clone(),
        label: member.sibling_label(),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::{OwnerId, RelationshipField, RelationshipSet};

    fn member(id: u64, relation: Relation, linked_to: Option<u64>) -> Member {
        Member {
            id: MemberId(id),
            owner: OwnerId::new("u1"),
            name: format!("m{id}"),
            image_url: "img".into(),
            relation,
            display_relation: None,
            linked_to: linked_to.map(MemberId),
            relationships: RelationshipSet::default(),
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    // ── spouse resolution ────────────────────────────────────────────────

    #[test]
    fn spouse_is_wife_linked_to_current() {
        let members = vec![
            member(1, Relation::Root, None),
            member(2, Relation::Wife, Some(1)),
        ];
        let index = MemberIndex::build(&members);
        let spouse = resolve_spouse(&index, &members[0]).unwrap();
        assert_eq!(spouse.id, MemberId(2));
    }

    #[test]
    fn spouse_is_husband_linked_to_current() {
        let members = vec![
            member(1, Relation::Root, None),
            member(2, Relation::Husband, Some(1)),
        ];
        let index = MemberIndex::build(&members);
        let spouse = resolve_spouse(&index, &members[0]).unwrap();
        assert_eq!(spouse.id, MemberId(2));
    }

    #[test]
    fn spouse_of_a_wife_is_the_member_she_links_to() {
        let members = vec![
            member(1, Relation::Root, None),
            member(2, Relation::Wife, Some(1)),
        ];
        let index = MemberIndex::build(&members);
        let spouse = resolve_spouse(&index, &members[1]).unwrap();
        assert_eq!(spouse.id, MemberId(1));
    }

    // ── parent resolution ────────────────────────────────────────────────

    #[test]
    fn parents_prefer_relationship_arrays() {
        let mut root = member(1, Relation::Root, None);
        root.relationships
            .insert(RelationshipField::Fathers, MemberId(2));
        let members = vec![
            root,
            member(2, Relation::Father, Some(1)),
            // A stray legacy mother record that the array tier must ignore.
            member(3, Relation::Mother, Some(1)),
        ];
        let index = MemberIndex::build(&members);
        let parents = resolve_parents(&index, &members[0]);
        assert_eq!(parents.father.unwrap().id, MemberId(2));
        assert!(parents.mother.is_none());
    }

    #[test]
    fn legacy_father_resolves_by_linked_to() {
        let members = vec![
            member(1, Relation::Root, None),
            member(2, Relation::Father, Some(1)),
            member(3, Relation::Mother, Some(1)),
        ];
        let index = MemberIndex::build(&members);
        let parents = resolve_parents(&index, &members[0]);
        assert_eq!(parents.father.unwrap().id, MemberId(2));
        assert_eq!(parents.mother.unwrap().id, MemberId(3));
    }

    #[test]
    fn legacy_root_accepts_unlinked_parents() {
        let members = vec![
            member(1, Relation::Root, None),
            member(2, Relation::Father, None),
        ];
        let index = MemberIndex::build(&members);
        let parents = resolve_parents(&index, &members[0]);
        assert_eq!(parents.father.unwrap().id, MemberId(2));
    }

    #[test]
    fn unlinked_parent_does_not_attach_to_non_root() {
        let members = vec![
            member(4, Relation::Son, Some(1)),
            member(2, Relation::Father, None),
        ];
        let index = MemberIndex::build(&members);
        let parents = resolve_parents(&index, &members[0]);
        assert!(parents.father.is_none());
    }

    #[test]
    fn display_mother_falls_back_to_fathers_wife() {
        // §8 scenario: [1 self, 2 father→1, 3 wife→2].
        let members = vec![
            member(1, Relation::Root, None),
            member(2, Relation::Father, Some(1)),
            member(3, Relation::Wife, Some(2)),
        ];
        let index = MemberIndex::build(&members);
        let parents = resolve_parents(&index, &members[0]);
        assert_eq!(parents.father.unwrap().id, MemberId(2));
        let mother = display_mother(&index, &parents).unwrap();
        assert_eq!(mother.id, MemberId(3));
    }

    // ── child resolution ─────────────────────────────────────────────────

    #[test]
    fn children_union_both_partners_arrays_without_duplicates() {
        let mut root = member(1, Relation::Root, None);
        root.relationships
            .insert(RelationshipField::Sons, MemberId(3));
        let mut wife = member(2, Relation::Wife, Some(1));
        wife.relationships
            .insert(RelationshipField::Sons, MemberId(3));
        wife.relationships
            .insert(RelationshipField::Daughters, MemberId(4));
        let members = vec![
            root,
            wife,
            member(3, Relation::Son, Some(1)),
            member(4, Relation::Daughter, Some(2)),
        ];
        let index = MemberIndex::build(&members);
        let spouse = resolve_spouse(&index, &members[0]);
        let children = resolve_children(&index, &members[0], spouse);
        let ids: Vec<_> = children.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn legacy_children_scan_covers_both_partners() {
        let members = vec![
            member(1, Relation::Root, None),
            member(2, Relation::Wife, Some(1)),
            member(3, Relation::Son, Some(1)),
            member(4, Relation::Daughter, Some(2)),
        ];
        let index = MemberIndex::build(&members);
        let spouse = resolve_spouse(&index, &members[0]);
        let children = resolve_children(&index, &members[0], spouse);
        let ids: Vec<_> = children.iter().map(|m| m.id.0).collect();
        assert_eq!(ids, vec![3, 4]);
    }

    #[test]
    fn array_ids_resolving_nowhere_are_dropped() {
        let mut root = member(1, Relation::Root, None);
        root.relationships
            .insert(RelationshipField::Sons, MemberId(99));
        let members = vec![root];
        let index = MemberIndex::build(&members);
        let children = resolve_children(&index, &members[0], None);
        assert!(children.is_empty());
    }

    // ── fallback equivalence ─────────────────────────────────────────────

    #[test]
    fn legacy_and_array_datasets_resolve_identically() {
        // Same family twice: father 2 and wife 5 over root 1, children 3, 4.
        let legacy = vec![
            member(1, Relation::Root, None),
            member(2, Relation::Father, Some(1)),
            member(5, Relation::Wife, Some(1)),
            member(3, Relation::Son, Some(1)),
            member(4, Relation::Daughter, Some(1)),
        ];

        let mut arrayed = legacy.clone();
        arrayed[0]
            .relationships
            .insert(RelationshipField::Fathers, MemberId(2));
        arrayed[0]
            .relationships
            .insert(RelationshipField::Sons, MemberId(3));
        arrayed[0]
            .relationships
            .insert(RelationshipField::Daughters, MemberId(4));
        arrayed[1]
            .relationships
            .insert(RelationshipField::Sons, MemberId(1));
        arrayed[4]
            .relationships
            .insert(RelationshipField::Mothers, MemberId(5));

        for members in [&legacy, &arrayed] {
            let index = MemberIndex::build(members);
            let root = &members[0];
            let spouse = resolve_spouse(&index, root).unwrap();
            assert_eq!(spouse.id, MemberId(5));
            let parents = resolve_parents(&index, root);
            assert_eq!(parents.father.unwrap().id, MemberId(2));
            let children = resolve_children(&index, root, Some(spouse));
            let mut ids: Vec<_> = children.iter().map(|m| m.id.0).collect();
            ids.sort_unstable();
            assert_eq!(ids, vec![3, 4]);
        }
    }

    // ── full tree assembly ───────────────────────────────────────────────

    fn family() -> Vec<Member> {
        vec![
            member(1, Relation::Root, None),
            member(2, Relation::Father, Some(1)),
            member(3, Relation::Wife, Some(2)),
            member(4, Relation::Wife, Some(1)),
            member(5, Relation::Son, Some(1)),
            member(6, Relation::Daughter, Some(2)),
        ]
    }

    #[test]
    fn full_mode_assembles_every_row() {
        let members = family();
        let index = MemberIndex::build(&members);
        let tree = build_tree(&index, &members[0], TreeMode::Full, true);

        assert_eq!(tree.card.label, "Me");
        assert_eq!(tree.spouse.as_ref().unwrap().id, MemberId(4));
        assert_eq!(tree.father.as_ref().unwrap().card.id, MemberId(2));
        assert_eq!(tree.mother.as_ref().unwrap().card.id, MemberId(3));
        // Daughter 6 links to father 2, so she shares the rail as a sister.
        let sibling_labels: Vec<_> = tree.siblings.iter().map(|s| s.label.as_str()).collect();
        assert_eq!(sibling_labels, vec!["Sister"]);
        let child_ids: Vec<_> = tree.children.iter().map(|c| c.card.id.0).collect();
        assert_eq!(child_ids, vec![5]);
    }

    #[test]
    fn ancestors_only_suppresses_spouse_rail_and_descendants() {
        let members = family();
        let index = MemberIndex::build(&members);
        let tree = build_tree(&index, &members[0], TreeMode::AncestorsOnly, false);

        assert!(tree.spouse.is_none());
        assert!(tree.siblings.is_empty());
        assert!(tree.children.is_empty());
        assert!(tree.father.is_some());
    }

    #[test]
    fn descendants_only_suppresses_the_ancestor_branch() {
        let members = family();
        let index = MemberIndex::build(&members);
        let tree = build_tree(&index, &members[0], TreeMode::DescendantsOnly, true);

        assert!(tree.father.is_none());
        assert!(tree.mother.is_none());
        assert!(tree.siblings.is_empty());
        assert!(tree.spouse.is_some());
        assert_eq!(tree.children.len(), 1);
    }

    #[test]
    fn parent_subtrees_are_ancestors_only() {
        let members = family();
        let index = MemberIndex::build(&members);
        let tree = build_tree(&index, &members[0], TreeMode::Full, true);
        let father = tree.father.unwrap();
        // Father's wife (3) must not render as his spouse card, and his
        // children must not re-expand below him.
        assert!(father.spouse.is_none());
        assert!(father.children.is_empty());
        assert!(father.siblings.is_empty());
    }

    #[test]
    fn grandchildren_recurse_under_children() {
        let members = vec![
            member(1, Relation::Root, None),
            member(2, Relation::Son, Some(1)),
            member(3, Relation::Son, Some(2)),
        ];
        let index = MemberIndex::build(&members);
        let tree = build_tree(&index, &members[0], TreeMode::Full, true);
        let son = &tree.children[0];
        assert_eq!(son.card.id, MemberId(2));
        assert_eq!(son.children[0].card.id, MemberId(3));
    }

    #[test]
    fn cyclic_linked_to_chain_terminates_at_depth_cap() {
        // Malformed import: two fathers pointing at each other.
        let members = vec![
            member(1, Relation::Father, Some(2)),
            member(2, Relation::Father, Some(1)),
        ];
        let index = MemberIndex::build(&members);
        let tree = build_tree(&index, &members[0], TreeMode::Full, true);

        let mut depth = 0usize;
        let mut node = &tree;
        while let Some(next) = node.father.as_deref() {
            node = next;
            depth += 1;
        }
        assert!(depth <= MAX_TREE_DEPTH);
    }

    #[test]
    fn tree_json_is_camel_case() {
        let members = vec![member(1, Relation::Root, None)];
        let index = MemberIndex::build(&members);
        let tree = build_tree(&index, &members[0], TreeMode::Full, true);
        let value = serde_json::to_value(&tree).unwrap();
        assert_eq!(value["card"]["imageUrl"], "img");
        assert_eq!(value["card"]["label"], "Me");
    }
}
