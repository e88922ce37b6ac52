// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Canonical family-graph model shared across Arbor tools.
//! Pure data (members, relations, relationship arrays) plus the tree
//! reconstruction that turns a flat member set into a renderable tree.
//!
//! # Relationship Arrays
//!
//! Every member carries six id lists (`fathers`, `mothers`, `wives`,
//! `husbands`, `sons`, `daughters`). Once populated they are the canonical
//! bidirectional adjacency lists; insertion order is irrelevant and
//! duplicates are forbidden (all writes go through [`RelationshipSet::insert`],
//! an idempotent set-insert). Members created before the arrays existed carry
//! empty lists — [`tree`] resolution falls back to `relation`/`linked_to`
//! scanning for those.

mod index;
pub mod tree;

pub use index::MemberIndex;

use serde::{Deserialize, Serialize};

/// Identifier of a member node, allocated by the store.
///
/// Thin newtype over `u64` following the `NodeId`/`TypeId` pattern. Renders
/// as a plain decimal in logs and wire payloads.
#[repr(transparent)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub u64);

impl std::fmt::Display for MemberId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for MemberId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u64>().map(Self)
    }
}

/// Identifier of the user owning a forest, produced by the identity
/// collaborator. Every query is scoped by it.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wrap an identity string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// View the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The fixed relation vocabulary. `Root` is the distinguished `self` member
/// (the account owner); everything else describes what the member *is* to the
/// tree it was attached to.
///
/// The enum is closed on purpose: an unrecognized relation string fails
/// deserialization at the boundary instead of silently skipping relationship
/// maintenance deeper in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Relation {
    /// The account owner's own node — at most one per forest.
    #[serde(rename = "self")]
    Root,
    /// Father of the linked member.
    Father,
    /// Mother of the linked member.
    Mother,
    /// Wife of the linked member.
    Wife,
    /// Husband of the linked member.
    Husband,
    /// Son of the linked member.
    Son,
    /// Daughter of the linked member.
    Daughter,
}

impl Relation {
    /// Wire spelling of the relation.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "self",
            Self::Father => "father",
            Self::Mother => "mother",
            Self::Wife => "wife",
            Self::Husband => "husband",
            Self::Son => "son",
            Self::Daughter => "daughter",
        }
    }

    /// Default card label: "Me" for the root, the capitalized relation
    /// otherwise.
    pub fn label(self) -> &'static str {
        match self {
            Self::Root => "Me",
            Self::Father => "Father",
            Self::Mother => "Mother",
            Self::Wife => "Wife",
            Self::Husband => "Husband",
            Self::Son => "Son",
            Self::Daughter => "Daughter",
        }
    }

    /// Label used when the member renders on the sibling rail instead of the
    /// descendant rows ("Brother"/"Sister"). `None` for non-child relations.
    pub fn sibling_label(self) -> Option<&'static str> {
        match self {
            Self::Son => Some("Brother"),
            Self::Daughter => Some("Sister"),
            _ => None,
        }
    }

    /// Returns `true` for the descendant relations (son/daughter).
    pub fn is_child(self) -> bool {
        matches!(self, Self::Son | Self::Daughter)
    }

    /// Returns `true` for the partner relations (wife/husband).
    pub fn is_spouse(self) -> bool {
        matches!(self, Self::Wife | Self::Husband)
    }

    /// Relationship-array pair maintained when a member with this relation is
    /// attached: `(field appended on the linked member, reciprocal field
    /// appended on the new member)`.
    ///
    /// `Root` and `Husband` have no mapping — attachment skips array
    /// maintenance for them (the member still persists). The arms are
    /// exhaustive so a vocabulary change cannot silently fall through.
    pub fn link_fields(self) -> Option<(RelationshipField, RelationshipField)> {
        match self {
            Self::Father => Some((RelationshipField::Fathers, RelationshipField::Sons)),
            Self::Mother => Some((RelationshipField::Mothers, RelationshipField::Daughters)),
            Self::Wife => Some((RelationshipField::Wives, RelationshipField::Husbands)),
            Self::Son => Some((RelationshipField::Sons, RelationshipField::Fathers)),
            Self::Daughter => Some((RelationshipField::Daughters, RelationshipField::Mothers)),
            Self::Root | Self::Husband => None,
        }
    }
}

/// Names of the six relationship arrays on a member (and on the mirrored
/// user record).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RelationshipField {
    /// The `fathers` array.
    Fathers,
    /// The `mothers` array.
    Mothers,
    /// The `wives` array.
    Wives,
    /// The `husbands` array.
    Husbands,
    /// The `sons` array.
    Sons,
    /// The `daughters` array.
    Daughters,
}

impl RelationshipField {
    /// Wire spelling of the array name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fathers => "fathers",
            Self::Mothers => "mothers",
            Self::Wives => "wives",
            Self::Husbands => "husbands",
            Self::Sons => "sons",
            Self::Daughters => "daughters",
        }
    }
}

/// The six bidirectional adjacency lists of a member.
///
/// All fields default to empty so records persisted before the arrays existed
/// deserialize cleanly.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelationshipSet {
    /// Ids of members recorded as fathers.
    #[serde(default)]
    pub fathers: Vec<MemberId>,
    /// Ids of members recorded as mothers.
    #[serde(default)]
    pub mothers: Vec<MemberId>,
    /// Ids of members recorded as wives.
    #[serde(default)]
    pub wives: Vec<MemberId>,
    /// Ids of members recorded as husbands.
    #[serde(default)]
    pub husbands: Vec<MemberId>,
    /// Ids of members recorded as sons.
    #[serde(default)]
    pub sons: Vec<MemberId>,
    /// Ids of members recorded as daughters.
    #[serde(default)]
    pub daughters: Vec<MemberId>,
}

impl RelationshipSet {
    /// View one array by field name.
    pub fn get(&self, field: RelationshipField) -> &[MemberId] {
        match field {
            RelationshipField::Fathers => &self.fathers,
            RelationshipField::Mothers => &self.mothers,
            RelationshipField::Wives => &self.wives,
            RelationshipField::Husbands => &self.husbands,
            RelationshipField::Sons => &self.sons,
            RelationshipField::Daughters => &self.daughters,
        }
    }

    fn get_mut(&mut self, field: RelationshipField) -> &mut Vec<MemberId> {
        match field {
            RelationshipField::Fathers => &mut self.fathers,
            RelationshipField::Mothers => &mut self.mothers,
            RelationshipField::Wives => &mut self.wives,
            RelationshipField::Husbands => &mut self.husbands,
            RelationshipField::Sons => &mut self.sons,
            RelationshipField::Daughters => &mut self.daughters,
        }
    }

    /// Idempotent set-insert. Returns `true` if `id` was actually added,
    /// `false` if it was already present.
    pub fn insert(&mut self, field: RelationshipField, id: MemberId) -> bool {
        let list = self.get_mut(field);
        if list.contains(&id) {
            return false;
        }
        list.push(id);
        true
    }

    /// Returns `true` when all six arrays are empty (legacy record).
    pub fn is_empty(&self) -> bool {
        self.fathers.is_empty()
            && self.mothers.is_empty()
            && self.wives.is_empty()
            && self.husbands.is_empty()
            && self.sons.is_empty()
            && self.daughters.is_empty()
    }

    /// Returns `true` when either parent array is populated.
    pub fn has_parents(&self) -> bool {
        !self.fathers.is_empty() || !self.mothers.is_empty()
    }

    /// Ids of recorded children (sons then daughters, in insertion order).
    pub fn child_ids(&self) -> impl Iterator<Item = MemberId> + '_ {
        self.sons.iter().chain(self.daughters.iter()).copied()
    }
}

/// One node in a user's private family forest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    /// Unique identifier, assigned at creation.
    pub id: MemberId,
    /// Owning user; every query is scoped by this.
    pub owner: OwnerId,
    /// Display name (required, non-empty).
    pub name: String,
    /// Photo resource reference (required).
    pub image_url: String,
    /// Declared relation to the tree being built.
    pub relation: Relation,
    /// Optional free-text label shown instead of the computed relation.
    /// Presentation only — never affects graph structure.
    #[serde(default)]
    pub display_relation: Option<String>,
    /// The member this one was attached to at creation time. `None` for the
    /// root.
    #[serde(default)]
    pub linked_to: Option<MemberId>,
    /// The six bidirectional adjacency lists.
    #[serde(flatten)]
    pub relationships: RelationshipSet,
    /// Creation timestamp (milliseconds since the Unix epoch).
    pub created_at_ms: u64,
    /// Bumped on any mutation.
    pub updated_at_ms: u64,
}

impl Member {
    /// Card label: trimmed `display_relation` when set, else the relation's
    /// default label ("Me" for the root).
    pub fn label(&self) -> String {
        match trimmed(self.display_relation.as_deref()) {
            Some(custom) => custom.to_string(),
            None => self.relation.label().to_string(),
        }
    }

    /// Sibling-rail label: trimmed `display_relation` when set, else
    /// "Brother"/"Sister" for son/daughter, else the default label.
    pub fn sibling_label(&self) -> String {
        match trimmed(self.display_relation.as_deref()) {
            Some(custom) => custom.to_string(),
            None => self
                .relation
                .sibling_label()
                .unwrap_or_else(|| self.relation.label())
                .to_string(),
        }
    }
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
