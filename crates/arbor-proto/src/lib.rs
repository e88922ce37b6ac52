// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! HTTP wire schema for the Arbor gateway.
//! Payloads wrap the canonical `arbor-graph` types; field names follow the
//! camelCase convention of the member records themselves.

pub use arbor_core::UserRecord;
pub use arbor_graph::{
    tree::{MemberCard, TreeNode},
    Member, MemberId, OwnerId, Relation, RelationshipField, RelationshipSet,
};

use serde::{Deserialize, Serialize};

/// Body of `POST /api/member`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateMemberRequest {
    /// Display name (required).
    pub name: String,
    /// Photo resource reference (required).
    pub image_url: String,
    /// Declared relation. Unknown strings are rejected during
    /// deserialization — the vocabulary is closed.
    pub relation: Relation,
    /// Member to attach to, when present.
    #[serde(default)]
    pub linked_to: Option<MemberId>,
    /// Optional presentation label.
    #[serde(default)]
    pub display_relation: Option<String>,
}

/// Response of `POST /api/member`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CreateMemberResponse {
    /// Human-readable outcome line.
    pub message: String,
    /// The created member, arrays included.
    pub member: Member,
}

/// Response of `GET /api/member`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MembersResponse {
    /// The owner's members (or the filtered subset).
    pub members: Vec<Member>,
}

/// Response of `GET /api/member/root`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RootResponse {
    /// The root member, created on first access.
    pub root: Member,
}

/// Response of `GET /api/member/tree`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TreeResponse {
    /// The resolved tree, rooted at the owner's `self` member.
    pub tree: TreeNode,
}

/// Response of `GET /api/user`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserResponse {
    /// Profile plus the mirrored root relationship arrays.
    pub user: UserRecord,
}

/// Error payload used for every non-2xx response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    /// HTTP-equivalent numeric code.
    pub code: u16,
    /// Stable identifier (e.g. "E_VALIDATION").
    pub name: String,
    /// Human-readable message.
    pub message: String,
}

impl ErrorBody {
    /// Assemble an error body.
    pub fn new(code: u16, name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            message: message.into(),
        }
    }
}

/// Parse the comma-separated `ids` filter of `GET /api/member`.
///
/// Tokens that do not parse as member ids are silently dropped, matching the
/// listing contract (unknown and invalid filter entries are not errors).
pub fn parse_id_filter(raw: &str) -> Vec<MemberId> {
    raw.split(',')
        .filter_map(|token| token.parse::<MemberId>().ok())
        .collect()
}
