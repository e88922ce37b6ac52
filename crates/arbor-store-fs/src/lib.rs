// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Filesystem-backed `MemberStore` for Arbor (uses the platform data dir).
//!
//! One JSON file per owner holds that owner's whole [`Forest`] — members, id
//! counter, and mirrored user record. Reads load the file fresh; mutations
//! load, delegate to the forest, and write the file back. The adapter itself
//! is stateless between calls, so process-level sharing/serialization is the
//! caller's concern (the gateway holds it behind a mutex).

use std::fs;
use std::path::{Path, PathBuf};

use directories::ProjectDirs;

use arbor_core::{Forest, MemberDraft, MemberStore, StoreError, UserProfile, UserRecord};
use arbor_graph::{Member, MemberId, OwnerId, RelationshipField};

/// Store forests as JSON files under a base directory.
#[derive(Debug)]
pub struct FsMemberStore {
    base: PathBuf,
}

impl FsMemberStore {
    /// Create a store rooted at `base`, creating the directory if needed.
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] when the directory cannot be created.
    pub fn open(base: impl AsRef<Path>) -> Result<Self, StoreError> {
        let base = base.as_ref().to_path_buf();
        fs::create_dir_all(&base)?;
        Ok(Self { base })
    }

    /// The platform data directory for Arbor (e.g. `~/.local/share/arbor`).
    ///
    /// # Errors
    ///
    /// [`StoreError::Other`] when no home directory can be resolved.
    pub fn default_dir() -> Result<PathBuf, StoreError> {
        let proj = ProjectDirs::from("dev", "flyingrobots", "Arbor")
            .ok_or_else(|| StoreError::Other("could not resolve data dir".into()))?;
        Ok(proj.data_dir().to_path_buf())
    }

    /// The directory forests are stored under.
    pub fn base_dir(&self) -> &Path {
        &self.base
    }

    fn path_for(&self, owner: &OwnerId) -> PathBuf {
        let filename = format!("{}.json", owner.as_str());
        self.base.join(filename)
    }

    fn load(&self, owner: &OwnerId) -> Result<Forest, StoreError> {
        let path = self.path_for(owner);
        match fs::read(path) {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(Forest::new()),
            Err(err) => Err(StoreError::Io(err)),
        }
    }

    fn save(&self, owner: &OwnerId, forest: &Forest) -> Result<(), StoreError> {
        let data = serde_json::to_vec_pretty(forest)?;
        fs::write(self.path_for(owner), data)?;
        Ok(())
    }
}

impl MemberStore for FsMemberStore {
    fn create(&mut self, owner: &OwnerId, draft: MemberDraft) -> Result<Member, StoreError> {
        let mut forest = self.load(owner)?;
        let member = forest.create_member(owner, draft)?;
        self.save(owner, &forest)?;
        Ok(member)
    }

    fn members_for(
        &self,
        owner: &OwnerId,
        filter: Option<&[MemberId]>,
    ) -> Result<Vec<Member>, StoreError> {
        Ok(self.load(owner)?.members(filter))
    }

    fn member(&self, owner: &OwnerId, id: MemberId) -> Result<Option<Member>, StoreError> {
        Ok(self.load(owner)?.member(id).cloned())
    }

    fn find_root(&self, owner: &OwnerId) -> Result<Option<Member>, StoreError> {
        Ok(self.load(owner)?.find_root().cloned())
    }

    fn add_relationship(
        &mut self,
        owner: &OwnerId,
        id: MemberId,
        field: RelationshipField,
        other: MemberId,
    ) -> Result<bool, StoreError> {
        let mut forest = self.load(owner)?;
        let inserted = forest.add_relationship(id, field, other)?;
        if inserted {
            self.save(owner, &forest)?;
        }
        Ok(inserted)
    }

    fn user(&self, owner: &OwnerId) -> Result<Option<UserRecord>, StoreError> {
        Ok(self.load(owner)?.user().cloned())
    }

    fn upsert_user(&mut self, profile: &UserProfile) -> Result<bool, StoreError> {
        let mut forest = self.load(&profile.owner)?;
        let changed = forest.upsert_user(profile);
        if changed {
            self.save(&profile.owner, &forest)?;
        }
        Ok(changed)
    }

    fn add_user_relationship(
        &mut self,
        owner: &OwnerId,
        field: RelationshipField,
        member: MemberId,
    ) -> Result<bool, StoreError> {
        let mut forest = self.load(owner)?;
        let inserted = forest.add_user_relationship(field, member)?;
        if inserted {
            self.save(owner, &forest)?;
        }
        Ok(inserted)
    }
}
