use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::models::{NewProfile, UserProfile};
use crate::search::vector::{self, VectorHit};

/// A stale user as seen by the index builder at fetch time.
#[derive(Debug, Clone)]
pub struct RebuildCandidate {
    pub profile: UserProfile,
    /// Revision observed when the candidate was fetched
    pub revision: u64,
}

/// User-record datastore. Records live in memory and every committed write
/// is snapshotted to a JSON file (temp file + rename).
///
/// This is the single place staleness flags are set (`mark_profile_dirty`,
/// `mutate_profile`) and cleared (`write_embedding`, `write_search_text`).
pub struct ProfileStore {
    profiles: RwLock<Vec<UserProfile>>,
    persist_path: Option<PathBuf>,
    embedding_dim: usize,
}

impl ProfileStore {
    pub fn open(path: &Path, embedding_dim: usize) -> anyhow::Result<Self> {
        let profiles = if path.exists() {
            let data = std::fs::read_to_string(path)?;
            serde_json::from_str(&data)?
        } else {
            Vec::new()
        };

        Ok(Self {
            profiles: RwLock::new(profiles),
            persist_path: Some(path.to_path_buf()),
            embedding_dim,
        })
    }

    pub fn in_memory(embedding_dim: usize) -> Self {
        Self {
            profiles: RwLock::new(Vec::new()),
            persist_path: None,
            embedding_dim,
        }
    }

    fn persist(&self, profiles: &[UserProfile]) -> Result<(), PersistenceError> {
        let Some(path) = &self.persist_path else {
            return Ok(());
        };
        let data = serde_json::to_string(profiles)?;
        let tmp_path = path.with_extension("json.tmp");
        std::fs::write(&tmp_path, &data)?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }

    /// Swap in `next` at `idx` and snapshot; on snapshot failure the previous
    /// record is restored so memory never runs ahead of disk.
    fn commit(
        &self,
        profiles: &mut [UserProfile],
        idx: usize,
        next: UserProfile,
    ) -> Result<(), PersistenceError> {
        let prev = std::mem::replace(&mut profiles[idx], next);
        if let Err(e) = self.persist(profiles) {
            profiles[idx] = prev;
            return Err(e);
        }
        Ok(())
    }

    /// Create a fresh record: both flags clear, no derived artifacts.
    pub fn create(&self, new: NewProfile) -> Result<UserProfile, PersistenceError> {
        let mut profiles = self.profiles.write();
        if profiles.iter().any(|p| p.username == new.username) {
            return Err(PersistenceError::UsernameTaken(new.username));
        }

        let profile = UserProfile {
            id: Uuid::new_v4(),
            name: new.name,
            username: new.username,
            title: new.title,
            about: None,
            location: new.location,
            website: None,
            custom_status: None,
            image: new.image,
            created_at: Utc::now(),
            experience: Vec::new(),
            education: Vec::new(),
            projects: Vec::new(),
            contacts: Vec::new(),
            search: Default::default(),
        };

        profiles.push(profile.clone());
        if let Err(e) = self.persist(&profiles) {
            profiles.pop();
            return Err(e);
        }
        Ok(profile)
    }

    pub fn get(&self, id: &Uuid) -> Option<UserProfile> {
        self.profiles.read().iter().find(|p| &p.id == id).cloned()
    }

    /// Look up several users at once, preserving the order of `ids` and
    /// skipping unknown ones.
    pub fn get_many(&self, ids: &[Uuid]) -> Vec<UserProfile> {
        let profiles = self.profiles.read();
        ids.iter()
            .filter_map(|id| profiles.iter().find(|p| &p.id == id).cloned())
            .collect()
    }

    /// Force both staleness flags on.
    pub fn mark_profile_dirty(&self, id: &Uuid) -> Result<(), PersistenceError> {
        self.mutate_profile(id, |_| Ok(()))
    }

    /// Apply a profile mutation and mark the record dirty in the same write.
    /// If `f` fails nothing is changed.
    pub fn mutate_profile<F, R>(&self, id: &Uuid, f: F) -> Result<R, PersistenceError>
    where
        F: FnOnce(&mut UserProfile) -> Result<R, PersistenceError>,
    {
        let mut profiles = self.profiles.write();
        let idx = profiles
            .iter()
            .position(|p| &p.id == id)
            .ok_or(PersistenceError::UserNotFound(*id))?;

        let mut next = profiles[idx].clone();
        let out = f(&mut next)?;

        if next.username != profiles[idx].username
            && profiles.iter().any(|p| p.id != next.id && p.username == next.username)
        {
            return Err(PersistenceError::UsernameTaken(next.username));
        }

        next.search.embeddings_stale = true;
        next.search.search_vector_stale = true;
        next.search.revision += 1;

        self.commit(&mut profiles, idx, next)?;
        Ok(out)
    }

    /// Users named in `requested` plus every user with either flag set,
    /// most recently created first, at most `limit`.
    pub fn fetch_candidates(&self, requested: &HashSet<Uuid>, limit: usize) -> Vec<RebuildCandidate> {
        let profiles = self.profiles.read();
        // Reverse insertion order first so equal timestamps still list newest first
        let mut candidates: Vec<&UserProfile> = profiles
            .iter()
            .rev()
            .filter(|p| {
                requested.contains(&p.id) || p.search.embeddings_stale || p.search.search_vector_stale
            })
            .collect();

        candidates.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        candidates.truncate(limit);

        candidates
            .into_iter()
            .map(|p| RebuildCandidate {
                profile: p.clone(),
                revision: p.search.revision,
            })
            .collect()
    }

    /// Revision of a user's record, bumped by every mutation.
    pub fn current_revision(&self, id: &Uuid) -> Option<u64> {
        self.profiles
            .read()
            .iter()
            .find(|p| &p.id == id)
            .map(|p| p.search.revision)
    }

    /// Store a rebuilt embedding and clear its flag, but only if no mutation
    /// happened since `observed_revision`. A superseded artifact is dropped
    /// and `Ok(false)` returned; the flag stays set for the newer rebuild.
    pub fn write_embedding(
        &self,
        id: &Uuid,
        embedding: Option<Vec<f32>>,
        observed_revision: u64,
    ) -> Result<bool, PersistenceError> {
        if let Some(v) = &embedding {
            if v.len() != self.embedding_dim {
                return Err(PersistenceError::Dimension {
                    expected: self.embedding_dim,
                    got: v.len(),
                });
            }
        }

        let mut profiles = self.profiles.write();
        let idx = profiles
            .iter()
            .position(|p| &p.id == id)
            .ok_or(PersistenceError::UserNotFound(*id))?;
        if profiles[idx].search.revision != observed_revision {
            return Ok(false);
        }

        let mut next = profiles[idx].clone();
        next.search.embedding = embedding;
        next.search.embedding_updated_at = Some(Utc::now());
        next.search.embeddings_stale = false;

        self.commit(&mut profiles, idx, next)?;
        Ok(true)
    }

    /// Record the text the search vector was rebuilt from and clear the flag
    /// under the same revision rule as `write_embedding`.
    pub fn write_search_text(
        &self,
        id: &Uuid,
        searchable_text: String,
        observed_revision: u64,
    ) -> Result<bool, PersistenceError> {
        let mut profiles = self.profiles.write();
        let idx = profiles
            .iter()
            .position(|p| &p.id == id)
            .ok_or(PersistenceError::UserNotFound(*id))?;
        if profiles[idx].search.revision != observed_revision {
            return Ok(false);
        }

        let mut next = profiles[idx].clone();
        next.search.searchable_text = Some(searchable_text);
        next.search.search_vector_updated_at = Some(Utc::now());
        next.search.search_vector_stale = false;

        self.commit(&mut profiles, idx, next)?;
        Ok(true)
    }

    /// Users with an embedding, nearest first by cosine distance.
    pub fn nearest_by_embedding(&self, query: &[f32], limit: usize) -> Vec<VectorHit> {
        let profiles = self.profiles.read();
        vector::nearest(
            query,
            profiles
                .iter()
                .filter_map(|p| p.search.embedding.as_deref().map(|e| (p.id, e))),
            limit,
        )
    }

    /// (profiles, embeddings stale, search vectors stale, embedded)
    pub fn staleness_counts(&self) -> (usize, usize, usize, usize) {
        let profiles = self.profiles.read();
        let embeddings_stale = profiles.iter().filter(|p| p.search.embeddings_stale).count();
        let vectors_stale = profiles.iter().filter(|p| p.search.search_vector_stale).count();
        let embedded = profiles.iter().filter(|p| p.search.embedding.is_some()).count();
        (profiles.len(), embeddings_stale, vectors_stale, embedded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Project;

    fn new_profile(name: &str, username: &str) -> NewProfile {
        NewProfile {
            name: name.to_string(),
            username: username.to_string(),
            title: None,
            location: None,
            image: None,
        }
    }

    #[test]
    fn test_create_starts_clean() {
        let store = ProfileStore::in_memory(3);
        let p = store.create(new_profile("Alice Smith", "alice")).unwrap();
        assert!(!p.search.embeddings_stale);
        assert!(!p.search.search_vector_stale);
        assert!(p.search.embedding.is_none());
        assert!(p.search.searchable_text.is_none());
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let store = ProfileStore::in_memory(3);
        store.create(new_profile("Alice", "alice")).unwrap();
        let err = store.create(new_profile("Other Alice", "alice")).unwrap_err();
        assert!(matches!(err, PersistenceError::UsernameTaken(u) if u == "alice"));
    }

    #[test]
    fn test_mutation_sets_both_flags() {
        let store = ProfileStore::in_memory(3);
        let p = store.create(new_profile("Alice", "alice")).unwrap();

        store
            .mutate_profile(&p.id, |profile| {
                profile.title = Some("Engineer".to_string());
                Ok(())
            })
            .unwrap();

        let after = store.get(&p.id).unwrap();
        assert_eq!(after.title.as_deref(), Some("Engineer"));
        assert!(after.search.embeddings_stale);
        assert!(after.search.search_vector_stale);
        assert_eq!(after.search.revision, 1);
    }

    #[test]
    fn test_failed_mutation_changes_nothing() {
        let store = ProfileStore::in_memory(3);
        let p = store.create(new_profile("Alice", "alice")).unwrap();

        let result: Result<(), _> = store.mutate_profile(&p.id, |profile| {
            profile.projects.push(Project {
                id: Uuid::new_v4(),
                title: "Half-applied".to_string(),
                company: None,
                description: None,
                hidden: false,
            });
            Err(PersistenceError::EntryNotFound {
                kind: "project",
                id: Uuid::nil(),
            })
        });

        assert!(result.is_err());
        let after = store.get(&p.id).unwrap();
        assert!(after.projects.is_empty());
        assert!(!after.search.embeddings_stale);
    }

    #[test]
    fn test_rename_to_taken_username_rejected() {
        let store = ProfileStore::in_memory(3);
        store.create(new_profile("Alice", "alice")).unwrap();
        let bob = store.create(new_profile("Bob", "bob")).unwrap();

        let err = store
            .mutate_profile(&bob.id, |p| {
                p.username = "alice".to_string();
                Ok(())
            })
            .unwrap_err();
        assert!(matches!(err, PersistenceError::UsernameTaken(_)));
        assert_eq!(store.get(&bob.id).unwrap().username, "bob");
    }

    #[test]
    fn test_mark_unknown_user() {
        let store = ProfileStore::in_memory(3);
        let err = store.mark_profile_dirty(&Uuid::new_v4()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_candidates_union_newest_first_and_bounded() {
        let store = ProfileStore::in_memory(3);
        let old = store.create(new_profile("Old", "old")).unwrap();
        let clean = store.create(new_profile("Clean", "clean")).unwrap();
        let new = store.create(new_profile("New", "new")).unwrap();
        store.mark_profile_dirty(&old.id).unwrap();
        store.mark_profile_dirty(&new.id).unwrap();

        let requested: HashSet<Uuid> = [clean.id].into_iter().collect();
        let candidates = store.fetch_candidates(&requested, 10);
        let ids: Vec<Uuid> = candidates.iter().map(|c| c.profile.id).collect();
        assert_eq!(ids, vec![new.id, clean.id, old.id]);

        let bounded = store.fetch_candidates(&requested, 2);
        assert_eq!(bounded.len(), 2);
        assert_eq!(bounded[0].profile.id, new.id);
    }

    #[test]
    fn test_write_embedding_clears_flag_and_stamps() {
        let store = ProfileStore::in_memory(3);
        let p = store.create(new_profile("Alice", "alice")).unwrap();
        store.mark_profile_dirty(&p.id).unwrap();
        let revision = store.get(&p.id).unwrap().search.revision;

        assert!(store
            .write_embedding(&p.id, Some(vec![1.0, 0.0, 0.0]), revision)
            .unwrap());

        let after = store.get(&p.id).unwrap();
        assert!(!after.search.embeddings_stale);
        assert!(after.search.search_vector_stale);
        assert!(after.search.embedding_updated_at.is_some());
        assert_eq!(after.search.embedding, Some(vec![1.0, 0.0, 0.0]));
    }

    #[test]
    fn test_write_after_concurrent_edit_is_dropped() {
        let store = ProfileStore::in_memory(3);
        let p = store.create(new_profile("Alice", "alice")).unwrap();
        store.mark_profile_dirty(&p.id).unwrap();
        let observed = store.get(&p.id).unwrap().search.revision;

        // Edit lands while the rebuild is in flight
        store.mark_profile_dirty(&p.id).unwrap();
        assert_eq!(store.current_revision(&p.id), Some(observed + 1));

        let written = store
            .write_embedding(&p.id, Some(vec![1.0, 0.0, 0.0]), observed)
            .unwrap();
        assert!(!written);
        let written = store
            .write_search_text(&p.id, "Alice".to_string(), observed)
            .unwrap();
        assert!(!written);

        let after = store.get(&p.id).unwrap();
        assert!(after.search.embedding.is_none());
        assert!(after.search.searchable_text.is_none());
        assert!(after.search.embeddings_stale);
        assert!(after.search.search_vector_stale);
    }

    #[test]
    fn test_older_write_never_replaces_newer_artifact() {
        let store = ProfileStore::in_memory(3);
        let p = store.create(new_profile("Alice", "alice")).unwrap();
        store.mark_profile_dirty(&p.id).unwrap();
        let older = store.current_revision(&p.id).unwrap();
        store.mark_profile_dirty(&p.id).unwrap();
        let newer = store.current_revision(&p.id).unwrap();

        store.write_embedding(&p.id, Some(vec![0.0, 1.0, 0.0]), newer).unwrap();
        store.write_search_text(&p.id, "Alice Gardener".to_string(), newer).unwrap();
        store.write_embedding(&p.id, Some(vec![1.0, 0.0, 0.0]), older).unwrap();
        store.write_search_text(&p.id, "Alice Engineer".to_string(), older).unwrap();

        let after = store.get(&p.id).unwrap();
        assert_eq!(after.search.embedding, Some(vec![0.0, 1.0, 0.0]));
        assert_eq!(after.search.searchable_text.as_deref(), Some("Alice Gardener"));
        assert!(!after.search.embeddings_stale);
        assert!(!after.search.search_vector_stale);
    }

    #[test]
    fn test_write_embedding_wrong_dimension() {
        let store = ProfileStore::in_memory(3);
        let p = store.create(new_profile("Alice", "alice")).unwrap();
        store.mark_profile_dirty(&p.id).unwrap();

        let err = store.write_embedding(&p.id, Some(vec![1.0]), 1).unwrap_err();
        assert!(matches!(err, PersistenceError::Dimension { expected: 3, got: 1 }));
        assert!(store.get(&p.id).unwrap().search.embeddings_stale);
    }

    #[test]
    fn test_nearest_skips_users_without_embedding() {
        let store = ProfileStore::in_memory(2);
        let a = store.create(new_profile("A", "a")).unwrap();
        let b = store.create(new_profile("B", "b")).unwrap();
        store.write_embedding(&a.id, Some(vec![1.0, 0.0]), 0).unwrap();

        let hits = store.nearest_by_embedding(&[1.0, 0.0], 100);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].user_id, a.id);
        assert!(hits.iter().all(|h| h.user_id != b.id));
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");

        let id = {
            let store = ProfileStore::open(&path, 2).unwrap();
            let p = store.create(new_profile("Alice", "alice")).unwrap();
            store.mark_profile_dirty(&p.id).unwrap();
            p.id
        };

        let reopened = ProfileStore::open(&path, 2).unwrap();
        let p = reopened.get(&id).unwrap();
        assert_eq!(p.username, "alice");
        assert!(p.search.embeddings_stale);
        assert!(!path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_failed_snapshot_leaves_record_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.json");
        let store = ProfileStore::open(&path, 2).unwrap();
        let p = store.create(new_profile("Alice", "alice")).unwrap();
        store.mark_profile_dirty(&p.id).unwrap();

        // Removing the directory makes the temp-file write fail
        dir.close().unwrap();

        let err = store.write_embedding(&p.id, Some(vec![1.0, 0.0]), 1).unwrap_err();
        assert!(matches!(err, PersistenceError::Io(_)));
        let after = store.get(&p.id).unwrap();
        assert!(after.search.embeddings_stale);
        assert!(after.search.embedding.is_none());
    }
}
