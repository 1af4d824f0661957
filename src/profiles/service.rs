use std::sync::Arc;
use uuid::Uuid;

use crate::error::PersistenceError;
use crate::indexer::RebuildQueue;
use crate::models::{NewProfile, ProfileUpdate, SectionEntry, UserProfile};
use crate::profiles::ProfileStore;

/// Profile mutation use cases. Every successful write that can change the
/// searchable text marks the user dirty and schedules a rebuild event.
#[derive(Clone)]
pub struct ProfileService {
    store: Arc<ProfileStore>,
    queue: RebuildQueue,
}

impl ProfileService {
    pub fn new(store: Arc<ProfileStore>, queue: RebuildQueue) -> Self {
        Self { store, queue }
    }

    pub fn create_profile(&self, new: NewProfile) -> Result<UserProfile, PersistenceError> {
        let profile = self.store.create(new)?;
        tracing::info!(user_id = %profile.id, username = %profile.username, "profile created");
        Ok(profile)
    }

    pub fn get_profile(&self, id: &Uuid) -> Result<UserProfile, PersistenceError> {
        self.store.get(id).ok_or(PersistenceError::UserNotFound(*id))
    }

    pub fn update_profile(
        &self,
        id: &Uuid,
        update: ProfileUpdate,
    ) -> Result<UserProfile, PersistenceError> {
        let profile = self.store.mutate_profile(id, |p| {
            if let Some(name) = update.name {
                p.name = name;
            }
            if let Some(username) = update.username {
                p.username = username;
            }
            apply(&mut p.title, update.title);
            apply(&mut p.about, update.about);
            apply(&mut p.location, update.location);
            apply(&mut p.website, update.website);
            apply(&mut p.custom_status, update.custom_status);
            apply(&mut p.image, update.image);
            Ok(p.clone())
        })?;
        self.schedule_rebuild(id);
        Ok(profile)
    }

    /// Append a section entry under a freshly assigned id.
    pub fn add_entry<T: SectionEntry>(&self, user_id: &Uuid, mut entry: T) -> Result<T, PersistenceError> {
        entry.set_id(Uuid::new_v4());
        let added = self.store.mutate_profile(user_id, |p| {
            T::entries_mut(p).push(entry.clone());
            Ok(entry)
        })?;
        self.schedule_rebuild(user_id);
        Ok(added)
    }

    /// Replace an entry's content, keeping its id.
    pub fn update_entry<T: SectionEntry>(
        &self,
        user_id: &Uuid,
        entry_id: &Uuid,
        mut entry: T,
    ) -> Result<T, PersistenceError> {
        entry.set_id(*entry_id);
        let updated = self.store.mutate_profile(user_id, |p| {
            let slot = find_entry::<T>(p, entry_id)?;
            *slot = entry.clone();
            Ok(entry)
        })?;
        self.schedule_rebuild(user_id);
        Ok(updated)
    }

    pub fn set_entry_hidden<T: SectionEntry>(
        &self,
        user_id: &Uuid,
        entry_id: &Uuid,
        hidden: bool,
    ) -> Result<T, PersistenceError> {
        let updated = self.store.mutate_profile(user_id, |p| {
            let slot = find_entry::<T>(p, entry_id)?;
            slot.set_hidden(hidden);
            Ok(slot.clone())
        })?;
        self.schedule_rebuild(user_id);
        Ok(updated)
    }

    pub fn remove_entry<T: SectionEntry>(
        &self,
        user_id: &Uuid,
        entry_id: &Uuid,
    ) -> Result<(), PersistenceError> {
        self.store.mutate_profile(user_id, |p| {
            let entries = T::entries_mut(p);
            let before = entries.len();
            entries.retain(|e| &e.id() != entry_id);
            if entries.len() == before {
                return Err(entry_not_found::<T>(entry_id));
            }
            Ok(())
        })?;
        self.schedule_rebuild(user_id);
        Ok(())
    }

    /// The profile is already marked dirty, so a lost event only delays the
    /// rebuild until the next builder run picks it up as a stale candidate.
    fn schedule_rebuild(&self, user_id: &Uuid) {
        if let Err(e) = self.queue.enqueue(*user_id) {
            tracing::warn!(user_id = %user_id, error = %e, "failed to schedule search rebuild");
        }
    }
}

fn apply(field: &mut Option<String>, value: Option<String>) {
    if let Some(v) = value {
        *field = if v.trim().is_empty() { None } else { Some(v) };
    }
}

fn find_entry<'a, T: SectionEntry>(
    profile: &'a mut UserProfile,
    entry_id: &Uuid,
) -> Result<&'a mut T, PersistenceError> {
    T::entries_mut(profile)
        .iter_mut()
        .find(|e| &e.id() == entry_id)
        .ok_or_else(|| entry_not_found::<T>(entry_id))
}

fn entry_not_found<T: SectionEntry>(entry_id: &Uuid) -> PersistenceError {
    PersistenceError::EntryNotFound {
        kind: T::KIND,
        id: *entry_id,
    }
}
