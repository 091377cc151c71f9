//! Profile registry: the process-wide catalog of validated profiles.
//!
//! The registry is written during startup (and on explicit hot reload) and
//! read by every classification afterwards. Readers take a
//! [`ProfileSnapshot`]: an immutable view that a concurrent write can never
//! change underneath them.

use std::sync::{Arc, RwLock};
use tracing::{debug, info};

use switchyard_core::{Error, Profile, Result};

/// Thread-safe, registration-ordered profile catalog.
#[derive(Debug, Default)]
pub struct ProfileRegistry {
    profiles: RwLock<Arc<Vec<Arc<Profile>>>>,
}

impl ProfileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one profile.
    ///
    /// Fails with `Validation` on schema errors or when the identifier is
    /// already registered; the registry is left unchanged in that case.
    pub fn register(&self, profile: Profile) -> Result<Arc<Profile>> {
        profile.validate()?;
        let mut guard = self.profiles.write().unwrap_or_else(|e| e.into_inner());
        if guard.iter().any(|p| p.id == profile.id) {
            return Err(duplicate(&profile.id));
        }
        let profile = Arc::new(profile);
        Arc::make_mut(&mut guard).push(profile.clone());
        info!(profile = %profile.id, tags = profile.tags.len(), "Registered profile");
        Ok(profile)
    }

    /// Register a batch all-or-nothing. Returns how many were added.
    pub fn register_all(&self, profiles: impl IntoIterator<Item = Profile>) -> Result<usize> {
        let batch: Vec<Profile> = profiles.into_iter().collect();
        for (i, profile) in batch.iter().enumerate() {
            profile.validate()?;
            if batch[..i].iter().any(|p| p.id == profile.id) {
                return Err(duplicate(&profile.id));
            }
        }

        let mut guard = self.profiles.write().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = batch.iter().find(|p| guard.iter().any(|q| q.id == p.id)) {
            return Err(duplicate(&existing.id));
        }
        let count = batch.len();
        let list = Arc::make_mut(&mut guard);
        for profile in batch {
            debug!(profile = %profile.id, "Registered profile");
            list.push(Arc::new(profile));
        }
        info!(count, total = list.len(), "Registered profile batch");
        Ok(count)
    }

    /// Replace the whole catalog atomically.
    ///
    /// The new set is fully validated before the swap; snapshots taken
    /// before the call keep seeing the old catalog.
    pub fn reload(&self, profiles: impl IntoIterator<Item = Profile>) -> Result<()> {
        let staged = ProfileRegistry::new();
        staged.register_all(profiles)?;
        let fresh = staged.all().profiles;

        let mut guard = self.profiles.write().unwrap_or_else(|e| e.into_inner());
        *guard = fresh;
        info!(total = guard.len(), "Profile catalog reloaded");
        Ok(())
    }

    /// Look up a profile by identifier.
    pub fn lookup(&self, id: &str) -> Result<Arc<Profile>> {
        self.all().get(id).ok_or_else(|| Error::profile_not_found(id))
    }

    /// Snapshot of all profiles in registration order.
    pub fn all(&self) -> ProfileSnapshot {
        let guard = self.profiles.read().unwrap_or_else(|e| e.into_inner());
        ProfileSnapshot {
            profiles: Arc::clone(&guard),
        }
    }

    pub fn len(&self) -> usize {
        self.all().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn duplicate(id: &str) -> Error {
    Error::validation(id, "a profile with this identifier is already registered")
}

/// An immutable, restartable view of the registry.
#[derive(Debug, Clone, Default)]
pub struct ProfileSnapshot {
    profiles: Arc<Vec<Arc<Profile>>>,
}

impl ProfileSnapshot {
    /// Lazily iterate profiles in registration order. Can be called any
    /// number of times.
    pub fn iter(&self) -> std::slice::Iter<'_, Arc<Profile>> {
        self.profiles.iter()
    }

    pub fn get(&self, id: &str) -> Option<Arc<Profile>> {
        self.profiles.iter().find(|p| p.id == id).cloned()
    }

    /// Registration index of a profile.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.profiles.iter().position(|p| p.id == id)
    }

    pub fn ids(&self) -> Vec<&str> {
        self.profiles.iter().map(|p| p.id.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

impl<'a> IntoIterator for &'a ProfileSnapshot {
    type Item = &'a Arc<Profile>;
    type IntoIter = std::slice::Iter<'a, Arc<Profile>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl FromIterator<Profile> for ProfileSnapshot {
    /// Build a detached snapshot (no validation); handy for tests and for
    /// composing against a fixed catalog.
    fn from_iter<I: IntoIterator<Item = Profile>>(iter: I) -> Self {
        Self {
            profiles: Arc::new(iter.into_iter().map(Arc::new).collect()),
        }
    }
}
