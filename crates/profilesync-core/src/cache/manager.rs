use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::debug;

use crate::api::{ApiClient, ApiError};
use crate::models::Profile;

/// Consider a fetched profile stale after 5 minutes.
const CACHE_STALE_MINUTES: i64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedData<T> {
    pub data: T,
    pub cached_at: DateTime<Utc>,
    /// Set when the next read must go back to the server
    #[serde(default)]
    pub invalidated: bool,
}

impl<T> CachedData<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
            invalidated: false,
        }
    }

    pub fn age_minutes(&self) -> i64 {
        let now = Utc::now();
        (now - self.cached_at).num_minutes()
    }

    pub fn age_display(&self) -> String {
        let minutes = self.age_minutes();
        if minutes < 1 {
            // Covers clock skew too
            "just now".to_string()
        } else if minutes < 60 {
            format!("{}m ago", minutes)
        } else if minutes < 1440 {
            format!("{}h ago", minutes / 60)
        } else {
            format!("{}d ago", minutes / 1440)
        }
    }

    pub fn is_stale(&self) -> bool {
        self.invalidated || self.age_minutes() >= CACHE_STALE_MINUTES
    }
}

/// The locally cached profile view.
///
/// This is what screens read. The optimistic updater writes speculative and
/// rolled-back values straight into it; `get_or_fetch` goes back to the
/// server once the entry is stale or invalidated. Changes are published on
/// a watch channel.
pub struct ProfileCache {
    entry: watch::Sender<Option<CachedData<Profile>>>,
}

impl ProfileCache {
    pub fn new() -> Self {
        let (entry, _) = watch::channel(None);
        Self { entry }
    }

    /// Current cached profile, fresh or not
    pub fn peek(&self) -> Option<Profile> {
        self.entry.borrow().as_ref().map(|e| e.data.clone())
    }

    pub fn entry(&self) -> Option<CachedData<Profile>> {
        self.entry.borrow().clone()
    }

    pub fn is_stale(&self) -> bool {
        self.entry.borrow().as_ref().map_or(true, CachedData::is_stale)
    }

    /// Replace the cached profile with a fresh value
    pub fn set(&self, profile: Profile) {
        self.entry.send_replace(Some(CachedData::new(profile)));
    }

    /// Overwrite the visible profile without touching its freshness
    pub fn replace_data(&self, profile: Profile) {
        self.entry.send_modify(|entry| match entry {
            Some(cached) => cached.data = profile,
            None => *entry = Some(CachedData::new(profile)),
        });
    }

    /// Mark the entry so the next `get_or_fetch` re-fetches
    pub fn invalidate(&self) {
        self.entry.send_if_modified(|entry| match entry {
            Some(cached) if !cached.invalidated => {
                cached.invalidated = true;
                true
            }
            _ => false,
        });
    }

    pub fn clear(&self) {
        self.entry.send_replace(None);
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<CachedData<Profile>>> {
        self.entry.subscribe()
    }

    /// Cached profile if fresh, otherwise `GET /users/me`
    pub async fn get_or_fetch(&self, api: &ApiClient) -> Result<Profile, ApiError> {
        let fresh = self.entry.borrow().as_ref().filter(|e| !e.is_stale()).cloned();
        if let Some(cached) = fresh {
            debug!(age = %cached.age_display(), "Serving cached profile");
            return Ok(cached.data);
        }

        debug!("Profile cache stale, fetching");
        let profile = api.fetch_profile().await?;
        self.set(profile.clone());
        Ok(profile)
    }
}

impl Default for ProfileCache {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Tests
// ============================================================================
