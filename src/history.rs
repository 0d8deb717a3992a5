//! history.rs — review history and saved ratings, mirrored to a storage port.
//!
//! The in-memory lists are authoritative. Persistence failures are logged and
//! counted, never returned: the feature degrades to "not persisted" instead of failing
//! the request. Concurrent writers (other processes on the same directory) are not
//! coordinated; the last write wins.

use std::sync::{Arc, Mutex, MutexGuard};

use metrics::counter;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::Result;
use crate::metrics::STORAGE_ERRORS_TOTAL;
use crate::review::{AggregatedRating, ReviewWithResult};
use crate::storage::{MemoryStorage, StoragePort};

pub const HISTORY_KEY: &str = "reviewHistory";
pub const RATINGS_KEY: &str = "aggregatedRatings";

#[derive(Debug, Default)]
struct Lists {
    /// Newest first.
    reviews: Vec<ReviewWithResult>,
    /// Newest first.
    ratings: Vec<AggregatedRating>,
}

pub struct HistoryStore {
    storage: Arc<dyn StoragePort>,
    inner: Mutex<Lists>,
}

impl HistoryStore {
    /// Load both lists from `storage`; unreadable or corrupt documents start empty.
    pub fn open(storage: Arc<dyn StoragePort>) -> Self {
        let store = Self {
            storage,
            inner: Mutex::new(Lists::default()),
        };
        store.reload();
        store
    }

    pub fn in_memory() -> Self {
        Self::open(Arc::new(MemoryStorage::new()))
    }

    /// Replace in-memory state with what is currently persisted.
    pub fn reload(&self) {
        let reviews = load_or_empty::<ReviewWithResult>(self.storage.as_ref(), HISTORY_KEY);
        let ratings = load_or_empty::<AggregatedRating>(self.storage.as_ref(), RATINGS_KEY);
        debug!(target: "history", reviews = reviews.len(), ratings = ratings.len(), "history loaded");
        let mut g = self.lock();
        g.reviews = reviews;
        g.ratings = ratings;
    }

    fn lock(&self) -> MutexGuard<'_, Lists> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn record(&self, entry: ReviewWithResult) {
        let mut g = self.lock();
        g.reviews.insert(0, entry);
        persist(self.storage.as_ref(), HISTORY_KEY, &g.reviews);
    }

    pub fn reviews(&self) -> Vec<ReviewWithResult> {
        self.lock().reviews.clone()
    }

    /// `false` (and no write) when `id` is unknown.
    pub fn delete_review(&self, id: Uuid) -> bool {
        let mut g = self.lock();
        let before = g.reviews.len();
        g.reviews.retain(|r| r.id != id);
        let removed = g.reviews.len() != before;
        if removed {
            persist(self.storage.as_ref(), HISTORY_KEY, &g.reviews);
        }
        removed
    }

    pub fn save_rating(&self, rating: AggregatedRating) {
        let mut g = self.lock();
        g.ratings.insert(0, rating);
        persist(self.storage.as_ref(), RATINGS_KEY, &g.ratings);
    }

    pub fn ratings(&self) -> Vec<AggregatedRating> {
        self.lock().ratings.clone()
    }

    pub fn rating(&self, id: Uuid) -> Option<AggregatedRating> {
        self.lock().ratings.iter().find(|r| r.id == id).cloned()
    }

    /// `false` (and no write) when `id` is unknown.
    pub fn delete_rating(&self, id: Uuid) -> bool {
        let mut g = self.lock();
        let before = g.ratings.len();
        g.ratings.retain(|r| r.id != id);
        let removed = g.ratings.len() != before;
        if removed {
            persist(self.storage.as_ref(), RATINGS_KEY, &g.ratings);
        }
        removed
    }
}

fn load<T: DeserializeOwned>(storage: &dyn StoragePort, key: &str) -> Result<Vec<T>> {
    match storage.read(key)? {
        Some(raw) => Ok(serde_json::from_str(&raw)?),
        None => Ok(Vec::new()),
    }
}

fn load_or_empty<T: DeserializeOwned>(storage: &dyn StoragePort, key: &str) -> Vec<T> {
    load(storage, key).unwrap_or_else(|e| {
        counter!(STORAGE_ERRORS_TOTAL, "op" => "load").increment(1);
        warn!(target: "history", key, error = %e, "could not load persisted list; starting empty");
        Vec::new()
    })
}

fn persist<T: Serialize>(storage: &dyn StoragePort, key: &str, items: &[T]) {
    let res = serde_json::to_string(items)
        .map_err(Into::into)
        .and_then(|json| storage.write(key, &json));
    if let Err(e) = res {
        counter!(STORAGE_ERRORS_TOTAL, "op" => "save").increment(1);
        warn!(target: "history", key, error = %e, "could not persist list; keeping in-memory state");
    }
}
