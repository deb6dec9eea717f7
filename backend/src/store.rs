//! The event store: every draw in memory behind one reader/writer lock,
//! mirrored to a JSON snapshot file after each mutation.
//!
//! Mutations hold the write lock until the snapshot is on disk, so readers
//! never observe state that has not been written out.

use std::collections::HashMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use draw_core::{
    new_token, DrawError, Event, EventId, ManageView, ParticipantView, Token, MAX_ACTIVE_EVENTS,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::RwLock;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreData {
    #[serde(default)]
    pub events: HashMap<EventId, Event>,
}

#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result of a mutation that was applied in memory. `persist_error` is set
/// when the snapshot write failed; the mutation stands regardless.
#[derive(Debug)]
pub struct Committed<T> {
    pub value: T,
    pub persist_error: Option<PersistError>,
}

impl<T> Committed<T> {
    pub fn is_durable(&self) -> bool {
        self.persist_error.is_none()
    }
}

struct Inner {
    data: StoreData,
    // Shuffle source for draws. Tokens never come from here.
    shuffle: ChaCha8Rng,
}

#[derive(Clone)]
pub struct EventStore {
    inner: Arc<RwLock<Inner>>,
    persist_path: Option<PathBuf>,
}

impl Default for EventStore {
    fn default() -> Self {
        Self::new(StoreData::default(), ChaCha8Rng::from_entropy(), None)
    }
}

impl EventStore {
    fn new(data: StoreData, shuffle: ChaCha8Rng, persist_path: Option<PathBuf>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner { data, shuffle })),
            persist_path,
        }
    }

    /// In-memory store whose draws are reproducible.
    pub fn with_shuffle_seed(seed: u64) -> Self {
        Self::new(StoreData::default(), ChaCha8Rng::seed_from_u64(seed), None)
    }

    /// Loads the snapshot at `path` (starting empty if it is missing or
    /// unreadable), sweeps expired draws, and persists there from now on.
    pub async fn with_persistence(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let data = load(&path).await;
        tracing::info!(events = data.events.len(), path = %path.display(), "loaded draws");
        let store = Self::new(data, ChaCha8Rng::from_entropy(), Some(path));
        store.sweep_expired().await;
        store
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.data.events.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Creates a draw with its organizer as first participant. Returns the
    /// event id and the organizer's token.
    pub async fn create(
        &self,
        name: &str,
        organizer_name: &str,
        organizer_wish: &str,
        expected_participants: Option<usize>,
    ) -> Result<Committed<(EventId, Token)>, DrawError> {
        let mut inner = self.inner.write().await;
        if inner.data.events.len() >= MAX_ACTIVE_EVENTS {
            tracing::warn!(active = inner.data.events.len(), "rejecting draw, store full");
            return Err(DrawError::StoreFull);
        }

        let (event, organizer_token) = Event::new(
            name,
            organizer_name,
            organizer_wish,
            expected_participants,
            OffsetDateTime::now_utc(),
        )?;
        let event_id = fresh_event_id(&inner.data);
        inner.data.events.insert(event_id.clone(), event);
        tracing::info!(event_id = %event_id, "draw created");

        let persist_error = self.save_locked(&inner.data).await;
        Ok(Committed {
            value: (event_id, organizer_token),
            persist_error,
        })
    }

    /// Shared-lock access to one event.
    pub(crate) async fn read<T>(
        &self,
        event_id: &str,
        f: impl FnOnce(&Event) -> T,
    ) -> Result<T, DrawError> {
        let inner = self.inner.read().await;
        let event = inner.data.events.get(event_id).ok_or(DrawError::NotFound)?;
        Ok(f(event))
    }

    /// Applies `f` to one event under the write lock, then persists before
    /// releasing it. Nothing is written when `f` fails.
    pub async fn mutate<T>(
        &self,
        event_id: &str,
        f: impl FnOnce(&mut Event) -> Result<T, DrawError>,
    ) -> Result<Committed<T>, DrawError> {
        self.mutate_with_shuffle(event_id, |event, _| f(event)).await
    }

    async fn mutate_with_shuffle<T>(
        &self,
        event_id: &str,
        f: impl FnOnce(&mut Event, &mut ChaCha8Rng) -> Result<T, DrawError>,
    ) -> Result<Committed<T>, DrawError> {
        let mut guard = self.inner.write().await;
        let inner = &mut *guard;
        let event = inner
            .data
            .events
            .get_mut(event_id)
            .ok_or(DrawError::NotFound)?;
        let value = f(event, &mut inner.shuffle)?;

        let persist_error = self.save_locked(&inner.data).await;
        Ok(Committed {
            value,
            persist_error,
        })
    }

    pub async fn join(
        &self,
        event_id: &str,
        name: &str,
        wish: &str,
    ) -> Result<Committed<Token>, DrawError> {
        let committed = self.mutate(event_id, |event| event.join(name, wish)).await?;
        tracing::info!(event_id = %event_id, "participant joined");
        Ok(committed)
    }

    pub async fn run_draw(&self, event_id: &str) -> Result<Committed<()>, DrawError> {
        let committed = self
            .mutate_with_shuffle(event_id, |event, rng| draw_core::run_draw(event, rng))
            .await?;
        tracing::info!(event_id = %event_id, "draw done");
        Ok(committed)
    }

    pub async fn manage_view(&self, event_id: &str) -> Result<ManageView, DrawError> {
        self.read(event_id, Event::manage_view).await
    }

    pub async fn resolve_view(
        &self,
        event_id: &str,
        token: &str,
    ) -> Result<ParticipantView, DrawError> {
        self.read(event_id, |event| event.resolve_view(token)).await?
    }

    pub async fn sweep_expired(&self) -> usize {
        self.sweep_expired_at(OffsetDateTime::now_utc()).await
    }

    /// Deletes every draw created more than [`draw_core::RETENTION`] before
    /// `now` and returns how many were removed.
    pub async fn sweep_expired_at(&self, now: OffsetDateTime) -> usize {
        let mut inner = self.inner.write().await;
        let expired = list_expired(&inner.data, now);
        if expired.is_empty() {
            return 0;
        }
        for event_id in &expired {
            inner.data.events.remove(event_id);
        }
        tracing::info!(removed = expired.len(), "swept expired draws");
        self.save_locked(&inner.data).await;
        expired.len()
    }

    #[cfg(test)]
    pub(crate) async fn snapshot(&self) -> StoreData {
        self.inner.read().await.data.clone()
    }

    #[cfg(test)]
    pub(crate) async fn insert(&self, event: Event) -> EventId {
        let mut inner = self.inner.write().await;
        let event_id = fresh_event_id(&inner.data);
        inner.data.events.insert(event_id.clone(), event);
        event_id
    }

    /// Writes the snapshot. Callers hold the write lock.
    async fn save_locked(&self, data: &StoreData) -> Option<PersistError> {
        let path = self.persist_path.as_ref()?;
        match save(path, data).await {
            Ok(()) => None,
            Err(err) => {
                tracing::warn!(error = %err, path = %path.display(), "failed to persist draws");
                Some(err)
            }
        }
    }
}

fn fresh_event_id(data: &StoreData) -> EventId {
    loop {
        let event_id = new_token();
        if !data.events.contains_key(&event_id) {
            return event_id;
        }
    }
}

fn list_expired(data: &StoreData, now: OffsetDateTime) -> Vec<EventId> {
    data.events
        .iter()
        .filter(|(_, event)| event.is_expired(now))
        .map(|(event_id, _)| event_id.clone())
        .collect()
}

async fn load(path: &Path) -> StoreData {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "data file not found, starting empty");
            return StoreData::default();
        }
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "failed to read data file, starting empty");
            return StoreData::default();
        }
    };
    match serde_json::from_slice(&bytes) {
        Ok(data) => data,
        Err(err) => {
            tracing::warn!(error = %err, path = %path.display(), "failed to parse data file, starting empty");
            StoreData::default()
        }
    }
}

async fn save(path: &Path, data: &StoreData) -> Result<(), PersistError> {
    let json = serde_json::to_vec_pretty(data)?;
    let mut tmp = OsString::from(path.as_os_str());
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    tokio::fs::write(&tmp, json).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}
