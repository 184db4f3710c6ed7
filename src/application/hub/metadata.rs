//! Per-instrument bookkeeping: metadata cache, last-seen times, mutes.
//!
//! The table's touch time doubles as the instrument's last-seen time, so a
//! single idle sweep purges both the metadata and the activity record.
//! Muted instruments live in a second cache that the reaper never sweeps;
//! it is bounded by capacity alone, dropping the mute sighted longest ago.

use crate::application::cache::BoundedCache;
use crate::domain::{ConditionId, InstrumentId, InstrumentMetadata};

/// What the hub should do with an event for an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sighting {
    /// Confirmed nonexistent; drop the event.
    Muted,
    /// Metadata is cached or already being fetched.
    Known,
    /// First sight (or a previous fetch failed); start a fetch.
    NeedsFetch,
}

#[derive(Debug, Clone, Default)]
struct Entry {
    metadata: Option<InstrumentMetadata>,
    fetching: bool,
}

/// Metadata cache plus activity tracking.
#[derive(Debug)]
pub struct InstrumentTable {
    entries: BoundedCache<InstrumentId, Entry>,
    muted: BoundedCache<InstrumentId, ()>,
}

impl InstrumentTable {
    #[must_use]
    pub fn new(capacity: usize, mute_capacity: usize, idle_ttl_ms: i64) -> Self {
        Self {
            entries: BoundedCache::new(capacity, idle_ttl_ms),
            muted: BoundedCache::new(mute_capacity, i64::MAX),
        }
    }

    /// Record activity for an instrument and decide how to treat it.
    ///
    /// Returns the sighting and, when the table was full, the instrument
    /// evicted to make room.
    pub fn observe(
        &mut self,
        instrument_id: &InstrumentId,
        now_ms: i64,
    ) -> (Sighting, Option<InstrumentId>) {
        if self.muted.touch(instrument_id, now_ms) {
            return (Sighting::Muted, None);
        }

        let mut evicted = None;
        if !self.entries.contains_key(instrument_id) {
            evicted = self
                .entries
                .insert(instrument_id.clone(), Entry::default(), now_ms)
                .map(|(id, _)| id);
        }

        let Some(entry) = self.entries.get_mut(instrument_id, now_ms) else {
            return (Sighting::Known, evicted);
        };
        if entry.metadata.is_some() || entry.fetching {
            return (Sighting::Known, evicted);
        }
        entry.fetching = true;
        (Sighting::NeedsFetch, evicted)
    }

    /// Store fetched or announced metadata.
    pub fn record(&mut self, metadata: InstrumentMetadata, now_ms: i64) -> Option<InstrumentId> {
        let id = metadata.instrument_id.clone();
        let entry = Entry {
            metadata: Some(metadata),
            fetching: false,
        };
        if let Some(existing) = self.entries.get_mut(&id, now_ms) {
            *existing = entry;
            return None;
        }
        self.entries.insert(id, entry, now_ms).map(|(id, _)| id)
    }

    /// Clear the in-flight flag so a later sighting retries the fetch.
    pub fn fetch_failed(&mut self, instrument_id: &InstrumentId) {
        if let Some(entry) = self.entries.peek_mut(instrument_id) {
            entry.fetching = false;
        }
    }

    /// Permanently mute an instrument; lookups report a placeholder from now on.
    ///
    /// Once the mute list is full, the mute sighted longest ago is forgotten;
    /// that instrument gets one more lookup if it ever reappears.
    pub fn mute(&mut self, instrument_id: &InstrumentId, now_ms: i64) {
        self.entries.remove(instrument_id);
        self.muted.insert(instrument_id.clone(), (), now_ms);
    }

    #[must_use]
    pub fn is_muted(&self, instrument_id: &InstrumentId) -> bool {
        self.muted.contains_key(instrument_id)
    }

    /// Cached metadata; muted instruments report a placeholder.
    #[must_use]
    pub fn metadata(&self, instrument_id: &InstrumentId) -> Option<InstrumentMetadata> {
        if self.muted.contains_key(instrument_id) {
            return Some(InstrumentMetadata::placeholder(instrument_id.clone()));
        }
        self.entries
            .peek(instrument_id)
            .and_then(|entry| entry.metadata.clone())
    }

    #[must_use]
    pub fn condition_id(&self, instrument_id: &InstrumentId) -> Option<ConditionId> {
        self.entries
            .peek(instrument_id)
            .and_then(|entry| entry.metadata.as_ref())
            .and_then(|metadata| metadata.condition_id.clone())
    }

    #[must_use]
    pub fn is_tracked(&self, instrument_id: &InstrumentId) -> bool {
        self.entries.contains_key(instrument_id)
    }

    #[must_use]
    pub fn last_seen(&self, instrument_id: &InstrumentId) -> Option<i64> {
        self.entries.touched_at(instrument_id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Purge instruments idle past the TTL; returns their ids.
    pub fn evict_idle(&mut self, now_ms: i64) -> Vec<InstrumentId> {
        self.entries.evict_idle(now_ms)
    }
}
