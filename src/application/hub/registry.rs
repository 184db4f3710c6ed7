//! Instrument subscription registry.
//!
//! Counts subscribers per instrument. Only the first subscriber causes a
//! wire subscribe and only the last unsubscribe causes a wire unsubscribe.

use std::collections::HashMap;

use crate::domain::InstrumentId;

#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    counts: HashMap<InstrumentId, usize>,
}

impl SubscriptionRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a subscriber. Returns true if this is the first one.
    pub fn add(&mut self, instrument_id: &InstrumentId) -> bool {
        let count = self.counts.entry(instrument_id.clone()).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Remove a subscriber. Returns true if it was the last one.
    pub fn remove(&mut self, instrument_id: &InstrumentId) -> bool {
        match self.counts.get_mut(instrument_id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.counts.remove(instrument_id);
                true
            }
            None => false,
        }
    }

    /// Drop an instrument regardless of subscriber count.
    ///
    /// Returns true if it was subscribed.
    pub fn purge(&mut self, instrument_id: &InstrumentId) -> bool {
        self.counts.remove(instrument_id).is_some()
    }

    #[must_use]
    pub fn contains(&self, instrument_id: &InstrumentId) -> bool {
        self.counts.contains_key(instrument_id)
    }

    #[must_use]
    pub fn subscriber_count(&self, instrument_id: &InstrumentId) -> usize {
        self.counts.get(instrument_id).copied().unwrap_or(0)
    }

    /// Every subscribed instrument, sorted.
    #[must_use]
    pub fn snapshot(&self) -> Vec<InstrumentId> {
        let mut ids: Vec<InstrumentId> = self.counts.keys().cloned().collect();
        ids.sort();
        ids
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_and_last_subscriber_are_reported() {
        let mut registry = SubscriptionRegistry::new();
        let id = InstrumentId::from("t1");

        assert!(registry.add(&id));
        assert!(!registry.add(&id));
        assert_eq!(registry.subscriber_count(&id), 2);

        assert!(!registry.remove(&id));
        assert!(registry.remove(&id));
        assert!(!registry.contains(&id));
        assert!(!registry.remove(&id));
    }

    #[test]
    fn purge_ignores_count() {
        let mut registry = SubscriptionRegistry::new();
        let id = InstrumentId::from("t1");
        registry.add(&id);
        registry.add(&id);

        assert!(registry.purge(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn snapshot_is_sorted() {
        let mut registry = SubscriptionRegistry::new();
        for id in ["c", "a", "b"] {
            registry.add(&InstrumentId::from(id));
        }
        let ids: Vec<String> = registry
            .snapshot()
            .into_iter()
            .map(|id| id.as_str().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }
}
