//! History: the bounded record of recently surfaced destinations.

use std::collections::VecDeque;

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Maximum number of places remembered.
pub const HISTORY_CAPACITY: usize = 20;

/// One remembered place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub place_id: String,
    pub last_seen: Timestamp,

    /// Sticky: once a place was completed it stays completed.
    pub was_completed: bool,
}

/// Most-recent-first list of places, capped at [`HISTORY_CAPACITY`].
///
/// Eviction drops the oldest entries regardless of completion state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History {
    entries: VecDeque<HistoryEntry>,
}

impl History {
    /// Inserts or refreshes a place and moves it to the front.
    pub fn upsert(&mut self, place_id: &str, was_completed: bool, seen_at: Timestamp) {
        let previously_completed = match self.entries.iter().position(|e| e.place_id == place_id)
        {
            Some(index) => self
                .entries
                .remove(index)
                .is_some_and(|entry| entry.was_completed),
            None => false,
        };

        self.entries.push_front(HistoryEntry {
            place_id: place_id.to_string(),
            last_seen: seen_at,
            was_completed: previously_completed || was_completed,
        });
        self.entries.truncate(HISTORY_CAPACITY);
    }

    pub fn contains(&self, place_id: &str) -> bool {
        self.entries.iter().any(|e| e.place_id == place_id)
    }

    pub fn get(&self, place_id: &str) -> Option<&HistoryEntry> {
        self.entries.iter().find(|e| e.place_id == place_id)
    }

    /// Entries, most recent first.
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Re-applies the capacity after loading from storage.
    pub(crate) fn enforce_capacity(&mut self) {
        self.entries.truncate(HISTORY_CAPACITY);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(seconds: i64) -> Timestamp {
        Timestamp::new(seconds, 0).unwrap()
    }

    #[test]
    fn upsert_same_place_does_not_grow() {
        let mut history = History::default();
        history.upsert("a", false, at(1));
        history.upsert("a", false, at(2));

        assert_eq!(history.len(), 1);
        assert_eq!(history.get("a").unwrap().last_seen, at(2));
    }

    #[test]
    fn upsert_moves_entry_to_front() {
        let mut history = History::default();
        history.upsert("a", false, at(1));
        history.upsert("b", false, at(2));
        history.upsert("a", false, at(3));

        let ids: Vec<&str> = history.entries().map(|e| e.place_id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
    }

    #[test]
    fn keeps_twenty_most_recent() {
        let mut history = History::default();
        for i in 0..25 {
            history.upsert(&format!("place-{i}"), false, at(i));
        }

        assert_eq!(history.len(), HISTORY_CAPACITY);
        for i in 0..5 {
            assert!(!history.contains(&format!("place-{i}")));
        }
        for i in 5..25 {
            assert!(history.contains(&format!("place-{i}")));
        }
    }

    #[test]
    fn completion_is_sticky() {
        let mut history = History::default();
        history.upsert("a", true, at(1));
        history.upsert("a", false, at(2));

        assert!(history.get("a").unwrap().was_completed);
    }

    #[test]
    fn completed_entries_are_evicted_like_any_other() {
        let mut history = History::default();
        history.upsert("done", true, at(0));
        for i in 1..=HISTORY_CAPACITY {
            history.upsert(&format!("place-{i}"), false, at(i as i64));
        }

        assert!(!history.contains("done"));
    }
}
