//! Rotation: the bookkeeping that keeps quests from repeating.
//!
//! The manager remembers recently surfaced places (persisted through a
//! [`KeyValueStore`]), picks the theme of the day, and draws random headings
//! and narrative seeds.

mod catalogue;

use std::collections::HashSet;

use jiff::{Timestamp, Zoned, civil::Date};
use rand::{Rng, SeedableRng, rngs::StdRng};
use tracing::{debug, warn};

use crate::model::History;
use crate::storage::{self, KeyValueStore};

pub use catalogue::{
    CARDINALS, CardinalDirection, DailyTheme, NARRATIVE_SEEDS, NarrativeSeed, THEMES,
};

/// Storage key for the serialized history.
const HISTORY_KEY: &str = "history";

/// The theme for a calendar date: `THEMES[day_of_year % THEMES.len()]`.
pub fn theme_for(date: Date) -> DailyTheme {
    let day = usize::from(date.day_of_year().unsigned_abs());
    THEMES[day % THEMES.len()]
}

/// Owner of the place history and the rotation random source.
pub struct RotationManager {
    store: Box<dyn KeyValueStore>,
    history: History,
    rng: StdRng,
}

impl RotationManager {
    /// Restores history from the store.
    ///
    /// Unreadable or corrupt history is logged and replaced by an empty one.
    pub fn load(store: Box<dyn KeyValueStore>) -> Self {
        Self::with_rng(store, StdRng::from_entropy())
    }

    /// Like [`RotationManager::load`] with a fixed random seed.
    pub fn with_seed(store: Box<dyn KeyValueStore>, seed: u64) -> Self {
        Self::with_rng(store, StdRng::seed_from_u64(seed))
    }

    fn with_rng(store: Box<dyn KeyValueStore>, rng: StdRng) -> Self {
        let history = match read_history(store.as_ref()) {
            Ok(history) => history,
            Err(e) => {
                warn!(error = %e, "discarding unreadable history");
                History::default()
            }
        };
        debug!(entries = history.len(), "history loaded");
        Self {
            store,
            history,
            rng,
        }
    }

    /// Records that a place was surfaced (or completed) and persists the history.
    ///
    /// The in-memory history is updated even when persisting fails.
    pub fn record_seen(&mut self, place_id: &str, was_completed: bool) -> storage::Result<()> {
        self.history.upsert(place_id, was_completed, Timestamp::now());
        self.persist()
    }

    /// Every place currently in history, completed or not.
    pub fn blacklist(&self) -> HashSet<String> {
        self.history.entries().map(|e| e.place_id.clone()).collect()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Forgets all places and removes the persisted history.
    pub fn clear(&mut self) -> storage::Result<()> {
        self.history.clear();
        self.store.remove(HISTORY_KEY)
    }

    /// Today's theme in the local time zone.
    pub fn daily_theme(&self) -> DailyTheme {
        theme_for(Zoned::now().date())
    }

    /// One of the four cardinal headings, uniformly.
    pub fn random_direction(&mut self) -> CardinalDirection {
        CARDINALS[self.rng.gen_range(0..CARDINALS.len())]
    }

    /// One narrative seed, uniformly.
    pub fn random_narrative_seed(&mut self) -> NarrativeSeed {
        NARRATIVE_SEEDS[self.rng.gen_range(0..NARRATIVE_SEEDS.len())]
    }

    fn persist(&self) -> storage::Result<()> {
        let bytes = serde_json::to_vec(&self.history)?;
        self.store.set(HISTORY_KEY, &bytes)
    }
}

fn read_history(store: &dyn KeyValueStore) -> storage::Result<History> {
    let Some(bytes) = store.get(HISTORY_KEY)? else {
        return Ok(History::default());
    };
    let mut history: History = serde_json::from_slice(&bytes)?;
    history.enforce_capacity();
    Ok(history)
}
