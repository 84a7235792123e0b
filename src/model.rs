//! Core data model for Wayfarer.
//!
//! These types carry a quest from discovery to completion:
//! coordinates, places, missions, and the history of places already seen.

mod coordinate;
mod history;
mod mission;
mod poi;

pub use coordinate::{Coordinate, GeoError, RawFix, SmoothedSample, TimestampedCoordinate};
pub use history::{HISTORY_CAPACITY, History, HistoryEntry};
pub use mission::{
    ActiveMission, CompletionRecord, CompletionType, DestinationType, EnvironmentType, Mission,
    Vibe,
};
pub use poi::{PlaceDescription, Placement, PointOfInterest};
