//! Points of interest: real places a mission can lead to.

use serde::{Deserialize, Serialize};

use super::Coordinate;

/// A real-world place returned by the search collaborator.
///
/// `place_id` is the identity: two values with the same id are the same
/// physical place even when the other fields differ between queries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PointOfInterest {
    pub place_id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub coordinate: Coordinate,

    /// Provider category tags (e.g. `cafe`, `park`).
    #[serde(default)]
    pub categories: Vec<String>,

    /// Average rating in `[0, 5]`, absent when the place is unrated.
    #[serde(default)]
    pub rating: Option<f64>,

    #[serde(default)]
    pub review_count: u32,

    /// `None` when the provider does not know opening hours.
    #[serde(default)]
    pub is_open_now: Option<bool>,

    /// Where the place sits relative to the origin of the search that found it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placement: Option<Placement>,
}

impl PointOfInterest {
    /// Whether any category tag matches, case-insensitively.
    pub fn has_category(&self, category: &str) -> bool {
        self.categories
            .iter()
            .any(|c| c.eq_ignore_ascii_case(category))
    }
}

/// Distance and bearing of a place from a search origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Placement {
    pub distance_meters: f64,
    pub bearing_degrees: f64,
}

/// A human description of a coordinate from the reverse-geocoding collaborator.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceDescription {
    pub display_name: String,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub landmark: Option<String>,
}

impl PlaceDescription {
    /// The most local name available, for use in generated text.
    pub fn locality(&self) -> &str {
        self.neighborhood
            .as_deref()
            .or(self.street.as_deref())
            .or(self.city.as_deref())
            .unwrap_or(&self.display_name)
    }
}
