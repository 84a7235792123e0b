//! Collaborators that work without a network.
//!
//! A JSON place catalogue stands in for place search; directions never find a
//! route; reverse geocoding names a coordinate by its numbers; the narrator
//! stays silent so every text comes from templates.

use std::fs;
use std::path::Path;

use async_trait::async_trait;

use crate::collaborators::{
    CollaboratorError, Directions, Narrator, PlaceSearch, ReverseGeocoder, SearchQuery,
};
use crate::geo;
use crate::model::{Coordinate, PlaceDescription, PointOfInterest, TimestampedCoordinate};
use crate::narrative::PromptContext;

/// Place search over a fixed list of places.
#[derive(Debug, Clone, Default)]
pub struct PlaceCatalog {
    places: Vec<PointOfInterest>,
}

impl PlaceCatalog {
    pub fn new(places: Vec<PointOfInterest>) -> Self {
        Self { places }
    }

    /// Reads a JSON array of places.
    pub fn from_path(path: &Path) -> Result<Self, String> {
        let contents = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
        let places: Vec<PointOfInterest> = serde_json::from_str(&contents)
            .map_err(|e| format!("invalid place catalogue at {}: {e}", path.display()))?;
        Ok(Self::new(places))
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }
}

#[async_trait]
impl PlaceSearch for PlaceCatalog {
    /// Places tagged with the query category inside the radius, nearest first.
    async fn search(
        &self,
        query: &SearchQuery,
    ) -> Result<Vec<PointOfInterest>, CollaboratorError> {
        let mut matches: Vec<(f64, &PointOfInterest)> = self
            .places
            .iter()
            .filter(|p| p.has_category(&query.category))
            .filter(|p| p.rating.is_some_and(|r| r >= query.min_rating))
            .filter(|p| !query.open_now_only || p.is_open_now != Some(false))
            .map(|p| (geo::distance(query.origin, p.coordinate), p))
            .filter(|(d, _)| *d <= query.radius_meters)
            .collect();
        matches.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(matches
            .into_iter()
            .take(query.max_results)
            .map(|(_, p)| p.clone())
            .collect())
    }
}

/// Directions that never know a route.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDirections;

#[async_trait]
impl Directions for NoDirections {
    async fn route(
        &self,
        _origin: Coordinate,
        _destination: Coordinate,
    ) -> Result<Option<Vec<TimestampedCoordinate>>, CollaboratorError> {
        Ok(None)
    }
}

/// Describes a coordinate by its latitude and longitude.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinateGeocoder;

#[async_trait]
impl ReverseGeocoder for CoordinateGeocoder {
    async fn describe(
        &self,
        coordinate: Coordinate,
    ) -> Result<PlaceDescription, CollaboratorError> {
        Ok(PlaceDescription {
            display_name: format!("{:.5}, {:.5}", coordinate.latitude, coordinate.longitude),
            ..PlaceDescription::default()
        })
    }
}

/// A narrator that never produces text.
#[derive(Debug, Clone, Copy, Default)]
pub struct SilentNarrator;

#[async_trait]
impl Narrator for SilentNarrator {
    async fn generate(&self, _context: &PromptContext) -> Result<Option<String>, CollaboratorError> {
        Ok(None)
    }
}
