//! Contracts for the services the engine relies on but does not implement.
//!
//! Place search, directions, reverse geocoding, and text generation are
//! network services in practice. Every failure they report is absorbed by
//! the component that called them and replaced with a defined fallback.

use async_trait::async_trait;

use crate::model::{Coordinate, PlaceDescription, PointOfInterest, TimestampedCoordinate};
use crate::narrative::PromptContext;

/// What a collaborator may report instead of a result.
#[derive(Debug, thiserror::Error)]
pub enum CollaboratorError {
    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("malformed response: {0}")]
    Malformed(String),
}

/// One place search around an origin.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub origin: Coordinate,
    pub category: String,
    pub radius_meters: f64,
    pub min_rating: f64,
    pub max_results: usize,
    pub open_now_only: bool,
}

/// Searches for real places.
#[async_trait]
pub trait PlaceSearch: Send + Sync {
    /// Places matching the query. An empty list is a valid answer.
    async fn search(&self, query: &SearchQuery)
    -> Result<Vec<PointOfInterest>, CollaboratorError>;
}

/// Computes walking paths.
#[async_trait]
pub trait Directions: Send + Sync {
    /// A street-following path, or `None` when no route is known.
    async fn route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Option<Vec<TimestampedCoordinate>>, CollaboratorError>;
}

/// Names coordinates.
#[async_trait]
pub trait ReverseGeocoder: Send + Sync {
    async fn describe(&self, coordinate: Coordinate)
    -> Result<PlaceDescription, CollaboratorError>;
}

/// Generates narrative text from a prompt context.
#[async_trait]
pub trait Narrator: Send + Sync {
    /// Generated text, or `None` when nothing was produced.
    async fn generate(&self, context: &PromptContext) -> Result<Option<String>, CollaboratorError>;
}
