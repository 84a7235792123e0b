//! Distance along a street path.
//!
//! The nearest point is found among path vertices only, not by projecting
//! onto segments. Between sparse vertices this overestimates the remaining
//! distance by up to half a segment.

use crate::geo;
use crate::model::Coordinate;

/// Default distance from the path beyond which the walker has strayed.
pub const DEFAULT_DEVIATION_THRESHOLD_METERS: f64 = 50.0;

/// The path vertex nearest to a location.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClosestPoint {
    pub index: usize,
    pub distance: f64,
}

/// Linear scan for the vertex nearest to `location`. `None` for an empty path.
pub fn closest_point_on_path(location: Coordinate, path: &[Coordinate]) -> Option<ClosestPoint> {
    path.iter()
        .enumerate()
        .map(|(index, vertex)| ClosestPoint {
            index,
            distance: geo::distance(location, *vertex),
        })
        .min_by(|a, b| a.distance.total_cmp(&b.distance))
}

/// Distance to the nearest vertex plus the path length from there to the end.
///
/// A path with a single vertex degenerates to the direct distance to it.
/// An empty path has no remaining distance.
pub fn remaining_distance(location: Coordinate, path: &[Coordinate]) -> f64 {
    let Some(closest) = closest_point_on_path(location, path) else {
        return 0.0;
    };
    let along: f64 = path[closest.index..]
        .windows(2)
        .map(|pair| geo::distance(pair[0], pair[1]))
        .sum();
    closest.distance + along
}

/// Whether `location` is farther than `threshold_meters` from every vertex.
pub fn has_deviated(location: Coordinate, path: &[Coordinate], threshold_meters: f64) -> bool {
    closest_point_on_path(location, path).is_some_and(|c| c.distance > threshold_meters)
}

/// Total length of a polyline.
pub fn path_length(path: &[Coordinate]) -> f64 {
    path.windows(2)
        .map(|pair| geo::distance(pair[0], pair[1]))
        .sum()
}
