//! Spherical geodesy: distance, bearing, and forward projection.
//!
//! All functions treat the Earth as a sphere of radius [`EARTH_RADIUS_METERS`].
//! Longitudes are used as given; the antimeridian is not specially handled.

use crate::model::Coordinate;

/// Mean Earth radius in meters.
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Great-circle distance in meters (haversine).
pub fn distance(a: Coordinate, b: Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let dlat = (b.latitude - a.latitude).to_radians();
    let dlon = (b.longitude - a.longitude).to_radians();

    let sin_dlat = (dlat / 2.0).sin();
    let sin_dlon = (dlon / 2.0).sin();

    let h = sin_dlat * sin_dlat + lat1.cos() * lat2.cos() * sin_dlon * sin_dlon;
    2.0 * EARTH_RADIUS_METERS * h.sqrt().atan2((1.0 - h).max(0.0).sqrt())
}

/// The point reached by travelling `distance_meters` from `origin` along
/// the initial bearing `bearing_degrees` (clockwise from north, taken mod 360).
pub fn project(origin: Coordinate, distance_meters: f64, bearing_degrees: f64) -> Coordinate {
    let angular = distance_meters / EARTH_RADIUS_METERS;
    let theta = normalize_bearing(bearing_degrees).to_radians();
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * angular.cos() + lat1.cos() * angular.sin() * theta.cos()).asin();
    let lon2 = lon1
        + (theta.sin() * angular.sin() * lat1.cos()).atan2(angular.cos() - lat1.sin() * lat2.sin());

    Coordinate {
        latitude: lat2.to_degrees(),
        longitude: lon2.to_degrees(),
    }
}

/// Initial bearing from `origin` to `destination`, in `[0, 360)`.
pub fn bearing(origin: Coordinate, destination: Coordinate) -> f64 {
    let lat1 = origin.latitude.to_radians();
    let lat2 = destination.latitude.to_radians();
    let dlon = (destination.longitude - origin.longitude).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    normalize_bearing(y.atan2(x).to_degrees())
}

/// Wraps any angle into `[0, 360)`.
pub fn normalize_bearing(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs.
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}

/// Smallest absolute difference between two bearings, in `[0, 180]`.
pub fn bearing_difference(a: f64, b: f64) -> f64 {
    let diff = normalize_bearing(a - b);
    if diff > 180.0 { 360.0 - diff } else { diff }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(latitude: f64, longitude: f64) -> Coordinate {
        Coordinate::new(latitude, longitude).unwrap()
    }

    #[test]
    fn distance_is_symmetric_and_zero_on_self() {
        let pairs = [
            (coord(51.5074, -0.1278), coord(48.8566, 2.3522)),
            (coord(-33.8688, 151.2093), coord(35.6762, 139.6503)),
            (coord(0.0, 0.0), coord(0.0, 0.001)),
        ];
        for (a, b) in pairs {
            assert!((distance(a, b) - distance(b, a)).abs() < 1e-6);
            assert_eq!(distance(a, a), 0.0);
            assert!(distance(a, b) > 0.0);
        }
    }

    #[test]
    fn london_to_paris_is_about_344_km() {
        let d = distance(coord(51.5074, -0.1278), coord(48.8566, 2.3522));
        assert!((d - 343_500.0).abs() < 1_500.0, "got {d}");
    }

    #[test]
    fn projection_round_trips_distance() {
        let origins = [coord(40.7128, -74.0060), coord(-33.9, 18.4), coord(64.1, -21.9)];
        let distances = [0.0, 5.0, 762.0, 4_500.0];
        let bearings = [0.0, 45.0, 90.0, 181.0, 270.0, 359.9];

        for origin in origins {
            for d in distances {
                for b in bearings {
                    let target = project(origin, d, b);
                    assert!(
                        (distance(origin, target) - d).abs() < 1e-3,
                        "origin {origin:?} distance {d} bearing {b}"
                    );
                }
            }
        }
    }

    #[test]
    fn projection_follows_bearing() {
        let origin = coord(10.0, 10.0);
        for b in [0.0, 90.0, 180.0, 270.0, 33.0] {
            let target = project(origin, 1_000.0, b);
            assert!(bearing_difference(bearing(origin, target), b) < 0.01);
        }
    }

    #[test]
    fn projection_takes_bearing_mod_360() {
        let origin = coord(10.0, 10.0);
        let a = project(origin, 1_000.0, 450.0);
        let b = project(origin, 1_000.0, 90.0);
        assert!(distance(a, b) < 1e-6);
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = coord(0.0, 0.0);
        assert!(bearing_difference(bearing(origin, coord(1.0, 0.0)), 0.0) < 1e-9);
        assert!(bearing_difference(bearing(origin, coord(0.0, 1.0)), 90.0) < 1e-9);
        assert!(bearing_difference(bearing(origin, coord(-1.0, 0.0)), 180.0) < 1e-9);
        assert!(bearing_difference(bearing(origin, coord(0.0, -1.0)), 270.0) < 1e-9);
    }

    #[test]
    fn bearing_is_in_range() {
        let b = bearing(coord(10.0, 10.0), coord(9.0, 9.0));
        assert!((0.0..360.0).contains(&b));
    }

    #[test]
    fn bearing_difference_wraps() {
        assert_eq!(bearing_difference(350.0, 10.0), 20.0);
        assert_eq!(bearing_difference(10.0, 350.0), 20.0);
        assert_eq!(bearing_difference(0.0, 180.0), 180.0);
        assert_eq!(normalize_bearing(-90.0), 270.0);
    }
}
