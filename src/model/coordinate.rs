//! Coordinate types: positions on the globe and samples of a walker's fix.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

/// Errors raised when a coordinate fails validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GeoError {
    #[error("latitude out of range [-90, 90]: {0}")]
    LatitudeOutOfRange(f64),

    #[error("longitude out of range [-180, 180]: {0}")]
    LongitudeOutOfRange(f64),
}

/// A position in decimal degrees.
///
/// Deserializing goes through [`Coordinate::new`], so out-of-range input is
/// rejected wherever a coordinate is read.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "UncheckedCoordinate")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UncheckedCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<UncheckedCoordinate> for Coordinate {
    type Error = GeoError;

    fn try_from(raw: UncheckedCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// Builds a validated coordinate.
    ///
    /// Non-finite values fail the range check.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A coordinate stamped with the millisecond Unix time it was observed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimestampedCoordinate {
    #[serde(flatten)]
    pub coordinate: Coordinate,
    pub timestamp_ms: i64,
}

impl TimestampedCoordinate {
    pub fn new(coordinate: Coordinate, timestamp_ms: i64) -> Self {
        Self {
            coordinate,
            timestamp_ms,
        }
    }

    /// Stamps a coordinate with the current time.
    pub fn now(coordinate: Coordinate) -> Self {
        Self::new(coordinate, Timestamp::now().as_millisecond())
    }
}

/// A raw position fix as pushed by the device location source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawFix {
    #[serde(flatten)]
    pub coordinate: Coordinate,

    /// Reported horizontal accuracy in meters, when the source knows it.
    #[serde(default)]
    pub accuracy_meters: Option<f64>,

    pub timestamp_ms: i64,
}

impl RawFix {
    /// The accuracy if it is usable: finite and strictly positive.
    pub fn known_accuracy(&self) -> Option<f64> {
        self.accuracy_meters.filter(|a| a.is_finite() && *a > 0.0)
    }
}

/// The smoother's output for one raw fix.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmoothedSample {
    pub coordinate: Coordinate,
    pub is_significant_movement: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_boundary_values() {
        assert!(Coordinate::new(90.0, 180.0).is_ok());
        assert!(Coordinate::new(-90.0, -180.0).is_ok());
    }

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(
            Coordinate::new(91.0, 0.0).unwrap_err(),
            GeoError::LatitudeOutOfRange(91.0)
        );
        assert_eq!(
            Coordinate::new(0.0, -180.5).unwrap_err(),
            GeoError::LongitudeOutOfRange(-180.5)
        );
        assert!(Coordinate::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn deserializing_rejects_out_of_range_coordinates() {
        let err = serde_json::from_str::<Coordinate>(r#"{"latitude": 500.0, "longitude": 0.0}"#)
            .unwrap_err();
        assert!(err.to_string().contains("latitude out of range"), "{err}");

        assert!(serde_json::from_str::<RawFix>(
            r#"{"latitude": 500.0, "longitude": -999.0, "timestampMs": 0}"#
        )
        .is_err());
        assert!(serde_json::from_str::<TimestampedCoordinate>(
            r#"{"latitude": 10.0, "longitude": 181.0, "timestampMs": 0}"#
        )
        .is_err());
    }

    #[test]
    fn deserializing_accepts_valid_fixes() {
        let fix: RawFix = serde_json::from_str(
            r#"{"latitude": -33.87, "longitude": 151.21, "accuracyMeters": 4.0, "timestampMs": 7}"#,
        )
        .unwrap();
        assert_eq!(fix.coordinate, Coordinate::new(-33.87, 151.21).unwrap());
        assert_eq!(fix.accuracy_meters, Some(4.0));
    }

    #[test]
    fn malformed_accuracy_is_unknown() {
        let coordinate = Coordinate::new(10.0, 10.0).unwrap();
        let fix = |accuracy_meters| RawFix {
            coordinate,
            accuracy_meters,
            timestamp_ms: 0,
        };

        assert_eq!(fix(Some(-3.0)).known_accuracy(), None);
        assert_eq!(fix(Some(f64::NAN)).known_accuracy(), None);
        assert_eq!(fix(None).known_accuracy(), None);
        assert_eq!(fix(Some(8.0)).known_accuracy(), Some(8.0));
    }

    #[test]
    fn timestamped_coordinate_serializes_flat() {
        let point = TimestampedCoordinate::new(Coordinate::new(1.5, 2.5).unwrap(), 42);
        let json = serde_json::to_value(point).unwrap();

        assert_eq!(json["latitude"], 1.5);
        assert_eq!(json["timestampMs"], 42);
    }
}
