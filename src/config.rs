//! Wayfarer configuration.
//!
//! Loaded from `~/.wayfarer/config.toml`. Defaults apply when the file or any
//! key is missing.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Wayfarer configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Config {
    pub smoother: SmootherConfig,
    pub discovery: DiscoveryConfig,
    pub mission: MissionConfig,
    pub storage: StorageConfig,
}

/// Location smoothing thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SmootherConfig {
    /// Fixes kept for the moving estimate.
    pub max_history_size: usize,

    /// Fixes closer than this to the estimate are noise.
    pub dead_zone_radius_meters: f64,

    /// Estimate shifts at least this large count as movement.
    pub movement_threshold_meters: f64,
}

impl Default for SmootherConfig {
    fn default() -> Self {
        Self {
            max_history_size: 5,
            dead_zone_radius_meters: 2.5,
            movement_threshold_meters: 1.5,
        }
    }
}

/// Destination search tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct DiscoveryConfig {
    /// Minimum average rating a place needs to be offered.
    pub min_rating: f64,

    /// Raw results requested per search, before filtering.
    pub max_results: usize,

    /// Half-width of the random jitter added to ranking scores.
    pub rank_jitter: f64,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            min_rating: 4.0,
            max_results: 25,
            rank_jitter: 0.25,
        }
    }
}

/// Mission progress thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct MissionConfig {
    /// Average stride used to turn steps into distance.
    pub stride_meters: f64,

    /// Distance to the goal at which the walker has arrived.
    pub arrival_radius_meters: f64,

    /// Minimum spacing between recorded route points.
    pub route_sample_meters: f64,

    /// Distance from the street path beyond which the walker is off path.
    pub deviation_threshold_meters: f64,

    /// Search radius around a projected goal when snapping it to a real place.
    pub snap_radius_meters: f64,

    /// Report "no missions" instead of falling back to missions without a real place.
    pub require_real_places: bool,
}

impl Default for MissionConfig {
    fn default() -> Self {
        Self {
            stride_meters: 0.762,
            arrival_radius_meters: 20.0,
            route_sample_meters: 5.0,
            deviation_threshold_meters: crate::path::DEFAULT_DEVIATION_THRESHOLD_METERS,
            snap_radius_meters: 400.0,
            require_real_places: false,
        }
    }
}

/// Where history is persisted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct StorageConfig {
    /// `SQLite` file; defaults to `~/.wayfarer/wayfarer.sqlite`.
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load config from `~/.wayfarer/config.toml`, or defaults if it is absent.
    pub fn load() -> Result<Self, String> {
        match Self::path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load config from an explicit path. A missing file yields defaults.
    pub fn load_from(path: &Path) -> Result<Self, String> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)
            .map_err(|e| format!("failed to read {}: {e}", path.display()))?;

        let config: Self = toml::from_str(&contents)
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        config
            .validate()
            .map_err(|e| format!("invalid config at {}: {e}", path.display()))?;

        Ok(config)
    }

    /// The config file path: `~/.wayfarer/config.toml`.
    pub fn path() -> Option<PathBuf> {
        Self::home().map(|h| h.join("config.toml"))
    }

    /// The history database path, honoring `[storage] path`.
    pub fn storage_path(&self) -> Option<PathBuf> {
        self.storage
            .path
            .clone()
            .or_else(|| Self::home().map(|h| h.join("wayfarer.sqlite")))
    }

    fn home() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".wayfarer"))
    }

    fn validate(&self) -> Result<(), String> {
        if self.smoother.max_history_size == 0 {
            return Err("smoother.max-history-size must be at least 1".into());
        }
        if !(0.0..=5.0).contains(&self.discovery.min_rating) {
            return Err("discovery.min-rating must be within [0, 5]".into());
        }
        if self.discovery.max_results == 0 {
            return Err("discovery.max-results must be at least 1".into());
        }
        if !self.discovery.rank_jitter.is_finite() || self.discovery.rank_jitter < 0.0 {
            return Err("discovery.rank-jitter must be a non-negative number".into());
        }

        let positive = [
            (
                "smoother.dead-zone-radius-meters",
                self.smoother.dead_zone_radius_meters,
            ),
            (
                "smoother.movement-threshold-meters",
                self.smoother.movement_threshold_meters,
            ),
            ("mission.stride-meters", self.mission.stride_meters),
            (
                "mission.arrival-radius-meters",
                self.mission.arrival_radius_meters,
            ),
            ("mission.route-sample-meters", self.mission.route_sample_meters),
            (
                "mission.deviation-threshold-meters",
                self.mission.deviation_threshold_meters,
            ),
            ("mission.snap-radius-meters", self.mission.snap_radius_meters),
        ];
        for (key, value) in positive {
            if !value.is_finite() || value <= 0.0 {
                return Err(format!("{key} must be a positive number, got {value}"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    #[test]
    fn missing_file_yields_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();

        assert_eq!(config, Config::default());
        assert_eq!(config.mission.stride_meters, 0.762);
        assert_eq!(config.smoother.max_history_size, 5);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            "[mission]\narrival-radius-meters = 30.0\n\n[discovery]\nmin-rating = 4.5\n",
        )
        .unwrap();

        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.mission.arrival_radius_meters, 30.0);
        assert_eq!(config.mission.route_sample_meters, 5.0);
        assert_eq!(config.discovery.min_rating, 4.5);
        assert_eq!(config.discovery.max_results, 25);
    }

    #[test]
    fn rejects_out_of_range_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");

        fs::write(&path, "[discovery]\nmin-rating = 7.0\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.contains("min-rating"), "{err}");

        fs::write(&path, "[mission]\nstride-meters = -0.5\n").unwrap();
        let err = Config::load_from(&path).unwrap_err();
        assert!(err.contains("stride-meters"), "{err}");
    }

    #[test]
    fn rejects_malformed_toml() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[mission\n").unwrap();

        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn explicit_storage_path_wins() {
        let config = Config {
            storage: StorageConfig {
                path: Some(PathBuf::from("/tmp/history.sqlite")),
            },
            ..Config::default()
        };
        assert_eq!(
            config.storage_path(),
            Some(PathBuf::from("/tmp/history.sqlite"))
        );
    }
}
