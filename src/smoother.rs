//! Location smoothing: turn a noisy stream of fixes into a stable one.
//!
//! Fixes that land inside the dead zone around the current estimate are
//! treated as noise and the estimate is held. Fixes outside it join a
//! bounded history, and the estimate becomes a weighted mean of that
//! history: newer fixes and more accurate fixes weigh more.

use std::collections::VecDeque;

use tracing::trace;

use crate::config::SmootherConfig;
use crate::geo;
use crate::model::{Coordinate, RawFix, SmoothedSample};

/// Accuracy assumed for fixes that do not report a usable one.
const ASSUMED_ACCURACY_METERS: f64 = 10.0;

/// Stateful filter over raw position fixes. One instance per location stream.
#[derive(Debug, Clone)]
pub struct LocationSmoother {
    config: SmootherConfig,
    history: VecDeque<RawFix>,
    estimate: Option<Coordinate>,
}

impl LocationSmoother {
    pub fn new(config: SmootherConfig) -> Self {
        Self {
            history: VecDeque::with_capacity(config.max_history_size.max(1)),
            config,
            estimate: None,
        }
    }

    /// Filters one raw fix. Always produces a sample.
    ///
    /// The first fix is passed through and reported as significant movement.
    /// Later fixes inside the dead zone are never movement, even when they lie
    /// past the movement threshold, and movement is judged on the smoothed
    /// estimate rather than the raw fix.
    pub fn smooth(&mut self, fix: RawFix) -> SmoothedSample {
        let Some(previous) = self.estimate else {
            self.push(fix);
            self.estimate = Some(fix.coordinate);
            return SmoothedSample {
                coordinate: fix.coordinate,
                is_significant_movement: true,
            };
        };

        let offset = geo::distance(previous, fix.coordinate);
        if offset < self.config.dead_zone_radius_meters {
            trace!(offset, "fix inside dead zone, holding estimate");
            return SmoothedSample {
                coordinate: previous,
                is_significant_movement: false,
            };
        }

        self.push(fix);
        let next = self.weighted_mean();
        self.estimate = Some(next);

        SmoothedSample {
            coordinate: next,
            is_significant_movement: geo::distance(previous, next)
                >= self.config.movement_threshold_meters,
        }
    }

    /// The current smoothed position, if any fix has been seen.
    pub fn estimate(&self) -> Option<Coordinate> {
        self.estimate
    }

    /// Forgets all fixes.
    pub fn reset(&mut self) {
        self.history.clear();
        self.estimate = None;
    }

    fn push(&mut self, fix: RawFix) {
        self.history.push_back(fix);
        while self.history.len() > self.config.max_history_size.max(1) {
            self.history.pop_front();
        }
    }

    /// Weight of fix `i` (oldest first) is `(i + 1) / accuracy`.
    fn weighted_mean(&self) -> Coordinate {
        let mut total = 0.0;
        let mut latitude = 0.0;
        let mut longitude = 0.0;

        for (i, fix) in self.history.iter().enumerate() {
            let accuracy = fix
                .known_accuracy()
                .unwrap_or(ASSUMED_ACCURACY_METERS)
                .max(1.0);
            let weight = (i + 1) as f64 / accuracy;
            total += weight;
            latitude += fix.coordinate.latitude * weight;
            longitude += fix.coordinate.longitude * weight;
        }

        Coordinate {
            latitude: latitude / total,
            longitude: longitude / total,
        }
    }
}

impl Default for LocationSmoother {
    fn default() -> Self {
        Self::new(SmootherConfig::default())
    }
}
