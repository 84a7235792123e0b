//! The mission lifecycle.
//!
//! ```text
//! idle ──scan──▶ scanning ──▶ selecting ──select──▶ active ──complete──▶ completed
//!   ▲                              │                  │                      │
//!   └────────────── cancel ────────┴──────────────────┘◀─────── dismiss ─────┘
//! ```
//!
//! Calls that do not fit the current state are ignored rather than failing.
//! Collaborator failures are logged and replaced by fallbacks: no path means
//! straight-line progress, no narrator text means template text.

use std::sync::Arc;

use jiff::Timestamp;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collaborators::{Directions, Narrator, PlaceSearch, ReverseGeocoder, SearchQuery};
use crate::config::{Config, MissionConfig};
use crate::discovery::{Discovery, DiscoveryEngine, DiscoveryRequest};
use crate::generation::{self, MISSIONS_PER_VIBE};
use crate::geo;
use crate::model::{
    ActiveMission, CompletionRecord, CompletionType, Coordinate, Mission, PlaceDescription,
    Placement, PointOfInterest, RawFix, TimestampedCoordinate, Vibe,
};
use crate::narrative::{
    FALLBACK_REWARD, PromptContext, PromptPurpose, RewardBrief, parse_mission_drafts,
    parse_place_narratives,
};
use crate::path;
use crate::rotation::{CardinalDirection, DailyTheme, RotationManager};
use crate::smoother::LocationSmoother;

/// A snapped place must lie within this many degrees of the mission heading.
pub const SNAP_BEARING_TOLERANCE_DEGREES: f64 = 45.0;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MissionError {
    #[error("mission step target must be positive")]
    InvalidStepTarget,

    #[error("no missions available")]
    NoMissionsAvailable,
}

/// Whether a call changed the state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Applied,
    Ignored,
}

/// The lifecycle state, without its data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MissionState {
    Idle,
    Scanning,
    Selecting,
    Active,
    Completed,
}

enum Phase {
    Idle,
    Scanning,
    Selecting(Vec<Mission>),
    Active(Box<ActiveMission>),
    Completed(Box<CompletionRecord>),
}

/// The external services a session talks to.
pub struct Collaborators {
    pub search: Arc<dyn PlaceSearch>,
    pub directions: Arc<dyn Directions>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    pub narrator: Arc<dyn Narrator>,
}

/// Owns one mission session: the discovery engine, the place history, the
/// location smoother, and at most one active mission.
pub struct MissionOrchestrator {
    config: MissionConfig,
    discovery: DiscoveryEngine,
    rotation: RotationManager,
    smoother: LocationSmoother,
    directions: Arc<dyn Directions>,
    geocoder: Arc<dyn ReverseGeocoder>,
    narrator: Arc<dyn Narrator>,
    phase: Phase,

    /// Last point appended to the route; `None` until the first update after selection.
    last_recorded: Option<Coordinate>,
}

impl MissionOrchestrator {
    pub fn new(config: &Config, collaborators: Collaborators, rotation: RotationManager) -> Self {
        let discovery = DiscoveryEngine::new(collaborators.search.clone(), config.discovery.clone());
        Self::with_discovery(config, collaborators, rotation, discovery)
    }

    /// An orchestrator whose discovery ranking is reproducible.
    pub fn with_seed(
        config: &Config,
        collaborators: Collaborators,
        rotation: RotationManager,
        seed: u64,
    ) -> Self {
        let discovery = DiscoveryEngine::with_seed(
            collaborators.search.clone(),
            config.discovery.clone(),
            seed,
        );
        Self::with_discovery(config, collaborators, rotation, discovery)
    }

    fn with_discovery(
        config: &Config,
        collaborators: Collaborators,
        rotation: RotationManager,
        discovery: DiscoveryEngine,
    ) -> Self {
        Self {
            config: config.mission.clone(),
            discovery,
            rotation,
            smoother: LocationSmoother::new(config.smoother.clone()),
            directions: collaborators.directions,
            geocoder: collaborators.geocoder,
            narrator: collaborators.narrator,
            phase: Phase::Idle,
            last_recorded: None,
        }
    }

    pub fn state(&self) -> MissionState {
        match self.phase {
            Phase::Idle => MissionState::Idle,
            Phase::Scanning => MissionState::Scanning,
            Phase::Selecting(_) => MissionState::Selecting,
            Phase::Active(_) => MissionState::Active,
            Phase::Completed(_) => MissionState::Completed,
        }
    }

    /// Missions on offer; empty outside the selecting state.
    pub fn missions(&self) -> &[Mission] {
        match &self.phase {
            Phase::Selecting(missions) => missions.as_slice(),
            _ => &[],
        }
    }

    pub fn active(&self) -> Option<&ActiveMission> {
        match &self.phase {
            Phase::Active(active) => Some(active.as_ref()),
            _ => None,
        }
    }

    pub fn completion(&self) -> Option<&CompletionRecord> {
        match &self.phase {
            Phase::Completed(record) => Some(record.as_ref()),
            _ => None,
        }
    }

    pub fn rotation(&self) -> &RotationManager {
        &self.rotation
    }

    /// Generates up to six missions around `location`.
    ///
    /// Ignored while scanning or active. Discovery runs twice at most: first
    /// biased toward a random cardinal heading, then unbiased with recently seen
    /// places allowed back in. Without a location or any discovered place the
    /// missions come from the narrator and templates, unless real places are
    /// required, in which case the session returns to idle with
    /// [`MissionError::NoMissionsAvailable`].
    pub async fn scan(&mut self, location: Option<Coordinate>) -> Result<Transition, MissionError> {
        if matches!(self.phase, Phase::Scanning | Phase::Active(_)) {
            debug!(state = ?self.state(), "scan ignored");
            return Ok(Transition::Ignored);
        }
        self.phase = Phase::Scanning;
        info!(has_location = location.is_some(), "scan started");

        let theme = self.rotation.daily_theme();
        let direction = self.rotation.random_direction();
        let description = match location {
            Some(origin) => self.describe(origin).await,
            None => None,
        };

        let discovered = match location {
            Some(origin) => self
                .discover(origin, &theme, direction)
                .await
                .map(|found| (origin, found)),
            None => None,
        };

        let missions = if let Some((origin, found)) = discovered {
            for (_, poi) in found.places() {
                if let Err(e) = self.rotation.record_seen(&poi.place_id, false) {
                    warn!(place = %poi.place_id, error = %e, "failed to persist seen place");
                }
            }
            let context = PromptContext {
                places: generation::place_briefs(&found),
                mission_count: found.len(),
                ..self.prompt(PromptPurpose::PlaceMissions, theme, Some(direction), description)
            };
            let narratives = match self.narrate(&context).await {
                Some(text) => parse_place_narratives(&text, &generation::place_ids(&found)),
                None => Vec::new(),
            };
            generation::place_missions(origin, &found, &narratives, self.config.stride_meters)
        } else if self.config.require_real_places {
            info!("no real places found, no missions offered");
            self.phase = Phase::Idle;
            return Err(MissionError::NoMissionsAvailable);
        } else {
            let context = PromptContext {
                mission_count: Vibe::ALL.len() * MISSIONS_PER_VIBE,
                ..self.prompt(PromptPurpose::FreeMissions, theme, Some(direction), description)
            };
            let drafts = match self.narrate(&context).await {
                Some(text) => parse_mission_drafts(&text),
                None => Vec::new(),
            };
            debug!(drafts = drafts.len(), "narrator drafts accepted");
            generation::free_missions(drafts, direction.bearing_degrees)
        };

        info!(missions = missions.len(), theme = theme.name, "scan complete");
        self.phase = Phase::Selecting(missions);
        Ok(Transition::Applied)
    }

    /// Starts `mission` from `location`.
    ///
    /// The goal is projected `step_target × stride` meters along the mission
    /// heading, then snapped to the mission's place or to a matching place near
    /// the projection. Ignored outside the selecting state.
    pub async fn select(
        &mut self,
        mission: Mission,
        current_steps: u64,
        location: Coordinate,
    ) -> Result<Transition, MissionError> {
        if !matches!(self.phase, Phase::Selecting(_)) {
            debug!(state = ?self.state(), "select ignored");
            return Ok(Transition::Ignored);
        }
        if mission.step_target == 0 {
            return Err(MissionError::InvalidStepTarget);
        }

        let mut mission = mission;
        let projected = geo::project(
            location,
            f64::from(mission.step_target) * self.config.stride_meters,
            mission.target_bearing,
        );
        if mission.real_poi.is_none() {
            mission.real_poi = self.snap_goal(location, projected, &mission).await;
        }
        let goal = mission
            .real_poi
            .as_ref()
            .map_or(projected, |poi| poi.coordinate);

        let street_path = self.request_path(location, goal).await;
        let distance = match &street_path {
            Some(p) => path::remaining_distance(location, p),
            None => geo::distance(location, goal),
        };

        info!(
            mission = %mission.id,
            title = %mission.title,
            distance = distance.round(),
            has_path = street_path.is_some(),
            "mission started"
        );
        self.last_recorded = None;
        self.phase = Phase::Active(Box::new(ActiveMission {
            mission,
            started_at: Timestamp::now(),
            steps_at_start: current_steps,
            current_steps,
            goal,
            distance_to_goal: distance,
            initial_distance: distance,
            route: Vec::new(),
            street_path,
            off_path: false,
            has_arrived: false,
            completion_type: CompletionType::None,
            is_completed: false,
        }));
        Ok(Transition::Applied)
    }

    /// Applies a step count and optional location to the active mission.
    ///
    /// Proximity is checked before steps and always measured straight to the
    /// goal, since a street path may end short of it. Once set, the completion
    /// type does not change. Returns `None` when no mission is active.
    pub fn update_progress(
        &mut self,
        current_steps: u64,
        location: Option<TimestampedCoordinate>,
    ) -> Option<&ActiveMission> {
        let Phase::Active(active) = &mut self.phase else {
            return None;
        };

        active.current_steps = current_steps;
        let steps_completed = active.steps_in_mission() >= i64::from(active.mission.step_target);

        let mut proximity_completed = false;
        if let Some(sample) = location {
            let here = sample.coordinate;
            active.distance_to_goal = match &active.street_path {
                Some(p) => path::remaining_distance(here, p),
                None => geo::distance(here, active.goal),
            };
            proximity_completed =
                geo::distance(here, active.goal) <= self.config.arrival_radius_meters;
            if proximity_completed {
                active.has_arrived = true;
            }
            if let Some(p) = &active.street_path {
                active.off_path =
                    path::has_deviated(here, p, self.config.deviation_threshold_meters);
            }

            let far_enough = self
                .last_recorded
                .is_none_or(|last| geo::distance(last, here) >= self.config.route_sample_meters);
            if far_enough {
                active.route.push(sample);
                self.last_recorded = Some(here);
            }
        }

        if !active.is_completed {
            let completion = if proximity_completed {
                CompletionType::Proximity
            } else if steps_completed {
                CompletionType::Steps
            } else {
                CompletionType::None
            };
            if completion != CompletionType::None {
                active.completion_type = completion;
                active.is_completed = true;
                info!(
                    mission = %active.mission.id,
                    completion = ?completion,
                    steps = active.steps_in_mission(),
                    "mission goal reached"
                );
            }
        }

        Some(&**active)
    }

    /// Smooths a raw fix and applies it as a progress update.
    pub fn observe_fix(&mut self, current_steps: u64, fix: RawFix) -> Option<&ActiveMission> {
        let sample = self.smoother.smooth(fix);
        let location = TimestampedCoordinate::new(sample.coordinate, fix.timestamp_ms);
        self.update_progress(current_steps, Some(location))
    }

    /// Requests a fresh path from the last recorded location to the goal.
    ///
    /// Keeps the current path when none is returned.
    pub async fn reroute(&mut self) -> Transition {
        let (Phase::Active(active), Some(from)) = (&self.phase, self.last_recorded) else {
            return Transition::Ignored;
        };
        let goal = active.goal;

        let Some(street_path) = self.request_path(from, goal).await else {
            debug!("reroute returned no path, keeping the current one");
            return Transition::Ignored;
        };
        let Phase::Active(active) = &mut self.phase else {
            return Transition::Ignored;
        };
        active.distance_to_goal = path::remaining_distance(from, &street_path);
        active.off_path = false;
        active.street_path = Some(street_path);
        info!(distance = active.distance_to_goal.round(), "rerouted");
        Transition::Applied
    }

    /// Ends the active mission and generates its reward.
    ///
    /// The transition happens before the narrator is asked; a narrator failure
    /// leaves the fallback reward in place.
    pub async fn complete(&mut self) -> Transition {
        let active = match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Active(active) => active,
            other => {
                self.phase = other;
                return Transition::Ignored;
            }
        };
        let steps_walked = active.steps_walked();
        let walked: Vec<Coordinate> = active.route.iter().map(|p| p.coordinate).collect();
        let walked_distance_meters = path::path_length(&walked);
        let ActiveMission {
            mission,
            started_at,
            current_steps,
            goal,
            route,
            completion_type,
            ..
        } = *active;

        if let Some(poi) = &mission.real_poi {
            if let Err(e) = self.rotation.record_seen(&poi.place_id, true) {
                warn!(place = %poi.place_id, error = %e, "failed to persist completed place");
            }
        }

        let theme = self.rotation.daily_theme();
        let context = PromptContext {
            completed: Some(RewardBrief {
                title: mission.title.clone(),
                destination: mission
                    .real_poi
                    .as_ref()
                    .map_or_else(|| mission.destination_archetype.clone(), |p| p.name.clone()),
                steps_walked,
                distance_meters: walked_distance_meters,
                completion_type,
            }),
            ..self.prompt(PromptPurpose::Reward, theme, None, None)
        };

        info!(
            mission = %mission.id,
            steps = steps_walked,
            distance = walked_distance_meters.round(),
            "mission completed"
        );
        self.phase = Phase::Completed(Box::new(CompletionRecord {
            mission,
            goal,
            final_steps: current_steps,
            steps_walked,
            walked_distance_meters,
            route,
            completion_type,
            is_generating_reward: true,
            reward_text: None,
            started_at,
            completed_at: Timestamp::now(),
        }));

        let reward = self.narrate(&context).await;
        if let Phase::Completed(record) = &mut self.phase {
            if reward.is_none() {
                debug!("using fallback reward");
            }
            record.reward_text = Some(reward.unwrap_or_else(|| FALLBACK_REWARD.to_string()));
            record.is_generating_reward = false;
        }
        Transition::Applied
    }

    /// Clears a completed mission, returning its record.
    pub fn dismiss(&mut self) -> Option<CompletionRecord> {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Completed(record) => {
                debug!(mission = %record.mission.id, "completion dismissed");
                Some(*record)
            }
            other => {
                self.phase = other;
                None
            }
        }
    }

    /// Returns to idle from any state.
    pub fn cancel(&mut self) {
        if !matches!(self.phase, Phase::Idle) {
            info!(state = ?self.state(), "cancelled");
        }
        self.phase = Phase::Idle;
        self.last_recorded = None;
        self.smoother.reset();
    }

    async fn discover(
        &mut self,
        origin: Coordinate,
        theme: &DailyTheme,
        direction: CardinalDirection,
    ) -> Option<Discovery> {
        let mut request = DiscoveryRequest::new(origin, self.discovery.config().min_rating)
            .with_theme(theme);
        request.blacklist = self.rotation.blacklist();
        request.bearing_bias = Some(direction.bearing_degrees);

        match self.discovery.discover(&request).await {
            Ok(found) => return Some(found),
            Err(e) => debug!(heading = direction.name, error = %e, "nothing in the chosen heading"),
        }

        request.bearing_bias = None;
        request.relax_blacklist = true;
        match self.discovery.discover(&request).await {
            Ok(found) => Some(found),
            Err(e) => {
                info!(error = %e, "discovery came back empty");
                None
            }
        }
    }

    /// The nearest matching place around the projected goal, on the mission heading.
    async fn snap_goal(
        &self,
        origin: Coordinate,
        projected: Coordinate,
        mission: &Mission,
    ) -> Option<PointOfInterest> {
        let config = self.discovery.config();
        let query = SearchQuery {
            origin: projected,
            category: mission.destination_type.search_category().to_string(),
            radius_meters: self.config.snap_radius_meters,
            min_rating: config.min_rating,
            max_results: config.max_results,
            open_now_only: true,
        };
        let places = match self.discovery.search().search(&query).await {
            Ok(places) => places,
            Err(e) => {
                warn!(error = %e, "goal snapping search failed");
                return None;
            }
        };

        let blacklist = self.rotation.blacklist();
        let snapped = places
            .into_iter()
            .filter(|p| !blacklist.contains(&p.place_id))
            .filter(|p| geo::distance(projected, p.coordinate) <= self.config.snap_radius_meters)
            .filter(|p| {
                geo::bearing_difference(geo::bearing(origin, p.coordinate), mission.target_bearing)
                    <= SNAP_BEARING_TOLERANCE_DEGREES
            })
            .min_by(|a, b| {
                geo::distance(projected, a.coordinate)
                    .total_cmp(&geo::distance(projected, b.coordinate))
            })
            .map(|mut poi| {
                poi.placement = Some(Placement {
                    distance_meters: geo::distance(origin, poi.coordinate),
                    bearing_degrees: geo::bearing(origin, poi.coordinate),
                });
                poi
            });
        if let Some(poi) = &snapped {
            debug!(place = %poi.place_id, name = %poi.name, "goal snapped to place");
        }
        snapped
    }

    async fn request_path(&self, origin: Coordinate, goal: Coordinate) -> Option<Vec<Coordinate>> {
        match self.directions.route(origin, goal).await {
            Ok(Some(points)) if points.len() >= 2 => {
                Some(points.into_iter().map(|p| p.coordinate).collect())
            }
            Ok(_) => {
                debug!("no street path, using straight-line distance");
                None
            }
            Err(e) => {
                warn!(error = %e, "directions failed, using straight-line distance");
                None
            }
        }
    }

    async fn describe(&self, location: Coordinate) -> Option<PlaceDescription> {
        match self.geocoder.describe(location).await {
            Ok(description) => Some(description),
            Err(e) => {
                warn!(error = %e, "reverse geocoding failed");
                None
            }
        }
    }

    /// Narrator text, or `None` on failure or blank output.
    async fn narrate(&self, context: &PromptContext) -> Option<String> {
        match self.narrator.generate(context).await {
            Ok(text) => text.filter(|t| !t.trim().is_empty()),
            Err(e) => {
                warn!(purpose = ?context.purpose, error = %e, "narrator failed");
                None
            }
        }
    }

    fn prompt(
        &mut self,
        purpose: PromptPurpose,
        theme: DailyTheme,
        direction: Option<CardinalDirection>,
        location: Option<PlaceDescription>,
    ) -> PromptContext {
        PromptContext {
            purpose,
            theme,
            seed: self.rotation.random_narrative_seed(),
            direction,
            location,
            places: Vec::new(),
            mission_count: 0,
            completed: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use uuid::Uuid;

    use crate::collaborators::CollaboratorError;
    use crate::model::DestinationType;
    use crate::offline::{CoordinateGeocoder, NoDirections, PlaceCatalog, SilentNarrator};
    use crate::storage::MemoryStore;

    struct Scripted(&'static str);

    #[async_trait::async_trait]
    impl Narrator for Scripted {
        async fn generate(&self, _context: &PromptContext) -> Result<Option<String>, CollaboratorError> {
            Ok(Some(self.0.to_string()))
        }
    }

    struct BrokenNarrator;

    #[async_trait::async_trait]
    impl Narrator for BrokenNarrator {
        async fn generate(&self, _context: &PromptContext) -> Result<Option<String>, CollaboratorError> {
            Err(CollaboratorError::Unavailable("quota exceeded".into()))
        }
    }

    /// Routes through the midpoint of the straight line.
    struct StraightDirections;

    #[async_trait::async_trait]
    impl Directions for StraightDirections {
        async fn route(
            &self,
            origin: Coordinate,
            destination: Coordinate,
        ) -> Result<Option<Vec<TimestampedCoordinate>>, CollaboratorError> {
            let half = geo::distance(origin, destination) / 2.0;
            let midpoint = geo::project(origin, half, geo::bearing(origin, destination));
            Ok(Some(
                [origin, midpoint, destination]
                    .into_iter()
                    .enumerate()
                    .map(|(i, c)| TimestampedCoordinate::new(c, i as i64))
                    .collect(),
            ))
        }
    }

    /// Directions whose path ends on the road 25 m short of the destination.
    struct ShortDirections;

    #[async_trait::async_trait]
    impl Directions for ShortDirections {
        async fn route(
            &self,
            origin: Coordinate,
            destination: Coordinate,
        ) -> Result<Option<Vec<TimestampedCoordinate>>, CollaboratorError> {
            let heading = geo::bearing(origin, destination);
            let length = geo::distance(origin, destination);
            let midpoint = geo::project(origin, length / 2.0, heading);
            let kerb = geo::project(origin, length - 25.0, heading);
            Ok(Some(
                [origin, midpoint, kerb]
                    .into_iter()
                    .enumerate()
                    .map(|(i, c)| TimestampedCoordinate::new(c, i as i64))
                    .collect(),
            ))
        }
    }

    fn origin() -> Coordinate {
        Coordinate::new(48.8566, 2.3522).unwrap()
    }

    fn orchestrator_with(
        places: Vec<PointOfInterest>,
        directions: Arc<dyn Directions>,
        narrator: Arc<dyn Narrator>,
        config: &Config,
    ) -> MissionOrchestrator {
        let collaborators = Collaborators {
            search: Arc::new(PlaceCatalog::new(places)),
            directions,
            geocoder: Arc::new(CoordinateGeocoder),
            narrator,
        };
        let rotation = RotationManager::with_seed(Box::new(MemoryStore::new()), 11);
        MissionOrchestrator::with_seed(config, collaborators, rotation, 5)
    }

    fn offline() -> MissionOrchestrator {
        orchestrator_with(
            Vec::new(),
            Arc::new(NoDirections),
            Arc::new(SilentNarrator),
            &Config::default(),
        )
    }

    fn mission(step_target: u32, target_bearing: f64) -> Mission {
        Mission {
            id: Uuid::new_v4(),
            vibe: Vibe::Chill,
            title: "Coffee north".into(),
            description: "Walk to coffee.".into(),
            step_target,
            target_bearing,
            environment_type: DestinationType::Cafe.environment(),
            destination_type: DestinationType::Cafe,
            destination_archetype: "The Warm Window".into(),
            destination_narrative: "Somewhere there is coffee.".into(),
            real_poi: None,
        }
    }

    fn place(id: &str, categories: &[&str], distance: f64, bearing: f64) -> PointOfInterest {
        PointOfInterest {
            place_id: id.into(),
            name: format!("Place {id}"),
            address: format!("{id} Street"),
            coordinate: geo::project(origin(), distance, bearing),
            categories: categories.iter().map(|c| (*c).to_string()).collect(),
            rating: Some(4.6),
            review_count: 40,
            is_open_now: Some(true),
            placement: None,
        }
    }

    fn at(coordinate: Coordinate, ms: i64) -> Option<TimestampedCoordinate> {
        Some(TimestampedCoordinate::new(coordinate, ms))
    }

    async fn start(orchestrator: &mut MissionOrchestrator, mission: Mission, steps: u64) {
        assert_eq!(orchestrator.scan(None).await.unwrap(), Transition::Applied);
        assert_eq!(
            orchestrator.select(mission, steps, origin()).await.unwrap(),
            Transition::Applied
        );
    }

    #[tokio::test]
    async fn reaching_the_step_target_completes_by_steps() {
        let mut o = offline();
        start(&mut o, mission(1_000, 0.0), 0).await;

        let active = o.update_progress(999, None).unwrap();
        assert!(!active.is_completed);

        let active = o.update_progress(1_000, None).unwrap();
        assert!(active.is_completed);
        assert_eq!(active.completion_type, CompletionType::Steps);
        assert!(!active.has_arrived);
    }

    #[tokio::test]
    async fn arriving_near_the_goal_completes_by_proximity() {
        let mut o = offline();
        start(&mut o, mission(1_000, 0.0), 0).await;
        let goal = o.active().unwrap().goal;

        let active = o
            .update_progress(200, at(geo::project(goal, 15.0, 90.0), 1))
            .unwrap();

        assert!(active.is_completed);
        assert_eq!(active.completion_type, CompletionType::Proximity);
        assert!(active.has_arrived);
    }

    #[tokio::test]
    async fn proximity_wins_when_both_conditions_are_met() {
        let mut o = offline();
        start(&mut o, mission(1_000, 0.0), 0).await;
        let goal = o.active().unwrap().goal;

        let active = o.update_progress(1_000, at(goal, 1)).unwrap();
        assert_eq!(active.completion_type, CompletionType::Proximity);
    }

    #[tokio::test]
    async fn completion_type_does_not_change_once_set() {
        let mut o = offline();
        start(&mut o, mission(1_000, 0.0), 0).await;
        let goal = o.active().unwrap().goal;

        o.update_progress(1_000, None).unwrap();
        let active = o.update_progress(1_100, at(goal, 1)).unwrap();

        assert_eq!(active.completion_type, CompletionType::Steps);
        assert!(active.has_arrived);
    }

    #[tokio::test]
    async fn arrival_stays_set_after_walking_away() {
        let mut o = offline();
        start(&mut o, mission(1_000, 0.0), 0).await;
        let goal = o.active().unwrap().goal;

        o.update_progress(200, at(goal, 1)).unwrap();
        let active = o
            .update_progress(260, at(geo::project(goal, 80.0, 180.0), 2))
            .unwrap();

        assert!(active.distance_to_goal > 20.0);
        assert!(active.has_arrived);
        assert!(active.is_completed);
    }

    #[tokio::test]
    async fn route_keeps_points_at_least_five_meters_apart() {
        let mut o = offline();
        start(&mut o, mission(1_000, 0.0), 0).await;
        let first = origin();
        let jitter = geo::project(first, 3.0, 90.0);
        let moved = geo::project(first, 6.0, 90.0);

        o.update_progress(0, at(first, 1));
        o.update_progress(4, at(jitter, 2));
        let active = o.update_progress(8, at(moved, 3)).unwrap();

        assert_eq!(active.route.len(), 2);
        assert_eq!(active.route[0].coordinate, first);
        assert_eq!(active.route[1].coordinate, moved);
    }

    #[tokio::test]
    async fn negative_step_deltas_do_not_complete() {
        let mut o = offline();
        start(&mut o, mission(1_000, 0.0), 5_000).await;

        let active = o.update_progress(100, None).unwrap();

        assert_eq!(active.steps_in_mission(), -4_900);
        assert_eq!(active.steps_walked(), 0);
        assert!(!active.is_completed);
    }

    #[tokio::test]
    async fn scan_is_ignored_while_active() {
        let mut o = offline();
        start(&mut o, mission(1_000, 0.0), 0).await;

        assert_eq!(o.scan(Some(origin())).await.unwrap(), Transition::Ignored);
        assert_eq!(o.state(), MissionState::Active);
    }

    #[tokio::test]
    async fn select_is_ignored_outside_selection() {
        let mut o = offline();
        let outcome = o.select(mission(1_000, 0.0), 0, origin()).await.unwrap();

        assert_eq!(outcome, Transition::Ignored);
        assert_eq!(o.state(), MissionState::Idle);
        assert!(o.update_progress(10, None).is_none());
    }

    #[tokio::test]
    async fn zero_step_target_is_rejected() {
        let mut o = offline();
        o.scan(None).await.unwrap();

        let err = o.select(mission(0, 0.0), 0, origin()).await.unwrap_err();

        assert_eq!(err, MissionError::InvalidStepTarget);
        assert_eq!(o.state(), MissionState::Selecting);
    }

    #[tokio::test]
    async fn cancel_returns_to_idle_from_any_state() {
        let mut o = offline();
        o.cancel();
        assert_eq!(o.state(), MissionState::Idle);

        o.scan(None).await.unwrap();
        o.cancel();
        assert_eq!(o.state(), MissionState::Idle);
        assert!(o.missions().is_empty());

        start(&mut o, mission(1_000, 0.0), 0).await;
        o.update_progress(10, at(origin(), 1));
        o.cancel();
        assert_eq!(o.state(), MissionState::Idle);
        assert!(o.active().is_none());

        // The route sampling reference is cleared too.
        start(&mut o, mission(1_000, 0.0), 0).await;
        let active = o.update_progress(10, at(origin(), 2)).unwrap();
        assert_eq!(active.route.len(), 1);
    }

    #[tokio::test]
    async fn scan_without_location_offers_two_missions_per_vibe() {
        let mut o = offline();
        o.scan(None).await.unwrap();

        let missions = o.missions();
        assert_eq!(missions.len(), 6);
        for vibe in Vibe::ALL {
            assert_eq!(missions.iter().filter(|m| m.vibe == vibe).count(), 2);
        }
        assert!(missions.iter().all(|m| m.real_poi.is_none()));
    }

    #[tokio::test]
    async fn narrator_drafts_shape_free_missions() {
        let mut o = orchestrator_with(
            Vec::new(),
            Arc::new(NoDirections),
            Arc::new(Scripted(
                r#"[{"vibe": "discovery", "title": "The Whispering Arcade",
                     "stepTarget": 2750, "destinationType": "landmark"}]"#,
            )),
            &Config::default(),
        );
        o.scan(None).await.unwrap();

        let arcade = o
            .missions()
            .iter()
            .find(|m| m.title == "The Whispering Arcade")
            .unwrap();
        assert_eq!(arcade.step_target, 2_800);
        assert_eq!(o.missions().len(), 6);
    }

    #[tokio::test]
    async fn scan_with_places_offers_real_destinations_and_remembers_them() {
        let chill = ["cafe", "park", "bakery", "bookstore", "garden"];
        let discovery = ["museum", "gallery", "landmark", "market", "library", "plaza"];
        let workout = ["park", "trail", "viewpoint", "waterfront", "garden"];
        let places = vec![
            place("c-n", &chill, 700.0, 0.0),
            place("c-s", &chill, 750.0, 180.0),
            place("d-n", &discovery, 2_000.0, 5.0),
            place("d-s", &discovery, 2_100.0, 175.0),
            place("w-n", &workout, 4_800.0, 355.0),
            place("w-s", &workout, 5_200.0, 185.0),
        ];
        let mut o = orchestrator_with(
            places,
            Arc::new(NoDirections),
            Arc::new(SilentNarrator),
            &Config::default(),
        );

        o.scan(Some(origin())).await.unwrap();

        let missions = o.missions();
        for vibe in Vibe::ALL {
            assert!(missions.iter().any(|m| m.vibe == vibe), "{vibe:?}");
        }
        let blacklist = o.rotation().blacklist();
        for m in missions {
            let poi = m.real_poi.as_ref().unwrap();
            assert!(blacklist.contains(&poi.place_id));
            assert!(m.step_target >= 100);
        }
    }

    #[tokio::test]
    async fn scan_requiring_real_places_fails_when_none_exist() {
        let mut config = Config::default();
        config.mission.require_real_places = true;
        let mut o = orchestrator_with(
            Vec::new(),
            Arc::new(NoDirections),
            Arc::new(SilentNarrator),
            &config,
        );

        let err = o.scan(Some(origin())).await.unwrap_err();

        assert_eq!(err, MissionError::NoMissionsAvailable);
        assert_eq!(o.state(), MissionState::Idle);
    }

    #[tokio::test]
    async fn missing_path_falls_back_to_straight_line() {
        let mut o = offline();
        start(&mut o, mission(1_000, 90.0), 0).await;

        let active = o.active().unwrap();
        assert!(active.street_path.is_none());
        let expected = geo::distance(origin(), active.goal);
        assert!((active.distance_to_goal - expected).abs() < 1e-6);
        assert!((active.distance_to_goal - 762.0).abs() < 0.5);
        assert_eq!(active.initial_distance, active.distance_to_goal);
    }

    #[tokio::test]
    async fn street_path_drives_distance_and_deviation() {
        let mut o = orchestrator_with(
            Vec::new(),
            Arc::new(StraightDirections),
            Arc::new(SilentNarrator),
            &Config::default(),
        );
        start(&mut o, mission(1_000, 0.0), 0).await;
        assert_eq!(o.active().unwrap().street_path.as_ref().unwrap().len(), 3);

        let astray = geo::project(origin(), 100.0, 90.0);
        let active = o.update_progress(50, at(astray, 1)).unwrap();
        assert!(active.off_path);

        assert_eq!(o.reroute().await, Transition::Applied);
        let active = o.active().unwrap();
        assert!(!active.off_path);
        assert_eq!(active.street_path.as_ref().unwrap()[0], astray);
    }

    #[tokio::test]
    async fn arrival_is_measured_to_the_goal_when_the_path_stops_short() {
        let mut o = orchestrator_with(
            Vec::new(),
            Arc::new(ShortDirections),
            Arc::new(SilentNarrator),
            &Config::default(),
        );
        start(&mut o, mission(1_000, 0.0), 0).await;
        let goal = o.active().unwrap().goal;

        let active = o
            .update_progress(200, at(geo::project(goal, 15.0, 90.0), 1))
            .unwrap();
        assert!(active.distance_to_goal > 20.0);
        assert!(active.is_completed);
        assert_eq!(active.completion_type, CompletionType::Proximity);
        assert!(active.has_arrived);
    }

    #[tokio::test]
    async fn standing_on_the_goal_arrives_despite_a_short_path() {
        let mut o = orchestrator_with(
            Vec::new(),
            Arc::new(ShortDirections),
            Arc::new(SilentNarrator),
            &Config::default(),
        );
        start(&mut o, mission(1_000, 0.0), 0).await;
        let goal = o.active().unwrap().goal;

        let active = o.update_progress(10, at(goal, 1)).unwrap();
        assert_eq!(active.completion_type, CompletionType::Proximity);
    }

    #[tokio::test]
    async fn reroute_needs_a_recorded_location() {
        let mut o = offline();
        assert_eq!(o.reroute().await, Transition::Ignored);

        start(&mut o, mission(1_000, 0.0), 0).await;
        assert_eq!(o.reroute().await, Transition::Ignored);
    }

    #[tokio::test]
    async fn goal_snaps_to_a_matching_place_on_the_heading() {
        let places = vec![
            place("snap", &["cafe"], 800.0, 95.0),
            place("park", &["park"], 762.0, 90.0),
            place("behind", &["cafe"], 700.0, 270.0),
        ];
        let mut o = orchestrator_with(
            places,
            Arc::new(NoDirections),
            Arc::new(SilentNarrator),
            &Config::default(),
        );

        start(&mut o, mission(1_000, 90.0), 0).await;

        let active = o.active().unwrap();
        let poi = active.mission.real_poi.as_ref().unwrap();
        assert_eq!(poi.place_id, "snap");
        assert_eq!(active.goal, poi.coordinate);
        assert_eq!(poi.address, "snap Street");
    }

    #[tokio::test]
    async fn reward_falls_back_when_the_narrator_fails() {
        let mut o = orchestrator_with(
            Vec::new(),
            Arc::new(NoDirections),
            Arc::new(BrokenNarrator),
            &Config::default(),
        );
        start(&mut o, mission(1_000, 0.0), 0).await;
        o.update_progress(1_000, None);

        assert_eq!(o.complete().await, Transition::Applied);

        let record = o.completion().unwrap();
        assert_eq!(record.reward_text.as_deref(), Some(FALLBACK_REWARD));
        assert!(!record.is_generating_reward);
        assert_eq!(record.final_steps, 1_000);
        assert_eq!(record.steps_walked, 1_000);
        assert_eq!(record.completion_type, CompletionType::Steps);

        let dismissed = o.dismiss().unwrap();
        assert_eq!(dismissed.mission.title, "Coffee north");
        assert_eq!(o.state(), MissionState::Idle);
        assert!(o.dismiss().is_none());
    }

    #[tokio::test]
    async fn reward_text_comes_from_the_narrator() {
        let mut o = orchestrator_with(
            Vec::new(),
            Arc::new(NoDirections),
            Arc::new(Scripted("You found the quiet corner of the city.")),
            &Config::default(),
        );
        start(&mut o, mission(1_000, 0.0), 0).await;
        let first = origin();
        let second = geo::project(first, 30.0, 0.0);
        o.update_progress(10, at(first, 1));
        o.update_progress(50, at(second, 2));

        assert_eq!(o.complete().await, Transition::Applied);

        let record = o.completion().unwrap();
        assert_eq!(
            record.reward_text.as_deref(),
            Some("You found the quiet corner of the city.")
        );
        assert_eq!(record.route.len(), 2);
        assert!((record.walked_distance_meters - 30.0).abs() < 0.01);
        assert_eq!(record.completion_type, CompletionType::None);
    }

    #[tokio::test]
    async fn completing_a_real_place_marks_it_completed() {
        let mut o = offline();
        let mut m = mission(1_000, 0.0);
        m.real_poi = Some(place("kiosk", &["cafe"], 760.0, 0.0));
        start(&mut o, m, 0).await;

        assert_eq!(o.complete().await, Transition::Applied);

        let entry = o.rotation().history().get("kiosk").unwrap();
        assert!(entry.was_completed);
    }

    #[tokio::test]
    async fn complete_is_ignored_without_an_active_mission() {
        let mut o = offline();
        assert_eq!(o.complete().await, Transition::Ignored);
        assert_eq!(o.state(), MissionState::Idle);
    }

    #[tokio::test]
    async fn raw_fixes_are_smoothed_before_recording() {
        let mut o = offline();
        start(&mut o, mission(1_000, 0.0), 0).await;

        let fix = |coordinate, timestamp_ms| RawFix {
            coordinate,
            accuracy_meters: Some(5.0),
            timestamp_ms,
        };
        o.observe_fix(0, fix(origin(), 1));
        let active = o
            .observe_fix(5, fix(geo::project(origin(), 1.0, 45.0), 2))
            .unwrap();

        assert_eq!(active.route.len(), 1);
        assert_eq!(active.route[0].coordinate, origin());
    }
}
