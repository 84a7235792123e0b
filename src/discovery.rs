//! Destination discovery: find up to two real places per tier.
//!
//! Each tier runs two searches (six in total, all in flight at once), then
//! filters the merged results in a fixed order:
//!
//! 1. rating at least `min_rating`, not known to be closed, far enough for the tier
//! 2. not in the blacklist
//! 3. within the tier's bearing window when a bias is given
//! 4. shuffled
//! 5. ranked by `rating × category weight` plus a small random jitter
//! 6. the top two kept
//!
//! A place picked by an earlier tier is not offered again by a later one.

mod tier;

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::collaborators::{PlaceSearch, SearchQuery};
use crate::config::DiscoveryConfig;
use crate::geo;
use crate::model::{Coordinate, DestinationType, Placement, PointOfInterest, Vibe};
use crate::rotation::DailyTheme;

pub use tier::{TIERS, TierPlan, plan_for};

/// Places selected per tier.
pub const PLACES_PER_TIER: usize = 2;

/// Raised when no tier produced a single place.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DiscoveryError {
    #[error("no destinations found in any tier")]
    NoDestinations,
}

/// What to search around and what to avoid.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryRequest {
    pub origin: Coordinate,
    pub min_rating: f64,

    /// Preferred heading in degrees; places outside the tier window are dropped.
    pub bearing_bias: Option<f64>,

    pub blacklist: HashSet<String>,

    /// Ranking multipliers by category; missing categories weigh 1.0.
    pub category_weights: HashMap<String, f64>,

    /// Let a tier fall back to blacklisted places when nothing else survives.
    pub relax_blacklist: bool,
}

impl DiscoveryRequest {
    pub fn new(origin: Coordinate, min_rating: f64) -> Self {
        Self {
            origin,
            min_rating,
            bearing_bias: None,
            blacklist: HashSet::new(),
            category_weights: HashMap::new(),
            relax_blacklist: false,
        }
    }

    /// Uses the theme's category weights for ranking and search choice.
    pub fn with_theme(mut self, theme: &DailyTheme) -> Self {
        self.category_weights = theme
            .category_weights
            .iter()
            .map(|(category, weight)| ((*category).to_string(), *weight))
            .collect();
        self
    }

    fn weight(&self, category: &str) -> Option<f64> {
        self.category_weights
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(category))
            .map(|(_, w)| *w)
    }
}

/// The places chosen for each tier.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Discovery {
    pub chill: Vec<PointOfInterest>,
    pub discovery: Vec<PointOfInterest>,
    pub workout: Vec<PointOfInterest>,

    /// Percentage of selected places not in the blacklist.
    pub variety_score: u8,
}

impl Discovery {
    pub fn tier(&self, vibe: Vibe) -> &[PointOfInterest] {
        match vibe {
            Vibe::Chill => &self.chill,
            Vibe::Discovery => &self.discovery,
            Vibe::Workout => &self.workout,
        }
    }

    fn tier_mut(&mut self, vibe: Vibe) -> &mut Vec<PointOfInterest> {
        match vibe {
            Vibe::Chill => &mut self.chill,
            Vibe::Discovery => &mut self.discovery,
            Vibe::Workout => &mut self.workout,
        }
    }

    /// Every selected place with its tier, in tier order.
    pub fn places(&self) -> impl Iterator<Item = (Vibe, &PointOfInterest)> {
        Vibe::ALL
            .into_iter()
            .flat_map(move |vibe| self.tier(vibe).iter().map(move |poi| (vibe, poi)))
    }

    pub fn len(&self) -> usize {
        self.chill.len() + self.discovery.len() + self.workout.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Multi-tier place search with randomized ranking.
pub struct DiscoveryEngine {
    search: Arc<dyn PlaceSearch>,
    config: DiscoveryConfig,
    rng: StdRng,
}

impl DiscoveryEngine {
    pub fn new(search: Arc<dyn PlaceSearch>, config: DiscoveryConfig) -> Self {
        Self::with_rng(search, config, StdRng::from_entropy())
    }

    /// An engine whose shuffles and jitter are reproducible.
    pub fn with_seed(search: Arc<dyn PlaceSearch>, config: DiscoveryConfig, seed: u64) -> Self {
        Self::with_rng(search, config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(search: Arc<dyn PlaceSearch>, config: DiscoveryConfig, rng: StdRng) -> Self {
        Self {
            search,
            config,
            rng,
        }
    }

    /// The search collaborator, shared with goal snapping.
    pub fn search(&self) -> &Arc<dyn PlaceSearch> {
        &self.search
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Runs all six searches concurrently and selects up to two places per tier.
    ///
    /// Search failures count as empty results. Fails only when every tier is empty.
    pub async fn discover(&mut self, request: &DiscoveryRequest) -> Result<Discovery, DiscoveryError> {
        let [chill, discovery, workout] =
            TIERS.map(|plan| self.tier_queries(&plan, request));

        let search = self.search.as_ref();
        let (chill, discovery, workout) = tokio::join!(
            search_tier(search, &chill),
            search_tier(search, &discovery),
            search_tier(search, &workout),
        );

        let mut result = Discovery::default();
        let mut taken: HashSet<String> = HashSet::new();
        for (plan, candidates) in TIERS.iter().zip([chill, discovery, workout]) {
            let selected = self.select(plan, candidates, request, &taken);
            debug!(
                vibe = plan.vibe.label(),
                selected = selected.len(),
                "tier selection"
            );
            taken.extend(selected.iter().map(|p| p.place_id.clone()));
            *result.tier_mut(plan.vibe) = selected;
        }

        if result.is_empty() {
            info!("discovery found no destinations");
            return Err(DiscoveryError::NoDestinations);
        }

        result.variety_score = variety_score(result.places().map(|(_, p)| p), &request.blacklist);
        info!(
            places = result.len(),
            variety = result.variety_score,
            "discovery complete"
        );
        Ok(result)
    }

    /// Two queries: the two categories the weights favor most, ties broken randomly.
    fn tier_queries(&mut self, plan: &TierPlan, request: &DiscoveryRequest) -> [SearchQuery; 2] {
        let mut ranked: Vec<(f64, f64, &str)> = plan
            .categories
            .iter()
            .map(|c| (request.weight(c).unwrap_or(1.0), self.rng.r#gen::<f64>(), *c))
            .collect();
        ranked.sort_by(|a, b| b.0.total_cmp(&a.0).then(b.1.total_cmp(&a.1)));

        let query = |category: &str, radius_meters: f64| SearchQuery {
            origin: request.origin,
            category: category.to_string(),
            radius_meters,
            min_rating: request.min_rating,
            max_results: self.config.max_results,
            open_now_only: true,
        };
        [
            query(ranked[0].2, plan.near_radius_meters),
            query(ranked[1].2, plan.far_radius_meters),
        ]
    }

    fn select(
        &mut self,
        plan: &TierPlan,
        candidates: Vec<PointOfInterest>,
        request: &DiscoveryRequest,
        taken: &HashSet<String>,
    ) -> Vec<PointOfInterest> {
        let mut seen = HashSet::new();
        let qualified: Vec<PointOfInterest> = candidates
            .into_iter()
            .filter(|p| !taken.contains(&p.place_id) && seen.insert(p.place_id.clone()))
            .map(|p| with_placement(p, request.origin))
            .filter(|p| qualifies(p, request.min_rating, plan.min_distance_meters))
            .collect();

        let in_window = |p: &PointOfInterest| {
            request.bearing_bias.is_none_or(|bias| {
                p.placement.is_some_and(|pl| {
                    geo::bearing_difference(pl.bearing_degrees, bias)
                        <= plan.bearing_tolerance_degrees
                })
            })
        };

        let mut survivors: Vec<PointOfInterest> = qualified
            .iter()
            .filter(|p| !request.blacklist.contains(&p.place_id) && in_window(p))
            .cloned()
            .collect();

        if survivors.is_empty() && request.relax_blacklist {
            survivors = qualified.into_iter().filter(|p| in_window(p)).collect();
            if !survivors.is_empty() {
                debug!(
                    vibe = plan.vibe.label(),
                    "blacklist emptied tier, reusing recent places"
                );
            }
        }

        survivors.shuffle(&mut self.rng);

        let jitter = self.config.rank_jitter;
        let mut scored: Vec<(f64, PointOfInterest)> = survivors
            .into_iter()
            .map(|p| {
                let noise = if jitter > 0.0 {
                    self.rng.gen_range(-jitter..=jitter)
                } else {
                    0.0
                };
                (score(&p, request) + noise, p)
            })
            .collect();
        scored.sort_by(|a, b| b.0.total_cmp(&a.0));

        scored
            .into_iter()
            .take(PLACES_PER_TIER)
            .map(|(_, p)| p)
            .collect()
    }
}

/// Runs a tier's two searches concurrently and merges the results.
async fn search_tier(search: &dyn PlaceSearch, queries: &[SearchQuery; 2]) -> Vec<PointOfInterest> {
    let (first, second) = tokio::join!(run_query(search, &queries[0]), run_query(search, &queries[1]));
    let mut merged = first;
    merged.extend(second);
    merged
}

async fn run_query(search: &dyn PlaceSearch, query: &SearchQuery) -> Vec<PointOfInterest> {
    match search.search(query).await {
        Ok(places) => places,
        Err(e) => {
            warn!(
                category = %query.category,
                radius = query.radius_meters,
                error = %e,
                "place search failed, treating as empty"
            );
            Vec::new()
        }
    }
}

fn with_placement(mut poi: PointOfInterest, origin: Coordinate) -> PointOfInterest {
    poi.placement = Some(Placement {
        distance_meters: geo::distance(origin, poi.coordinate),
        bearing_degrees: geo::bearing(origin, poi.coordinate),
    });
    poi
}

fn qualifies(poi: &PointOfInterest, min_rating: f64, min_distance: f64) -> bool {
    let rated = poi.rating.is_some_and(|r| r >= min_rating);
    let open = poi.is_open_now != Some(false);
    let far_enough = poi
        .placement
        .is_some_and(|p| p.distance_meters >= min_distance);
    rated && open && far_enough
}

/// `rating × weight`, where weight is the largest weight among the place's
/// tags and its derived destination type.
fn score(poi: &PointOfInterest, request: &DiscoveryRequest) -> f64 {
    let derived = DestinationType::from_categories(&poi.categories).map(DestinationType::search_category);
    let weight = poi
        .categories
        .iter()
        .map(String::as_str)
        .chain(derived)
        .filter_map(|c| request.weight(c))
        .reduce(f64::max)
        .unwrap_or(1.0);
    poi.rating.unwrap_or(0.0) * weight
}

/// `round(100 × fresh / total)`, or 0 for an empty selection.
pub fn variety_score<'a>(
    selected: impl Iterator<Item = &'a PointOfInterest>,
    blacklist: &HashSet<String>,
) -> u8 {
    let (total, fresh) = selected.fold((0usize, 0usize), |(total, fresh), p| {
        (total + 1, fresh + usize::from(!blacklist.contains(&p.place_id)))
    });
    if total == 0 {
        return 0;
    }
    let percent = (100.0 * fresh as f64 / total as f64).round();
    // fresh <= total, so percent is within [0, 100].
    u8::try_from(percent as u64).unwrap_or(100)
}
