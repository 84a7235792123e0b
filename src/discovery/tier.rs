//! Tier plans: what each vibe searches for and how far.

use crate::model::Vibe;

/// Search plan for one vibe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TierPlan {
    pub vibe: Vibe,

    /// Places closer than this are too short a walk for the tier.
    pub min_distance_meters: f64,

    /// Radius of the first search.
    pub near_radius_meters: f64,

    /// Radius of the second search.
    pub far_radius_meters: f64,

    /// Half-width of the window around a bearing bias.
    pub bearing_tolerance_degrees: f64,

    /// Categories the two searches are drawn from.
    pub categories: &'static [&'static str],
}

pub const TIERS: [TierPlan; 3] = [
    TierPlan {
        vibe: Vibe::Chill,
        min_distance_meters: 500.0,
        near_radius_meters: 800.0,
        far_radius_meters: 1_000.0,
        bearing_tolerance_degrees: 60.0,
        categories: &["cafe", "park", "bakery", "bookstore", "garden"],
    },
    TierPlan {
        vibe: Vibe::Discovery,
        min_distance_meters: 1_500.0,
        near_radius_meters: 2_200.0,
        far_radius_meters: 3_000.0,
        bearing_tolerance_degrees: 70.0,
        categories: &["museum", "gallery", "landmark", "market", "library", "plaza"],
    },
    TierPlan {
        vibe: Vibe::Workout,
        min_distance_meters: 4_000.0,
        near_radius_meters: 5_000.0,
        far_radius_meters: 6_000.0,
        bearing_tolerance_degrees: 80.0,
        categories: &["park", "trail", "viewpoint", "waterfront", "garden"],
    },
];

/// The plan for a vibe.
pub fn plan_for(vibe: Vibe) -> &'static TierPlan {
    match vibe {
        Vibe::Chill => &TIERS[0],
        Vibe::Discovery => &TIERS[1],
        Vibe::Workout => &TIERS[2],
    }
}
