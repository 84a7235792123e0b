//! Mission types: the quest template, its live state, and its completion record.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Coordinate, PointOfInterest, TimestampedCoordinate};

/// The feel of a mission, paired with a distance band when searching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vibe {
    /// Short stroll, roughly 500 m to 1 km.
    Chill,
    /// Exploratory walk, roughly 1.5 to 3 km.
    Discovery,
    /// Long walk, roughly 4 to 6 km.
    Workout,
}

impl Vibe {
    pub const ALL: [Vibe; 3] = [Vibe::Chill, Vibe::Discovery, Vibe::Workout];

    /// Parses a vibe name, ignoring case and surrounding whitespace.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chill" => Some(Self::Chill),
            "discovery" => Some(Self::Discovery),
            "workout" => Some(Self::Workout),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Chill => "chill",
            Self::Discovery => "discovery",
            Self::Workout => "workout",
        }
    }
}

/// The broad surroundings a mission passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvironmentType {
    Urban,
    Green,
    Waterfront,
    Cultural,
}

/// The closed set of destination kinds a mission can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DestinationType {
    Cafe,
    Park,
    Garden,
    Museum,
    Gallery,
    Landmark,
    Viewpoint,
    Waterfront,
    Market,
    Library,
    Bookstore,
    Plaza,
    Trail,
}

impl DestinationType {
    pub const ALL: [DestinationType; 13] = [
        Self::Cafe,
        Self::Park,
        Self::Garden,
        Self::Museum,
        Self::Gallery,
        Self::Landmark,
        Self::Viewpoint,
        Self::Waterfront,
        Self::Market,
        Self::Library,
        Self::Bookstore,
        Self::Plaza,
        Self::Trail,
    ];

    /// Parses a destination type name, accepting spaces or hyphens for underscores.
    pub fn parse(s: &str) -> Option<Self> {
        let normalized = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|t| t.search_category() == normalized)
    }

    /// The category string used when searching for this kind of place.
    pub fn search_category(self) -> &'static str {
        match self {
            Self::Cafe => "cafe",
            Self::Park => "park",
            Self::Garden => "garden",
            Self::Museum => "museum",
            Self::Gallery => "gallery",
            Self::Landmark => "landmark",
            Self::Viewpoint => "viewpoint",
            Self::Waterfront => "waterfront",
            Self::Market => "market",
            Self::Library => "library",
            Self::Bookstore => "bookstore",
            Self::Plaza => "plaza",
            Self::Trail => "trail",
        }
    }

    /// Derives the destination type from provider category tags.
    ///
    /// Tags are checked in order; the first recognised tag wins.
    pub fn from_categories(categories: &[String]) -> Option<Self> {
        categories.iter().find_map(|tag| {
            Self::parse(tag).or(match tag.to_ascii_lowercase().as_str() {
                "coffee_shop" | "bakery" | "tea_house" => Some(Self::Cafe),
                "art_gallery" => Some(Self::Gallery),
                "book_store" => Some(Self::Bookstore),
                "tourist_attraction" | "monument" | "historic_site" => Some(Self::Landmark),
                "hiking_area" | "nature_reserve" => Some(Self::Trail),
                "botanical_garden" => Some(Self::Garden),
                "farmers_market" => Some(Self::Market),
                "beach" | "marina" | "pier" => Some(Self::Waterfront),
                "square" => Some(Self::Plaza),
                _ => None,
            })
        })
    }

    pub fn environment(self) -> EnvironmentType {
        match self {
            Self::Park | Self::Garden | Self::Trail | Self::Viewpoint => EnvironmentType::Green,
            Self::Waterfront => EnvironmentType::Waterfront,
            Self::Museum | Self::Gallery | Self::Landmark | Self::Library => {
                EnvironmentType::Cultural
            }
            Self::Cafe | Self::Market | Self::Bookstore | Self::Plaza => EnvironmentType::Urban,
        }
    }
}

/// An immutable quest template produced when scanning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mission {
    pub id: Uuid,
    pub vibe: Vibe,
    pub title: String,
    pub description: String,

    /// Steps to walk; always positive.
    pub step_target: u32,

    /// Degrees clockwise from true north in `[0, 360)`.
    pub target_bearing: f64,

    pub environment_type: EnvironmentType,
    pub destination_type: DestinationType,
    pub destination_archetype: String,
    pub destination_narrative: String,

    #[serde(default)]
    pub real_poi: Option<PointOfInterest>,
}

/// Which signal completed a mission.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionType {
    #[default]
    None,
    Steps,
    Proximity,
}

/// A mission being walked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveMission {
    pub mission: Mission,
    pub started_at: Timestamp,
    pub steps_at_start: u64,
    pub current_steps: u64,
    pub goal: Coordinate,
    pub distance_to_goal: f64,

    /// Distance to the goal when the mission was selected.
    pub initial_distance: f64,

    /// Recorded walk, append-only.
    pub route: Vec<TimestampedCoordinate>,

    /// Street-following path to the goal, when directions were available.
    pub street_path: Option<Vec<Coordinate>>,

    /// Whether the last location update strayed from the street path.
    pub off_path: bool,

    /// Set on the first update within the arrival radius and never cleared.
    pub has_arrived: bool,
    pub completion_type: CompletionType,
    pub is_completed: bool,
}

impl ActiveMission {
    /// Steps since selection. Negative if the step counter reset mid-mission.
    pub fn steps_in_mission(&self) -> i64 {
        self.current_steps as i64 - self.steps_at_start as i64
    }

    /// Steps since selection, clamped at zero for display.
    pub fn steps_walked(&self) -> u64 {
        self.steps_in_mission().max(0).unsigned_abs()
    }

    /// How far along the mission is, in `[0, 1]`.
    ///
    /// The larger of step progress and distance progress.
    pub fn progress_fraction(&self) -> f64 {
        if self.is_completed {
            return 1.0;
        }
        let steps = self.steps_walked() as f64 / f64::from(self.mission.step_target);
        let distance = if self.initial_distance > 0.0 {
            1.0 - self.distance_to_goal / self.initial_distance
        } else {
            0.0
        };
        steps.max(distance).clamp(0.0, 1.0)
    }
}

/// What remains of a mission once it is completed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRecord {
    pub mission: Mission,
    pub goal: Coordinate,
    pub final_steps: u64,
    pub steps_walked: u64,
    pub walked_distance_meters: f64,
    pub route: Vec<TimestampedCoordinate>,
    pub completion_type: CompletionType,
    pub is_generating_reward: bool,
    pub reward_text: Option<String>,
    pub started_at: Timestamp,
    pub completed_at: Timestamp,
}
