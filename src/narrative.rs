//! Narrative exchange with the text-generation collaborator.
//!
//! The engine hands the narrator a [`PromptContext`] and gets back free text.
//! That text is expected to hold a JSON array of drafts. Each draft is
//! validated on its own: entries with unknown vibes or destination types,
//! missing titles, or unusable step targets are dropped, and the caller
//! fills the gaps from the deterministic templates in this module.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::geo;
use crate::model::{CompletionType, DestinationType, PlaceDescription, PointOfInterest, Vibe};
use crate::rotation::{CARDINALS, CardinalDirection, DailyTheme, NarrativeSeed};

/// Reward text used whenever the narrator cannot provide one.
pub const FALLBACK_REWARD: &str =
    "Quest complete. Every step you took today is part of the map now.";

/// What the narrator is being asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum PromptPurpose {
    /// Titles and stories for missions to known places.
    PlaceMissions,
    /// Whole missions with no real place behind them.
    FreeMissions,
    /// A short reward for a finished mission.
    Reward,
}

/// Everything the narrator may use to shape its text.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptContext {
    pub purpose: PromptPurpose,
    pub theme: DailyTheme,

    /// Steering hint, forwarded untouched.
    pub seed: NarrativeSeed,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub direction: Option<CardinalDirection>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<PlaceDescription>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub places: Vec<PlaceBrief>,

    /// Number of missions wanted for [`PromptPurpose::FreeMissions`].
    pub mission_count: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<RewardBrief>,
}

/// A place the narrator should write about.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceBrief {
    pub place_id: String,
    pub name: String,
    pub vibe: Vibe,
    pub destination_type: DestinationType,
    pub distance_meters: f64,
    pub direction: &'static str,
}

impl PlaceBrief {
    pub fn new(vibe: Vibe, poi: &PointOfInterest, destination_type: DestinationType) -> Self {
        let (distance_meters, bearing) = poi
            .placement
            .map_or((0.0, 0.0), |p| (p.distance_meters, p.bearing_degrees));
        Self {
            place_id: poi.place_id.clone(),
            name: poi.name.clone(),
            vibe,
            destination_type,
            distance_meters,
            direction: compass_word(bearing),
        }
    }
}

/// A finished mission the narrator should reward.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardBrief {
    pub title: String,
    pub destination: String,
    pub steps_walked: u64,
    pub distance_meters: f64,
    pub completion_type: CompletionType,
}

/// Narrator text for a mission to a known place.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceNarrative {
    pub place_id: String,
    pub title: String,
    pub description: String,
    pub archetype: String,
    pub narrative: String,
}

/// A mission proposed by the narrator with no real place behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct MissionDraft {
    pub vibe: Vibe,
    pub title: String,
    pub description: String,
    pub step_target: u32,
    pub target_bearing: Option<f64>,
    pub destination_type: DestinationType,
    pub archetype: String,
    pub narrative: String,
}

/// Loosely typed draft as it may arrive from the narrator.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct RawDraft {
    place_id: Option<String>,
    vibe: Option<String>,
    title: Option<String>,
    description: Option<String>,
    step_target: Option<Value>,
    target_bearing: Option<Value>,
    destination_type: Option<String>,
    destination_archetype: Option<String>,
    destination_narrative: Option<String>,
}

/// Rounds a raw step count to the nearest 100, minimum 100.
///
/// Non-finite and non-positive values are rejected.
pub fn round_step_target(raw: f64) -> Option<u32> {
    if !raw.is_finite() || raw <= 0.0 {
        return None;
    }
    let rounded = ((raw / 100.0).round() * 100.0).clamp(100.0, f64::from(u32::MAX));
    // Clamped into u32 range above.
    Some(rounded as u32)
}

/// Parses narratives for known places; entries for unknown ids or without a title are dropped.
pub fn parse_place_narratives(text: &str, known_ids: &[&str]) -> Vec<PlaceNarrative> {
    raw_drafts(text)
        .into_iter()
        .filter_map(|raw| {
            let place_id = raw.place_id.filter(|id| known_ids.contains(&id.as_str()))?;
            let title = non_empty(raw.title)?;
            Some(PlaceNarrative {
                place_id,
                title,
                description: non_empty(raw.description).unwrap_or_default(),
                archetype: non_empty(raw.destination_archetype).unwrap_or_default(),
                narrative: non_empty(raw.destination_narrative).unwrap_or_default(),
            })
        })
        .collect()
}

/// Parses free mission drafts, validating each against the closed enumerations.
pub fn parse_mission_drafts(text: &str) -> Vec<MissionDraft> {
    raw_drafts(text)
        .into_iter()
        .enumerate()
        .filter_map(|(index, raw)| {
            let draft = validate_draft(raw);
            if draft.is_none() {
                debug!(index, "discarding invalid mission draft");
            }
            draft
        })
        .collect()
}

fn validate_draft(raw: RawDraft) -> Option<MissionDraft> {
    let vibe = Vibe::parse(raw.vibe.as_deref()?)?;
    let destination_type = DestinationType::parse(raw.destination_type.as_deref()?)?;
    let title = non_empty(raw.title)?;
    let step_target = round_step_target(number(raw.step_target.as_ref()?)?)?;
    let target_bearing = raw
        .target_bearing
        .as_ref()
        .and_then(number)
        .filter(|b| b.is_finite())
        .map(geo::normalize_bearing);

    Some(MissionDraft {
        vibe,
        title,
        description: non_empty(raw.description).unwrap_or_default(),
        step_target,
        target_bearing,
        destination_type,
        archetype: non_empty(raw.destination_archetype).unwrap_or_default(),
        narrative: non_empty(raw.destination_narrative).unwrap_or_default(),
    })
}

/// Finds the outermost JSON array in `text` and decodes its objects.
///
/// Elements that are not objects are skipped.
fn raw_drafts(text: &str) -> Vec<RawDraft> {
    let (Some(start), Some(end)) = (text.find('['), text.rfind(']')) else {
        return Vec::new();
    };
    if end < start {
        return Vec::new();
    }
    let Ok(values) = serde_json::from_str::<Vec<Value>>(&text[start..=end]) else {
        debug!("narrator response is not a JSON array");
        return Vec::new();
    };
    values
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|v| serde_json::from_value(v).ok())
        .collect()
}

/// Accepts numbers and numeric strings such as `"2,500"`.
fn number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().replace(',', "").parse().ok(),
        _ => None,
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

/// Compass word for a bearing, in eight sectors.
pub fn compass_word(bearing: f64) -> &'static str {
    const WORDS: [&str; 8] = [
        "north",
        "northeast",
        "east",
        "southeast",
        "south",
        "southwest",
        "west",
        "northwest",
    ];
    let sector = (geo::normalize_bearing(bearing + 22.5) / 45.0).floor();
    // normalize_bearing keeps the value in [0, 360), so sector is in 0..8.
    WORDS[(sector as usize) % WORDS.len()]
}

/// Template text for a mission to a known place.
pub fn template_place_narrative(
    poi: &PointOfInterest,
    vibe: Vibe,
    destination_type: DestinationType,
) -> PlaceNarrative {
    let direction = poi
        .placement
        .map_or("ahead", |p| compass_word(p.bearing_degrees));
    let (title, archetype) = match vibe {
        Vibe::Chill => (format!("A short stroll to {}", poi.name), "The Nearby Pause"),
        Vibe::Discovery => (format!("Uncover {}", poi.name), "The Unexplored Corner"),
        Vibe::Workout => (format!("The long road to {}", poi.name), "The Distant Marker"),
    };
    PlaceNarrative {
        place_id: poi.place_id.clone(),
        title,
        description: format!(
            "Head {direction} to reach this {} and see what the walk reveals.",
            destination_type.search_category()
        ),
        archetype: archetype.to_string(),
        narrative: format!(
            "Somewhere {direction} of you, {} is waiting to be found.",
            poi.name
        ),
    }
}

struct Template {
    title: &'static str,
    description: &'static str,
    destination_type: DestinationType,
    archetype: &'static str,
    narrative: &'static str,
}

const CHILL_TEMPLATES: [Template; 2] = [
    Template {
        title: "The Corner Cup",
        description: "Wander to the nearest spot where someone is pouring coffee.",
        destination_type: DestinationType::Cafe,
        archetype: "The Warm Window",
        narrative: "Follow the first street that smells of something baking.",
    },
    Template {
        title: "Pocket of Green",
        description: "Find a patch of grass or a tree worth standing under.",
        destination_type: DestinationType::Park,
        archetype: "The Quiet Bench",
        narrative: "Somewhere close, the city lets a little nature in.",
    },
];

const DISCOVERY_TEMPLATES: [Template; 2] = [
    Template {
        title: "The Storied Facade",
        description: "Seek out a building that looks older than its neighbors.",
        destination_type: DestinationType::Landmark,
        archetype: "The Keeper of Dates",
        narrative: "Look up: the cornices remember a different city.",
    },
    Template {
        title: "Square Dance",
        description: "Walk until the streets open into a public square.",
        destination_type: DestinationType::Plaza,
        archetype: "The Gathering Place",
        narrative: "Every neighborhood has a room without a roof.",
    },
];

const WORKOUT_TEMPLATES: [Template; 2] = [
    Template {
        title: "Horizon Chaser",
        description: "Keep walking until you reach a view worth the climb.",
        destination_type: DestinationType::Viewpoint,
        archetype: "The High Edge",
        narrative: "The city looks different from above.",
    },
    Template {
        title: "To the Water",
        description: "Follow the slope down until you meet the water.",
        destination_type: DestinationType::Waterfront,
        archetype: "The Shoreline",
        narrative: "All streets lead somewhere wet eventually.",
    },
];

/// Default step target for template missions of a vibe.
pub fn template_step_target(vibe: Vibe) -> u32 {
    match vibe {
        Vibe::Chill => 1_000,
        Vibe::Discovery => 3_000,
        Vibe::Workout => 6_500,
    }
}

/// The `slot`-th template draft for a vibe. Deterministic in `(vibe, slot)`.
pub fn template_draft(vibe: Vibe, slot: usize) -> MissionDraft {
    let (templates, offset) = match vibe {
        Vibe::Chill => (&CHILL_TEMPLATES, 0),
        Vibe::Discovery => (&DISCOVERY_TEMPLATES, 1),
        Vibe::Workout => (&WORKOUT_TEMPLATES, 2),
    };
    let template = &templates[slot % templates.len()];
    MissionDraft {
        vibe,
        title: template.title.to_string(),
        description: template.description.to_string(),
        step_target: template_step_target(vibe),
        target_bearing: Some(CARDINALS[(offset + slot) % CARDINALS.len()].bearing_degrees),
        destination_type: template.destination_type,
        archetype: template.archetype.to_string(),
        narrative: template.narrative.to_string(),
    }
}
