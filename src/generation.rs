//! Mission generation: turn discovered places or narrator drafts into missions.

use uuid::Uuid;

use crate::discovery::Discovery;
use crate::geo;
use crate::model::{Coordinate, DestinationType, Mission, PointOfInterest, Vibe};
use crate::narrative::{
    self, MissionDraft, PlaceNarrative, round_step_target, template_draft,
    template_place_narrative, template_step_target,
};

/// Missions offered per vibe when no real places are known.
pub const MISSIONS_PER_VIBE: usize = 2;

/// Destination type assumed for a place whose tags are unrecognised.
pub fn default_destination(vibe: Vibe) -> DestinationType {
    match vibe {
        Vibe::Chill => DestinationType::Cafe,
        Vibe::Discovery => DestinationType::Landmark,
        Vibe::Workout => DestinationType::Park,
    }
}

/// The destination type of a discovered place.
pub fn destination_of(vibe: Vibe, poi: &PointOfInterest) -> DestinationType {
    DestinationType::from_categories(&poi.categories).unwrap_or_else(|| default_destination(vibe))
}

/// One mission per discovered place, in tier order.
///
/// Narrator text is used where it exists for a place; the rest comes from templates.
pub fn place_missions(
    origin: Coordinate,
    discovery: &Discovery,
    narratives: &[PlaceNarrative],
    stride_meters: f64,
) -> Vec<Mission> {
    discovery
        .places()
        .map(|(vibe, poi)| {
            let destination_type = destination_of(vibe, poi);
            let (distance, bearing) = poi.placement.map_or_else(
                || {
                    (
                        geo::distance(origin, poi.coordinate),
                        geo::bearing(origin, poi.coordinate),
                    )
                },
                |p| (p.distance_meters, p.bearing_degrees),
            );
            let step_target = round_step_target(distance / stride_meters)
                .unwrap_or_else(|| template_step_target(vibe));

            let text = merge_narrative(
                template_place_narrative(poi, vibe, destination_type),
                narratives.iter().find(|n| n.place_id == poi.place_id),
            );

            Mission {
                id: Uuid::new_v4(),
                vibe,
                title: text.title,
                description: text.description,
                step_target,
                target_bearing: bearing,
                environment_type: destination_type.environment(),
                destination_type,
                destination_archetype: text.archetype,
                destination_narrative: text.narrative,
                real_poi: Some(poi.clone()),
            }
        })
        .collect()
}

/// Up to [`MISSIONS_PER_VIBE`] missions per vibe from narrator drafts,
/// topped up from templates.
///
/// Drafts without a bearing head toward `default_bearing`.
pub fn free_missions(drafts: Vec<MissionDraft>, default_bearing: f64) -> Vec<Mission> {
    let mut missions = Vec::with_capacity(Vibe::ALL.len() * MISSIONS_PER_VIBE);
    for vibe in Vibe::ALL {
        let mut chosen: Vec<MissionDraft> = drafts
            .iter()
            .filter(|d| d.vibe == vibe)
            .take(MISSIONS_PER_VIBE)
            .cloned()
            .collect();
        let mut slot = 0;
        while chosen.len() < MISSIONS_PER_VIBE {
            let template = template_draft(vibe, slot);
            slot += 1;
            if chosen.iter().all(|d| d.title != template.title) {
                chosen.push(template);
            }
        }
        missions.extend(
            chosen
                .into_iter()
                .map(|draft| mission_from_draft(draft, default_bearing)),
        );
    }
    missions
}

fn mission_from_draft(draft: MissionDraft, default_bearing: f64) -> Mission {
    let template = template_draft(draft.vibe, 0);
    Mission {
        id: Uuid::new_v4(),
        vibe: draft.vibe,
        title: draft.title,
        description: or_else(draft.description, template.description),
        step_target: draft.step_target,
        target_bearing: geo::normalize_bearing(draft.target_bearing.unwrap_or(default_bearing)),
        environment_type: draft.destination_type.environment(),
        destination_type: draft.destination_type,
        destination_archetype: or_else(draft.archetype, template.archetype),
        destination_narrative: or_else(draft.narrative, template.narrative),
        real_poi: None,
    }
}

fn merge_narrative(template: PlaceNarrative, generated: Option<&PlaceNarrative>) -> PlaceNarrative {
    let Some(generated) = generated else {
        return template;
    };
    PlaceNarrative {
        place_id: template.place_id,
        title: or_else(generated.title.clone(), template.title),
        description: or_else(generated.description.clone(), template.description),
        archetype: or_else(generated.archetype.clone(), template.archetype),
        narrative: or_else(generated.narrative.clone(), template.narrative),
    }
}

fn or_else(value: String, fallback: String) -> String {
    if value.is_empty() { fallback } else { value }
}

/// Place ids in a discovery, for validating narrator output.
pub fn place_ids(discovery: &Discovery) -> Vec<&str> {
    discovery
        .places()
        .map(|(_, p)| p.place_id.as_str())
        .collect()
}

/// Briefs for every discovered place.
pub fn place_briefs(discovery: &Discovery) -> Vec<narrative::PlaceBrief> {
    discovery
        .places()
        .map(|(vibe, poi)| narrative::PlaceBrief::new(vibe, poi, destination_of(vibe, poi)))
        .collect()
}
