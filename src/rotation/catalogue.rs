//! Fixed catalogues that rotation draws from.

use serde::Serialize;

/// A theme for the day: how strongly each place category is favored.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTheme {
    pub name: &'static str,
    pub tagline: &'static str,

    /// Multipliers applied to ranking; unlisted categories weigh 1.0.
    pub category_weights: &'static [(&'static str, f64)],
}

impl DailyTheme {
    pub fn weight(&self, category: &str) -> f64 {
        self.category_weights
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(category))
            .map_or(1.0, |(_, w)| *w)
    }
}

pub const THEMES: [DailyTheme; 7] = [
    DailyTheme {
        name: "Green Escape",
        tagline: "Trade pavement for leaves.",
        category_weights: &[
            ("park", 1.6),
            ("garden", 1.5),
            ("trail", 1.4),
            ("cafe", 0.8),
        ],
    },
    DailyTheme {
        name: "Coffee Crawl",
        tagline: "Follow the smell of roasting beans.",
        category_weights: &[
            ("cafe", 1.8),
            ("bakery", 1.4),
            ("bookstore", 1.2),
            ("market", 1.1),
        ],
    },
    DailyTheme {
        name: "Culture Day",
        tagline: "Every wall has a story.",
        category_weights: &[
            ("museum", 1.7),
            ("gallery", 1.6),
            ("landmark", 1.3),
            ("library", 1.2),
        ],
    },
    DailyTheme {
        name: "Waterfront Wander",
        tagline: "Walk until you hear water.",
        category_weights: &[("waterfront", 1.8), ("viewpoint", 1.4), ("park", 1.1)],
    },
    DailyTheme {
        name: "Market Day",
        tagline: "Where the neighborhood trades.",
        category_weights: &[("market", 1.8), ("plaza", 1.4), ("cafe", 1.2)],
    },
    DailyTheme {
        name: "High Ground",
        tagline: "Climb for the view.",
        category_weights: &[("viewpoint", 1.8), ("trail", 1.5), ("landmark", 1.2)],
    },
    DailyTheme {
        name: "Quiet Corners",
        tagline: "Find the places people whisper in.",
        category_weights: &[("library", 1.6), ("bookstore", 1.5), ("garden", 1.3)],
    },
];

/// A coarse heading used to frame a quest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CardinalDirection {
    pub name: &'static str,
    pub bearing_degrees: f64,
}

pub const CARDINALS: [CardinalDirection; 4] = [
    CardinalDirection {
        name: "north",
        bearing_degrees: 0.0,
    },
    CardinalDirection {
        name: "east",
        bearing_degrees: 90.0,
    },
    CardinalDirection {
        name: "south",
        bearing_degrees: 180.0,
    },
    CardinalDirection {
        name: "west",
        bearing_degrees: 270.0,
    },
];

/// A steering hint forwarded verbatim to the narrator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrativeSeed {
    pub focus: &'static str,
    pub instruction: &'static str,
}

pub const NARRATIVE_SEEDS: [NarrativeSeed; 7] = [
    NarrativeSeed {
        focus: "sensory detail",
        instruction: "Describe what the walker will hear, smell, and feel on the way.",
    },
    NarrativeSeed {
        focus: "history",
        instruction: "Hint at what stood here before and who walked these streets.",
    },
    NarrativeSeed {
        focus: "architecture",
        instruction: "Point the walker at facades, rooflines, and doorways worth a look.",
    },
    NarrativeSeed {
        focus: "local character",
        instruction: "Frame the destination through the people who make it theirs.",
    },
    NarrativeSeed {
        focus: "hidden detail",
        instruction: "Promise one small thing most passers-by never notice.",
    },
    NarrativeSeed {
        focus: "emotional arc",
        instruction: "Give the walk a beginning, a turn, and a quiet payoff.",
    },
    NarrativeSeed {
        focus: "cultural meaning",
        instruction: "Explain why this kind of place matters to the city around it.",
    },
];
