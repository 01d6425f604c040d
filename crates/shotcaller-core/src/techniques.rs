//! Technique library: nested map of style category -> singles/combos.
//!
//! This is the data provider interface for the pool builder. Entries are
//! either plain strings or `{ text, favorite }` objects; favorites get a
//! selection boost when the pool is built. The built-in seed mirrors the
//! classic Muay Thai style split plus a boxing set and calisthenics.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Category key that is exempt from southpaw mirroring.
pub const SOUTHPAW_CATEGORY: &str = "southpaw";
/// Auxiliary category unioned in by the "add calisthenics" flag.
pub const CALISTHENICS_CATEGORY: &str = "calisthenics";
/// Category used when the caller selects nothing.
pub const DEFAULT_CATEGORY: &str = "newb";

/// One callable phrase, plain or with a favorite flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TechniqueItem {
    Plain(String),
    Detailed {
        text: String,
        #[serde(default)]
        favorite: bool,
    },
}

impl TechniqueItem {
    pub fn text(&self) -> &str {
        match self {
            TechniqueItem::Plain(s) => s,
            TechniqueItem::Detailed { text, .. } => text,
        }
    }

    pub fn is_favorite(&self) -> bool {
        matches!(self, TechniqueItem::Detailed { favorite: true, .. })
    }
}

impl From<&str> for TechniqueItem {
    fn from(s: &str) -> Self {
        TechniqueItem::Plain(s.to_string())
    }
}

/// Singles and combos for one style category.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechniqueGroup {
    #[serde(default)]
    pub singles: Vec<TechniqueItem>,
    #[serde(default)]
    pub combos: Vec<TechniqueItem>,
}

impl TechniqueGroup {
    /// All items, singles first.
    pub fn items(&self) -> impl Iterator<Item = &TechniqueItem> {
        self.singles.iter().chain(self.combos.iter())
    }

    pub fn len(&self) -> usize {
        self.singles.len() + self.combos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.singles.is_empty() && self.combos.is_empty()
    }
}

/// The whole library, keyed by category.
pub type TechniqueLibrary = BTreeMap<String, TechniqueGroup>;

/// Display metadata for a known style category.
#[derive(Debug, Clone, Serialize)]
pub struct StyleInfo {
    pub key: &'static str,
    pub label: &'static str,
    pub description: &'static str,
}

/// Metadata for the built-in styles, for listing UIs.
pub fn style_catalog() -> Vec<StyleInfo> {
    vec![
        StyleInfo {
            key: "newb",
            label: "Nak Muay Newb",
            description: "Start with one move at a time to learn the basics",
        },
        StyleInfo {
            key: "khao",
            label: "Muay Khao",
            description: "Close-range clinch work and knee combinations",
        },
        StyleInfo {
            key: "mat",
            label: "Muay Mat",
            description: "Heavy hands and boxing combinations",
        },
        StyleInfo {
            key: "tae",
            label: "Muay Tae",
            description: "Kicking specialist with long-range attacks",
        },
        StyleInfo {
            key: "femur",
            label: "Muay Femur",
            description: "Technical timing and defensive counters",
        },
        StyleInfo {
            key: "sok",
            label: "Muay Sok",
            description: "Vicious elbows and close-range attacks",
        },
        StyleInfo {
            key: "boxing",
            label: "Boxing",
            description: "Fundamental boxing combinations",
        },
    ]
}

fn group(singles: &[&str], combos: &[&str]) -> TechniqueGroup {
    TechniqueGroup {
        singles: singles.iter().map(|s| TechniqueItem::from(*s)).collect(),
        combos: combos.iter().map(|s| TechniqueItem::from(*s)).collect(),
    }
}

const MUAY_THAI_SINGLES: &[&str] = &[
    "1",
    "2",
    "3",
    "4",
    "5",
    "6",
    "Left teep",
    "Right teep",
    "Left Knee",
    "Right Knee",
    "Flying knee",
    "Left kick",
    "Right kick",
    "Left elbow",
    "Right elbow",
    "Spinning Elbow",
];

/// Built-in seed library.
pub fn builtin() -> TechniqueLibrary {
    let mut lib = TechniqueLibrary::new();

    lib.insert(
        "newb".into(),
        group(
            &[
                "Jab",
                "Cross",
                "Left Hook",
                "Right kick",
                "Left teep",
                "Right Knee",
            ],
            &["Jab, Cross", "Jab, Right kick"],
        ),
    );

    lib.insert(
        "khao".into(),
        group(
            MUAY_THAI_SINGLES,
            &[
                "Jab, Step-in Straight Knee",
                "Jab, Cross, Clinch, Double Knees",
                "Right Hook, Clinch Pull-down, Right Knee to Head",
                "High Guard Block, Clinch, Knee",
                "Clinch, Multiple Knees, Dump",
                "Feint Low, Flying Knee",
                "Knee, Elbow",
                "Uppercut, Knee, Elbow",
                "Knee, Knee, Clinch",
                "Elbow, Uppercut, Knee",
            ],
        ),
    );

    lib.insert(
        "mat".into(),
        group(
            MUAY_THAI_SINGLES,
            &[
                "Jab, Cross, Left Hook",
                "Jab, Cross, Left Hook, Right Low Kick",
                "Jab high, Cross to body, Hook high",
                "Catch body kick, Right Cross, Left Hook",
                "Right Overhand, Spinning Left Backfist",
                "Jab, Cross, Left Hook, Step-in Right Elbow",
                "Jab, Jab, Cross",
                "Cross, Hook, Cross",
                "Jab to Body, Cross to Head",
                "Overhand, Hook, Cross",
            ],
        ),
    );

    lib.insert(
        "tae".into(),
        group(
            MUAY_THAI_SINGLES,
            &[
                "Jab, Right Roundhouse Kick",
                "Jab, Cross, Switch Left Roundhouse Kick",
                "Lead Teep, Right Roundhouse Kick",
                "Right Low Kick, Right High Kick",
                "Jab feint, Spinning Back Kick",
                "Switch Left Low Kick, Right Roundhouse Kick",
                "Jab, Cross, Low kick",
                "Double Jab, Cross, Low kick",
                "Hook, Cross, Low kick",
                "Jab, Body kick, High kick",
            ],
        ),
    );

    lib.insert(
        "femur".into(),
        group(
            MUAY_THAI_SINGLES,
            &[
                "Check Kick, Counter Right Low Kick",
                "Slip Jab, Right Uppercut, Left Hook",
                "Parry Jab, Right High Kick",
                "Lean Back, Right Low Kick",
                "Left Hook with pivot, Right Roundhouse Kick",
                "Catch Kick, Right Cross, Leg Sweep",
                "Parry, Cross, Hook",
                "Slip, Cross, Hook, Low kick",
                "Check hook, Cross",
                "Lean back, Cross, Low kick",
            ],
        ),
    );

    lib.insert(
        "sok".into(),
        group(
            MUAY_THAI_SINGLES,
            &[
                "Jab, Cross, Horizontal Elbow",
                "Hook, Spinning Elbow",
                "Parry, Uppercut Elbow",
                "Jab, Overhand, Downward Elbow",
                "Clinch, Horizontal Elbow, Uppercut Elbow",
                "Push kick, Cross, Spear Elbow",
                "Double Jab, Cross, Horizontal Elbow",
                "Slip, Hook, Spinning Elbow",
                "Knee, Downward Elbow",
                "Jab, Cross, Hook, Spinning Elbow",
            ],
        ),
    );

    lib.insert(
        "boxing".into(),
        group(
            &[
                "1",
                "2",
                "3",
                "4",
                "5",
                "6",
                "Jab",
                "Cross",
                "Hook",
                "Uppercut",
                "Body Shot",
            ],
            &[
                "Jab, Jab, Cross",
                "Jab, Cross, Lead Hook",
                "Jab, Cross, Lead Hook, Cross",
                "Jab, Cross, Lead Uppercut, Cross",
                "Cross, Lead Hook, Cross",
                "Jab, Slip, Cross",
                "Jab, Jab, Body Hook",
                "Jab, Cross, Roll, Cross, Hook",
                "Jab high, Cross to body, Hook high",
                "Feint Jab, Right Cross",
            ],
        ),
    );

    lib.insert(
        CALISTHENICS_CATEGORY.into(),
        group(
            &[
                "Breakdown",
                "5 pushups",
                "5 jumpsquats",
                "5 speed kicks left",
                "5 speed kicks right",
            ],
            &[],
        ),
    );

    lib
}
