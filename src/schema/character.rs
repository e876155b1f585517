use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Coarse character-development period. Derived from the episode number,
/// never stored per episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    /// 前期, episodes 1–20
    #[serde(rename = "前期")]
    Early,
    /// 中期, episodes 21–50
    #[serde(rename = "中期")]
    Mid,
    /// 后期, episodes 51 onward
    #[serde(rename = "后期")]
    Late,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Early, Stage::Mid, Stage::Late];

    /// Map an episode number onto its stage using the fixed breakpoints
    /// (≤20, ≤50, later).
    pub fn for_episode(episode: u32) -> Self {
        if episode <= 20 {
            Self::Early
        } else if episode <= 50 {
            Self::Mid
        } else {
            Self::Late
        }
    }

    /// The label used as a key in character sheets.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Early => "前期",
            Self::Mid => "中期",
            Self::Late => "后期",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|s| s.label() == label)
    }
}

/// Role category from the character sheet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterCategory {
    Protagonist,
    CoreSupporting,
    MainSupporting,
    MinorSupporting,
    Antagonist,
}

/// Everything the character sheet says about one stage of a character.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageAttributes {
    #[serde(default)]
    pub identity: String,
    #[serde(default)]
    pub background: String,
    #[serde(default)]
    pub personality: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub appearance: String,
}

/// A character sheet entry. `name` is the unique key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub name: String,
    pub category: CharacterCategory,
    #[serde(default)]
    pub stages: HashMap<Stage, StageAttributes>,
}

impl Character {
    /// Attributes for the given stage, if the sheet has an entry for it.
    pub fn stage(&self, stage: Stage) -> Option<&StageAttributes> {
        self.stages.get(&stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_breakpoints() {
        assert_eq!(Stage::for_episode(1), Stage::Early);
        assert_eq!(Stage::for_episode(20), Stage::Early);
        assert_eq!(Stage::for_episode(21), Stage::Mid);
        assert_eq!(Stage::for_episode(50), Stage::Mid);
        assert_eq!(Stage::for_episode(51), Stage::Late);
        assert_eq!(Stage::for_episode(70), Stage::Late);
    }

    #[test]
    fn stage_labels_round_trip() {
        for stage in Stage::ALL {
            assert_eq!(Stage::from_label(stage.label()), Some(stage));
        }
        assert_eq!(Stage::from_label("末期"), None);
    }

    #[test]
    fn character_stage_lookup() {
        let character = Character {
            name: "陆长乐".to_string(),
            category: CharacterCategory::CoreSupporting,
            stages: HashMap::from([(
                Stage::Early,
                StageAttributes {
                    identity: "镇北王长女".to_string(),
                    ..Default::default()
                },
            )]),
        };
        assert_eq!(character.stage(Stage::Early).unwrap().identity, "镇北王长女");
        assert!(character.stage(Stage::Late).is_none());
    }
}
