use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use thiserror::Error;

use super::character::{Character, CharacterCategory};
use super::outline::Outline;
use super::scene::Scene;

#[derive(Debug, Error)]
pub enum StoryError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported story file extension: {0}")]
    UnsupportedFormat(String),
}

/// A dynamic value from the settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
    List(Vec<Value>),
    Map(BTreeMap<String, Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    /// Walk a dotted path (`"world.regions"`) through nested maps.
    pub fn get_path(&self, path: &str) -> Option<&Value> {
        path.split('.').try_fold(self, |node, key| match node {
            Value::Map(map) => map.get(key),
            _ => None,
        })
    }
}

/// Parsed story documents: character sheet, scene list, outlines, settings.
///
/// Any of the mappings may be empty; empty means "not parsed yet" and is
/// never an error.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StoryData {
    #[serde(default)]
    pub characters: HashMap<String, Character>,
    #[serde(default)]
    pub scenes: HashMap<String, Scene>,
    #[serde(default)]
    pub outlines: BTreeMap<u32, Outline>,
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

impl StoryData {
    /// Load story data from a `.ron` or `.json` file.
    pub fn load(path: &Path) -> Result<StoryData, StoryError> {
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|s| s.to_str()) {
            Some("ron") => Ok(ron::from_str(&contents)?),
            Some("json") => Ok(serde_json::from_str(&contents)?),
            other => Err(StoryError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
            && self.scenes.is_empty()
            && self.outlines.is_empty()
            && self.settings.is_empty()
    }

    pub fn character(&self, name: &str) -> Option<&Character> {
        self.characters.get(name)
    }

    pub fn scene(&self, name: &str) -> Option<&Scene> {
        self.scenes.get(name)
    }

    pub fn outline(&self, episode: u32) -> Option<&Outline> {
        self.outlines.get(&episode)
    }

    pub fn insert_outline(&mut self, outline: Outline) {
        self.outlines.insert(outline.episode, outline);
    }

    /// Characters of a category, sorted by name.
    pub fn characters_by_category(&self, category: CharacterCategory) -> Vec<&Character> {
        let mut found: Vec<&Character> = self
            .characters
            .values()
            .filter(|c| c.category == category)
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// Scenes of a category, sorted by name.
    pub fn scenes_by_category(&self, category: &str) -> Vec<&Scene> {
        let mut found: Vec<&Scene> = self
            .scenes
            .values()
            .filter(|s| s.category == category)
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    /// Scenes set at the given time of day (`日`, `夜`), sorted by name.
    pub fn scenes_by_time(&self, time: &str) -> Vec<&Scene> {
        let mut found: Vec<&Scene> = self.scenes.values().filter(|s| s.time == time).collect();
        found.sort_by(|a, b| a.name.cmp(&b.name));
        found
    }

    pub fn setting(&self, path: &str) -> Option<&Value> {
        let (head, rest) = match path.split_once('.') {
            Some((head, rest)) => (head, Some(rest)),
            None => (path, None),
        };
        let root = self.settings.get(head)?;
        match rest {
            Some(rest) => root.get_path(rest),
            None => Some(root),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::character::{Stage, StageAttributes};

    fn make_story() -> StoryData {
        let mut story = StoryData::default();
        story.characters.insert(
            "陆念离".to_string(),
            Character {
                name: "陆念离".to_string(),
                category: CharacterCategory::Protagonist,
                stages: HashMap::from([(Stage::Early, StageAttributes::default())]),
            },
        );
        story.characters.insert(
            "太子".to_string(),
            Character {
                name: "太子".to_string(),
                category: CharacterCategory::Antagonist,
                stages: HashMap::new(),
            },
        );
        story.scenes.insert(
            "皇宫".to_string(),
            Scene {
                name: "皇宫".to_string(),
                category: "皇宫场景".to_string(),
                time: "夜".to_string(),
                description: String::new(),
            },
        );
        story
    }

    #[test]
    fn empty_story_is_empty() {
        assert!(StoryData::default().is_empty());
        assert!(!make_story().is_empty());
    }

    #[test]
    fn category_queries() {
        let story = make_story();
        let antagonists = story.characters_by_category(CharacterCategory::Antagonist);
        assert_eq!(antagonists.len(), 1);
        assert_eq!(antagonists[0].name, "太子");
        assert_eq!(story.scenes_by_category("皇宫场景").len(), 1);
        assert_eq!(story.scenes_by_time("夜").len(), 1);
        assert!(story.scenes_by_time("日").is_empty());
    }

    #[test]
    fn settings_dotted_lookup() {
        let story: StoryData = serde_json::from_str(
            r#"{"settings": {"world": {"name": "俗世百朝", "regions": ["东土", "北荒"]}}}"#,
        )
        .unwrap();
        assert_eq!(
            story.setting("world.name").and_then(Value::as_str),
            Some("俗世百朝")
        );
        assert!(matches!(story.setting("world.regions"), Some(Value::List(l)) if l.len() == 2));
        assert!(story.setting("world.missing").is_none());
    }

    #[test]
    fn load_rejects_unknown_extension() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("story.yaml");
        std::fs::write(&path, "{}").unwrap();
        assert!(matches!(
            StoryData::load(&path),
            Err(StoryError::UnsupportedFormat(ext)) if ext == "yaml"
        ));
    }
}
