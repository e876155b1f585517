//! Narrative state tracker.
//!
//! Answers "what does this character look like in episode N" and "may this
//! ability appear yet", and keeps the ledger of recorded episodes. The
//! ledger is read once at construction and written only on `save()`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::core::rules::{PlotStage, RuleTables, UnlockKind};
use crate::schema::character::{Stage, StageAttributes};
use crate::schema::story::StoryData;

#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// First and latest episode an entity showed up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sighting {
    pub first_episode: u32,
    pub last_episode: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub episode: u32,
    pub event: String,
}

/// Persisted narrative state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ledger {
    #[serde(default)]
    pub characters: BTreeMap<String, Sighting>,
    #[serde(default)]
    pub forces: BTreeMap<String, Sighting>,
    #[serde(default)]
    pub abilities: BTreeMap<String, Sighting>,
    #[serde(default)]
    pub items: BTreeMap<String, Sighting>,
    #[serde(default)]
    pub events: Vec<LedgerEvent>,
    #[serde(default)]
    pub current_episode: u32,
}

impl Ledger {
    fn sightings_mut(&mut self, kind: UnlockKind) -> &mut BTreeMap<String, Sighting> {
        match kind {
            UnlockKind::Ability => &mut self.abilities,
            UnlockKind::Force => &mut self.forces,
            UnlockKind::Item => &mut self.items,
        }
    }
}

fn note(map: &mut BTreeMap<String, Sighting>, name: &str, episode: u32) {
    map.entry(name.to_string())
        .and_modify(|s| {
            s.first_episode = s.first_episode.min(episode);
            s.last_episode = s.last_episode.max(episode);
        })
        .or_insert(Sighting {
            first_episode: episode,
            last_episode: episode,
        });
}

/// Storage port for the ledger.
pub trait LedgerStore: Send {
    /// `Ok(None)` when nothing has been saved yet.
    fn load(&self) -> Result<Option<Ledger>, LedgerError>;
    fn save(&mut self, ledger: &Ledger) -> Result<(), LedgerError>;
}

/// Ledger stored as pretty-printed JSON, rewritten wholesale on save.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonFileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LedgerStore for JsonFileStore {
    fn load(&self) -> Result<Option<Ledger>, LedgerError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save(&mut self, ledger: &Ledger) -> Result<(), LedgerError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, serde_json::to_string_pretty(ledger)?)?;
        Ok(())
    }
}

/// In-memory store. Clones share the same slot, so a test can keep a
/// handle and inspect what the tracker saved.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    slot: Arc<Mutex<Option<String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw JSON of the last save.
    pub fn contents(&self) -> Option<String> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Seed the slot with raw JSON, valid or not.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        MemoryStore {
            slot: Arc::new(Mutex::new(Some(contents.into()))),
        }
    }
}

impl LedgerStore for MemoryStore {
    fn load(&self) -> Result<Option<Ledger>, LedgerError> {
        match self.contents() {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn save(&mut self, ledger: &Ledger) -> Result<(), LedgerError> {
        let json = serde_json::to_string(ledger)?;
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = Some(json);
        Ok(())
    }
}

pub struct StateTracker {
    story: Arc<StoryData>,
    rules: Arc<RuleTables>,
    ledger: Ledger,
    store: Box<dyn LedgerStore>,
}

impl std::fmt::Debug for StateTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StateTracker")
            .field("ledger", &self.ledger)
            .finish_non_exhaustive()
    }
}

impl StateTracker {
    /// Build a tracker, loading the ledger from `store`. A store that
    /// fails to load is logged and replaced by an empty ledger.
    pub fn new(story: Arc<StoryData>, rules: Arc<RuleTables>, store: Box<dyn LedgerStore>) -> Self {
        let ledger = match store.load() {
            Ok(Some(ledger)) => ledger,
            Ok(None) => Ledger::default(),
            Err(e) => {
                tracing::warn!(error = %e, "failed to load ledger, starting empty");
                Ledger::default()
            }
        };
        StateTracker {
            story,
            rules,
            ledger,
            store,
        }
    }

    pub fn in_memory(story: Arc<StoryData>, rules: Arc<RuleTables>) -> Self {
        Self::new(story, rules, Box::new(MemoryStore::new()))
    }

    pub fn story(&self) -> &StoryData {
        &self.story
    }

    pub fn rules(&self) -> &RuleTables {
        &self.rules
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Stage depends only on the episode; the character is accepted so
    /// callers read naturally.
    pub fn stage_for(&self, _character: &str, episode: u32) -> Stage {
        Stage::for_episode(episode)
    }

    pub fn attributes_for(&self, character: &str, episode: u32) -> Option<&StageAttributes> {
        self.story
            .character(character)?
            .stage(self.stage_for(character, episode))
    }

    /// Appearance text, empty when the sheet has none.
    pub fn appearance_for(&self, character: &str, episode: u32) -> &str {
        self.attributes_for(character, episode)
            .map(|a| a.appearance.as_str())
            .unwrap_or_default()
    }

    pub fn identity_for(&self, character: &str, episode: u32) -> &str {
        self.attributes_for(character, episode)
            .map(|a| a.identity.as_str())
            .unwrap_or_default()
    }

    pub fn is_unlocked(&self, kind: UnlockKind, name: &str, episode: u32) -> bool {
        self.rules.is_unlocked(kind, name, episode)
    }

    pub fn plot_stage_for(&self, episode: u32) -> Option<&PlotStage> {
        self.rules.plot_stage_for(episode)
    }

    /// Set the current episode and append events not yet recorded for it.
    pub fn record_episode(&mut self, episode: u32, events: &[String]) {
        self.ledger.current_episode = episode;
        for event in events {
            let present = self
                .ledger
                .events
                .iter()
                .any(|e| e.episode == episode && e.event == *event);
            if !present {
                self.ledger.events.push(LedgerEvent {
                    episode,
                    event: event.clone(),
                });
            }
        }
        tracing::debug!(episode, events = self.ledger.events.len(), "recorded episode");
    }

    /// Note which roster characters and table entities appear in a script.
    pub fn note_sightings(&mut self, episode: u32, roster: &[String], content: &str) {
        for name in roster {
            note(&mut self.ledger.characters, name, episode);
        }
        for kind in [UnlockKind::Ability, UnlockKind::Force, UnlockKind::Item] {
            let found: Vec<String> = self
                .rules
                .table(kind)
                .iter()
                .filter(|(name, _)| content.contains(name))
                .map(|(name, _)| name.to_string())
                .collect();
            let map = self.ledger.sightings_mut(kind);
            for name in found {
                note(map, &name, episode);
            }
        }
    }

    pub fn save(&mut self) -> Result<(), LedgerError> {
        self.store.save(&self.ledger)?;
        tracing::debug!(current_episode = self.ledger.current_episode, "ledger saved");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::character::{Character, CharacterCategory};
    use std::collections::HashMap;

    fn make_story() -> Arc<StoryData> {
        let mut story = StoryData::default();
        story.characters.insert(
            "陆长乐".to_string(),
            Character {
                name: "陆长乐".to_string(),
                category: CharacterCategory::CoreSupporting,
                stages: HashMap::from([
                    (
                        Stage::Early,
                        StageAttributes {
                            identity: "镇北王府二小姐".to_string(),
                            appearance: "一袭白衣，腰悬长剑".to_string(),
                            ..Default::default()
                        },
                    ),
                    (
                        Stage::Mid,
                        StageAttributes {
                            identity: "长安女帝".to_string(),
                            ..Default::default()
                        },
                    ),
                ]),
            },
        );
        Arc::new(story)
    }

    fn make_tracker() -> StateTracker {
        StateTracker::in_memory(make_story(), Arc::new(RuleTables::default()))
    }

    #[test]
    fn attributes_resolve_through_stage() {
        let tracker = make_tracker();
        assert_eq!(tracker.identity_for("陆长乐", 20), "镇北王府二小姐");
        assert_eq!(tracker.identity_for("陆长乐", 21), "长安女帝");
        assert_eq!(tracker.appearance_for("陆长乐", 21), "");
        assert!(tracker.attributes_for("陆长乐", 55).is_none());
        assert!(tracker.attributes_for("无名氏", 1).is_none());
    }

    #[test]
    fn unlock_lookup_uses_shared_tables() {
        let tracker = make_tracker();
        assert!(!tracker.is_unlocked(UnlockKind::Ability, "气运画技", 4));
        assert!(tracker.is_unlocked(UnlockKind::Ability, "气运画技", 5));
        assert!(tracker.is_unlocked(UnlockKind::Force, "无名帮派", 1));
    }

    #[test]
    fn record_episode_is_idempotent() {
        let mut tracker = make_tracker();
        let events = vec!["救下二姐".to_string(), "获得苍生笔".to_string()];
        tracker.record_episode(1, &events);
        tracker.record_episode(1, &events);
        assert_eq!(tracker.ledger().events.len(), 2);
        assert_eq!(tracker.ledger().current_episode, 1);

        tracker.record_episode(2, &events[..1]);
        assert_eq!(tracker.ledger().events.len(), 3);
        assert_eq!(tracker.ledger().current_episode, 2);
    }

    #[test]
    fn malformed_store_falls_back_to_empty() {
        let store = MemoryStore::with_contents("{not json");
        let tracker = StateTracker::new(
            make_story(),
            Arc::new(RuleTables::default()),
            Box::new(store),
        );
        assert_eq!(tracker.ledger(), &Ledger::default());
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        let mut tracker = StateTracker::new(
            make_story(),
            Arc::new(RuleTables::default()),
            Box::new(store.clone()),
        );
        tracker.record_episode(3, &["太子失势".to_string()]);
        tracker.save().unwrap();

        let reloaded = StateTracker::new(
            make_story(),
            Arc::new(RuleTables::default()),
            Box::new(store),
        );
        assert_eq!(reloaded.ledger().events, tracker.ledger().events);
        assert_eq!(reloaded.ledger().current_episode, 3);
    }

    #[test]
    fn json_file_store_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("state.json");
        let mut tracker = StateTracker::new(
            make_story(),
            Arc::new(RuleTables::default()),
            Box::new(JsonFileStore::new(&path)),
        );
        tracker.record_episode(7, &["醉仙楼夜宴".to_string()]);
        tracker.note_sightings(7, &["陆念离".to_string()], "苍生笔一挥，六剑奴齐出");
        tracker.save().unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        for key in ["characters", "forces", "abilities", "items", "events", "current_episode"] {
            assert!(raw.contains(key), "missing key {}", key);
        }

        let reloaded = StateTracker::new(
            make_story(),
            Arc::new(RuleTables::default()),
            Box::new(JsonFileStore::new(&path)),
        );
        assert_eq!(reloaded.ledger(), tracker.ledger());
    }

    #[test]
    fn sightings_track_first_and_last() {
        let mut tracker = make_tracker();
        tracker.note_sightings(5, &[], "六剑奴护驾");
        tracker.note_sightings(2, &[], "六剑奴");
        tracker.note_sightings(9, &[], "六剑奴");
        let sighting = tracker.ledger().forces["六剑奴"];
        assert_eq!(sighting.first_episode, 2);
        assert_eq!(sighting.last_episode, 9);
        assert!(tracker.ledger().abilities.contains_key("六剑奴"));
        assert!(tracker.ledger().items.is_empty());
    }
}
