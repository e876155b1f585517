/// The script pipeline: outline → assembled text → checks.
///
/// Wires together the rule tables, the state tracker, the assembler, the
/// validator, the format enforcer and the script archive. Validation
/// findings are reported next to the text and never stop generation.
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

use crate::core::archive::{ArchiveError, ScriptArchive};
use crate::core::assembler::Assembler;
use crate::core::config::{ConfigError, EngineConfig, ValidationToggles};
use crate::core::context::AssemblyContext;
use crate::core::enforcer::{FormatEnforcer, StyleReport};
use crate::core::rules::{PlotStage, RuleError, RuleTables};
use crate::core::tracker::{JsonFileStore, LedgerError, LedgerStore, StateTracker};
use crate::core::validator::{ConsistencyValidator, ValidationResult};
use crate::schema::story::{StoryData, StoryError};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("rule table error: {0}")]
    Rule(#[from] RuleError),
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("story data error: {0}")]
    Story(#[from] StoryError),
    #[error("archive error: {0}")]
    Archive(#[from] ArchiveError),
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("no outline for episode {0}")]
    OutlineNotFound(u32),
}

/// One generated episode with whatever checks were enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedEpisode {
    pub episode: u32,
    pub title: String,
    pub text: String,
    pub characters: Vec<String>,
    pub scenes: Vec<String>,
    pub validation: Option<ValidationResult>,
    pub style: Option<StyleReport>,
}

/// The top-level engine. Built via `ScriptEngine::builder()`.
pub struct ScriptEngine {
    config: EngineConfig,
    tracker: StateTracker,
    validator: ConsistencyValidator,
    enforcer: FormatEnforcer,
    archive: ScriptArchive,
}

impl std::fmt::Debug for ScriptEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptEngine")
            .field("config", &self.config)
            .field("tracker", &self.tracker)
            .finish_non_exhaustive()
    }
}

/// Builder for constructing a `ScriptEngine`.
pub struct ScriptEngineBuilder {
    config: EngineConfig,
    story_path: Option<PathBuf>,
    rules_path: Option<PathBuf>,
    validation: Option<ValidationToggles>,
    /// Directly provided story data (for testing without files).
    story: Option<StoryData>,
    /// Directly provided rule tables (for testing without files).
    rules: Option<RuleTables>,
    /// Ledger storage; defaults to the configured state file.
    store: Option<Box<dyn LedgerStore>>,
}

impl ScriptEngine {
    pub fn builder() -> ScriptEngineBuilder {
        ScriptEngineBuilder {
            config: EngineConfig::default(),
            story_path: None,
            rules_path: None,
            validation: None,
            story: None,
            rules: None,
            store: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn tracker(&self) -> &StateTracker {
        &self.tracker
    }

    pub fn story(&self) -> &StoryData {
        self.tracker.story()
    }

    pub fn rules(&self) -> &RuleTables {
        self.tracker.rules()
    }

    pub fn archive(&self) -> &ScriptArchive {
        &self.archive
    }

    pub fn has_outline(&self, episode: u32) -> bool {
        self.story().outline(episode).is_some()
    }

    /// Assemble one episode and run the enabled checks. A missing outline is
    /// the only failure; findings are logged and returned with the text.
    pub fn generate(&self, episode: u32) -> Result<GeneratedEpisode, EngineError> {
        let outline = self
            .story()
            .outline(episode)
            .ok_or(EngineError::OutlineNotFound(episode))?;

        let mut ctx = AssemblyContext::new();
        let assembly = Assembler::new(&self.tracker, &self.config.protagonist).assemble(outline, &mut ctx);

        let validation = self.config.validation.consistency.then(|| {
            let result = self.validator.validate(episode, &assembly.text);
            if !result.is_valid() {
                tracing::warn!(episode, issues = ?result.issues, "consistency issues");
            }
            result
        });
        let style = self.config.validation.style.then(|| {
            let report = self.enforcer.check_script(&assembly.text, Some(episode));
            if !report.is_clean() {
                tracing::warn!(episode, issues = report.all_issues.len(), "style issues");
            }
            report
        });

        tracing::info!(
            episode,
            chars = assembly.text.chars().count(),
            "generated episode"
        );
        Ok(GeneratedEpisode {
            episode,
            title: outline.display_title(),
            text: assembly.text,
            characters: assembly.characters,
            scenes: assembly.scenes,
            validation,
            style,
        })
    }

    /// Record a generated episode in the ledger: the outline's highlights
    /// become events and the roster and table entities are noted as seen.
    /// Nothing is persisted until `save`.
    pub fn record(&mut self, generated: &GeneratedEpisode) {
        let events = self
            .story()
            .outline(generated.episode)
            .map(|o| o.highlights.clone())
            .unwrap_or_default();
        self.tracker.record_episode(generated.episode, &events);
        self.tracker
            .note_sightings(generated.episode, &generated.characters, &generated.text);
    }

    pub fn save(&mut self) -> Result<(), EngineError> {
        self.tracker.save()?;
        Ok(())
    }

    pub fn archive_episode(&self, generated: &GeneratedEpisode) -> Result<PathBuf, EngineError> {
        Ok(self.archive.save(generated.episode, &generated.text)?)
    }

    pub fn validate(&self, episode: u32, content: &str) -> ValidationResult {
        self.validator.validate(episode, content)
    }

    pub fn check_style(&self, content: &str, episode: Option<u32>) -> StyleReport {
        self.enforcer.check_script(content, episode)
    }

    /// Re-validate an archived script. An unreadable script yields a single
    /// issue instead of an error.
    pub fn validate_archived(&self, episode: u32) -> ValidationResult {
        match self.archive.load(episode) {
            Ok(content) => self.validator.validate(episode, &content),
            Err(e) => {
                tracing::warn!(episode, error = %e, "cannot read archived script");
                ValidationResult::unreadable()
            }
        }
    }

    pub fn plot_stage(&self, episode: u32) -> Option<&PlotStage> {
        self.tracker.plot_stage_for(episode)
    }
}

impl ScriptEngineBuilder {
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn story_path(mut self, path: impl AsRef<Path>) -> Self {
        self.story_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn rules_path(mut self, path: impl AsRef<Path>) -> Self {
        self.rules_path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn validation(mut self, toggles: ValidationToggles) -> Self {
        self.validation = Some(toggles);
        self
    }

    /// Provide story data directly (for testing without files).
    pub fn with_story(mut self, story: StoryData) -> Self {
        self.story = Some(story);
        self
    }

    /// Provide rule tables directly (for testing without files).
    pub fn with_rules(mut self, rules: RuleTables) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_store(mut self, store: Box<dyn LedgerStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn build(self) -> Result<ScriptEngine, EngineError> {
        let mut config = self.config;
        if let Some(toggles) = self.validation {
            config.validation = toggles;
        }

        // Explicit data wins over paths; builder paths win over config paths.
        let story = match self.story {
            Some(story) => story,
            None => match self.story_path.or_else(|| config.story_file.clone()) {
                Some(path) => StoryData::load(&path)?,
                None => StoryData::default(),
            },
        };
        if story.is_empty() {
            tracing::warn!("story data is empty; only validation is available");
        }

        let rules = match self.rules {
            Some(rules) => rules,
            None => match self.rules_path.or_else(|| config.rules_file.clone()) {
                Some(path) => RuleTables::load_from_ron(&path)?,
                None => RuleTables::default(),
            },
        };
        let rules = Arc::new(rules);

        let store = self
            .store
            .unwrap_or_else(|| Box::new(JsonFileStore::new(config.state_file.clone())));

        let tracker = StateTracker::new(Arc::new(story), Arc::clone(&rules), store);
        tracing::debug!(
            outlines = tracker.story().outlines.len(),
            characters = tracker.story().characters.len(),
            "engine built"
        );

        Ok(ScriptEngine {
            validator: ConsistencyValidator::new(rules),
            enforcer: FormatEnforcer::new(config.protagonist.clone()),
            archive: ScriptArchive::new(config.output_dir.clone()),
            tracker,
            config,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::tracker::MemoryStore;
    use crate::schema::outline::{EventLogic, Outline};

    fn make_story() -> StoryData {
        let mut story = StoryData::default();
        story.insert_outline(Outline {
            episode: 6,
            title: "暗流".to_string(),
            main_progress: "陆念离追查幽阁".to_string(),
            event_logic: EventLogic {
                cause: "陆念离在寝殿翻看密报".to_string(),
                process: "太子在皇宫召见心腹".to_string(),
                result: "陆念离决定夜探皇宫".to_string(),
            },
            hook: String::new(),
            climax: String::new(),
            highlights: vec!["密报到手".to_string()],
            conflicts: vec![],
        });
        story
    }

    fn make_engine(store: MemoryStore) -> ScriptEngine {
        ScriptEngine::builder()
            .with_story(make_story())
            .with_store(Box::new(store))
            .build()
            .unwrap()
    }

    #[test]
    fn missing_outline_is_reported() {
        let engine = make_engine(MemoryStore::new());
        assert!(matches!(
            engine.generate(9),
            Err(EngineError::OutlineNotFound(9))
        ));
        assert!(!engine.has_outline(9));
    }

    #[test]
    fn generate_runs_enabled_checks() {
        let engine = make_engine(MemoryStore::new());
        let generated = engine.generate(6).unwrap();
        assert_eq!(generated.title, "第6集：暗流");
        assert!(generated.text.starts_with("第6集：暗流\n"));
        assert!(generated.validation.as_ref().is_some_and(|v| v.is_valid()));
        assert!(generated.style.is_some());
    }

    #[test]
    fn checks_can_be_disabled() {
        let engine = ScriptEngine::builder()
            .with_story(make_story())
            .with_store(Box::new(MemoryStore::new()))
            .validation(ValidationToggles::off())
            .build()
            .unwrap();
        let generated = engine.generate(6).unwrap();
        assert!(generated.validation.is_none());
        assert!(generated.style.is_none());
    }

    #[test]
    fn record_then_save_writes_ledger() {
        let store = MemoryStore::new();
        let mut engine = make_engine(store.clone());
        let generated = engine.generate(6).unwrap();
        engine.record(&generated);
        assert!(store.contents().is_none());

        engine.save().unwrap();
        let saved = store.contents().unwrap();
        assert!(saved.contains("密报到手"));
        assert_eq!(engine.tracker().ledger().current_episode, 6);
        assert!(engine.tracker().ledger().characters.contains_key("太子"));
    }

    #[test]
    fn unreadable_archive_is_a_single_issue() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            output_dir: dir.path().to_path_buf(),
            ..EngineConfig::default()
        };
        let engine = ScriptEngine::builder()
            .config(config)
            .with_store(Box::new(MemoryStore::new()))
            .build()
            .unwrap();
        let result = engine.validate_archived(3);
        assert_eq!(result, ValidationResult::unreadable());
    }

    #[test]
    fn archived_script_is_revalidated() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            output_dir: dir.path().to_path_buf(),
            ..EngineConfig::default()
        };
        let engine = ScriptEngine::builder()
            .config(config)
            .with_story(make_story())
            .with_store(Box::new(MemoryStore::new()))
            .build()
            .unwrap();
        let generated = engine.generate(6).unwrap();
        engine.archive_episode(&generated).unwrap();
        assert_eq!(engine.archive().list().unwrap(), vec![6]);
        assert!(engine.validate_archived(6).is_valid());
    }

    #[test]
    fn plot_stage_lookup() {
        let engine = make_engine(MemoryStore::new());
        assert_eq!(engine.plot_stage(35).map(|s| s.stage), Some(4));
        assert!(engine.plot_stage(71).is_none());
    }
}
