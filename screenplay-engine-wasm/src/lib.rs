//! WASM bindings for screenplay-engine: script checks and episode assembly
//! for the browser editor. All values cross the boundary as JSON strings.

use std::sync::Arc;
use wasm_bindgen::prelude::*;

use screenplay_engine::core::enforcer::FormatEnforcer;
use screenplay_engine::core::pipeline::ScriptEngine;
use screenplay_engine::core::rules::RuleTables;
use screenplay_engine::core::tracker::MemoryStore;
use screenplay_engine::core::validator::ConsistencyValidator;
use screenplay_engine::schema::story::StoryData;

// ---------------------------------------------------------------------------
// JSON helper types for communication across the WASM boundary
// ---------------------------------------------------------------------------
#[derive(serde::Serialize)]
struct PlotStageInfo {
    stage: u32,
    name: String,
    start: u32,
    end: u32,
    description: String,
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, JsError> {
    serde_json::to_string(value).map_err(|e| JsError::new(&format!("Serialization error: {e}")))
}

fn parse_story(story_json: &str) -> Result<StoryData, JsError> {
    serde_json::from_str(story_json).map_err(|e| JsError::new(&format!("Invalid story JSON: {e}")))
}

fn build_engine(story: StoryData) -> Result<ScriptEngine, JsError> {
    ScriptEngine::builder()
        .with_story(story)
        .with_store(Box::new(MemoryStore::new()))
        .build()
        .map_err(|e| JsError::new(&format!("Engine build error: {e}")))
}

// ---------------------------------------------------------------------------
// Stateless checks
// ---------------------------------------------------------------------------

/// Run the continuity validator. Returns
/// `{"is_valid": bool, "issues": [...], "warnings": [...]}`.
#[wasm_bindgen]
pub fn validate_script(episode: u32, content: &str) -> Result<String, JsError> {
    let validator = ConsistencyValidator::new(Arc::new(RuleTables::default()));
    to_json(&validator.validate(episode, content))
}

/// Run the format enforcer. `episode` enables the opening-episode checks
/// when given.
#[wasm_bindgen]
pub fn check_script(content: &str, episode: Option<u32>) -> Result<String, JsError> {
    to_json(&FormatEnforcer::default().check_script(content, episode))
}

/// Assemble one episode from a story JSON document. The ledger lives in
/// memory for the duration of the call.
#[wasm_bindgen]
pub fn generate_episode(story_json: &str, episode: u32) -> Result<String, JsError> {
    let engine = build_engine(parse_story(story_json)?)?;
    let generated = engine
        .generate(episode)
        .map_err(|e| JsError::new(&format!("Generation error: {e}")))?;
    to_json(&generated)
}

/// The plot stage containing `episode`, or `null`.
#[wasm_bindgen]
pub fn plot_stage(episode: u32) -> Result<String, JsError> {
    let rules = RuleTables::default();
    let info = rules.plot_stage_for(episode).map(|s| PlotStageInfo {
        stage: s.stage,
        name: s.name.clone(),
        start: s.range.0,
        end: s.range.1,
        description: s.description.clone(),
    });
    to_json(&info)
}

// ---------------------------------------------------------------------------
// ScreenplayDemo: keeps one story and ledger across calls
// ---------------------------------------------------------------------------
#[wasm_bindgen]
pub struct ScreenplayDemo {
    engine: ScriptEngine,
}

#[wasm_bindgen]
impl ScreenplayDemo {
    #[wasm_bindgen(constructor)]
    pub fn new(story_json: &str) -> Result<ScreenplayDemo, JsError> {
        Ok(ScreenplayDemo {
            engine: build_engine(parse_story(story_json)?)?,
        })
    }

    /// Generate an episode and record it in the in-memory ledger, so later
    /// episodes see it as already written.
    pub fn generate(&mut self, episode: u32) -> Result<String, JsError> {
        let generated = self
            .engine
            .generate(episode)
            .map_err(|e| JsError::new(&format!("Generation error: {e}")))?;
        self.engine.record(&generated);
        to_json(&generated)
    }

    /// JSON array of episode numbers that have an outline.
    pub fn episodes(&self) -> Result<String, JsError> {
        let episodes: Vec<u32> = self.engine.story().outlines.keys().copied().collect();
        to_json(&episodes)
    }

    /// The ledger as JSON, in the same shape as the state file.
    pub fn ledger(&self) -> Result<String, JsError> {
        to_json(self.engine.tracker().ledger())
    }
}
