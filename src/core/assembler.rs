//! Episode assembler: turns an outline into script text.
//!
//! Episodes 1 and 2 are rendered from the authored beat sheets in
//! [`crate::core::episodes`]; every other episode is built from the
//! outline's event logic. Either way the text passes through a
//! [`ScriptWriter`], which keeps description runs short enough for the
//! validator by slipping an ambient sound cue between long runs.

use crate::core::components::{
    action_line, action_lines, combat_sound, dialogue, environment_sound, floating_name,
    highlight, main_quest_panel, monologue, narrator, scene_description_for, scene_header,
    scene_label, sound_cue, split_long_action, system_line, system_panel, task_complete_panel,
    task_panel, warning_panel, binding_panel, MAX_ACTION_CHARS,
};
use crate::core::context::AssemblyContext;
use crate::core::enforcer::{classify, LineKind};
use crate::core::episodes::{AuthoredEpisode, AuthoredScene, Beat, FIRST, SECOND};
use crate::core::extraction::{extract_characters, extract_scenes, scene_list, DEFAULT_SCENE};
use crate::core::tracker::StateTracker;
use crate::core::validator::MAX_CONSECUTIVE_ACTIONS;
use crate::schema::marker::Color;
use crate::schema::outline::Outline;
use crate::schema::scene::Placement;

const FINAL_GOAL: &str = "一统百朝，终结乱世";
const QUEST_REWARD: &str = "摆烂值1000点";
const GENERAL_TIME: &str = "日";

/// Which generator an episode number selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EpisodeVariant {
    First,
    Second,
    General,
}

impl EpisodeVariant {
    pub fn for_episode(episode: u32) -> Self {
        match episode {
            1 => EpisodeVariant::First,
            2 => EpisodeVariant::Second,
            _ => EpisodeVariant::General,
        }
    }

    pub fn authored(&self) -> Option<&'static AuthoredEpisode> {
        match self {
            EpisodeVariant::First => Some(&FIRST),
            EpisodeVariant::Second => Some(&SECOND),
            EpisodeVariant::General => None,
        }
    }
}

/// A finished script plus the roster and locations it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub episode: u32,
    pub text: String,
    pub characters: Vec<String>,
    pub scenes: Vec<String>,
}

/// Line-aware output buffer. Counts consecutive description lines and
/// breaks a run with an ambient sound before it grows past
/// `MAX_CONSECUTIVE_ACTIONS`. Sound and dialogue lines end a run; scene
/// headers and blank lines do not.
#[derive(Debug, Default)]
pub struct ScriptWriter {
    out: String,
    run: usize,
    ambience: &'static str,
}

impl ScriptWriter {
    pub fn new() -> Self {
        ScriptWriter {
            out: String::new(),
            run: 0,
            ambience: "风声",
        }
    }

    /// Pick the ambient sound used to break runs, by time of day.
    pub fn set_time(&mut self, time: &str) {
        self.ambience = if time.contains('夜') { "风声" } else { "鸟鸣" };
    }

    pub fn push(&mut self, fragment: &str) {
        for line in fragment.split_inclusive('\n') {
            let trimmed = line.trim();
            if !trimmed.is_empty() {
                match classify(trimmed) {
                    LineKind::Action => {
                        if self.run >= MAX_CONSECUTIVE_ACTIONS {
                            self.break_run();
                        }
                        self.run += 1;
                    }
                    LineKind::Sound | LineKind::Dialogue => self.run = 0,
                    LineKind::Other => {}
                }
            }
            self.out.push_str(line);
            if !line.ends_with('\n') {
                self.out.push('\n');
            }
        }
    }

    pub fn blank(&mut self) {
        self.out.push('\n');
    }

    fn break_run(&mut self) {
        let cue = environment_sound(self.ambience);
        if cue.is_empty() {
            self.out.push_str(&sound_cue("呼呼", Some("风声")));
        } else {
            self.out.push_str(&cue);
        }
        self.run = 0;
    }

    pub fn as_str(&self) -> &str {
        &self.out
    }

    pub fn into_string(self) -> String {
        self.out
    }
}

/// Appearance and floating-name block for a character's first mention.
/// The leading line always names the character so the floating name can
/// be placed after it.
pub fn intro_block(name: &str, action: &str, appearance: &str, identity: &str) -> String {
    let lead = format!("{}{}", name, action);
    let appearance = appearance.trim().trim_end_matches('。');
    let mut out = if appearance.is_empty() {
        match (action.is_empty(), identity.is_empty()) {
            (true, true) => String::new(),
            (true, false) => action_line(&format!("{}出场", name)),
            (false, _) => action_lines(&lead),
        }
    } else {
        let joined = format!("{}，{}", lead, appearance);
        if joined.chars().count() <= MAX_ACTION_CHARS {
            action_line(&joined)
        } else {
            format!("{}{}", action_lines(&lead), action_lines(appearance))
        }
    };
    if !identity.is_empty() {
        out.push_str(&floating_name(name, identity));
    }
    out
}

/// Renders outlines for one tracker and protagonist.
#[derive(Debug, Clone, Copy)]
pub struct Assembler<'a> {
    tracker: &'a StateTracker,
    protagonist: &'a str,
}

impl<'a> Assembler<'a> {
    pub fn new(tracker: &'a StateTracker, protagonist: &'a str) -> Self {
        Assembler {
            tracker,
            protagonist,
        }
    }

    /// Assemble one episode. The context is reset first, so characters and
    /// scenes are introduced at most once per call. The hook part is left
    /// out when the outline has no hook text.
    pub fn assemble(&self, outline: &Outline, ctx: &mut AssemblyContext) -> Assembly {
        let episode = outline.episode;
        ctx.reset(episode);
        let include_hook = !outline.hook.trim().is_empty();
        let variant = EpisodeVariant::for_episode(episode);

        let (body, characters, scenes, listing) = match variant.authored() {
            Some(authored) => {
                let body = self.render_authored(authored, episode, include_hook, ctx);
                let characters: Vec<String> =
                    authored.roster.iter().map(|c| c.to_string()).collect();
                let mut scenes: Vec<String> = Vec::new();
                for slot in ctx.scenes() {
                    if !scenes.contains(&slot.location) {
                        scenes.push(slot.location.clone());
                    }
                }
                let listing = ctx
                    .scenes()
                    .iter()
                    .map(|s| s.list_entry())
                    .collect::<Vec<_>>()
                    .join("；");
                (body, characters, scenes, listing)
            }
            None => {
                let rules = self.tracker.rules();
                let characters =
                    extract_characters(outline, &rules.character_keywords, self.protagonist);
                let scenes = extract_scenes(outline, &rules.scene_keywords);
                let body = self.render_general(outline, &characters, &scenes, include_hook, ctx);
                let listing = scene_list(episode, &scenes);
                (body, characters, scenes, listing)
            }
        };

        let text = format!(
            "{}\n\n出场人物：{}\n\n场景列表：{}\n\n{}",
            outline.display_title(),
            characters.join("、"),
            listing,
            body
        );
        tracing::debug!(
            episode,
            ?variant,
            characters = characters.len(),
            scenes = scenes.len(),
            "assembled episode"
        );
        Assembly {
            episode,
            text,
            characters,
            scenes,
        }
    }

    fn render_authored(
        &self,
        authored: &AuthoredEpisode,
        episode: u32,
        include_hook: bool,
        ctx: &mut AssemblyContext,
    ) -> String {
        let mut writer = ScriptWriter::new();
        let parts = authored.parts();
        let count = if include_hook { parts.len() } else { parts.len() - 1 };
        for part in &parts[..count] {
            for scene in part.iter() {
                self.render_scene(&mut writer, scene, episode, ctx);
            }
        }
        writer.into_string()
    }

    fn render_scene(
        &self,
        writer: &mut ScriptWriter,
        scene: &AuthoredScene,
        episode: u32,
        ctx: &mut AssemblyContext,
    ) {
        open_scene(writer, ctx, scene.time, scene.placement, scene.location);
        for beat in scene.beats {
            let fragment = self.render_beat(beat, episode, ctx);
            writer.push(&fragment);
        }
        writer.blank();
    }

    fn render_beat(&self, beat: &Beat, episode: u32, ctx: &mut AssemblyContext) -> String {
        match *beat {
            Beat::Action(text) => action_line(text),
            Beat::Marked(color, text) => highlight(color, text),
            Beat::Label(text) => {
                if ctx.introduce_scene(text) {
                    scene_label(text)
                } else {
                    String::new()
                }
            }
            Beat::Line { speaker, cue, text } => dialogue(speaker, text, cue),
            Beat::Monologue(text) => monologue(self.protagonist, text),
            Beat::Narrator(text) => narrator(text),
            Beat::System(text) => system_line(text),
            Beat::Sound(sound, source) => sound_cue(sound, Some(source)),
            Beat::CombatSound(action) => combat_sound(action),
            Beat::AmbientSound(event) => environment_sound(event),
            Beat::Panel(color, text) => system_panel(text, color),
            Beat::Binding(rewards) => binding_panel(rewards),
            Beat::Task {
                name,
                description,
                reward,
                penalty,
            } => task_panel(name, description, reward, penalty),
            Beat::TaskComplete { time_used, reward } => task_complete_panel(time_used, reward),
            Beat::MainQuest {
                description,
                progress,
                reward,
            } => main_quest_panel(description, progress, reward),
            Beat::Warning(text, level) => warning_panel(text, level),
            Beat::Intro {
                name,
                action,
                identity,
            } => self.introduce(ctx, episode, name, action, identity),
        }
    }

    /// Full introduction on first mention, the bare action afterwards.
    fn introduce(
        &self,
        ctx: &mut AssemblyContext,
        episode: u32,
        name: &str,
        action: &str,
        fallback_identity: &str,
    ) -> String {
        if !ctx.introduce_character(name) {
            return if action.is_empty() {
                String::new()
            } else {
                action_lines(&format!("{}{}", name, action))
            };
        }
        let appearance = self.tracker.appearance_for(name, episode);
        let identity = match self.tracker.identity_for(name, episode) {
            "" => fallback_identity,
            identity => identity,
        };
        intro_block(name, action, appearance, identity)
    }

    fn render_general(
        &self,
        outline: &Outline,
        roster: &[String],
        scenes: &[String],
        include_hook: bool,
        ctx: &mut AssemblyContext,
    ) -> String {
        let episode = outline.episode;
        let logic = &outline.event_logic;
        let location = |i: usize| scene_at(scenes, i);
        let mut writer = ScriptWriter::new();

        // cause
        self.open_general_scene(&mut writer, ctx, location(0));
        if !outline.main_progress.trim().is_empty() {
            writer.push(&narrator(outline.main_progress.trim()));
        }
        self.introduce_mentioned(&mut writer, ctx, episode, roster, &logic.cause, true);
        writer.push(&action_lines(&logic.cause));
        writer.blank();

        // process
        self.open_general_scene(&mut writer, ctx, location(1));
        self.introduce_mentioned(&mut writer, ctx, episode, roster, &logic.process, false);
        writer.push(&action_lines(&logic.process));
        for conflict in outline.conflicts.iter().filter(|c| !c.trim().is_empty()) {
            writer.push(&highlight(Color::Yellow, conflict.trim()));
        }
        if !outline.climax.trim().is_empty() {
            writer.push(&highlight(Color::Green, outline.climax.trim()));
        }
        writer.blank();

        // result
        self.open_general_scene(&mut writer, ctx, location(2));
        self.introduce_mentioned(&mut writer, ctx, episode, roster, &logic.result, false);
        writer.push(&action_lines(&logic.result));
        for item in outline.highlights.iter().filter(|h| !h.trim().is_empty()) {
            writer.push(&highlight(Color::Green, item.trim()));
        }
        let progress = match self.tracker.plot_stage_for(episode) {
            Some(stage) => format!("第{}阶段·{}", stage.stage, stage.name),
            None => format!("第{}集", episode),
        };
        writer.push(&main_quest_panel(FINAL_GOAL, &progress, QUEST_REWARD));
        writer.blank();

        if include_hook {
            self.open_general_scene(&mut writer, ctx, location(0));
            self.introduce_mentioned(&mut writer, ctx, episode, roster, &outline.hook, false);
            writer.push(&environment_sound("风声"));
            for part in split_long_action(outline.hook.trim()) {
                writer.push(&highlight(Color::Blue, part.trim_end_matches(['，', '。', '；'])));
            }
            writer.blank();
        }

        writer.into_string()
    }

    fn open_general_scene(&self, writer: &mut ScriptWriter, ctx: &mut AssemblyContext, location: &str) {
        let first_visit = !ctx.is_scene_introduced(location);
        open_scene(writer, ctx, GENERAL_TIME, Placement::Interior, location);
        if first_visit {
            writer.push(&scene_description_for(
                location,
                self.tracker.story().scene(location),
            ));
        }
    }

    /// Introduce roster characters named in `text`; the protagonist is
    /// introduced in the opening part regardless.
    fn introduce_mentioned(
        &self,
        writer: &mut ScriptWriter,
        ctx: &mut AssemblyContext,
        episode: u32,
        roster: &[String],
        text: &str,
        opening: bool,
    ) {
        for name in roster {
            let mentioned = text.contains(name.as_str()) || (opening && name == self.protagonist);
            if mentioned && !ctx.is_character_introduced(name) {
                let block = self.introduce(ctx, episode, name, "", "");
                writer.push(&block);
            }
        }
    }
}

/// The `i`th extracted scene, or the last one when there are fewer.
fn scene_at(scenes: &[String], i: usize) -> &str {
    scenes
        .get(i)
        .or_else(|| scenes.last())
        .map(String::as_str)
        .unwrap_or(DEFAULT_SCENE)
}

/// Scene header, then the floating location label on the first visit.
fn open_scene(
    writer: &mut ScriptWriter,
    ctx: &mut AssemblyContext,
    time: &str,
    placement: Placement,
    location: &str,
) {
    writer.set_time(time);
    let header = {
        let slot = ctx.open_scene(time, placement, location);
        scene_header(&slot.id, &slot.time, slot.placement, &slot.location)
    };
    writer.push(&header);
    if ctx.introduce_scene(location) {
        writer.push(&scene_label(location));
    }
}
