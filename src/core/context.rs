//! Assembly context: first-mention tracking and scene numbering for one
//! episode being assembled.

use rustc_hash::FxHashSet;

use crate::schema::scene::Placement;

/// A scene header emitted during assembly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneSlot {
    pub id: String,
    pub time: String,
    pub placement: Placement,
    pub location: String,
}

impl SceneSlot {
    /// `1-2 夜 内 长安·百晓堂`, as listed in the script header.
    pub fn list_entry(&self) -> String {
        format!(
            "{} {} {} {}",
            self.id,
            self.time,
            self.placement.label(),
            self.location
        )
    }
}

/// Per-run memory of which characters and scenes have already had their
/// floating gold-text introduction. Reset at the start of every episode.
#[derive(Debug, Clone, Default)]
pub struct AssemblyContext {
    episode: u32,
    introduced_characters: FxHashSet<String>,
    introduced_scenes: FxHashSet<String>,
    scenes: Vec<SceneSlot>,
}

impl AssemblyContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self, episode: u32) {
        self.episode = episode;
        self.introduced_characters.clear();
        self.introduced_scenes.clear();
        self.scenes.clear();
    }

    pub fn episode(&self) -> u32 {
        self.episode
    }

    /// Returns true the first time a character is seen this episode.
    pub fn introduce_character(&mut self, name: &str) -> bool {
        self.introduced_characters.insert(name.to_string())
    }

    pub fn introduce_scene(&mut self, location: &str) -> bool {
        self.introduced_scenes.insert(location.to_string())
    }

    pub fn is_character_introduced(&self, name: &str) -> bool {
        self.introduced_characters.contains(name)
    }

    pub fn is_scene_introduced(&self, location: &str) -> bool {
        self.introduced_scenes.contains(location)
    }

    /// Allocate the next scene id (`{episode}-{n}`) and remember the slot.
    pub fn open_scene(&mut self, time: &str, placement: Placement, location: &str) -> &SceneSlot {
        let id = format!("{}-{}", self.episode, self.scenes.len() + 1);
        self.scenes.push(SceneSlot {
            id,
            time: time.to_string(),
            placement,
            location: location.to_string(),
        });
        &self.scenes[self.scenes.len() - 1]
    }

    pub fn scenes(&self) -> &[SceneSlot] {
        &self.scenes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn characters_introduced_once() {
        let mut ctx = AssemblyContext::new();
        ctx.reset(4);
        assert!(ctx.introduce_character("太子"));
        assert!(!ctx.introduce_character("太子"));
        assert!(ctx.is_character_introduced("太子"));
        assert!(!ctx.is_scene_introduced("皇宫"));
    }

    #[test]
    fn scene_ids_follow_episode() {
        let mut ctx = AssemblyContext::new();
        ctx.reset(12);
        ctx.open_scene("日", Placement::Interior, "皇宫");
        let slot = ctx.open_scene("夜", Placement::Exterior, "长安·街道").clone();
        assert_eq!(slot.id, "12-2");
        assert_eq!(slot.list_entry(), "12-2 夜 外 长安·街道");
    }

    #[test]
    fn reset_clears_everything() {
        let mut ctx = AssemblyContext::new();
        ctx.reset(1);
        ctx.introduce_character("陆长乐");
        ctx.introduce_scene("皇宫");
        ctx.open_scene("日", Placement::Interior, "皇宫");
        ctx.reset(2);
        assert!(!ctx.is_character_introduced("陆长乐"));
        assert!(!ctx.is_scene_introduced("皇宫"));
        assert!(ctx.scenes().is_empty());
        assert_eq!(ctx.episode(), 2);
    }
}
