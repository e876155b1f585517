//! Rule tables: unlock episodes, title changes, character stage ranges,
//! plot stages, and the keyword tables used for roster extraction.
//!
//! This is the single source for every table the tracker, validator and
//! assembler consult. The built-in tables can be overridden from RON.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;

use crate::core::extraction::KeywordTable;
use crate::schema::character::Stage;

/// Episodes covered by the plot-stage partition.
pub const FIRST_EPISODE: u32 = 1;
pub const LAST_EPISODE: u32 = 70;

#[derive(Debug, Error)]
pub enum RuleError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("RON deserialization error: {0}")]
    Ron(#[from] ron::error::SpannedError),
    #[error("plot stages leave episode {0} uncovered")]
    PlotStageGap(u32),
    #[error("plot stages overlap at episode {0}")]
    PlotStageOverlap(u32),
}

/// Which unlock table an entity belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnlockKind {
    Ability,
    Force,
    Item,
}

impl UnlockKind {
    /// Label used in issue text.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Ability => "能力",
            Self::Force => "势力",
            Self::Item => "道具",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ability" | "能力" => Some(Self::Ability),
            "force" | "势力" => Some(Self::Force),
            "item" | "道具" => Some(Self::Item),
            _ => None,
        }
    }
}

/// Ordered `entity → unlock episode` table.
///
/// The table is an exception list: entities it does not name are
/// unlocked from episode 0. Order is preserved so issue lists are
/// reported in table order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnlockTable {
    entries: Vec<(String, u32)>,
}

impl UnlockTable {
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u32)>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for (name, episode) in entries {
            table.insert(name, episode);
        }
        table
    }

    pub fn get(&self, name: &str) -> Option<u32> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, ep)| *ep)
    }

    /// Unlock episode, 0 for entities the table does not name.
    pub fn unlock_episode(&self, name: &str) -> u32 {
        self.get(name).unwrap_or(0)
    }

    pub fn is_unlocked(&self, name: &str, episode: u32) -> bool {
        episode >= self.unlock_episode(name)
    }

    /// Insert or replace in place (replacement keeps the original position).
    pub fn insert(&mut self, name: impl Into<String>, episode: u32) {
        let name = name.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = episode,
            None => self.entries.push((name, episode)),
        }
    }

    pub fn merge(&mut self, other: UnlockTable) {
        for (name, episode) in other.entries {
            self.insert(name, episode);
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.entries.iter().map(|(n, ep)| (n.as_str(), *ep))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// An honorific that may not appear before the episode where the
/// character earns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TitleRule {
    pub title: String,
    pub character: String,
    pub unlock_episode: u32,
    /// What happens at the unlock episode, e.g. `登基`.
    pub event: String,
}

impl TitleRule {
    pub fn issue(&self, episode: u32) -> String {
        format!(
            "人物【{}】在第{}集被称为{}，但应在第{}集后才{}",
            self.character, episode, self.title, self.unlock_episode, self.event
        )
    }
}

/// One of the seven arcs partitioning the season.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotStage {
    pub stage: u32,
    pub name: String,
    pub range: (u32, u32),
    pub description: String,
}

impl PlotStage {
    pub fn contains(&self, episode: u32) -> bool {
        self.range.0 <= episode && episode <= self.range.1
    }
}

/// All rule tables shared by tracker, validator and assembler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuleTables {
    pub abilities: UnlockTable,
    pub forces: UnlockTable,
    pub items: UnlockTable,
    pub titles: Vec<TitleRule>,
    pub character_stages: BTreeMap<String, BTreeMap<Stage, (u32, u32)>>,
    pub plot_stages: Vec<PlotStage>,
    pub character_keywords: KeywordTable,
    pub scene_keywords: KeywordTable,
}

/// Partial rule tables as written in a RON override file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RuleOverrides {
    pub abilities: UnlockTable,
    pub forces: UnlockTable,
    pub items: UnlockTable,
    pub titles: Vec<TitleRule>,
    pub character_stages: BTreeMap<String, BTreeMap<Stage, (u32, u32)>>,
    pub plot_stages: Option<Vec<PlotStage>>,
    pub character_keywords: KeywordTable,
    pub scene_keywords: KeywordTable,
}

impl Default for RuleTables {
    fn default() -> Self {
        let standard_stages = || {
            BTreeMap::from([
                (Stage::Early, (1, 20)),
                (Stage::Mid, (21, 50)),
                (Stage::Late, (51, 70)),
            ])
        };

        RuleTables {
            abilities: UnlockTable::from_entries([
                ("苍生笔", 1),
                ("修罗剑意", 1),
                ("六剑奴", 1),
                ("百晓堂", 2),
                ("血咒检测", 4),
                ("气运画技", 5),
                ("酒道通神", 21),
                ("白泽", 31),
                ("乾坤画轴", 31),
                ("镇魔画道", 41),
            ]),
            forces: UnlockTable::from_entries([
                ("六剑奴", 1),
                ("百晓堂", 2),
                ("七杀楼", 11),
                ("大雪龙骑", 11),
                ("白泽", 31),
            ]),
            items: UnlockTable::from_entries([
                ("苍生笔", 1),
                ("玉画筒", 1),
                ("乾坤画轴雏形", 11),
                ("乾坤画轴", 31),
                ("镇魔苍生笔", 41),
            ]),
            titles: vec![
                TitleRule {
                    title: "女帝".to_string(),
                    character: "陆长乐".to_string(),
                    unlock_episode: 31,
                    event: "登基".to_string(),
                },
                TitleRule {
                    title: "一字并肩王".to_string(),
                    character: "陆念离".to_string(),
                    unlock_episode: 11,
                    event: "封王".to_string(),
                },
            ],
            character_stages: BTreeMap::from([
                ("陆念离".to_string(), standard_stages()),
                ("陆长乐".to_string(), standard_stages()),
            ]),
            plot_stages: default_plot_stages(),
            character_keywords: KeywordTable::default_characters(),
            scene_keywords: KeywordTable::default_scenes(),
        }
    }
}

fn default_plot_stages() -> Vec<PlotStage> {
    let stage = |stage: u32, name: &str, range: (u32, u32), description: &str| PlotStage {
        stage,
        name: name.to_string(),
        range,
        description: description.to_string(),
    };
    vec![
        stage(1, "朝堂生存战", (1, 10), "主角vs太子+皇后+外戚，核心：保命、护姐、夺权"),
        stage(2, "东土统一战", (11, 20), "主角vs太子残党+大明+暗黑势力，核心：整合势力、平定东土"),
        stage(3, "北荒边患战", (21, 30), "主角vs兽化人+蛮族+暗黑血咒，核心：解除诅咒、收复北荒"),
        stage(4, "百朝争霸战", (31, 40), "主角vs南林/西沼/大明联军，核心：一统天下版图"),
        stage(5, "盛世肃清战", (41, 50), "主角vs魔神残魂+叛乱势力，核心：守护太平、清除内患"),
        stage(6, "神魔终极战", (51, 60), "主角vs上古暗黑魔神，核心：世界存亡、三界安危"),
        stage(7, "本心抉择战", (61, 70), "主角vs权位束缚，核心：拒绝仙帝之位，坚守摆烂初心"),
    ]
}

impl RuleTables {
    /// Built-in tables with the overrides from a RON file applied.
    pub fn load_from_ron(path: &Path) -> Result<RuleTables, RuleError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse_ron(&contents)
    }

    /// Built-in tables with the overrides from a RON string applied.
    pub fn parse_ron(input: &str) -> Result<RuleTables, RuleError> {
        let overrides: RuleOverrides = ron::from_str(input)?;
        let mut tables = RuleTables::default();
        tables.merge(overrides)?;
        Ok(tables)
    }

    /// Apply overrides. Unlock and keyword entries with an existing name
    /// replace it; plot stages, when given, replace the whole list and
    /// must still partition the season.
    pub fn merge(&mut self, overrides: RuleOverrides) -> Result<(), RuleError> {
        self.abilities.merge(overrides.abilities);
        self.forces.merge(overrides.forces);
        self.items.merge(overrides.items);
        for rule in overrides.titles {
            match self.titles.iter_mut().find(|t| t.title == rule.title) {
                Some(existing) => *existing = rule,
                None => self.titles.push(rule),
            }
        }
        self.character_stages.extend(overrides.character_stages);
        if let Some(stages) = overrides.plot_stages {
            self.plot_stages = stages;
        }
        self.character_keywords.merge(overrides.character_keywords);
        self.scene_keywords.merge(overrides.scene_keywords);
        self.check_partition()
    }

    pub fn table(&self, kind: UnlockKind) -> &UnlockTable {
        match kind {
            UnlockKind::Ability => &self.abilities,
            UnlockKind::Force => &self.forces,
            UnlockKind::Item => &self.items,
        }
    }

    /// `episode >= unlock_episode`; unknown entities are always unlocked.
    pub fn is_unlocked(&self, kind: UnlockKind, name: &str, episode: u32) -> bool {
        self.table(kind).is_unlocked(name, episode)
    }

    /// The plot stage containing `episode`, or `None` outside 1–70.
    pub fn plot_stage_for(&self, episode: u32) -> Option<&PlotStage> {
        self.plot_stages.iter().find(|s| s.contains(episode))
    }

    /// Episode range of a character's stage, if the stage table lists it.
    pub fn stage_range(&self, character: &str, stage: Stage) -> Option<(u32, u32)> {
        self.character_stages.get(character)?.get(&stage).copied()
    }

    /// Verify that exactly one plot stage covers every episode in 1–70.
    pub fn check_partition(&self) -> Result<(), RuleError> {
        for episode in FIRST_EPISODE..=LAST_EPISODE {
            match self.plot_stages.iter().filter(|s| s.contains(episode)).count() {
                0 => return Err(RuleError::PlotStageGap(episode)),
                1 => {}
                _ => return Err(RuleError::PlotStageOverlap(episode)),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_partition_is_exhaustive() {
        let rules = RuleTables::default();
        rules.check_partition().unwrap();
        assert_eq!(rules.plot_stages.len(), 7);
        for episode in FIRST_EPISODE..=LAST_EPISODE {
            assert!(rules.plot_stage_for(episode).is_some(), "episode {}", episode);
        }
        assert!(rules.plot_stage_for(0).is_none());
        assert!(rules.plot_stage_for(71).is_none());
    }

    #[test]
    fn plot_stage_boundaries() {
        let rules = RuleTables::default();
        assert_eq!(rules.plot_stage_for(10).unwrap().stage, 1);
        assert_eq!(rules.plot_stage_for(11).unwrap().stage, 2);
        assert_eq!(rules.plot_stage_for(70).unwrap().name, "本心抉择战");
    }

    #[test]
    fn unknown_entities_are_unlocked() {
        let rules = RuleTables::default();
        assert!(rules.is_unlocked(UnlockKind::Ability, "不存在的能力", 1));
        assert!(rules.is_unlocked(UnlockKind::Item, "不存在的道具", 0));
    }

    #[test]
    fn unlock_thresholds() {
        let rules = RuleTables::default();
        assert!(!rules.is_unlocked(UnlockKind::Ability, "白泽", 30));
        assert!(rules.is_unlocked(UnlockKind::Ability, "白泽", 31));
        assert!(!rules.is_unlocked(UnlockKind::Force, "七杀楼", 10));
        assert!(rules.is_unlocked(UnlockKind::Force, "七杀楼", 11));
        assert!(!rules.is_unlocked(UnlockKind::Item, "镇魔苍生笔", 40));
        assert!(rules.is_unlocked(UnlockKind::Item, "镇魔苍生笔", 41));
    }

    #[test]
    fn unlock_table_insert_keeps_position() {
        let mut table = UnlockTable::from_entries([("甲", 1), ("乙", 2)]);
        table.insert("甲", 9);
        table.insert("丙", 3);
        let names: Vec<&str> = table.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["甲", "乙", "丙"]);
        assert_eq!(table.get("甲"), Some(9));
    }

    #[test]
    fn stage_ranges() {
        let rules = RuleTables::default();
        assert_eq!(rules.stage_range("陆念离", Stage::Mid), Some((21, 50)));
        assert_eq!(rules.stage_range("路人", Stage::Mid), None);
    }

    #[test]
    fn parse_ron_overrides() {
        let rules = RuleTables::parse_ron(
            r#"(
                abilities: [("白泽", 25), ("画中藏物", 3)],
                titles: [(title: "女帝", character: "陆长乐", unlock_episode: 30, event: "登基")],
            )"#,
        )
        .unwrap();
        assert_eq!(rules.abilities.get("白泽"), Some(25));
        assert_eq!(rules.abilities.get("画中藏物"), Some(3));
        assert_eq!(rules.abilities.get("苍生笔"), Some(1));
        assert_eq!(rules.titles.len(), 2);
        assert_eq!(rules.titles[0].unlock_episode, 30);
    }

    #[test]
    fn overlapping_plot_stages_rejected() {
        let result = RuleTables::parse_ron(
            r#"(
                plot_stages: Some([
                    (stage: 1, name: "甲", range: (1, 40), description: ""),
                    (stage: 2, name: "乙", range: (40, 70), description: ""),
                ]),
            )"#,
        );
        assert!(matches!(result, Err(RuleError::PlotStageOverlap(40))));
    }

    #[test]
    fn gapped_plot_stages_rejected() {
        let result = RuleTables::parse_ron(
            r#"(
                plot_stages: Some([
                    (stage: 1, name: "甲", range: (1, 30), description: ""),
                    (stage: 2, name: "乙", range: (32, 70), description: ""),
                ]),
            )"#,
        );
        assert!(matches!(result, Err(RuleError::PlotStageGap(31))));
    }

    #[test]
    fn title_issue_text() {
        let rules = RuleTables::default();
        assert_eq!(
            rules.titles[0].issue(5),
            "人物【陆长乐】在第5集被称为女帝，但应在第31集后才登基"
        );
    }
}
