//! Keyword tables mapping free outline text onto canonical character and
//! scene names.
//!
//! Tables are ordered; when several entries could claim a mention, the
//! earlier entry wins.

use serde::{Deserialize, Serialize};

use crate::schema::outline::Outline;

/// Location used when no scene keyword matches.
pub const DEFAULT_SCENE: &str = "镇北王府·世子寝殿";

/// One canonical name and the keywords that refer to it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeywordEntry {
    pub canonical: String,
    pub keywords: Vec<String>,
}

impl KeywordEntry {
    pub fn new(canonical: &str, keywords: &[&str]) -> Self {
        KeywordEntry {
            canonical: canonical.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }

    pub fn matches(&self, text: &str) -> bool {
        self.keywords.iter().any(|k| text.contains(k.as_str()))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KeywordTable {
    entries: Vec<KeywordEntry>,
}

impl KeywordTable {
    pub fn new(entries: Vec<KeywordEntry>) -> Self {
        KeywordTable { entries }
    }

    /// Supporting cast and antagonists. The protagonist is not listed; the
    /// extractor always puts them first.
    pub fn default_characters() -> Self {
        KeywordTable::new(vec![
            KeywordEntry::new("陆长乐", &["陆长乐", "二姐", "姐姐"]),
            KeywordEntry::new("镇北王", &["镇北王", "父王", "陆无敌"]),
            KeywordEntry::new("太子", &["太子", "朱峰"]),
            KeywordEntry::new("皇后", &["皇后", "苏云纤"]),
            KeywordEntry::new("百晓通", &["百晓通", "百晓堂"]),
            KeywordEntry::new("六剑奴", &["六剑奴", "剑奴"]),
            KeywordEntry::new("李梦邪", &["李梦邪", "七杀楼"]),
            KeywordEntry::new("陈蒹葭", &["陈蒹葭", "蒹葭"]),
            KeywordEntry::new("白泽", &["白泽", "神兽"]),
            KeywordEntry::new("蒙面女子", &["蒙面女子"]),
        ])
    }

    pub fn default_scenes() -> Self {
        KeywordTable::new(vec![
            KeywordEntry::new(DEFAULT_SCENE, &["寝殿", "世子寝殿", "房间", "王府"]),
            KeywordEntry::new("镇北王府·正厅", &["正厅", "大厅"]),
            KeywordEntry::new("镇北王府·后花园", &["后花园", "花园"]),
            KeywordEntry::new("长安·醉仙楼", &["醉仙楼", "酒楼"]),
            KeywordEntry::new("长安·百晓堂", &["百晓堂", "情报堂"]),
            KeywordEntry::new("长安·街道", &["街道", "长安"]),
            KeywordEntry::new("皇宫", &["皇宫", "宫廷"]),
            KeywordEntry::new("皇宫·御书房", &["御书房"]),
            KeywordEntry::new("北荒·边境", &["北荒", "边境"]),
            KeywordEntry::new("皇家狩猎场", &["狩猎场", "狩猎"]),
        ])
    }

    /// Canonical name of the first entry with a keyword in `text`.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.matches(text))
            .map(|e| e.canonical.as_str())
    }

    /// Canonical names of every matching entry, in table order.
    pub fn all_matches(&self, text: &str) -> Vec<&str> {
        self.entries
            .iter()
            .filter(|e| e.matches(text))
            .map(|e| e.canonical.as_str())
            .collect()
    }

    /// Same-canonical entries replace in place; new entries append.
    pub fn merge(&mut self, other: KeywordTable) {
        for entry in other.entries {
            match self
                .entries
                .iter_mut()
                .find(|e| e.canonical == entry.canonical)
            {
                Some(existing) => *existing = entry,
                None => self.entries.push(entry),
            }
        }
    }

    pub fn entries(&self) -> &[KeywordEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Roster for an episode: the protagonist, then every character mentioned
/// anywhere in the outline's free text.
pub fn extract_characters(outline: &Outline, table: &KeywordTable, protagonist: &str) -> Vec<String> {
    let text = outline.character_text();
    let mut names = vec![protagonist.to_string()];
    for name in table.all_matches(&text) {
        if name != protagonist {
            names.push(name.to_string());
        }
    }
    names
}

/// Locations named in the event logic, or the default scene when none are.
pub fn extract_scenes(outline: &Outline, table: &KeywordTable) -> Vec<String> {
    let scenes: Vec<String> = table
        .all_matches(&outline.event_logic.joined())
        .into_iter()
        .map(str::to_string)
        .collect();
    if scenes.is_empty() {
        vec![DEFAULT_SCENE.to_string()]
    } else {
        scenes
    }
}

/// `1-1 日 内 镇北王府·世子寝殿；1-2 日 内 …`
pub fn scene_list(episode: u32, scenes: &[String]) -> String {
    scenes
        .iter()
        .enumerate()
        .map(|(i, scene)| format!("{}-{} 日 内 {}", episode, i + 1, scene))
        .collect::<Vec<_>>()
        .join("；")
}
