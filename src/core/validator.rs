//! Consistency validator.
//!
//! A pure scan over finished script text. Every check runs; findings are
//! concatenated in check order and never short-circuit.

use regex::Regex;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use std::sync::{Arc, LazyLock};

use crate::core::components::ACTION_MARKER;
use crate::core::rules::{RuleTables, UnlockKind};

/// Longest action body accepted on a single line.
pub const MAX_DESCRIPTION_CHARS: usize = 50;
/// Longest run of consecutive action lines accepted.
pub const MAX_CONSECUTIVE_ACTIONS: usize = 4;

const PREVIEW_CHARS: usize = 30;
const GOLD_TEXT: &str = "金色字体";
const NAME_LABEL_START: &str = "△金色字体，竖向，悬浮在";
const NAME_LABEL_END: &str = "旁边";

struct ForbiddenPattern {
    display: &'static str,
    regex: Regex,
    /// A match directly followed by this text does not count.
    unless_followed_by: Option<&'static str>,
}

impl ForbiddenPattern {
    fn matches(&self, line: &str) -> bool {
        self.regex.find_iter(line).any(|m| match self.unless_followed_by {
            Some(suffix) => !line[m.end()..].starts_with(suffix),
            None => true,
        })
    }
}

// (shown in the issue, regex, exemption)
const FORBIDDEN: [(&str, &str, Option<&str>); 10] = [
    ("眼神.*", "眼神.*", None),
    ("声音(?!提示：).*", "声音", Some("提示：")),
    ("心里.*", "心里.*", None),
    ("气氛.*", "气氛.*", None),
    ("像.*", "像.*", None),
    ("如.*", "如.*", None),
    ("冷冷地.*", "冷冷地.*", None),
    ("狠狠地.*", "狠狠地.*", None),
    ("轻轻.*", "轻轻.*", None),
    ("快速.*", "快速.*", None),
];

static FORBIDDEN_PATTERNS: LazyLock<Vec<ForbiddenPattern>> = LazyLock::new(|| {
    FORBIDDEN
        .iter()
        .filter_map(|(display, source, unless)| {
            Regex::new(source).ok().map(|regex| ForbiddenPattern {
                display: *display,
                regex,
                unless_followed_by: *unless,
            })
        })
        .collect()
});

/// Outcome of a validation run. `is_valid` is derived from `issues`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ValidationResult {
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.issues.is_empty()
    }

    /// Result carrying a single issue, for scripts that could not be read.
    pub fn unreadable() -> Self {
        ValidationResult {
            issues: vec!["无法加载剧本内容".to_string()],
            warnings: Vec::new(),
        }
    }
}

impl Serialize for ValidationResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ValidationResult", 3)?;
        state.serialize_field("is_valid", &self.is_valid())?;
        state.serialize_field("issues", &self.issues)?;
        state.serialize_field("warnings", &self.warnings)?;
        state.end()
    }
}

fn is_action(line: &str) -> bool {
    line.starts_with(ACTION_MARKER)
}

#[derive(Debug, Clone)]
pub struct ConsistencyValidator {
    rules: Arc<RuleTables>,
}

impl ConsistencyValidator {
    pub fn new(rules: Arc<RuleTables>) -> Self {
        ConsistencyValidator { rules }
    }

    pub fn validate(&self, episode: u32, content: &str) -> ValidationResult {
        let mut issues = Vec::new();
        issues.extend(self.check_forbidden_patterns(content));
        issues.extend(self.check_unlocks(UnlockKind::Ability, episode, content));
        issues.extend(self.check_unlocks(UnlockKind::Force, episode, content));
        issues.extend(self.check_titles(episode, content));
        issues.extend(self.check_description_length(content));
        issues.extend(self.check_consecutive_actions(content));

        let mut warnings = self.check_scene_descriptions(content);
        warnings.extend(self.check_intro_order(content));

        tracing::debug!(
            episode,
            issues = issues.len(),
            warnings = warnings.len(),
            "validated script"
        );
        ValidationResult { issues, warnings }
    }

    /// Every (line, pattern) pair that matches is reported.
    pub fn check_forbidden_patterns(&self, content: &str) -> Vec<String> {
        let mut issues = Vec::new();
        for (i, line) in content.split('\n').enumerate() {
            for pattern in FORBIDDEN_PATTERNS.iter() {
                if pattern.matches(line) {
                    issues.push(format!(
                        "第{}行：发现禁止模式【{}】：{}",
                        i + 1,
                        pattern.display,
                        line.trim()
                    ));
                }
            }
        }
        issues
    }

    /// Substring match against an unlock table, in table order.
    pub fn check_unlocks(&self, kind: UnlockKind, episode: u32, content: &str) -> Vec<String> {
        self.rules
            .table(kind)
            .iter()
            .filter(|(name, unlock)| episode < *unlock && content.contains(name))
            .map(|(name, unlock)| {
                format!(
                    "{}【{}】在第{}集出现，但应在第{}集后才解锁",
                    kind.label(),
                    name,
                    episode,
                    unlock
                )
            })
            .collect()
    }

    pub fn check_titles(&self, episode: u32, content: &str) -> Vec<String> {
        self.rules
            .titles
            .iter()
            .filter(|t| episode < t.unlock_episode && content.contains(t.title.as_str()))
            .map(|t| t.issue(episode))
            .collect()
    }

    pub fn check_description_length(&self, content: &str) -> Vec<String> {
        let mut issues = Vec::new();
        for (i, line) in content.split('\n').enumerate() {
            let Some(body) = line.strip_prefix(ACTION_MARKER) else {
                continue;
            };
            let body = body.trim();
            let len = body.chars().count();
            if len > MAX_DESCRIPTION_CHARS {
                let preview: String = body.chars().take(PREVIEW_CHARS).collect();
                issues.push(format!(
                    "第{}行：描写过长（{}字），建议拆分：{}...",
                    i + 1,
                    len,
                    preview
                ));
            }
        }
        issues
    }

    /// Runs of action lines longer than `MAX_CONSECUTIVE_ACTIONS`,
    /// including a run that reaches the end of the text.
    pub fn check_consecutive_actions(&self, content: &str) -> Vec<String> {
        let lines: Vec<&str> = content.split('\n').collect();
        let mut issues = Vec::new();
        let mut run = 0usize;
        let mut start = 0usize;

        let flush = |run: usize, start: usize, end: usize, issues: &mut Vec<String>| {
            if run > MAX_CONSECUTIVE_ACTIONS {
                issues.push(format!(
                    "第{}-{}行：连续{}个△，建议穿插对话或声音",
                    start, end, run
                ));
            }
        };

        for (i, line) in lines.iter().enumerate() {
            let number = i + 1;
            if is_action(line) {
                if run == 0 {
                    start = number;
                }
                run += 1;
            } else {
                flush(run, start, number - 1, &mut issues);
                run = 0;
            }
        }
        flush(run, start, lines.len(), &mut issues);
        issues
    }

    /// Action lines (other than gold text) with neither `，` nor `。`.
    pub fn check_scene_descriptions(&self, content: &str) -> Vec<String> {
        content
            .split('\n')
            .enumerate()
            .filter(|(_, line)| is_action(line) && !line.contains(GOLD_TEXT))
            .filter(|(_, line)| !line.contains('，') && !line.contains('。'))
            .map(|(i, _)| {
                format!(
                    "第{}行：场景描写格式不正确，应为'时间+地点+物品+状态'格式",
                    i + 1
                )
            })
            .collect()
    }

    /// A character's floating name must follow an appearance: either the
    /// line right before it is a plain action line, or an earlier plain
    /// action line mentions the character. Characters without a floating
    /// name always pass.
    pub fn intro_order_ok(&self, content: &str, name: &str) -> bool {
        let lines: Vec<&str> = content.split('\n').collect();
        let label = format!("{}{}{}", NAME_LABEL_START, name, NAME_LABEL_END);
        let Some(at) = lines.iter().position(|l| l.starts_with(&label)) else {
            return true;
        };
        let plain_action = |l: &&str| is_action(l) && !l.contains(GOLD_TEXT);
        let previous = lines[..at].iter().rev().find(|l| !l.trim().is_empty());
        previous.is_some_and(plain_action)
            || lines[..at].iter().any(|l| plain_action(l) && l.contains(name))
    }

    pub fn check_intro_order(&self, content: &str) -> Vec<String> {
        let mut seen = Vec::new();
        for line in content.split('\n') {
            let name = line
                .strip_prefix(NAME_LABEL_START)
                .and_then(|rest| rest.split_once(NAME_LABEL_END))
                .map(|(name, _)| name);
            if let Some(name) = name {
                if !seen.contains(&name) {
                    seen.push(name);
                }
            }
        }
        seen.into_iter()
            .filter(|name| !self.intro_order_ok(content, name))
            .map(|name| format!("人物【{}】的悬浮字介绍应在外貌描写之后", name))
            .collect()
    }
}
