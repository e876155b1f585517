//! Format and style enforcer: banned phrasing, description/dialogue
//! interleave, required markers, per-episode requirements for the opening
//! episodes, and script layout.

use serde::{Deserialize, Serialize};

use crate::core::components::{ACTION_MARKER, PANEL_PREFIX, SOUND_PREFIX};
use crate::schema::marker::Color;

/// Longest run of description lines tolerated between dialogue.
pub const MAX_ACTION_RUN: usize = 5;
/// Highest description:dialogue ratio tolerated.
pub const MAX_ACTION_RATIO: f64 = 5.0;

const SCENE_LABEL: &str = "金色字体，横向，悬浮在场景上方";

struct PhraseCategory {
    label: &'static str,
    phrases: &'static [&'static str],
}

const EYE: PhraseCategory = PhraseCategory {
    label: "眼神描写",
    phrases: &[
        "眼神冷", "眼神锐利", "眼神一冷", "眼神扫过", "眼神没离开", "眼神坚定",
        "眼神警惕", "眼神变得专注", "眼神频繁瞟", "眼神怒", "眼神骤亮",
    ],
};

const VOICE: PhraseCategory = PhraseCategory {
    label: "声音描写",
    phrases: &["声音冷", "声音狠", "声音发颤", "喉间压狠音", "声音沙哑", "声音低沉"],
};

const CATEGORIES: [PhraseCategory; 7] = [
    EYE,
    VOICE,
    PhraseCategory {
        label: "心理描写",
        phrases: &["心中暗爽", "很害怕", "心里想", "心中想", "心里觉得", "心中觉得"],
    },
    PhraseCategory {
        label: "情感描述",
        phrases: &["气氛紧张", "很愤怒", "恐惧", "开心", "悲伤", "兴奋", "焦虑", "紧张"],
    },
    PhraseCategory {
        label: "抽象描述",
        phrases: &["很安静", "气质清雅", "优雅", "美丽", "丑陋", "英俊", "高大", "矮小", "肥胖"],
    },
    PhraseCategory {
        label: "比喻",
        phrases: &[
            "像什么", "如什么", "如诗如画", "如同", "宛如", "仿佛", "好似", "恰似", "犹如", "好像",
        ],
    },
    PhraseCategory {
        label: "形容词/副词修饰",
        phrases: &[
            "冷冷地", "狠狠地", "轻轻", "快速", "慢慢地", "缓缓地", "重重地", "悄悄地", "偷偷地",
            "渐渐地",
        ],
    },
];

/// Findings grouped by check. `all_issues` holds every finding in order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleReport {
    pub forbidden_issues: Vec<String>,
    pub interleave_issues: Vec<String>,
    pub required_issues: Vec<String>,
    pub format_issues: Vec<String>,
    pub all_issues: Vec<String>,
}

impl StyleReport {
    pub fn is_clean(&self) -> bool {
        self.all_issues.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LineKind {
    Action,
    Sound,
    Dialogue,
    Other,
}

/// Classify a non-empty line. A leading color marker is ignored; sound
/// cues are recognised before dialogue since they also contain a colon.
pub(crate) fn classify(line: &str) -> LineKind {
    let body = Color::ALL
        .iter()
        .find_map(|c| {
            line.strip_prefix(c.marker().as_str())
                .or_else(|| line.strip_prefix(c.label_marker().as_str()))
                .map(str::to_string)
        })
        .unwrap_or_else(|| line.to_string());

    if body.starts_with(ACTION_MARKER) {
        LineKind::Action
    } else if body.starts_with(SOUND_PREFIX) {
        LineKind::Sound
    } else if body.contains('：') || body.contains(':') {
        LineKind::Dialogue
    } else {
        LineKind::Other
    }
}

fn has_color(content: &str, color: Color) -> bool {
    content.contains(&color.marker()) || content.contains(&color.label_marker())
}

#[derive(Debug, Clone)]
pub struct FormatEnforcer {
    protagonist: String,
}

impl Default for FormatEnforcer {
    fn default() -> Self {
        FormatEnforcer::new("陆念离")
    }
}

impl FormatEnforcer {
    pub fn new(protagonist: impl Into<String>) -> Self {
        FormatEnforcer {
            protagonist: protagonist.into(),
        }
    }

    pub fn check_script(&self, content: &str, episode: Option<u32>) -> StyleReport {
        let forbidden_issues = self.check_forbidden(content);
        let interleave_issues = self.check_interleave(content);
        let required_issues = self.check_required(content, episode);
        let mut format_issues = self.check_structure(content);
        format_issues.extend(self.check_scene_headers(content));
        format_issues.extend(self.check_dialogue_parentheses(content));

        let all_issues = forbidden_issues
            .iter()
            .chain(&interleave_issues)
            .chain(&required_issues)
            .chain(&format_issues)
            .cloned()
            .collect::<Vec<_>>();

        tracing::debug!(?episode, issues = all_issues.len(), "style check");
        StyleReport {
            forbidden_issues,
            interleave_issues,
            required_issues,
            format_issues,
            all_issues,
        }
    }

    /// Literal-phrase bans by category, then eye/voice phrases inside the
    /// first parenthetical of each line.
    pub fn check_forbidden(&self, content: &str) -> Vec<String> {
        let mut issues = Vec::new();
        for category in &CATEGORIES {
            for phrase in category.phrases {
                if content.contains(phrase) {
                    issues.push(format!("[禁止事项] 发现{}：'{}'", category.label, phrase));
                }
            }
        }

        for (i, line) in content.split('\n').enumerate() {
            let Some(cue) = parenthetical(line) else {
                continue;
            };
            for category in [&EYE, &VOICE] {
                for phrase in category.phrases {
                    if cue.contains(phrase) {
                        issues.push(format!(
                            "[禁止事项] 第{}行台词括号中发现{}：'{}'",
                            i + 1,
                            category.label,
                            phrase
                        ));
                    }
                }
            }
        }
        issues
    }

    pub fn check_interleave(&self, content: &str) -> Vec<String> {
        let mut actions = 0usize;
        let mut dialogues = 0usize;
        let mut run = 0usize;
        let mut longest = 0usize;

        for line in content.split('\n').map(str::trim).filter(|l| !l.is_empty()) {
            match classify(line) {
                LineKind::Action => {
                    actions += 1;
                    run += 1;
                    longest = longest.max(run);
                }
                LineKind::Dialogue => {
                    dialogues += 1;
                    run = 0;
                }
                LineKind::Sound => run = 0,
                LineKind::Other => {}
            }
        }

        let mut issues = Vec::new();
        if longest > MAX_ACTION_RUN {
            issues.push(format!(
                "[穿插比例] 发现连续{}句纯场景/动作描写，超过限制",
                longest
            ));
        }
        if actions > 0 && dialogues > 0 {
            let ratio = actions as f64 / dialogues as f64;
            if ratio > MAX_ACTION_RATIO {
                issues.push(format!(
                    "[穿插比例] 场景/动作描写与对话比例失衡（{:.1}:1），建议调整为3-5:1",
                    ratio
                ));
            }
        }
        issues
    }

    /// Markers and annotations every episode needs, plus the extra
    /// requirements for episodes 1–3.
    pub fn check_required(&self, content: &str, episode: Option<u32>) -> Vec<String> {
        let mut issues = Vec::new();
        for (color, beat) in [
            (Color::Green, "高光场景标记"),
            (Color::Yellow, "冲突场景标记"),
            (Color::Blue, "钩子标记"),
        ] {
            if !has_color(content, color) {
                issues.push(format!("[必须包含] 缺少{}{}", color.label_marker(), beat));
            }
        }
        if !content.contains(SOUND_PREFIX) {
            issues.push("[必须包含] 缺少音效标注".to_string());
        }
        if !content.contains(SCENE_LABEL) {
            issues.push("[必须包含] 缺少金色字体场景标注".to_string());
        }
        if !content.contains(PANEL_PREFIX) {
            issues.push("[必须包含] 缺少系统面板可视化描述".to_string());
        }
        if let Some(episode) = episode {
            issues.extend(self.check_opening_episode(content, episode));
        }
        issues
    }

    pub fn check_opening_episode(&self, content: &str, episode: u32) -> Vec<String> {
        let has_quest = content.contains("主线任务");
        let mut issues = Vec::new();
        match episode {
            1 => {
                if !content.contains(&format!("{}（OS）：", self.protagonist)) {
                    issues.push("[第一集专项] 缺少OS交代世界观、背景、身份、主线目标".to_string());
                }
                if !content.contains("姐姐") && !content.contains("二姐") {
                    issues.push("[第一集专项] 缺少护姐宣言".to_string());
                }
                if !has_quest {
                    issues.push("[第一集专项] 缺少系统任务提示".to_string());
                }
            }
            2 => {
                if !content.contains("主线") {
                    issues.push("[第二集专项] 缺少主线推进".to_string());
                }
                if !has_quest {
                    issues.push("[第二集专项] 缺少系统任务提示".to_string());
                }
            }
            3 => {
                if !content.contains("一统百朝") && !content.contains("终结乱世") {
                    issues.push("[第三集专项] 缺少台词明确最终目标".to_string());
                }
                if !has_quest {
                    issues.push("[第三集专项] 缺少系统任务提示".to_string());
                }
            }
            _ => {}
        }
        issues
    }

    pub fn check_structure(&self, content: &str) -> Vec<String> {
        let mut issues = Vec::new();
        let has_title = content
            .lines()
            .map(str::trim)
            .any(|l| l.starts_with('第') && l.contains('集'));
        if !has_title {
            issues.push("[结构] 剧本缺少标题".to_string());
        }
        if !content.contains("出场人物：") {
            issues.push("[结构] 剧本缺少出场人物".to_string());
        }
        if !content.contains("场景列表：") {
            issues.push("[结构] 剧本缺少场景列表".to_string());
        }
        issues
    }

    /// Lines that look like a scene header must have id, time,
    /// interior/exterior and location.
    pub fn check_scene_headers(&self, content: &str) -> Vec<String> {
        content
            .split('\n')
            .enumerate()
            .filter(|(_, line)| looks_like_header(line.trim()))
            .filter(|(_, line)| line.trim().split(' ').count() < 4)
            .map(|(i, _)| {
                format!(
                    "[场景格式] 第{}行：场景格式不正确，应为 '场景编号 时间 内外 场景名称'",
                    i + 1
                )
            })
            .collect()
    }

    pub fn check_dialogue_parentheses(&self, content: &str) -> Vec<String> {
        let mut issues = Vec::new();
        for (i, line) in content.split('\n').enumerate() {
            if line.contains("（眼神") || line.contains("(眼神") {
                issues.push(format!("[台词格式] 第{}行：台词括号中禁止描写眼神", i + 1));
            }
            if line.contains("（声音") || line.contains("(声音") {
                issues.push(format!("[台词格式] 第{}行：台词括号中禁止描写声音", i + 1));
            }
        }
        issues
    }
}

fn looks_like_header(line: &str) -> bool {
    !line.is_empty()
        && !line.starts_with(ACTION_MARKER)
        && line.contains('-')
        && (line.contains('日') || line.contains('夜'))
        && (line.contains('内') || line.contains('外'))
}

/// Text between the first `（` and the first `）` after it.
fn parenthetical(line: &str) -> Option<&str> {
    let start = line.find('（')? + '（'.len_utf8();
    let end = line[start..].find('）')?;
    Some(&line[start..start + end])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complete_script() -> String {
        [
            "第3集：立志",
            "",
            "出场人物：陆念离",
            "",
            "场景列表：3-1 日 内 长安·街道",
            "",
            "3-1 日 内 长安·街道",
            "",
            "△金色字体，横向，悬浮在场景上方，显示：长安·街道",
            "△日，长安街头，人来人往。",
            "陆念离：我要一统百朝。",
            "声音提示：咚（鼓声）",
            "【GREEN】△陆念离拔剑出鞘。",
            "【YELLOW】△刺客拦住去路。",
            "【BLUE】△系统面板：半空中浮现淡蓝色透明面板，上面写着\"主线任务已激活\"",
        ]
        .join("\n")
    }

    #[test]
    fn complete_script_is_clean() {
        let report = FormatEnforcer::default().check_script(&complete_script(), Some(3));
        assert!(report.is_clean(), "{:?}", report.all_issues);
    }

    #[test]
    fn forbidden_phrase_categories() {
        let issues = FormatEnforcer::default().check_forbidden("他仿佛很害怕");
        assert_eq!(
            issues,
            vec!["[禁止事项] 发现心理描写：'很害怕'", "[禁止事项] 发现比喻：'仿佛'"]
        );
    }

    #[test]
    fn parenthetical_eye_phrase() {
        let issues = FormatEnforcer::default().check_forbidden("太子（眼神一冷）：放肆。");
        assert!(issues.contains(&"[禁止事项] 第1行台词括号中发现眼神描写：'眼神一冷'".to_string()));
        assert!(issues.contains(&"[禁止事项] 发现眼神描写：'眼神一冷'".to_string()));
    }

    #[test]
    fn sound_cue_is_not_dialogue() {
        assert_eq!(classify("声音提示：咚"), LineKind::Sound);
        assert_eq!(classify("太子：放肆。"), LineKind::Dialogue);
        assert_eq!(classify("【GREEN】△系统面板：叮"), LineKind::Action);
        assert_eq!(classify("1-1 日 内 皇宫"), LineKind::Other);
    }

    #[test]
    fn long_action_run_flagged() {
        let content = "△一。\n△二。\n△三。\n△四。\n△五。\n△六。\n甲：好。";
        let issues = FormatEnforcer::default().check_interleave(content);
        assert_eq!(issues[0], "[穿插比例] 发现连续6句纯场景/动作描写，超过限制");
        assert_eq!(
            issues[1],
            "[穿插比例] 场景/动作描写与对话比例失衡（6.0:1），建议调整为3-5:1"
        );
    }

    #[test]
    fn sound_cue_breaks_run() {
        let content = "△一。\n△二。\n△三。\n声音提示：咚\n△四。\n△五。\n△六。\n甲：好。\n乙：好。";
        assert!(FormatEnforcer::default().check_interleave(content).is_empty());
    }

    #[test]
    fn required_markers_reported_separately() {
        let issues = FormatEnforcer::default().check_required("", None);
        assert_eq!(
            issues,
            vec![
                "[必须包含] 缺少【绿色】高光场景标记",
                "[必须包含] 缺少【黄色】冲突场景标记",
                "[必须包含] 缺少【蓝色】钩子标记",
                "[必须包含] 缺少音效标注",
                "[必须包含] 缺少金色字体场景标注",
                "[必须包含] 缺少系统面板可视化描述",
            ]
        );
    }

    #[test]
    fn chinese_color_labels_accepted() {
        let issues = FormatEnforcer::default().check_required("【绿色】【黄色】【蓝色】", None);
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| !i.contains("标记")));
    }

    #[test]
    fn first_episode_requirements() {
        let enforcer = FormatEnforcer::default();
        let issues = enforcer.check_opening_episode("", 1);
        assert_eq!(issues.len(), 3);
        assert!(enforcer
            .check_opening_episode("陆念离（OS）：穿越了。\n二姐在此。\n主线任务", 1)
            .is_empty());
        assert!(enforcer.check_opening_episode("", 4).is_empty());
    }

    #[test]
    fn protagonist_is_configurable() {
        let enforcer = FormatEnforcer::new("沈青");
        let issues = enforcer.check_opening_episode("沈青（OS）：醒了。姐姐。主线任务", 1);
        assert!(issues.is_empty());
    }

    #[test]
    fn scene_header_shape() {
        let issues = FormatEnforcer::default().check_scene_headers("1-1 日 内皇宫\n1-2 夜 外 长安·街道");
        assert_eq!(
            issues,
            vec!["[场景格式] 第1行：场景格式不正确，应为 '场景编号 时间 内外 场景名称'"]
        );
    }

    #[test]
    fn structure_and_parentheses() {
        let enforcer = FormatEnforcer::default();
        assert_eq!(enforcer.check_structure("").len(), 3);
        let issues = enforcer.check_dialogue_parentheses("太子（声音发颤）：你……");
        assert_eq!(issues, vec!["[台词格式] 第1行：台词括号中禁止描写声音"]);
    }
}
