//! Text fragment formatters.
//!
//! Every function here is pure and returns newline-terminated text. The
//! validator and enforcer match on the exact punctuation produced here, so
//! the formats are fixed.

use crate::schema::marker::Color;
use crate::schema::scene::{Placement, Scene};

/// Action lines longer than this are candidates for splitting.
pub const MAX_ACTION_CHARS: usize = 50;
/// A split segment must have accumulated at least this many characters.
pub const MIN_SEGMENT_CHARS: usize = 20;

pub const ACTION_MARKER: char = '△';
pub const SOUND_PREFIX: &str = "声音提示：";
pub const SCENE_LABEL_PREFIX: &str = "△金色字体，横向，悬浮在场景上方，显示：";
pub const PANEL_PREFIX: &str = "△系统面板：";

const SPLIT_CONNECTORS: [char; 3] = ['，', '。', '；'];

/// `△{text}。`
pub fn action_line(text: &str) -> String {
    format!("{}{}。\n", ACTION_MARKER, text)
}

pub fn action_chain<S: AsRef<str>>(actions: &[S]) -> String {
    actions.iter().map(|a| action_line(a.as_ref())).collect()
}

/// Split an action at `，`/`。`/`；` once a segment has reached
/// `MIN_SEGMENT_CHARS`. Actions within `MAX_ACTION_CHARS` come back whole.
pub fn split_long_action(action: &str) -> Vec<String> {
    if action.chars().count() <= MAX_ACTION_CHARS {
        return vec![action.to_string()];
    }

    let mut parts = Vec::new();
    let mut current = String::new();
    for ch in action.chars() {
        current.push(ch);
        if SPLIT_CONNECTORS.contains(&ch) && current.chars().count() >= MIN_SEGMENT_CHARS {
            parts.push(current.trim_matches(&SPLIT_CONNECTORS[..]).to_string());
            current.clear();
        }
    }
    if !current.is_empty() {
        parts.push(current.trim_matches(&SPLIT_CONNECTORS[..]).to_string());
    }
    parts.retain(|p| !p.is_empty());

    if parts.is_empty() {
        vec![action.to_string()]
    } else {
        parts
    }
}

/// Action lines for a possibly long action, trailing punctuation removed
/// so `action_line` does not double it. Blank input yields no lines.
pub fn action_lines(action: &str) -> String {
    let action = action.trim();
    if action.is_empty() {
        return String::new();
    }
    split_long_action(action)
        .iter()
        .map(|part| action_line(part.trim_end_matches(&SPLIT_CONNECTORS[..])))
        .collect()
}

/// `△{attacker}{action}{target}。` then an optional `△{result}。`
pub fn combat_action(attacker: &str, action: &str, target: Option<&str>, result: Option<&str>) -> String {
    let mut out = action_line(&format!("{}{}{}", attacker, action, target.unwrap_or_default()));
    if let Some(result) = result.filter(|r| !r.is_empty()) {
        out.push_str(&action_line(result));
    }
    out
}

/// `△金色字体，竖向，悬浮在{name}旁边，显示：{name}：{identity}`
pub fn floating_name(name: &str, identity: &str) -> String {
    format!(
        "△金色字体，竖向，悬浮在{}旁边，显示：{}：{}\n",
        name, name, identity
    )
}

/// Appearance line then floating name; either half is dropped when its
/// text is empty.
pub fn character_intro(name: &str, appearance: &str, identity: &str) -> String {
    let mut out = String::new();
    if !appearance.is_empty() {
        out.push_str(&format!("{}{}\n", ACTION_MARKER, appearance));
    }
    if !identity.is_empty() {
        out.push_str(&floating_name(name, identity));
    }
    out
}

pub fn character_intro_with_action(name: &str, action: &str, appearance: &str, identity: &str) -> String {
    let mut out = match (action.is_empty(), appearance.is_empty()) {
        (false, false) => format!("△{}{}，{}\n", name, action, appearance),
        (true, false) => format!("△{}\n", appearance),
        (false, true) => format!("△{}{}。\n", name, action),
        (true, true) => String::new(),
    };
    if !identity.is_empty() {
        out.push_str(&floating_name(name, identity));
    }
    out
}

/// `{scene_id} {time} {内|外} {location}` followed by a blank line.
pub fn scene_header(scene_id: &str, time: &str, placement: Placement, location: &str) -> String {
    format!("{} {} {} {}\n\n", scene_id, time, placement.label(), location)
}

pub fn scene_label(location: &str) -> String {
    format!("{}{}\n", SCENE_LABEL_PREFIX, location)
}

/// `△{time}，{location}[，{items}][，{state}]。`
pub fn scene_description(time: &str, location: &str, items: &[&str], state: &str) -> String {
    let mut out = format!("△{}，{}", time, location);
    if !items.is_empty() {
        out.push('，');
        out.push_str(&items.join("、"));
    }
    if !state.is_empty() {
        out.push('，');
        out.push_str(state);
    }
    out.push_str("。\n");
    out
}

/// Describe a scene from the scene list, or just name it when unknown.
pub fn scene_description_for(name: &str, scene: Option<&Scene>) -> String {
    match scene {
        Some(scene) => scene_description(&scene.time, &scene.name, &[], &scene.description),
        None => action_line(name),
    }
}

/// `{speaker}：{line}` or `{speaker}（{cue}）：{line}`
pub fn dialogue(speaker: &str, line: &str, cue: Option<&str>) -> String {
    match cue.filter(|c| !c.is_empty()) {
        Some(cue) => format!("{}（{}）：{}\n", speaker, cue, line),
        None => format!("{}：{}\n", speaker, line),
    }
}

/// Interior monologue.
pub fn monologue(speaker: &str, line: &str) -> String {
    format!("{}（OS）：{}\n", speaker, line)
}

pub fn narrator(text: &str) -> String {
    format!("旁白：{}\n", text)
}

pub fn system_line(text: &str) -> String {
    format!("系统：{}\n", text)
}

/// `声音提示：{sound}（{description}）` or `声音提示：{sound}`
pub fn sound_cue(sound: &str, description: Option<&str>) -> String {
    match description.filter(|d| !d.is_empty()) {
        Some(d) => format!("{}{}（{}）\n", SOUND_PREFIX, sound, d),
        None => format!("{}{}\n", SOUND_PREFIX, sound),
    }
}

const COMBAT_SOUNDS: [(&str, &str); 7] = [
    ("挥刀", "唰"),
    ("拔剑", "锵"),
    ("砍中", "当"),
    ("踢中", "砰"),
    ("骨折", "咔嚓"),
    ("吐血", "噗"),
    ("爆炸", "BOOM"),
];

const ENVIRONMENT_SOUNDS: [(&str, &str); 7] = [
    ("开门", "吱呀"),
    ("关门", "砰"),
    ("脚步声", "踏踏"),
    ("风声", "呼呼"),
    ("雨声", "滴答"),
    ("雷声", "轰隆"),
    ("鸟鸣", "啾啾"),
];

fn sound_source(action: &str) -> String {
    if action.ends_with('声') {
        action.to_string()
    } else {
        format!("{}声", action)
    }
}

/// Sound cue for a combat action; unknown actions get a generic slap.
pub fn combat_sound(action: &str) -> String {
    let sound = COMBAT_SOUNDS
        .iter()
        .find(|(a, _)| *a == action)
        .map(|(_, s)| *s)
        .unwrap_or("啪");
    sound_cue(sound, Some(&sound_source(action)))
}

/// Sound cue for an ambient event, empty for unknown events.
pub fn environment_sound(event: &str) -> String {
    ENVIRONMENT_SOUNDS
        .iter()
        .find(|(e, _)| *e == event)
        .map(|(_, sound)| sound_cue(sound, Some(&sound_source(event))))
        .unwrap_or_default()
}

/// `【{COLOR}】{content}`
pub fn color_mark(color: Color, content: &str) -> String {
    format!("{}{}", color.marker(), content)
}

/// A color-marked action line.
pub fn highlight(color: Color, action: &str) -> String {
    color_mark(color, &action_line(action))
}

/// `【{COLOR}】△系统面板：半空中浮现淡蓝色透明面板，上面写着"{content}"`
pub fn system_panel(content: &str, color: Color) -> String {
    color_mark(
        color,
        &format!("{}半空中浮现淡蓝色透明面板，上面写着\"{}\"\n", PANEL_PREFIX, content),
    )
}

pub fn binding_panel<S: AsRef<str>>(rewards: &[S]) -> String {
    let rewards: Vec<&str> = rewards.iter().map(|r| r.as_ref()).collect();
    system_panel(
        &format!("系统绑定成功！新手大礼包激活：{}！", rewards.join(", ")),
        Color::Green,
    )
}

pub fn task_panel(name: &str, description: &str, reward: &str, penalty: Option<&str>) -> String {
    let content = match penalty.filter(|p| !p.is_empty()) {
        Some(penalty) => format!("{}：{}，奖励{}！{}", name, description, reward, penalty),
        None => format!("{}：{}，奖励{}！", name, description, reward),
    };
    system_panel(&content, Color::Green)
}

pub fn task_complete_panel(time_used: &str, reward: &str) -> String {
    system_panel(
        &format!("任务完成（耗时{}）！{}到账！", time_used, reward),
        Color::Green,
    )
}

pub fn main_quest_panel(description: &str, progress: &str, reward: &str) -> String {
    system_panel(
        &format!(
            "主线任务已激活：{}。当前进度：{}。奖励：{}。",
            description, progress, reward
        ),
        Color::Green,
    )
}

/// Warning panels are always blue; danger is shown as 1–5 stars.
pub fn warning_panel(content: &str, danger_level: u8) -> String {
    let stars = "★".repeat(danger_level.clamp(1, 5) as usize);
    color_mark(
        Color::Blue,
        &format!(
            "{}半空中浮现淡蓝色透明面板，上面显示\"{}，危险等级：{}\"\n",
            PANEL_PREFIX, content, stars
        ),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_line_format() {
        assert_eq!(action_line("夜，王府寝殿"), "△夜，王府寝殿。\n");
    }

    #[test]
    fn blank_action_has_no_lines() {
        assert_eq!(action_lines(""), "");
        assert_eq!(action_lines("  \n"), "");
        assert_eq!(action_lines("陆念离起身。"), "△陆念离起身。\n");
    }

    #[test]
    fn short_action_is_not_split() {
        let action = "陆念离推门而入，扫视四周";
        assert_eq!(split_long_action(action), vec![action]);
    }

    #[test]
    fn long_action_splits_at_connectors() {
        let first = "夜色深沉，镇北王府的寝殿里只剩一盏孤灯未灭，灯芯噼啪作响。";
        let second = "陆念离翻身坐起，披上外袍，赤足走到窗边推开半扇木窗。";
        let action = format!("{}{}", first, second);
        assert!(action.chars().count() > MAX_ACTION_CHARS);

        let parts = split_long_action(&action);
        assert!(parts.len() >= 2);
        for part in &parts {
            assert!(!part.ends_with('，') && !part.ends_with('。'));
        }
        assert_eq!(parts.concat().chars().filter(|c| *c == '陆').count(), 1);
    }

    #[test]
    fn unsplittable_action_falls_back() {
        let action = "甲".repeat(60);
        assert_eq!(split_long_action(&action), vec![action.clone()]);
    }

    #[test]
    fn intro_halves_are_optional() {
        assert_eq!(
            character_intro("陆长乐", "白衣如雪", "镇北王府二小姐"),
            "△白衣如雪\n△金色字体，竖向，悬浮在陆长乐旁边，显示：陆长乐：镇北王府二小姐\n"
        );
        assert_eq!(character_intro("路人", "", ""), "");
        assert!(!character_intro("路人", "", "商贩").contains("△路人"));
    }

    #[test]
    fn intro_with_action_variants() {
        assert_eq!(
            character_intro_with_action("太子", "推门而入", "", ""),
            "△太子推门而入。\n"
        );
        assert_eq!(
            character_intro_with_action("太子", "推门而入", "蟒袍玉带", ""),
            "△太子推门而入，蟒袍玉带\n"
        );
    }

    #[test]
    fn header_and_label() {
        assert_eq!(
            scene_header("1-1", "夜", Placement::Interior, "镇北王府·世子寝殿"),
            "1-1 夜 内 镇北王府·世子寝殿\n\n"
        );
        assert_eq!(
            scene_label("长安·街道"),
            "△金色字体，横向，悬浮在场景上方，显示：长安·街道\n"
        );
    }

    #[test]
    fn scene_description_forms() {
        assert_eq!(
            scene_description("夜", "正厅", &["烛台", "长案"], "空无一人"),
            "△夜，正厅，烛台、长案，空无一人。\n"
        );
        assert_eq!(scene_description_for("无名之地", None), "△无名之地。\n");
    }

    #[test]
    fn dialogue_forms() {
        assert_eq!(dialogue("陆念离", "走。", None), "陆念离：走。\n");
        assert_eq!(dialogue("陆念离", "走。", Some("起身")), "陆念离（起身）：走。\n");
        assert_eq!(monologue("陆念离", "穿越了。"), "陆念离（OS）：穿越了。\n");
        assert_eq!(narrator("三日后。"), "旁白：三日后。\n");
        assert_eq!(system_line("叮。"), "系统：叮。\n");
    }

    #[test]
    fn sound_forms() {
        assert_eq!(sound_cue("咚", Some("敲门声")), "声音提示：咚（敲门声）\n");
        assert_eq!(sound_cue("咚", None), "声音提示：咚\n");
        assert_eq!(combat_sound("拔剑"), "声音提示：锵（拔剑声）\n");
        assert_eq!(combat_sound("挠痒"), "声音提示：啪（挠痒声）\n");
        assert_eq!(environment_sound("脚步声"), "声音提示：踏踏（脚步声）\n");
        assert_eq!(environment_sound("打喷嚏"), "");
    }

    #[test]
    fn panel_variants() {
        assert_eq!(
            system_panel("叮", Color::Green),
            "【GREEN】△系统面板：半空中浮现淡蓝色透明面板，上面写着\"叮\"\n"
        );
        assert!(binding_panel(&["苍生笔", "修罗剑意"]).contains("新手大礼包激活：苍生笔, 修罗剑意！"));
        assert!(task_panel("护姐", "护住二姐", "寿命十年", None).contains("护姐：护住二姐，奖励寿命十年！\""));
        assert!(task_complete_panel("一炷香", "修罗剑意").contains("任务完成（耗时一炷香）！修罗剑意到账！"));
        assert!(main_quest_panel("一统百朝", "0%", "仙帝之位").contains("主线任务已激活：一统百朝。当前进度：0%。奖励：仙帝之位。"));
        assert_eq!(
            warning_panel("刺客逼近", 3),
            "【BLUE】△系统面板：半空中浮现淡蓝色透明面板，上面显示\"刺客逼近，危险等级：★★★\"\n"
        );
    }

    #[test]
    fn combat_chain() {
        assert_eq!(
            combat_action("陆念离", "一剑刺向", Some("刺客"), Some("刺客倒地")),
            "△陆念离一剑刺向刺客。\n△刺客倒地。\n"
        );
        assert_eq!(combat_action("刺客", "倒地", None, None), "△刺客倒地。\n");
    }
}
