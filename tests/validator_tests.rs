/// Validator integration tests: unlock tables, banned patterns and layout
/// rules run over whole scripts.
use screenplay_engine::core::enforcer::FormatEnforcer;
use screenplay_engine::core::rules::{RuleTables, UnlockKind};
use screenplay_engine::core::validator::{ConsistencyValidator, ValidationResult};
use std::path::Path;
use std::sync::Arc;

fn default_validator() -> ConsistencyValidator {
    ConsistencyValidator::new(Arc::new(RuleTables::default()))
}

fn ability_issue<'a>(result: &'a ValidationResult, name: &str) -> Option<&'a String> {
    let prefix = format!("{}【{}】", UnlockKind::Ability.label(), name);
    result.issues.iter().find(|i| i.starts_with(&prefix))
}

#[test]
fn abilities_are_flagged_before_unlock_only() {
    let rules = RuleTables::default();
    let validator = default_validator();

    for (name, unlock) in rules.abilities.iter() {
        let script = format!("陆念离：看好了。\n△陆念离施展{}，破开阵法。\n", name);

        if unlock > 1 {
            let early = unlock - 1;
            let result = validator.validate(early, &script);
            let issue = ability_issue(&result, name)
                .unwrap_or_else(|| panic!("{} not flagged at episode {}", name, early));
            assert!(issue.contains(&format!("第{}集出现", early)), "{}", issue);
            assert!(issue.contains(&format!("第{}集后", unlock)), "{}", issue);
        }

        for episode in [unlock, unlock + 1, 70] {
            let result = validator.validate(episode, &script);
            assert!(
                ability_issue(&result, name).is_none(),
                "{} flagged at episode {}",
                name,
                episode
            );
        }
    }
}

#[test]
fn validation_is_idempotent() {
    let validator = default_validator();
    let script = "△陆念离眼神一冷。\n陆长乐：女帝之位迟早是我的。\n△白泽现身，血咒检测启动。\n";
    let first = validator.validate(3, script);
    let second = validator.validate(3, script);
    assert_eq!(first, second);
    assert!(!first.is_valid());
}

#[test]
fn five_consecutive_actions_are_one_issue() {
    let validator = default_validator();
    let five = "△夜，寝殿。\n△烛火摇晃。\n△窗外落雪。\n△刺客翻窗。\n△寒刃出鞘。\n陆念离：来了。\n";
    let result = validator.validate(1, five);
    assert_eq!(result.issues, vec!["第1-5行：连续5个△，建议穿插对话或声音"]);

    let four = "△夜，寝殿。\n△烛火摇晃。\n△窗外落雪。\n△刺客翻窗。\n陆念离：来了。\n";
    assert!(validator.validate(1, four).is_valid());
}

#[test]
fn description_length_boundary() {
    let validator = default_validator();
    let fifty = format!("△{}", "雪".repeat(50));
    let fifty_one = format!("△{}", "雪".repeat(51));
    assert!(validator.check_description_length(&fifty).is_empty());

    let issues = validator.check_description_length(&fifty_one);
    assert_eq!(issues.len(), 1);
    assert!(issues[0].starts_with("第1行：描写过长（51字）"), "{}", issues[0]);
}

#[test]
fn empress_title_in_episode_five() {
    let validator = default_validator();
    let script = "陆长乐：从今日起，我便是女帝。\n声音提示：咚（鼓声）\n";
    let result = validator.validate(5, script);
    assert_eq!(result.issues.len(), 1);
    assert!(result.issues[0].contains("31"), "{}", result.issues[0]);
    assert!(result.issues[0].contains("陆长乐"));
}

#[test]
fn unlock_names_match_as_substrings() {
    // Known limitation: a name inside a longer unrelated word still counts.
    let validator = default_validator();
    let result = validator.validate(10, "△陆念离站在白泽湖畔。\n");
    assert!(result.issues.iter().any(|i| i.contains("【白泽】")));

    // The scroll prototype unlocks at 11, but the full scroll's name is
    // inside it and unlocks at 31.
    let result = validator.validate(11, "△陆念离展开乾坤画轴雏形。\n");
    assert!(ability_issue(&result, "乾坤画轴").is_some());
}

#[test]
fn rule_overrides_from_fixture() {
    let rules = RuleTables::load_from_ron(Path::new("tests/fixtures/rules_override.ron")).unwrap();
    assert_eq!(rules.abilities.get("白泽"), Some(25));
    assert_eq!(rules.abilities.get("画中藏物"), Some(3));
    assert_eq!(rules.forces.get("白泽"), Some(31));
    assert!(rules.titles.iter().any(|t| t.title == "仙帝"));
    assert!(rules.titles.iter().any(|t| t.title == "女帝"));

    let validator = ConsistencyValidator::new(Arc::new(rules));
    let result = validator.validate(26, "△白泽跟在陆念离身后。\n");
    assert!(ability_issue(&result, "白泽").is_none());
    assert_eq!(
        result.issues,
        vec!["势力【白泽】在第26集出现，但应在第31集后才解锁"]
    );
}

#[test]
fn warnings_do_not_affect_validity() {
    let validator = default_validator();
    let script = "△金色字体，竖向，悬浮在陆长乐旁边，显示：陆长乐：镇北军统领\n△陆长乐拔剑\n";
    let result = validator.validate(1, script);
    assert!(result.is_valid());
    assert_eq!(result.warnings.len(), 2);
}

#[test]
fn sound_cues_pass_but_voice_phrases_do_not() {
    // The validator only bans `声音` outside a sound cue; the enforcer bans
    // voice phrases anywhere.
    let script = "声音提示：咚（鼓声）\n陆念离：走。\n";
    assert!(default_validator().validate(1, script).is_valid());
    let report = FormatEnforcer::default().check_script("陆念离声音沙哑。", None);
    assert_eq!(report.forbidden_issues, vec!["[禁止事项] 发现声音描写：'声音沙哑'"]);
}
