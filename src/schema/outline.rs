use serde::{Deserialize, Serialize};

const CAUSE_LABEL: &str = "起因：";
const PROCESS_LABEL: &str = "经过：";
const RESULT_LABEL: &str = "结果：";

/// Cause / process / result of an episode's central event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawEventLogic")]
pub struct EventLogic {
    pub cause: String,
    pub process: String,
    pub result: String,
}

// Outline documents carry event logic either as a table or as one
// labelled paragraph, so accept both on the way in.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawEventLogic {
    Structured {
        #[serde(default)]
        cause: String,
        #[serde(default)]
        process: String,
        #[serde(default)]
        result: String,
    },
    Text(String),
}

impl From<RawEventLogic> for EventLogic {
    fn from(raw: RawEventLogic) -> Self {
        match raw {
            RawEventLogic::Structured {
                cause,
                process,
                result,
            } => EventLogic {
                cause,
                process,
                result,
            },
            RawEventLogic::Text(text) => EventLogic::parse(&text),
        }
    }
}

impl EventLogic {
    /// Parse the `起因：…经过：…结果：…` paragraph form.
    ///
    /// Each field runs from its label to the next label (or end of text).
    /// Missing labels leave the field empty.
    pub fn parse(text: &str) -> Self {
        let section = |label: &str, next: Option<&str>| -> String {
            let Some(start) = text.find(label) else {
                return String::new();
            };
            let body = &text[start + label.len()..];
            let end = next.and_then(|n| body.find(n)).unwrap_or(body.len());
            body[..end].trim().to_string()
        };

        EventLogic {
            cause: section(CAUSE_LABEL, Some(PROCESS_LABEL)),
            process: section(PROCESS_LABEL, Some(RESULT_LABEL)),
            result: section(RESULT_LABEL, None),
        }
    }

    /// The three fields joined by spaces, for keyword scanning.
    pub fn joined(&self) -> String {
        format!("{} {} {}", self.cause, self.process, self.result)
    }
}

/// The beat sheet for a single episode. Read-only once parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    pub episode: u32,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub main_progress: String,
    #[serde(default)]
    pub event_logic: EventLogic,
    #[serde(default)]
    pub hook: String,
    #[serde(default)]
    pub climax: String,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub conflicts: Vec<String>,
}

impl Outline {
    /// Title line for the script. Titles that already carry the episode
    /// number are kept; bare titles get a `第{n}集：` prefix; a missing title
    /// becomes `第{n}集`.
    pub fn display_title(&self) -> String {
        let title = self.title.trim();
        if title.is_empty() {
            format!("第{}集", self.episode)
        } else if title.starts_with('第') && title.contains('集') {
            title.to_string()
        } else {
            format!("第{}集：{}", self.episode, title)
        }
    }

    /// All free-text fields the character extractor scans.
    pub fn character_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.main_progress,
            self.event_logic.joined(),
            self.hook,
            self.climax
        )
    }
}
