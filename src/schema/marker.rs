use serde::{Deserialize, Serialize};

/// The three color markers a script uses to tag beats.
///
/// Each color carries a fixed thematic meaning; the format enforcer
/// requires at least one of each per episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    /// Highlight, payoff, golden-finger moment.
    Green,
    /// Conflict trigger.
    Yellow,
    /// Setup, hook, suspense.
    Blue,
}

impl Color {
    pub const ALL: [Color; 3] = [Color::Green, Color::Yellow, Color::Blue];

    /// Canonical token emitted inside `【…】`.
    pub fn token(&self) -> &'static str {
        match self {
            Self::Green => "GREEN",
            Self::Yellow => "YELLOW",
            Self::Blue => "BLUE",
        }
    }

    /// Chinese label accepted as an alternative spelling of the marker.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Green => "绿色",
            Self::Yellow => "黄色",
            Self::Blue => "蓝色",
        }
    }

    pub fn meaning(&self) -> &'static str {
        match self {
            Self::Green => "高光场景·金手指·大爽点",
            Self::Yellow => "冲突·矛盾·纷争触发",
            Self::Blue => "铺垫·钩子·悬念",
        }
    }

    /// `【GREEN】`
    pub fn marker(&self) -> String {
        format!("【{}】", self.token())
    }

    /// `【绿色】`
    pub fn label_marker(&self) -> String {
        format!("【{}】", self.label())
    }

    /// Parse either the token or the lowercase name ("green", "GREEN", "绿色").
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| {
            c.token().eq_ignore_ascii_case(s) || c.label() == s
        })
    }
}

impl Default for Color {
    fn default() -> Self {
        Self::Green
    }
}
