use serde::{Deserialize, Serialize};

/// Interior or exterior, as written in a scene header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Placement {
    Interior,
    Exterior,
}

impl Placement {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Interior => "内",
            Self::Exterior => "外",
        }
    }
}

/// A location from the scene list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default = "default_time")]
    pub time: String,
    #[serde(default)]
    pub description: String,
}

fn default_time() -> String {
    "日".to_string()
}
