//! Screenplay Engine: episode assembly and continuity checking for a
//! serialized web-fiction script.
//!
//! Turns structured story data (character sheets, scene lists, per-episode
//! outlines) into formatted script text by template assembly, then checks
//! the text against unlock tables, banned prose patterns and layout rules.
//! Findings are always reported alongside the text, never instead of it.

pub mod core;
pub mod schema;
