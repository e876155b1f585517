//! Script archive: finished episodes stored as `第{n}集.md` under one
//! output directory.

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("no archived script for episode {0}")]
    Missing(u32),
}

#[derive(Debug, Clone)]
pub struct ScriptArchive {
    dir: PathBuf,
}

impl ScriptArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        ScriptArchive { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, episode: u32) -> PathBuf {
        self.dir.join(format!("第{}集.md", episode))
    }

    /// Write a script, creating the directory if needed. Returns the path
    /// written.
    pub fn save(&self, episode: u32, content: &str) -> Result<PathBuf, ArchiveError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path_for(episode);
        std::fs::write(&path, content)?;
        tracing::debug!(episode, path = %path.display(), "archived script");
        Ok(path)
    }

    /// Read an archived script. `第{n}集.md` is tried first, then `{n}.md`.
    pub fn load(&self, episode: u32) -> Result<String, ArchiveError> {
        for path in [self.path_for(episode), self.dir.join(format!("{}.md", episode))] {
            if path.is_file() {
                return Ok(std::fs::read_to_string(path)?);
            }
        }
        Err(ArchiveError::Missing(episode))
    }

    /// Archived episode numbers in ascending order. A missing directory is
    /// an empty archive.
    pub fn list(&self) -> Result<Vec<u32>, ArchiveError> {
        if !self.dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut episodes = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(episode) = episode_from_filename(&path) {
                episodes.push(episode);
            }
        }
        episodes.sort_unstable();
        episodes.dedup();
        Ok(episodes)
    }
}

/// Episode number from `第12集.md` or `12.md`.
pub fn episode_from_filename(path: &Path) -> Option<u32> {
    if path.extension().and_then(|e| e.to_str()) != Some("md") {
        return None;
    }
    let stem = path.file_stem()?.to_str()?;
    let digits = stem
        .strip_prefix('第')
        .and_then(|s| s.strip_suffix('集'))
        .unwrap_or(stem);
    digits.parse().ok()
}
