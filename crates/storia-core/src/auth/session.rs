use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Session file name in the config directory
const SESSION_FILE: &str = "session.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub token: String,
    pub name: String,
    #[serde(default)]
    pub user_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl SessionData {
    pub fn new(token: impl Into<String>, name: impl Into<String>, user_id: Option<String>) -> Self {
        Self {
            token: token.into(),
            name: name.into(),
            user_id,
            created_at: Utc::now(),
        }
    }
}

pub struct Session {
    dir: PathBuf,
    pub data: Option<SessionData>,
}

impl Session {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            data: None,
        }
    }

    /// Load session from disk. Returns whether a session was found.
    pub fn load(&mut self) -> Result<bool> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(false);
        }

        let contents = std::fs::read_to_string(&path).context("Failed to read session file")?;
        let data: SessionData =
            serde_json::from_str(&contents).context("Failed to parse session file")?;
        debug!(name = %data.name, "Session loaded");
        self.data = Some(data);
        Ok(true)
    }

    /// Save session to disk
    pub fn save(&self) -> Result<()> {
        if let Some(ref data) = self.data {
            std::fs::create_dir_all(&self.dir).context("Failed to create session directory")?;
            let contents = serde_json::to_string_pretty(data)?;
            std::fs::write(self.session_path(), contents).context("Failed to write session file")?;
        }
        Ok(())
    }

    /// Forget the token, in memory and on disk
    pub fn clear(&mut self) -> Result<()> {
        self.data = None;
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path).context("Failed to remove session file")?;
        }
        Ok(())
    }

    pub fn update(&mut self, data: SessionData) {
        self.data = Some(data);
    }

    pub fn token(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.token.as_str())
    }

    pub fn name(&self) -> Option<&str> {
        self.data.as_ref().map(|d| d.name.as_str())
    }

    pub fn is_logged_in(&self) -> bool {
        self.data.is_some()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_load_clear() {
        let dir = tempfile::tempdir().unwrap();

        let mut session = Session::new(dir.path());
        assert!(!session.load().unwrap());
        assert!(!session.is_logged_in());

        let data = SessionData::new("tok-123", "Dimas", Some("user-1".to_string()));
        session.update(data.clone());
        session.save().unwrap();

        let mut reloaded = Session::new(dir.path());
        assert!(reloaded.load().unwrap());
        assert_eq!(reloaded.data, Some(data));
        assert_eq!(reloaded.token(), Some("tok-123"));
        assert_eq!(reloaded.name(), Some("Dimas"));

        reloaded.clear().unwrap();
        assert_eq!(reloaded.token(), None);
        assert!(!Session::new(dir.path()).load().unwrap());
    }

    #[test]
    fn test_save_without_data_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let session = Session::new(dir.path().join("nested"));
        session.save().unwrap();
        assert!(!dir.path().join("nested").join(SESSION_FILE).exists());
    }

    #[test]
    fn test_corrupt_session_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), "{not json").unwrap();
        assert!(Session::new(dir.path()).load().is_err());
    }
}
