// Session persistence: the login session is stored as JSON in the user's
// home directory so later commands can reuse it.

use crate::models::SessionInfo;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Directory under the home dir holding the session and the log file.
pub fn appstax_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".appstax")
}

/// Where the current session lives on disk.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionStore { path: path.into() }
    }

    /// `~/.appstax/session`.
    pub fn default_location() -> Self {
        Self::new(appstax_dir().join("session"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn save(&self, session: &SessionInfo) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let data = serde_json::to_vec_pretty(session)?;
        std::fs::write(&self.path, data)
            .with_context(|| format!("Failed to write session to {}", self.path.display()))?;
        Ok(())
    }

    /// The stored session, or `None` if nobody is logged in.
    pub fn load(&self) -> Result<Option<SessionInfo>> {
        match std::fs::read(&self.path) {
            Ok(data) => {
                let session: SessionInfo =
                    serde_json::from_slice(&data).context("Parsing stored session")?;
                if session.session_id.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(session))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("Failed to read {}", self.path.display())),
        }
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("Failed to remove {}", self.path.display())),
        }
    }
}
