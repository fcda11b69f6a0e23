//! Handoff record shared between the scenario and teardown commands
//!
//! The scenario writes the manager's credentials on every exit path; the
//! teardown reads them once and removes the file on every exit path. A
//! missing file means there is nothing to clean.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Credentials needed to log back in as the generated manager
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffRecord {
    #[serde(default)]
    pub gestor_email: String,
    #[serde(default)]
    pub gestor_senha: String,
}

impl HandoffRecord {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        HandoffRecord {
            gestor_email: email.into(),
            gestor_senha: password.into(),
        }
    }

    /// Read the record, or `None` when no file exists
    pub fn load(path: &Path) -> Result<Option<Self>> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(e).context(format!("Failed to read {}", path.display()));
            }
        };
        let record = serde_json::from_str(&raw)
            .context(format!("Invalid handoff record in {}", path.display()))?;
        Ok(Some(record))
    }

    pub fn store(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
            .context(format!("Failed to write {}", path.display()))?;
        debug!("Wrote handoff record to {}", path.display());
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        !self.gestor_email.is_empty() && !self.gestor_senha.is_empty()
    }
}

/// Writes the record when committed, or when dropped without a commit
pub struct HandoffGuard {
    path: PathBuf,
    record: HandoffRecord,
    written: bool,
}

impl HandoffGuard {
    pub fn arm(path: impl Into<PathBuf>, record: HandoffRecord) -> Self {
        HandoffGuard {
            path: path.into(),
            record,
            written: false,
        }
    }

    pub fn commit(mut self) -> Result<PathBuf> {
        self.written = true;
        self.record.store(&self.path)?;
        info!(
            "Demo data saved to '{}' for later cleanup",
            self.path.display()
        );
        Ok(std::mem::take(&mut self.path))
    }
}

impl Drop for HandoffGuard {
    fn drop(&mut self) {
        if self.written {
            return;
        }
        match self.record.store(&self.path) {
            Ok(()) => info!(
                "Demo data saved to '{}' for later cleanup",
                self.path.display()
            ),
            Err(e) => warn!("Could not save handoff record: {:#}", e),
        }
    }
}

/// Removes the handoff file when dropped
pub struct RemoveOnDrop {
    path: PathBuf,
}

impl RemoveOnDrop {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        RemoveOnDrop { path: path.into() }
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        match std::fs::remove_file(&self.path) {
            Ok(()) => info!("Removed '{}'", self.path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("'{}' already gone", self.path.display())
            }
            Err(e) => warn!("Could not remove '{}': {}", self.path.display(), e),
        }
    }
}

#[cfg(test)]
#[path = "handoff_test.rs"]
mod handoff_test;
