//! Session persistence

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::domain::result::{Error, Result};
use crate::domain::Session;
use crate::ports::SessionStore;

pub const SESSION_FILE: &str = "session.json";
pub const DEMO_SESSION_FILE: &str = "demo-session.json";

/// Session kept in `session.json` in the SlotBazaar directory
///
/// The file holds bearer tokens, so on Unix it is created owner-only.
#[derive(Debug, Clone)]
pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(dir: &Path) -> Self {
        Self::with_file(dir, SESSION_FILE)
    }

    /// Demo mode keeps its own file so house tokens never reach the real API
    pub fn with_file(dir: &Path, file_name: &str) -> Self {
        Self {
            path: dir.join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&self.path)?;
        // A damaged file means nobody is logged in
        Ok(serde_json::from_str(&content).ok())
    }

    fn save(&self, session: &Session) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(session)?;
        std::fs::write(&self.path, content)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))?;
        }
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}

/// In-memory store for tests and one-shot runs
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Mutex::new(Some(session)),
        }
    }

    fn slot(&self) -> Result<std::sync::MutexGuard<'_, Option<Session>>> {
        self.session
            .lock()
            .map_err(|e| Error::database(format!("Session lock poisoned: {}", e)))
    }
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>> {
        Ok(self.slot()?.clone())
    }

    fn save(&self, session: &Session) -> Result<()> {
        *self.slot()? = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        *self.slot()? = None;
        Ok(())
    }
}
