//! Session storage port

use crate::domain::result::Result;
use crate::domain::Session;

/// Where the client keeps the logged-in session between runs
pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>>;

    fn save(&self, session: &Session) -> Result<()>;

    /// Forget the session. Clearing an empty store is not an error.
    fn clear(&self) -> Result<()>;
}
