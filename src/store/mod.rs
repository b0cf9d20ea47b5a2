//! Session persistence seam.

pub mod memory;

pub use memory::MemorySessionStore;

use async_trait::async_trait;

use crate::error::Result;
use crate::runtime::Session;

/// Where sessions are kept between (and across) turns.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, session_id: &str) -> Result<Option<Session>>;

    /// Create and store an empty session.
    async fn create(&self, session_id: &str) -> Result<Session>;

    /// Store `session`, bumping its revision and `updated_at` in place.
    async fn save(&self, session: &mut Session) -> Result<()>;
}
