//! Store implementations for CampusDesk.
//!
//! Both backends implement [`CampusStore`](campusdesk_core::CampusStore) and
//! [`ConversationStore`](campusdesk_core::ConversationStore).

pub mod in_memory;
pub mod seed;

#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use in_memory::InMemoryStore;
pub use seed::{SeedReport, seed_demo};

#[cfg(feature = "sqlite")]
pub use sqlite::SqliteStore;

use campusdesk_core::error::StoreError;
use campusdesk_core::store::{CampusStore, ConversationStore};
use std::sync::Arc;

/// Conversation appends retry this many times when the version guard loses
/// a race.
pub const APPEND_RETRIES: usize = 5;

/// One backend viewed through both store traits.
#[derive(Clone)]
pub struct Stores {
    pub campus: Arc<dyn CampusStore>,
    pub conversations: Arc<dyn ConversationStore>,
}

impl Stores {
    pub fn in_memory() -> Self {
        let store = Arc::new(InMemoryStore::new());
        Self {
            campus: store.clone(),
            conversations: store,
        }
    }

    pub fn backend(&self) -> &str {
        self.campus.name()
    }
}

/// Open the backend named by a database url.
///
/// `memory` selects [`InMemoryStore`]; anything else is handed to SQLite,
/// which creates the schema on connect.
pub async fn open(url: &str, max_connections: u32) -> Result<Stores, StoreError> {
    if url.trim().eq_ignore_ascii_case("memory") {
        return Ok(Stores::in_memory());
    }
    open_sqlite(url, max_connections).await
}

#[cfg(feature = "sqlite")]
async fn open_sqlite(url: &str, max_connections: u32) -> Result<Stores, StoreError> {
    let store = Arc::new(SqliteStore::connect(url, max_connections).await?);
    Ok(Stores {
        campus: store.clone(),
        conversations: store,
    })
}

#[cfg(not(feature = "sqlite"))]
async fn open_sqlite(url: &str, _max_connections: u32) -> Result<Stores, StoreError> {
    Err(StoreError::Storage(format!(
        "SQLite support is not compiled in; cannot open {url}"
    )))
}
