//! Session summary records and their storage.
//!
//! - `types`: the stored record and the generation request
//! - `ids`: identifier generation
//! - `store`: the `SessionStore` trait
//! - `json_store` / `sqlite_store`: the two backends

pub mod errors;
pub mod ids;
pub mod json_store;
pub mod sqlite_store;
pub mod store;
pub mod types;

use std::sync::Arc;

use tracing::info;

pub use errors::{StoreError, StoreResult};
pub use ids::new_session_id;
pub use json_store::JsonSessionStore;
pub use sqlite_store::SqliteSessionStore;
pub use store::{SessionStore, StoreFuture};
pub use types::{GenerateSessionSummary, SessionSummary};

use crate::config::{StoreBackend, StoreConfig};

/// Open the configured store backend.
///
/// # Errors
/// Returns an error if the backing file cannot be opened or initialized.
pub async fn open_store(config: &StoreConfig) -> StoreResult<Arc<dyn SessionStore>> {
    info!(
        "Opening {:?} session store at {}",
        config.backend,
        config.path.display()
    );

    let store: Arc<dyn SessionStore> = match config.backend {
        StoreBackend::Json => Arc::new(JsonSessionStore::open(&config.path).await?),
        StoreBackend::Sqlite => Arc::new(SqliteSessionStore::open(&config.path).await?),
    };
    Ok(store)
}
