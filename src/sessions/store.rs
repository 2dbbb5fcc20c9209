//! Session store trait shared by the storage backends.

use std::future::Future;
use std::pin::Pin;

use super::errors::StoreResult;
use super::types::SessionSummary;

/// Boxed future type for session store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Storage for session summaries, keyed by their `id` field.
///
/// Misses are never errors: lookups return an empty list and deletes of an
/// unknown id succeed. Mutations are serialized by the implementation, so
/// concurrent writes to the same id resolve as last write wins.
pub trait SessionStore: Send + Sync {
    /// Get the records whose id matches.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get_session(&self, id: &str) -> StoreFuture<'_, StoreResult<Vec<SessionSummary>>>;

    /// Get all records belonging to a user, in storage order.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn get_sessions_by_user(&self, user: &str)
    -> StoreFuture<'_, StoreResult<Vec<SessionSummary>>>;

    /// Insert or update a record and return its id.
    ///
    /// With `Some(id)` the record stored under `id` is overwritten (a silent
    /// no-op when nothing matches). With `None` a fresh id is generated and
    /// the record is inserted.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn write_session(
        &self,
        session: SessionSummary,
        session_id: Option<String>,
    ) -> StoreFuture<'_, StoreResult<String>>;

    /// Delete the record with this id, if any.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn delete_session(&self, id: &str) -> StoreFuture<'_, StoreResult<()>>;

    /// Persist anything still held in memory. Called once on shutdown.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn flush(&self) -> StoreFuture<'_, StoreResult<()>>;
}
