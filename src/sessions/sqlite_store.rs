//! `SQLite` backend for the session store.

use std::path::Path;

use tokio_rusqlite::Connection;
use tracing::debug;

use super::errors::StoreResult;
use super::ids::new_session_id;
use super::store::{SessionStore, StoreFuture};
use super::types::SessionSummary;

/// `SQLite` implementation of the session store.
///
/// Records are kept as JSON next to the columns used for lookups. All calls
/// go through the single connection thread of `tokio_rusqlite`, which
/// serializes writes.
pub struct SqliteSessionStore {
    conn: Connection,
    table: String,
}

impl SqliteSessionStore {
    /// Table name for session summaries.
    pub const DEFAULT_TABLE: &'static str = "sessions";

    /// Open the database and create the table if it doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or initialized.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref()).await?;
        Self::with_connection(conn).await
    }

    /// Open a private in-memory database.
    ///
    /// # Errors
    /// Returns an error if the database cannot be initialized.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> StoreResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    doc_id INTEGER PRIMARY KEY AUTOINCREMENT,
                    id TEXT NOT NULL UNIQUE,
                    user_ref TEXT NOT NULL,
                    record_json TEXT NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_{table_name}_user
                    ON {table_name} (user_ref, doc_id);"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }

    async fn select_where(
        &self,
        column: &'static str,
        value: String,
    ) -> StoreResult<Vec<SessionSummary>> {
        let table = self.table.clone();
        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&format!(
                    "SELECT id, record_json FROM {table} WHERE {column} = ?1 ORDER BY doc_id"
                ))?;
                let rows = stmt
                    .query_map(rusqlite::params![value], |row| {
                        let id: String = row.get(0)?;
                        let json: String = row.get(1)?;
                        Ok((id, json))
                    })?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await?;

        rows.into_iter()
            .map(|(id, json)| -> StoreResult<SessionSummary> {
                let record: SessionSummary = serde_json::from_str(&json)?;
                Ok(SessionSummary {
                    id: Some(id),
                    ..record
                })
            })
            .collect()
    }
}

impl SessionStore for SqliteSessionStore {
    fn get_session(&self, id: &str) -> StoreFuture<'_, StoreResult<Vec<SessionSummary>>> {
        let id = id.to_string();
        Box::pin(async move { self.select_where("id", id).await })
    }

    fn get_sessions_by_user(
        &self,
        user: &str,
    ) -> StoreFuture<'_, StoreResult<Vec<SessionSummary>>> {
        let user = user.to_string();
        Box::pin(async move { self.select_where("user_ref", user).await })
    }

    fn write_session(
        &self,
        session: SessionSummary,
        session_id: Option<String>,
    ) -> StoreFuture<'_, StoreResult<String>> {
        Box::pin(async move {
            let table = self.table.clone();
            let (id, is_update) = match session_id {
                Some(id) => (id, true),
                None => (new_session_id(), false),
            };
            let record = SessionSummary {
                id: Some(id.clone()),
                ..session
            };
            let user = record.user.clone();
            let record_json = serde_json::to_string(&record)?;
            let row_id = id.clone();

            let changed = self
                .conn
                .call(move |conn| {
                    let changed = if is_update {
                        conn.execute(
                            &format!(
                                "UPDATE {table} SET user_ref = ?1, record_json = ?2 WHERE id = ?3"
                            ),
                            rusqlite::params![user, record_json, row_id],
                        )?
                    } else {
                        conn.execute(
                            &format!(
                                "INSERT INTO {table} (id, user_ref, record_json) VALUES (?1, ?2, ?3)"
                            ),
                            rusqlite::params![row_id, user, record_json],
                        )?
                    };
                    Ok(changed)
                })
                .await?;

            debug!("Wrote session {id} (update: {is_update}, rows: {changed})");
            Ok(id)
        })
    }

    fn delete_session(&self, id: &str) -> StoreFuture<'_, StoreResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let row_id = id.clone();
            let removed = self
                .conn
                .call(move |conn| {
                    let removed = conn.execute(
                        &format!("DELETE FROM {table} WHERE id = ?1"),
                        rusqlite::params![row_id],
                    )?;
                    Ok(removed)
                })
                .await?;
            debug!("Deleted session {id} ({removed} removed)");
            Ok(())
        })
    }

    fn flush(&self) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            self.conn
                .call(|conn| {
                    conn.execute_batch("PRAGMA optimize;")?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}
