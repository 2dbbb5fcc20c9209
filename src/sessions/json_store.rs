//! JSON document file backend for the session store.
//!
//! The file is one JSON object keyed by table name. Each table maps a
//! document number (written as a string) to a flat record:
//!
//! ```json
//! {"sessions": {"1": {"id": "…", "user": "alice", "summary": "ok", "duration": null,
//!                     "type": null, "patient": "bob", "date": null}}}
//! ```
//!
//! The whole document lives in memory behind an async mutex. A mutation is
//! applied to a copy of the document, the copy is written (temp file +
//! rename) while the lock is held, and it replaces the in-memory document
//! only once the file is in place.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::debug;

use super::errors::StoreResult;
use super::ids::new_session_id;
use super::store::{SessionStore, StoreFuture};
use super::types::SessionSummary;

/// Table holding session summaries.
const SESSIONS_TABLE: &str = "sessions";

/// In-memory image of the document file.
#[derive(Clone, Debug, Default)]
struct Document {
    /// Session records keyed by document number.
    sessions: BTreeMap<u64, SessionSummary>,
    /// Tables this service does not own, written back untouched.
    other_tables: Map<String, Value>,
    /// Highest document number handed out so far.
    last_doc: u64,
}

impl Document {
    fn parse(bytes: &[u8]) -> StoreResult<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }

        let mut other_tables: Map<String, Value> = serde_json::from_slice(bytes)?;
        let sessions: BTreeMap<u64, SessionSummary> = other_tables
            .remove(SESSIONS_TABLE)
            .map(serde_json::from_value)
            .transpose()?
            .unwrap_or_default();
        let last_doc = sessions.keys().next_back().copied().unwrap_or(0);

        Ok(Self {
            sessions,
            other_tables,
            last_doc,
        })
    }

    fn to_bytes(&self) -> StoreResult<Vec<u8>> {
        let mut tables = self.other_tables.clone();
        tables.insert(
            SESSIONS_TABLE.to_string(),
            serde_json::to_value(&self.sessions)?,
        );
        Ok(serde_json::to_vec(&tables)?)
    }

    fn matching<'a>(
        &'a self,
        predicate: impl Fn(&SessionSummary) -> bool + 'a,
    ) -> impl Iterator<Item = &'a SessionSummary> + 'a {
        self.sessions.values().filter(move |record| predicate(*record))
    }

    /// Overwrite every record stored under `id`. Returns how many matched.
    fn update(&mut self, id: &str, session: &SessionSummary) -> usize {
        let mut updated = 0;
        for record in self.sessions.values_mut() {
            if record.id.as_deref() == Some(id) {
                *record = SessionSummary {
                    id: Some(id.to_string()),
                    ..session.clone()
                };
                updated += 1;
            }
        }
        updated
    }

    fn insert(&mut self, session: SessionSummary) {
        self.last_doc += 1;
        self.sessions.insert(self.last_doc, session);
    }

    /// Remove every record stored under `id`. Returns how many were removed.
    fn remove(&mut self, id: &str) -> usize {
        let before = self.sessions.len();
        self.sessions
            .retain(|_, record| record.id.as_deref() != Some(id));
        before - self.sessions.len()
    }
}

/// Session store backed by a single JSON document file.
pub struct JsonSessionStore {
    path: PathBuf,
    document: Mutex<Document>,
}

impl JsonSessionStore {
    /// Open the store, loading the file if it exists.
    ///
    /// A missing or empty file opens as an empty store; the file is created
    /// on the first write.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or is not a valid document.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let document = match tokio::fs::read(&path).await {
            Ok(bytes) => Document::parse(&bytes)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Document::default(),
            Err(err) => return Err(err.into()),
        };

        debug!(
            "Opened JSON session store at {} ({} records)",
            path.display(),
            document.sessions.len()
        );

        Ok(Self {
            path,
            document: Mutex::new(document),
        })
    }

    async fn persist(&self, document: &Document) -> StoreResult<()> {
        let bytes = document.to_bytes()?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let tmp_path = temp_path_for(&self.path);
        tokio::fs::write(&tmp_path, bytes).await?;
        tokio::fs::rename(&tmp_path, &self.path).await?;
        Ok(())
    }
}

/// Sibling path used for atomic rewrites, e.g. `db.json` -> `db.json.tmp`.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map_or_else(|| OsString::from(SESSIONS_TABLE), ToOwned::to_owned);
    name.push(".tmp");
    path.with_file_name(name)
}

impl SessionStore for JsonSessionStore {
    fn get_session(&self, id: &str) -> StoreFuture<'_, StoreResult<Vec<SessionSummary>>> {
        let id = id.to_string();
        Box::pin(async move {
            Ok(self
                .document
                .lock()
                .await
                .matching(|record| record.id.as_deref() == Some(id.as_str()))
                .cloned()
                .collect())
        })
    }

    fn get_sessions_by_user(
        &self,
        user: &str,
    ) -> StoreFuture<'_, StoreResult<Vec<SessionSummary>>> {
        let user = user.to_string();
        Box::pin(async move {
            Ok(self
                .document
                .lock()
                .await
                .matching(|record| record.user == user)
                .cloned()
                .collect())
        })
    }

    fn write_session(
        &self,
        session: SessionSummary,
        session_id: Option<String>,
    ) -> StoreFuture<'_, StoreResult<String>> {
        Box::pin(async move {
            let mut document = self.document.lock().await;
            let mut next = document.clone();

            if let Some(id) = session_id {
                let updated = next.update(&id, &session);
                if updated > 0 {
                    self.persist(&next).await?;
                    *document = next;
                }
                debug!("Updated session {id} ({updated} matched)");
                return Ok(id);
            }

            let id = new_session_id();
            next.insert(SessionSummary {
                id: Some(id.clone()),
                ..session
            });
            self.persist(&next).await?;
            *document = next;
            debug!("Inserted session {id}");
            Ok(id)
        })
    }

    fn delete_session(&self, id: &str) -> StoreFuture<'_, StoreResult<()>> {
        let id = id.to_string();
        Box::pin(async move {
            let mut document = self.document.lock().await;
            let mut next = document.clone();
            let removed = next.remove(&id);
            if removed > 0 {
                self.persist(&next).await?;
                *document = next;
            }
            debug!("Deleted session {id} ({removed} removed)");
            Ok(())
        })
    }

    fn flush(&self) -> StoreFuture<'_, StoreResult<()>> {
        Box::pin(async move {
            let document = self.document.lock().await;
            self.persist(&document).await
        })
    }
}
