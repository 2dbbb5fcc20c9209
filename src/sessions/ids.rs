//! Identifier generation for session records.
//!
//! Identifiers are opaque strings on the wire. Newly generated ones are UUIDs:
//! - default: `UUIDv4` (random).
//! - feature `uuid_v7`: `UUIDv7`, for better insert locality in the `SQLite` backend.
//!
//! Client-supplied identifiers are never parsed, so a caller may keep using
//! whatever string an earlier insert returned.

use uuid::Uuid;

/// Generate the UUID behind a new session identifier.
#[inline]
#[must_use]
fn uuid_for_session() -> Uuid {
    #[cfg(feature = "uuid_v7")]
    {
        Uuid::now_v7()
    }
    #[cfg(not(feature = "uuid_v7"))]
    {
        Uuid::new_v4()
    }
}

/// Generate a new, globally unique session identifier.
#[must_use]
pub fn new_session_id() -> String {
    uuid_for_session().to_string()
}
