//! Session notes server binary.
//! Run with: cargo run --bin session-notes-server

use std::process::ExitCode;

use session_notes::start_session_notes;

fn main() -> ExitCode {
    start_session_notes::run()
}
