//! Accepting a question and folding the backend's answer into the session.

use crate::error::ClientResult;
use crate::state::{Session, SessionId};

/// Inline error shown when the user submits nothing
pub const EMPTY_INPUT_ERROR: &str = "Please enter a question.";

/// A validated question ready to be sent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub session_id: SessionId,
    pub message: String,
}

/// Validates raw input and records the user turn.
///
/// Empty input is rejected with [`EMPTY_INPUT_ERROR`] and leaves the session
/// untouched. The session id is created here on the first accepted question.
pub fn begin_submission(session: &mut Session, raw: &str) -> Result<Submission, &'static str> {
    let message = raw.trim();
    if message.is_empty() {
        return Err(EMPTY_INPUT_ERROR);
    }
    let session_id = session.id();
    session.push_user(message);
    Ok(Submission {
        session_id,
        message: message.to_string(),
    })
}

/// Appends the assistant turn for a finished request. Failures become a
/// regular assistant turn carrying the error text.
pub fn complete_submission(session: &mut Session, result: ClientResult<String>) {
    match result {
        Ok(reply) => session.push_assistant(reply),
        Err(err) => {
            tracing::warn!(error = %err, "chat request failed");
            session.push_assistant(err.to_string());
        }
    }
}
