//! UI-agnostic chat session state
//!
//! This module contains the data structures shared by every front end (the
//! TUI and the one-shot CLI) and doesn't depend on any UI framework.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::reveal::step_size;

/// The role of a chat message sender
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChatRole {
    User,
    Assistant,
}

/// A single turn in the advising conversation.
///
/// Assistant turns carry a revealed character count that the reveal
/// scheduler advances until the whole content is visible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: ChatRole,
    content: String,
    revealed: Option<usize>,
}

impl ChatTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            revealed: None,
        }
    }

    /// A fresh assistant turn with nothing revealed yet
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            revealed: Some(0),
        }
    }

    /// An assistant turn that is already fully visible (loaded history)
    pub fn settled_assistant(content: impl Into<String>) -> Self {
        let content = content.into();
        let len = content.chars().count();
        Self {
            role: ChatRole::Assistant,
            content,
            revealed: Some(len),
        }
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }

    /// Number of characters currently visible
    pub fn revealed_chars(&self) -> usize {
        self.revealed.unwrap_or_else(|| self.char_len())
    }

    /// The currently visible prefix of the content
    pub fn revealed(&self) -> &str {
        match self.revealed {
            None => &self.content,
            Some(n) => {
                let end = self
                    .content
                    .char_indices()
                    .nth(n)
                    .map(|(i, _)| i)
                    .unwrap_or(self.content.len());
                &self.content[..end]
            }
        }
    }

    pub fn is_settled(&self) -> bool {
        match self.revealed {
            None => true,
            Some(n) => n >= self.char_len(),
        }
    }

    /// Extends the revealed prefix by one step. Returns false if already settled.
    pub fn advance(&mut self) -> bool {
        let len = self.char_len();
        match self.revealed.as_mut() {
            Some(n) if *n < len => {
                *n = (*n + step_size(len)).min(len);
                true
            }
            _ => false,
        }
    }

    pub fn settle(&mut self) {
        if self.revealed.is_some() {
            self.revealed = Some(self.char_len());
        }
    }
}

/// Opaque identifier sent to the backend as `chat_session_id`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Outcome of one reveal step over the whole session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealProgress {
    /// No unsettled turn; the timer can be disarmed
    Idle,
    /// A turn advanced and still has characters left
    Advanced,
    /// A turn advanced and is now fully visible
    Settled,
}

/// An append-only conversation plus its lazily created session id
#[derive(Debug, Default, Clone)]
pub struct Session {
    turns: Vec<ChatTurn>,
    id: Option<SessionId>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn turns(&self) -> &[ChatTurn] {
        &self.turns
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Returns the session id, generating one on first use
    pub fn id(&mut self) -> SessionId {
        self.id.get_or_insert_with(SessionId::generate).clone()
    }

    pub fn current_id(&self) -> Option<&SessionId> {
        self.id.as_ref()
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatTurn::user(content));
    }

    /// Appends an assistant turn to be revealed. Any earlier unsettled turn is
    /// settled first so only the newest turn is ever in progress.
    pub fn push_assistant(&mut self, content: impl Into<String>) {
        for turn in self.turns.iter_mut() {
            turn.settle();
        }
        self.turns.push(ChatTurn::assistant(content));
    }

    /// Index of the turn still being revealed, if any
    pub fn in_progress(&self) -> Option<usize> {
        self.turns.iter().position(|t| !t.is_settled())
    }

    pub fn has_unsettled(&self) -> bool {
        self.in_progress().is_some()
    }

    /// Advances the unsettled turn by one step
    pub fn advance_reveal(&mut self) -> RevealProgress {
        let Some(idx) = self.in_progress() else {
            return RevealProgress::Idle;
        };
        let turn = &mut self.turns[idx];
        turn.advance();
        if turn.is_settled() {
            RevealProgress::Settled
        } else {
            RevealProgress::Advanced
        }
    }

    /// Starts a new conversation: drops every turn and forgets the session id
    pub fn clear(&mut self) {
        self.turns.clear();
        self.id = None;
    }

    /// Replaces the conversation with stored history; all turns are settled
    pub fn load(&mut self, id: SessionId, turns: Vec<ChatTurn>) {
        self.turns = turns;
        for turn in self.turns.iter_mut() {
            turn.settle();
        }
        self.id = Some(id);
    }
}
