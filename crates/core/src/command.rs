//! Structured command values for game interactions.
//!
//! Chat transports historically pack everything into a single callback
//! string (`game:answer:<session>:<option>:<question>`) and re-parse it in
//! domain code. Adapters decode their wire format into a [`GameCommand`]
//! exactly once at the boundary; the engine only ever sees the typed value.

use serde::{Deserialize, Serialize};

use crate::types::{GameId, RowId, SessionId};

/// A decoded game interaction from an adapter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GameCommand {
    /// Create a new session of the given game.
    Create { game: GameId },
    /// Join an existing session.
    Join { session: SessionId },
    /// Answer a quiz question with the selected option index.
    Answer {
        session: SessionId,
        option: u32,
        question: RowId,
    },
    /// End a session, optionally declaring a winner by user key.
    End {
        session: SessionId,
        winner: Option<String>,
    },
}
