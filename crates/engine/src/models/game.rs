//! Game, session, and quiz domain types.

use serde::{Deserialize, Serialize};

use kudos_core::{GameId, RowId, SessionId, SessionStatus, UserId};

use crate::db::RepositoryError;

/// A playable game definition.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Game {
    pub id: GameId,
    pub name: String,
    pub description: String,
    /// Game family (quiz, memory, reaction, puzzle).
    pub game_type: String,
    pub min_players: i64,
    pub max_players: i64,
    /// Full coin reward paid to the winner.
    pub coin_reward: i64,
    /// Full XP reward granted to the winner.
    pub xp_reward: i64,
    pub is_active: bool,
    pub created_at: i64,
}

/// A single run of a game.
///
/// Status only moves forward: `waiting -> active -> ended`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GameSession {
    pub id: SessionId,
    pub game_id: GameId,
    pub status: SessionStatus,
    pub created_by: UserId,
    pub winner: Option<UserId>,
    pub created_at: i64,
    pub started_at: Option<i64>,
    pub ended_at: Option<i64>,
}

/// One roster row of a session.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GamePlayer {
    pub session_id: SessionId,
    pub user_id: UserId,
    pub score: i64,
    pub joined_at: i64,
}

/// A quiz question with its options stored as a JSON array.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct QuizQuestion {
    pub id: RowId,
    pub question: String,
    /// JSON-encoded `Vec<String>` of answer options.
    pub options: String,
    /// Index into the options array.
    pub correct_answer: i64,
    pub difficulty: String,
    pub created_at: i64,
}

impl QuizQuestion {
    /// Decode the stored options array.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored JSON is
    /// invalid.
    pub fn parsed_options(&self) -> Result<Vec<String>, RepositoryError> {
        serde_json::from_str(&self.options)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid quiz options: {e}")))
    }
}
