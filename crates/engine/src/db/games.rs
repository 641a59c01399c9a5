//! Game catalog and session repository.
//!
//! Session membership is capacity-guarded at the INSERT, and ending a
//! session captures the prior status inside the same transaction so the
//! caller can tell a played-out session from an abandoned lobby.

use sqlx::SqlitePool;

use kudos_core::{GameId, SessionId, UserId, types::SessionStatus};

use super::{RepositoryError, is_unique_violation, now_ts};
use crate::models::{Game, GamePlayer, GameSession, QuizQuestion};

const SESSION_COLUMNS: &str =
    "id, game_id, status, created_by, winner, created_at, started_at, ended_at";

/// Why a guarded join INSERT put no row in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinRejection {
    /// The user already holds a seat in this session.
    AlreadyJoined,
    /// The roster is at the game's `max_players`.
    Full,
    /// The session is no longer in the waiting state.
    NotWaiting,
}

/// Repository for game, session, player, and quiz-question rows.
pub struct GameRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GameRepository<'a> {
    /// Create a new game repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List active games.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_games(&self) -> Result<Vec<Game>, RepositoryError> {
        let rows = sqlx::query_as::<_, Game>(
            "SELECT id, name, description, game_type, min_players, max_players, coin_reward, \
             xp_reward, is_active, created_at \
             FROM games WHERE is_active = 1 ORDER BY name",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a game by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn game(&self, id: &GameId) -> Result<Option<Game>, RepositoryError> {
        let game = sqlx::query_as::<_, Game>(
            "SELECT id, name, description, game_type, min_players, max_players, coin_reward, \
             xp_reward, is_active, created_at \
             FROM games WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(game)
    }

    /// Insert a session with its host already seated.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` on a duplicate session id;
    /// `RepositoryError::Database` if a query fails.
    pub async fn create_session(
        &self,
        id: &SessionId,
        game: &GameId,
        host: &UserId,
        status: SessionStatus,
    ) -> Result<GameSession, RepositoryError> {
        let now = now_ts();
        let started_at = if status == SessionStatus::Active {
            Some(now)
        } else {
            None
        };
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO game_sessions (id, game_id, created_by, status, created_at, started_at) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(game)
        .bind(host)
        .bind(status)
        .bind(now)
        .bind(started_at)
        .execute(&mut *tx)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                RepositoryError::Conflict(format!("session {id} already exists"))
            } else {
                RepositoryError::Database(err)
            }
        })?;

        sqlx::query(
            "INSERT INTO game_players (session_id, user_id, score, joined_at) VALUES (?, ?, 0, ?)",
        )
        .bind(id)
        .bind(host)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        self.session(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Get a session by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn session(&self, id: &SessionId) -> Result<Option<GameSession>, RepositoryError> {
        let session = sqlx::query_as::<_, GameSession>(&format!(
            "SELECT {SESSION_COLUMNS} FROM game_sessions WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(session)
    }

    /// List joinable sessions, oldest lobby first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn waiting_sessions(
        &self,
        game: Option<&GameId>,
    ) -> Result<Vec<GameSession>, RepositoryError> {
        let rows = match game {
            Some(game) => {
                sqlx::query_as::<_, GameSession>(&format!(
                    "SELECT {SESSION_COLUMNS} FROM game_sessions \
                     WHERE status = 'waiting' AND game_id = ? ORDER BY created_at"
                ))
                .bind(game)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, GameSession>(&format!(
                    "SELECT {SESSION_COLUMNS} FROM game_sessions \
                     WHERE status = 'waiting' ORDER BY created_at"
                ))
                .fetch_all(self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    /// Seat a user in a waiting session, capacity-guarded.
    ///
    /// The INSERT only fires while the session is still waiting and the
    /// roster is below `max_players`, so two racing joins for the last
    /// seat resolve to exactly one row. On rejection the current session
    /// and roster are re-read to name the reason.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session vanished;
    /// `RepositoryError::Database` if a query fails.
    pub async fn try_join(
        &self,
        session: &SessionId,
        user: &UserId,
        max_players: i64,
    ) -> Result<Result<(), JoinRejection>, RepositoryError> {
        let result = sqlx::query(
            "INSERT INTO game_players (session_id, user_id, score, joined_at) \
             SELECT ?, ?, 0, ? \
             WHERE (SELECT COUNT(*) FROM game_players WHERE session_id = ?) < ? \
               AND EXISTS (SELECT 1 FROM game_sessions WHERE id = ? AND status = 'waiting')",
        )
        .bind(session)
        .bind(user)
        .bind(now_ts())
        .bind(session)
        .bind(max_players)
        .bind(session)
        .execute(self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => Ok(Ok(())),
            Ok(_) => {
                // A full roster outranks the status in the rejection: a
                // session that filled up and auto-activated reads as full,
                // not merely as no-longer-waiting.
                let current = self.session(session).await?.ok_or(RepositoryError::NotFound)?;
                let seated = self.player_count(session).await?;
                if seated >= max_players {
                    return Ok(Err(JoinRejection::Full));
                }
                if current.status != SessionStatus::Waiting {
                    return Ok(Err(JoinRejection::NotWaiting));
                }
                Ok(Err(JoinRejection::Full))
            }
            Err(err) if is_unique_violation(&err) => Ok(Err(JoinRejection::AlreadyJoined)),
            Err(err) => Err(RepositoryError::Database(err)),
        }
    }

    /// Current roster size.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn player_count(&self, session: &SessionId) -> Result<i64, RepositoryError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM game_players WHERE session_id = ?")
                .bind(session)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// List a session's roster in join order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn players(&self, session: &SessionId) -> Result<Vec<GamePlayer>, RepositoryError> {
        let rows = sqlx::query_as::<_, GamePlayer>(
            "SELECT session_id, user_id, score, joined_at \
             FROM game_players WHERE session_id = ? ORDER BY joined_at",
        )
        .bind(session)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Move a waiting session to active.
    ///
    /// Returns `false` when the session was no longer waiting.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn activate(&self, session: &SessionId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE game_sessions SET status = 'active', started_at = ? \
             WHERE id = ? AND status = 'waiting'",
        )
        .bind(now_ts())
        .bind(session)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Terminally end a session, recording the winner if any.
    ///
    /// Returns the status the session held before the transition. Inside
    /// a transaction the status is read and then updated with a guard on
    /// the observed value, so two racing end calls see distinct priors
    /// and only one observes a live session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the session doesn't exist;
    /// `RepositoryError::Conflict` if the status changed underfoot;
    /// `RepositoryError::Database` if a query fails.
    pub async fn end_session(
        &self,
        session: &SessionId,
        winner: Option<&UserId>,
    ) -> Result<SessionStatus, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let prior = sqlx::query_scalar::<_, SessionStatus>(
            "SELECT status FROM game_sessions WHERE id = ?",
        )
        .bind(session)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        if prior == SessionStatus::Ended {
            return Ok(prior);
        }

        let result = sqlx::query(
            "UPDATE game_sessions SET status = 'ended', winner = ?, ended_at = ? \
             WHERE id = ? AND status = ?",
        )
        .bind(winner)
        .bind(now_ts())
        .bind(session)
        .bind(prior)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::Conflict(format!(
                "session {session} changed state during end"
            )));
        }

        tx.commit().await?;
        Ok(prior)
    }

    /// Add to a player's score within a session.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the player isn't seated;
    /// `RepositoryError::Database` if the query fails.
    pub async fn add_score(
        &self,
        session: &SessionId,
        user: &UserId,
        delta: i64,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE game_players SET score = score + ? WHERE session_id = ? AND user_id = ?",
        )
        .bind(delta)
        .bind(session)
        .bind(user)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Pick a random quiz question, optionally by difficulty.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn random_question(
        &self,
        difficulty: Option<&str>,
    ) -> Result<Option<QuizQuestion>, RepositoryError> {
        let question = match difficulty {
            Some(difficulty) => {
                sqlx::query_as::<_, QuizQuestion>(
                    "SELECT id, question, options, correct_answer, difficulty, created_at \
                     FROM quiz_questions WHERE difficulty = ? ORDER BY RANDOM() LIMIT 1",
                )
                .bind(difficulty)
                .fetch_optional(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, QuizQuestion>(
                    "SELECT id, question, options, correct_answer, difficulty, created_at \
                     FROM quiz_questions ORDER BY RANDOM() LIMIT 1",
                )
                .fetch_optional(self.pool)
                .await?
            }
        };
        Ok(question)
    }

    /// Get a quiz question by row id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn question(&self, id: i64) -> Result<Option<QuizQuestion>, RepositoryError> {
        let question = sqlx::query_as::<_, QuizQuestion>(
            "SELECT id, question, options, correct_answer, difficulty, created_at \
             FROM quiz_questions WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(question)
    }

    /// Count ended sessions the user sat in (the `games` badge metric).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn games_completed(&self, user: &UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM game_players gp \
             JOIN game_sessions s ON s.id = gp.session_id \
             WHERE gp.user_id = ? AND s.status = 'ended'",
        )
        .bind(user)
        .fetch_one(self.pool)
        .await?;
        Ok(count)
    }
}
