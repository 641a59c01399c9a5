//! Game-session lifecycle: lobby, roster, answers, and reward fan-out.
//!
//! State machine per session: `waiting -> active -> ended`, `ended`
//! terminal. A session auto-activates the moment its roster reaches the
//! game's minimum; reward fan-out runs after the ending transition
//! commits, never inside it.

use tracing::info;
use uuid::Uuid;

use kudos_core::{GameCommand, GameId, SessionId, SessionStatus, UserId};

use crate::db::games::JoinRejection;
use crate::db::{GameRepository, RepositoryError, UserRepository};
use crate::engine::EngineInner;
use crate::error::{EngineError, Result};
use crate::models::{Game, GamePlayer, GameSession, QuizQuestion};
use crate::services::{BadgeService, EconomyService, ProgressionService, invalidate_user};

/// One player's share of a session's rewards.
#[derive(Debug, Clone)]
pub struct PlayerReward {
    pub user: UserId,
    pub coins: i64,
    pub xp: i64,
}

/// The result of ending a session.
#[derive(Debug)]
pub struct EndOutcome {
    pub session: GameSession,
    /// Rewards granted, winner first when one was declared. Empty for a
    /// session that never left the lobby.
    pub rewards: Vec<PlayerReward>,
}

/// The result of answering a quiz question.
#[derive(Debug)]
pub struct AnswerOutcome {
    pub correct: bool,
    /// The option index that was correct.
    pub correct_answer: i64,
    /// Present when a correct answer ended the session.
    pub end: Option<EndOutcome>,
}

/// The result of dispatching a [`GameCommand`].
#[derive(Debug)]
pub enum CommandOutcome {
    Created(GameSession),
    Joined(GameSession),
    Answered(AnswerOutcome),
    Ended(EndOutcome),
}

/// Session coordinator service.
pub struct GameService<'a> {
    inner: &'a EngineInner,
}

impl<'a> GameService<'a> {
    pub(crate) const fn new(inner: &'a EngineInner) -> Self {
        Self { inner }
    }

    fn repo(&self) -> GameRepository<'_> {
        GameRepository::new(&self.inner.pool)
    }

    /// Active games.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Repository`] on storage failure.
    pub async fn list_games(&self) -> Result<Vec<Game>> {
        Ok(self.repo().list_games().await?)
    }

    /// An active game by id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameNotFound`] if the game doesn't exist or
    /// is inactive.
    pub async fn game(&self, id: &GameId) -> Result<Game> {
        match self.repo().game(id).await? {
            Some(game) if game.is_active => Ok(game),
            _ => Err(EngineError::GameNotFound { game: id.clone() }),
        }
    }

    /// Open a session with the creator as its first player.
    ///
    /// A game whose minimum is a single player activates immediately;
    /// otherwise the session waits for joins.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::GameNotFound`] or
    /// [`EngineError::UserNotFound`].
    pub async fn create_session(&self, game_id: &GameId, creator: &UserId) -> Result<GameSession> {
        let game = self.game(game_id).await?;
        self.require_user(creator).await?;

        let status = if game.min_players <= 1 {
            SessionStatus::Active
        } else {
            SessionStatus::Waiting
        };
        let id = SessionId::new(Uuid::new_v4().to_string());
        let session = self.repo().create_session(&id, game_id, creator, status).await?;
        info!(session = %id, game = %game_id, host = %creator, ?status, "session created");
        Ok(session)
    }

    /// A session by id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] if it doesn't exist.
    pub async fn session(&self, id: &SessionId) -> Result<GameSession> {
        self.repo()
            .session(id)
            .await?
            .ok_or_else(|| EngineError::SessionNotFound {
                session: id.clone(),
            })
    }

    /// Joinable sessions, oldest lobby first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Repository`] on storage failure.
    pub async fn waiting_sessions(&self, game: Option<&GameId>) -> Result<Vec<GameSession>> {
        Ok(self.repo().waiting_sessions(game).await?)
    }

    /// A session's roster in join order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`] if it doesn't exist.
    pub async fn players(&self, id: &SessionId) -> Result<Vec<GamePlayer>> {
        self.session(id).await?;
        Ok(self.repo().players(id).await?)
    }

    /// Seat a user in a waiting session.
    ///
    /// The roster insert is capacity-guarded, so racing joins for the
    /// last seat resolve to one winner. When the roster reaches the
    /// game's minimum the session auto-activates.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`],
    /// [`EngineError::SessionNotWaiting`], [`EngineError::AlreadyJoined`],
    /// [`EngineError::SessionFull`], or [`EngineError::UserNotFound`].
    pub async fn join_session(&self, id: &SessionId, user: &UserId) -> Result<GameSession> {
        self.require_user(user).await?;
        let session = self.session(id).await?;
        if session.status != SessionStatus::Waiting {
            return Err(EngineError::SessionNotWaiting {
                session: id.clone(),
                status: session.status,
            });
        }
        let game = self.game(&session.game_id).await?;

        let joined = self.repo().try_join(id, user, game.max_players).await?;
        match joined {
            Ok(()) => {}
            Err(JoinRejection::AlreadyJoined) => {
                return Err(EngineError::AlreadyJoined {
                    session: id.clone(),
                });
            }
            Err(JoinRejection::Full) => {
                return Err(EngineError::SessionFull {
                    session: id.clone(),
                    max_players: game.max_players,
                });
            }
            Err(JoinRejection::NotWaiting) => {
                let current = self.session(id).await?;
                return Err(EngineError::SessionNotWaiting {
                    session: id.clone(),
                    status: current.status,
                });
            }
        }

        if self.repo().player_count(id).await? >= game.min_players {
            // Lost races are fine: someone else already activated it.
            let _ = self.repo().activate(id).await?;
        }
        info!(session = %id, %user, "player joined");
        self.session(id).await
    }

    /// End a session, distributing rewards for played-out games.
    ///
    /// The winner (if declared) receives the game's full coin and XP
    /// reward; every other roster player receives half, floored. A
    /// session ended straight out of the lobby is treated as abandoned
    /// and grants nothing. Fan-out (credits, XP, badge scans) runs after
    /// the ending transition commits.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionNotFound`],
    /// [`EngineError::SessionEnded`], or
    /// [`EngineError::WinnerNotInSession`].
    pub async fn end_session(
        &self,
        id: &SessionId,
        winner: Option<&UserId>,
    ) -> Result<EndOutcome> {
        let session = self.session(id).await?;
        if session.status == SessionStatus::Ended {
            return Err(EngineError::SessionEnded {
                session: id.clone(),
            });
        }
        let game = self.game(&session.game_id).await?;
        let players = self.repo().players(id).await?;

        if let Some(winner) = winner
            && !players.iter().any(|p| &p.user_id == winner)
        {
            return Err(EngineError::WinnerNotInSession {
                session: id.clone(),
                user: winner.clone(),
            });
        }

        let prior = match self.repo().end_session(id, winner).await {
            Ok(SessionStatus::Ended) => {
                return Err(EngineError::SessionEnded {
                    session: id.clone(),
                });
            }
            Ok(prior) => prior,
            Err(RepositoryError::Conflict(_)) => {
                return Err(EngineError::SessionEnded {
                    session: id.clone(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        info!(session = %id, ?prior, winner = winner.map(UserId::as_str), "session ended");

        // Abandoned lobby: no gameplay occurred, nobody is rewarded.
        let mut rewards = Vec::new();
        if prior == SessionStatus::Active {
            let economy = EconomyService::new(self.inner);
            let progression = ProgressionService::new(self.inner);
            let badges = BadgeService::new(self.inner);
            let users = UserRepository::new(&self.inner.pool);

            let mut ordered: Vec<&GamePlayer> = players.iter().collect();
            ordered.sort_by_key(|p| winner != Some(&p.user_id));

            for player in ordered {
                let full = winner.is_some_and(|w| w == &player.user_id);
                let coins = if full { game.coin_reward } else { game.coin_reward / 2 };
                let xp = if full { game.xp_reward } else { game.xp_reward / 2 };

                if coins > 0 {
                    economy.credit(&player.user_id, coins, "game_reward").await?;
                }
                if xp > 0 {
                    progression.grant_xp(&player.user_id, xp).await?;
                }
                if let Some(record) = users.get_by_id(&player.user_id).await? {
                    invalidate_user(&self.inner.cache, &record).await?;
                }
                badges.evaluate(&player.user_id).await?;

                rewards.push(PlayerReward {
                    user: player.user_id.clone(),
                    coins,
                    xp,
                });
            }
        }

        let session = self.session(id).await?;
        Ok(EndOutcome { session, rewards })
    }

    /// Answer a quiz question inside an active session.
    ///
    /// A correct answer scores the player and ends the session with them
    /// as winner; an incorrect answer changes nothing.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::SessionEnded`] or
    /// [`EngineError::SessionNotWaiting`] for sessions outside `active`,
    /// [`EngineError::NotInSession`] if the user holds no seat, or
    /// [`EngineError::QuestionNotFound`].
    pub async fn answer(
        &self,
        id: &SessionId,
        user: &UserId,
        question_id: i64,
        option: i64,
    ) -> Result<AnswerOutcome> {
        let session = self.session(id).await?;
        match session.status {
            SessionStatus::Active => {}
            SessionStatus::Ended => {
                return Err(EngineError::SessionEnded {
                    session: id.clone(),
                });
            }
            SessionStatus::Waiting => {
                return Err(EngineError::SessionNotWaiting {
                    session: id.clone(),
                    status: session.status,
                });
            }
        }

        let players = self.repo().players(id).await?;
        if !players.iter().any(|p| &p.user_id == user) {
            return Err(EngineError::NotInSession {
                session: id.clone(),
                user: user.clone(),
            });
        }

        let question = self
            .repo()
            .question(question_id)
            .await?
            .ok_or(EngineError::QuestionNotFound {
                question: question_id,
            })?;

        let correct = question.correct_answer == option;
        if !correct {
            return Ok(AnswerOutcome {
                correct: false,
                correct_answer: question.correct_answer,
                end: None,
            });
        }

        self.repo().add_score(id, user, 1).await?;
        let end = self.end_session(id, Some(user)).await?;
        Ok(AnswerOutcome {
            correct: true,
            correct_answer: question.correct_answer,
            end: Some(end),
        })
    }

    /// A random quiz question, optionally narrowed by difficulty.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Repository`] on storage failure.
    pub async fn random_question(&self, difficulty: Option<&str>) -> Result<Option<QuizQuestion>> {
        Ok(self.repo().random_question(difficulty).await?)
    }

    /// Dispatch a structured game command for an acting user.
    ///
    /// Adapters decode their wire format into a [`GameCommand`] once at
    /// the boundary; domain logic only ever sees the typed value.
    ///
    /// # Errors
    ///
    /// Propagates the error of the dispatched operation.
    pub async fn dispatch(&self, actor: &UserId, command: GameCommand) -> Result<CommandOutcome> {
        match command {
            GameCommand::Create { game } => {
                Ok(CommandOutcome::Created(self.create_session(&game, actor).await?))
            }
            GameCommand::Join { session } => {
                Ok(CommandOutcome::Joined(self.join_session(&session, actor).await?))
            }
            GameCommand::Answer {
                session,
                option,
                question,
            } => Ok(CommandOutcome::Answered(
                self.answer(&session, actor, question.as_i64(), i64::from(option))
                    .await?,
            )),
            GameCommand::End { session, winner } => {
                let winner = match winner {
                    Some(key) => Some(
                        UserRepository::new(&self.inner.pool)
                            .get_by_key(&key)
                            .await?
                            .ok_or(EngineError::UserNotFound { key })?
                            .user_id,
                    ),
                    None => None,
                };
                Ok(CommandOutcome::Ended(
                    self.end_session(&session, winner.as_ref()).await?,
                ))
            }
        }
    }

    async fn require_user(&self, user: &UserId) -> Result<()> {
        UserRepository::new(&self.inner.pool)
            .get_by_id(user)
            .await?
            .ok_or_else(|| EngineError::UserNotFound {
                key: user.to_string(),
            })?;
        Ok(())
    }
}
