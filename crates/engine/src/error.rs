//! Unified error handling for engine operations.
//!
//! Every rejected precondition surfaces as a typed [`EngineError`] variant
//! carrying enough context (entity id, limit value, balance) for an adapter
//! to render a user-facing message. Adapters that only need a coarse
//! classification can use [`EngineError::kind`].

use kudos_core::{BadgeId, GameId, ItemId, SessionId, SessionStatus, UserId, UserRole};
use thiserror::Error;

use crate::db::RepositoryError;

/// Coarse classification of an [`EngineError`], mirroring how adapters
/// typically map failures onto their own protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A precondition on the request itself failed (bad amount, out of
    /// stock, insufficient funds, purchase limit).
    Validation,
    /// The request conflicts with existing state (already friends, already
    /// claimed, already joined).
    Conflict,
    /// The target entity is in the wrong lifecycle state.
    State,
    /// The acting user lacks the required role.
    Permission,
    /// The referenced entity does not exist.
    NotFound,
    /// Storage failure or corrupt data.
    Internal,
}

/// Engine-level error type.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Storage layer failure.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// Referenced user does not exist (by internal id or external handle).
    #[error("User not found: {key}")]
    UserNotFound { key: String },

    /// Credit/debit amount must be strictly positive.
    #[error("Invalid amount: {amount}")]
    InvalidAmount { amount: i64 },

    /// Purchase quantity must be at least 1.
    #[error("Invalid quantity: {quantity}")]
    InvalidQuantity { quantity: i64 },

    /// Balance is too low for the requested debit.
    #[error("Insufficient funds for {user}: balance {balance}, required {required}")]
    InsufficientFunds {
        user: UserId,
        balance: i64,
        required: i64,
    },

    /// Daily reward was already claimed inside the 24h window.
    #[error("Daily reward already claimed by {user}")]
    AlreadyClaimed { user: UserId },

    /// Item does not exist or is not active.
    #[error("Item unavailable: {item}")]
    ItemUnavailable { item: ItemId },

    /// Finite stock cannot cover the requested quantity.
    #[error("Out of stock: {item} (requested {requested})")]
    OutOfStock { item: ItemId, requested: i64 },

    /// Per-user purchase limit would be exceeded.
    #[error("Purchase limit reached for {item}: limit {limit}")]
    PurchaseLimitReached { item: ItemId, limit: i64 },

    /// The user holds no inventory entry for the item.
    #[error("Item not owned: {item}")]
    NotOwned { item: ItemId },

    /// The item's type cannot be equipped.
    #[error("Item cannot be equipped: {item}")]
    NotEquippable { item: ItemId },

    /// Referenced game does not exist or is inactive.
    #[error("Game not found: {game}")]
    GameNotFound { game: GameId },

    /// Referenced session does not exist.
    #[error("Session not found: {session}")]
    SessionNotFound { session: SessionId },

    /// Session is past the `waiting` state and cannot accept players.
    #[error("Session {session} is not waiting (status: {status})")]
    SessionNotWaiting {
        session: SessionId,
        status: SessionStatus,
    },

    /// Session already reached its terminal state.
    #[error("Session already ended: {session}")]
    SessionEnded { session: SessionId },

    /// The roster already holds the game's maximum player count.
    #[error("Session full: {session} (max {max_players})")]
    SessionFull {
        session: SessionId,
        max_players: i64,
    },

    /// The user already sits on the session roster.
    #[error("Already joined session {session}")]
    AlreadyJoined { session: SessionId },

    /// Declared winner is not on the session roster.
    #[error("Winner {user} is not a player in session {session}")]
    WinnerNotInSession { session: SessionId, user: UserId },

    /// The acting user does not sit on the session roster.
    #[error("{user} is not a player in session {session}")]
    NotInSession { session: SessionId, user: UserId },

    /// Referenced quiz question does not exist.
    #[error("Quiz question not found: {question}")]
    QuestionNotFound { question: i64 },

    /// Users are already friends.
    #[error("{a} and {b} are already friends")]
    AlreadyFriends { a: UserId, b: UserId },

    /// A friend request between the pair is already pending.
    #[error("Friend request already pending between {a} and {b}")]
    RequestPending { a: UserId, b: UserId },

    /// No pending request exists to accept or reject.
    #[error("No pending friend request from {from} to {to}")]
    NoPendingRequest { from: UserId, to: UserId },

    /// No friendship edge exists to remove.
    #[error("{a} and {b} are not friends")]
    NotFriends { a: UserId, b: UserId },

    /// No block exists to lift.
    #[error("{user} has not blocked {target}")]
    NotBlocked { user: UserId, target: UserId },

    /// A block in either direction forbids the operation.
    #[error("Interaction between {a} and {b} is blocked")]
    Blocked { a: UserId, b: UserId },

    /// The operation targets the acting user itself.
    #[error("Operation cannot target the acting user: {user}")]
    SelfReference { user: UserId },

    /// Unknown badge id.
    #[error("Badge not found: {badge}")]
    BadgeNotFound { badge: BadgeId },

    /// The acting user's role is below the required level.
    #[error("Permission denied for {actor}: requires {required} role")]
    PermissionDenied { actor: UserId, required: UserRole },
}

impl EngineError {
    /// Coarse classification for adapters.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Repository(_) => ErrorKind::Internal,
            Self::UserNotFound { .. }
            | Self::GameNotFound { .. }
            | Self::SessionNotFound { .. }
            | Self::QuestionNotFound { .. }
            | Self::BadgeNotFound { .. } => ErrorKind::NotFound,
            Self::InvalidAmount { .. }
            | Self::InvalidQuantity { .. }
            | Self::InsufficientFunds { .. }
            | Self::ItemUnavailable { .. }
            | Self::OutOfStock { .. }
            | Self::PurchaseLimitReached { .. }
            | Self::NotOwned { .. }
            | Self::NotEquippable { .. }
            | Self::SelfReference { .. }
            | Self::WinnerNotInSession { .. }
            | Self::NotInSession { .. } => ErrorKind::Validation,
            Self::AlreadyClaimed { .. }
            | Self::AlreadyFriends { .. }
            | Self::RequestPending { .. }
            | Self::NoPendingRequest { .. }
            | Self::NotFriends { .. }
            | Self::NotBlocked { .. }
            | Self::Blocked { .. }
            | Self::AlreadyJoined { .. }
            | Self::SessionFull { .. } => ErrorKind::Conflict,
            Self::SessionNotWaiting { .. } | Self::SessionEnded { .. } => ErrorKind::State,
            Self::PermissionDenied { .. } => ErrorKind::Permission,
        }
    }
}

impl From<sqlx::Error> for EngineError {
    fn from(e: sqlx::Error) -> Self {
        Self::Repository(RepositoryError::Database(e))
    }
}

/// Result type alias for `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_carries_context() {
        let err = EngineError::InsufficientFunds {
            user: UserId::new("u-1"),
            balance: 40,
            required: 100,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient funds for u-1: balance 40, required 100"
        );

        let err = EngineError::PurchaseLimitReached {
            item: ItemId::new("name_change"),
            limit: 1,
        };
        assert_eq!(
            err.to_string(),
            "Purchase limit reached for name_change: limit 1"
        );
    }

    #[test]
    fn error_kinds() {
        let user = UserId::new("u-1");
        assert_eq!(
            EngineError::InvalidAmount { amount: 0 }.kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            EngineError::AlreadyClaimed { user: user.clone() }.kind(),
            ErrorKind::Conflict
        );
        assert_eq!(
            EngineError::SessionEnded {
                session: SessionId::new("s-1")
            }
            .kind(),
            ErrorKind::State
        );
        assert_eq!(
            EngineError::PermissionDenied {
                actor: user,
                required: UserRole::Admin
            }
            .kind(),
            ErrorKind::Permission
        );
    }
}
