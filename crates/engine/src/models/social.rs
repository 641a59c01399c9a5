//! Social graph domain types.

use serde::{Deserialize, Serialize};

use kudos_core::{FriendRequestStatus, RowId, UserId};

/// A friend request, unique per ordered (from, to) pair.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FriendRequest {
    pub id: RowId,
    pub from_user: UserId,
    pub to_user: UserId,
    pub status: FriendRequestStatus,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One direction of a symmetric friendship edge.
///
/// Accepting a request materializes both directions; removal deletes both.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Friendship {
    pub user_id: UserId,
    pub friend_id: UserId,
    pub created_at: i64,
}
