//! Social graph repository: friend requests, friendships, blocks.
//!
//! Friendship edges are symmetric and stored as two rows, written and
//! deleted together in one transaction.

use sqlx::SqlitePool;

use kudos_core::{UserId, types::FriendRequestStatus};

use super::{RepositoryError, is_unique_violation, now_ts};
use crate::models::{FriendRequest, Friendship};

const REQUEST_COLUMNS: &str = "id, from_user, to_user, status, created_at, updated_at";

/// Repository for friend-request, friendship, and block rows.
pub struct SocialRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> SocialRepository<'a> {
    /// Create a new social repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get the request row for an ordered (from, to) pair.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn request(
        &self,
        from: &UserId,
        to: &UserId,
    ) -> Result<Option<FriendRequest>, RepositoryError> {
        let request = sqlx::query_as::<_, FriendRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM friend_requests WHERE from_user = ? AND to_user = ?"
        ))
        .bind(from)
        .bind(to)
        .fetch_optional(self.pool)
        .await?;
        Ok(request)
    }

    /// Insert a pending friend request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if a request for this pair
    /// already exists; `RepositoryError::Database` if the query fails.
    pub async fn create_request(
        &self,
        from: &UserId,
        to: &UserId,
    ) -> Result<FriendRequest, RepositoryError> {
        let now = now_ts();
        let request = sqlx::query_as::<_, FriendRequest>(&format!(
            "INSERT INTO friend_requests (from_user, to_user, status, created_at, updated_at) \
             VALUES (?, ?, 'pending', ?, ?) RETURNING {REQUEST_COLUMNS}"
        ))
        .bind(from)
        .bind(to)
        .bind(now)
        .bind(now)
        .fetch_one(self.pool)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                RepositoryError::Conflict(format!("request {from} -> {to} already exists"))
            } else {
                RepositoryError::Database(err)
            }
        })?;
        Ok(request)
    }

    /// Reopen a previously settled request as pending.
    ///
    /// Used when a fresh request is sent after an earlier rejection or a
    /// removed friendship left a stale row behind.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no settled row exists;
    /// `RepositoryError::Database` if the query fails.
    pub async fn reopen_request(&self, from: &UserId, to: &UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE friend_requests SET status = 'pending', updated_at = ? \
             WHERE from_user = ? AND to_user = ? AND status != 'pending'",
        )
        .bind(now_ts())
        .bind(from)
        .bind(to)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Pending requests addressed to a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn pending_requests_to(
        &self,
        user: &UserId,
    ) -> Result<Vec<FriendRequest>, RepositoryError> {
        let rows = sqlx::query_as::<_, FriendRequest>(&format!(
            "SELECT {REQUEST_COLUMNS} FROM friend_requests \
             WHERE to_user = ? AND status = 'pending' ORDER BY created_at"
        ))
        .bind(user)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Accept a pending request and materialize the symmetric edge.
    ///
    /// The status flip is guarded on `status = 'pending'`, so two racing
    /// accepts resolve to one.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no pending request exists
    /// for this pair; `RepositoryError::Database` if a query fails.
    pub async fn accept_request(&self, from: &UserId, to: &UserId) -> Result<(), RepositoryError> {
        let now = now_ts();
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE friend_requests SET status = 'accepted', updated_at = ? \
             WHERE from_user = ? AND to_user = ? AND status = 'pending'",
        )
        .bind(now)
        .bind(from)
        .bind(to)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            "INSERT OR IGNORE INTO friends (user_id, friend_id, created_at) \
             VALUES (?, ?, ?), (?, ?, ?)",
        )
        .bind(from)
        .bind(to)
        .bind(now)
        .bind(to)
        .bind(from)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Reject a pending request.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no pending request exists
    /// for this pair; `RepositoryError::Database` if the query fails.
    pub async fn reject_request(&self, from: &UserId, to: &UserId) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE friend_requests SET status = 'rejected', updated_at = ? \
             WHERE from_user = ? AND to_user = ? AND status = 'pending'",
        )
        .bind(now_ts())
        .bind(from)
        .bind(to)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Whether a symmetric friendship edge exists.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn are_friends(&self, a: &UserId, b: &UserId) -> Result<bool, RepositoryError> {
        let exists = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM friends WHERE user_id = ? AND friend_id = ?",
        )
        .bind(a)
        .bind(b)
        .fetch_one(self.pool)
        .await?;
        Ok(exists > 0)
    }

    /// List a user's friendship edges, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn friends(&self, user: &UserId) -> Result<Vec<Friendship>, RepositoryError> {
        let rows = sqlx::query_as::<_, Friendship>(
            "SELECT user_id, friend_id, created_at FROM friends \
             WHERE user_id = ? ORDER BY created_at",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Count a user's friends (the `friends` badge metric).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn friend_count(&self, user: &UserId) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM friends WHERE user_id = ?")
            .bind(user)
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }

    /// Delete both directions of a friendship edge.
    ///
    /// Also clears the request rows between the pair so a fresh request
    /// can be sent later.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no edge existed;
    /// `RepositoryError::Database` if a query fails.
    pub async fn remove_friend(&self, user: &UserId, friend: &UserId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "DELETE FROM friends WHERE (user_id = ? AND friend_id = ?) \
             OR (user_id = ? AND friend_id = ?)",
        )
        .bind(user)
        .bind(friend)
        .bind(friend)
        .bind(user)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        sqlx::query(
            "DELETE FROM friend_requests WHERE (from_user = ? AND to_user = ?) \
             OR (from_user = ? AND to_user = ?)",
        )
        .bind(user)
        .bind(friend)
        .bind(friend)
        .bind(user)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Block a user, severing any friendship and pending requests.
    ///
    /// Idempotent: blocking twice is a no-op.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if a query fails.
    pub async fn block(&self, user: &UserId, target: &UserId) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT OR IGNORE INTO blocks (user_id, blocked_user_id, created_at) VALUES (?, ?, ?)",
        )
        .bind(user)
        .bind(target)
        .bind(now_ts())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM friends WHERE (user_id = ? AND friend_id = ?) \
             OR (user_id = ? AND friend_id = ?)",
        )
        .bind(user)
        .bind(target)
        .bind(target)
        .bind(user)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "DELETE FROM friend_requests WHERE ((from_user = ? AND to_user = ?) \
             OR (from_user = ? AND to_user = ?)) AND status = 'pending'",
        )
        .bind(user)
        .bind(target)
        .bind(target)
        .bind(user)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    /// Remove a block.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no block existed;
    /// `RepositoryError::Database` if the query fails.
    pub async fn unblock(&self, user: &UserId, target: &UserId) -> Result<(), RepositoryError> {
        let result =
            sqlx::query("DELETE FROM blocks WHERE user_id = ? AND blocked_user_id = ?")
                .bind(user)
                .bind(target)
                .execute(self.pool)
                .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Users this user has blocked, oldest block first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn blocked(&self, user: &UserId) -> Result<Vec<UserId>, RepositoryError> {
        let rows = sqlx::query_scalar::<_, UserId>(
            "SELECT blocked_user_id FROM blocks WHERE user_id = ? ORDER BY created_at",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Whether either side has blocked the other.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn either_blocked(&self, a: &UserId, b: &UserId) -> Result<bool, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM blocks WHERE (user_id = ? AND blocked_user_id = ?) \
             OR (user_id = ? AND blocked_user_id = ?)",
        )
        .bind(a)
        .bind(b)
        .bind(b)
        .bind(a)
        .fetch_one(self.pool)
        .await?;
        Ok(count > 0)
    }

    /// Current status of the request between a pair, if any.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn request_status(
        &self,
        from: &UserId,
        to: &UserId,
    ) -> Result<Option<FriendRequestStatus>, RepositoryError> {
        let status = sqlx::query_scalar::<_, FriendRequestStatus>(
            "SELECT status FROM friend_requests WHERE from_user = ? AND to_user = ?",
        )
        .bind(from)
        .bind(to)
        .fetch_optional(self.pool)
        .await?;
        Ok(status)
    }
}
