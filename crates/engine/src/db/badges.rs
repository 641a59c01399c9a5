//! Badge repository.
//!
//! Grants are keyed on the (user, badge) primary key and inserted with
//! `INSERT OR IGNORE`, so concurrent evaluators award each badge at most
//! once no matter how many of them cross the threshold together.

use sqlx::SqlitePool;

use kudos_core::{BadgeId, UserId};

use super::{RepositoryError, now_ts};
use crate::models::{Badge, UserBadge};

const BADGE_COLUMNS: &str = "id, name, description, icon, requirement_type, requirement_value, \
     coin_reward, xp_reward, created_at";

/// Repository for badge definitions and grants.
pub struct BadgeRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> BadgeRepository<'a> {
    /// Create a new badge repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List all badge definitions.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn all(&self) -> Result<Vec<Badge>, RepositoryError> {
        let rows = sqlx::query_as::<_, Badge>(&format!(
            "SELECT {BADGE_COLUMNS} FROM badges ORDER BY requirement_type, requirement_value"
        ))
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a badge definition by id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn badge(&self, id: &BadgeId) -> Result<Option<Badge>, RepositoryError> {
        let badge =
            sqlx::query_as::<_, Badge>(&format!("SELECT {BADGE_COLUMNS} FROM badges WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(badge)
    }

    /// Badges the user has not earned yet.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn unearned(&self, user: &UserId) -> Result<Vec<Badge>, RepositoryError> {
        let rows = sqlx::query_as::<_, Badge>(&format!(
            "SELECT {BADGE_COLUMNS} FROM badges b \
             WHERE NOT EXISTS (SELECT 1 FROM user_badges ub \
                               WHERE ub.badge_id = b.id AND ub.user_id = ?) \
             ORDER BY requirement_type, requirement_value"
        ))
        .bind(user)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// List a user's earned badges, oldest grant first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn earned(&self, user: &UserId) -> Result<Vec<UserBadge>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserBadge>(
            "SELECT user_id, badge_id, earned_at FROM user_badges \
             WHERE user_id = ? ORDER BY earned_at",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Record a grant; returns `false` if the user already held the badge.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn try_grant(&self, user: &UserId, badge: &BadgeId) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "INSERT OR IGNORE INTO user_badges (user_id, badge_id, earned_at) VALUES (?, ?, ?)",
        )
        .bind(user)
        .bind(badge)
        .bind(now_ts())
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
