//! User repository: accounts, coin ledger, levels, daily claims.
//!
//! Ledger mutations are guarded single statements: the balance check and
//! the decrement of a debit are one conditional UPDATE, so a racing debit
//! can never observe a balance it is about to invalidate.

use sqlx::SqlitePool;

use kudos_core::{UserId, UserRole};

use super::{RepositoryError, is_unique_violation, now_ts};
use crate::models::{DailyClaim, LevelRecord, User, UserPatch};

const USER_COLUMNS: &str = "user_id, external_id, display_name, role, coin_balance, \
     total_coins_earned, total_coins_spent, theme_preference, chat_bubble_style, \
     emoji_pack, voice_style, daily_requests, total_requests, last_request_date, \
     referral_code, metadata, created_at, updated_at";

/// Repository for user, level, and daily-claim rows.
pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    /// Create a new user repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Get a user by internal id or external handle.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_key(&self, key: &str) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = ? OR external_id = ?"
        ))
        .bind(key)
        .bind(key)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Get a user by internal id.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn get_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE user_id = ?"
        ))
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(user)
    }

    /// Create a new user together with its paired level row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Conflict` if the external id or referral
    /// code is already registered; `RepositoryError::Database` otherwise.
    pub async fn create(
        &self,
        id: &UserId,
        external_id: &str,
        display_name: &str,
        referral_code: &str,
        starting_balance: i64,
    ) -> Result<User, RepositoryError> {
        let now = now_ts();
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO users (user_id, external_id, display_name, referral_code, \
             coin_balance, total_coins_earned, metadata, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, '{}', ?, ?)",
        )
        .bind(id)
        .bind(external_id)
        .bind(display_name)
        .bind(referral_code)
        .bind(starting_balance)
        .bind(starting_balance)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                RepositoryError::Conflict("external id already registered".to_owned())
            } else {
                RepositoryError::Database(e)
            }
        })?;

        sqlx::query("INSERT INTO user_levels (user_id, created_at, updated_at) VALUES (?, ?, ?)")
            .bind(id)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        self.get_by_id(id).await?.ok_or(RepositoryError::NotFound)
    }

    /// Apply an explicit patch to the permitted user fields.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn apply_patch(&self, id: &UserId, patch: &UserPatch) -> Result<(), RepositoryError> {
        if patch.is_empty() {
            return Ok(());
        }

        let mut builder = sqlx::QueryBuilder::new("UPDATE users SET ");
        let mut fields = builder.separated(", ");
        if let Some(name) = &patch.display_name {
            fields.push("display_name = ").push_bind_unseparated(name);
        }
        if let Some(theme) = &patch.theme_preference {
            fields
                .push("theme_preference = ")
                .push_bind_unseparated(theme);
        }
        if let Some(bubble) = &patch.chat_bubble_style {
            fields
                .push("chat_bubble_style = ")
                .push_bind_unseparated(bubble);
        }
        if let Some(pack) = &patch.emoji_pack {
            fields.push("emoji_pack = ").push_bind_unseparated(pack);
        }
        if let Some(voice) = &patch.voice_style {
            fields.push("voice_style = ").push_bind_unseparated(voice);
        }
        if let Some(metadata) = &patch.metadata {
            fields.push("metadata = ").push_bind_unseparated(metadata);
        }
        fields.push("updated_at = ").push_bind_unseparated(now_ts());

        builder.push(" WHERE user_id = ").push_bind(id);

        let result = builder.build().execute(self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Set a user's role.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn set_role(&self, id: &UserId, role: UserRole) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE user_id = ?")
            .bind(role)
            .bind(now_ts())
            .bind(id)
            .execute(self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Add coins to balance and lifetime earned.
    ///
    /// Returns the new balance, or `None` if the user doesn't exist.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn credit(&self, id: &UserId, amount: i64) -> Result<Option<i64>, RepositoryError> {
        let balance = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET coin_balance = coin_balance + ?, \
             total_coins_earned = total_coins_earned + ?, updated_at = ? \
             WHERE user_id = ? RETURNING coin_balance",
        )
        .bind(amount)
        .bind(amount)
        .bind(now_ts())
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(balance)
    }

    /// Atomically debit coins if the balance covers the amount.
    ///
    /// The balance check and the decrement are one statement; `None` means
    /// the guard rejected the write (user absent or balance too low).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn try_debit(&self, id: &UserId, amount: i64) -> Result<Option<i64>, RepositoryError> {
        let balance = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET coin_balance = coin_balance - ?, \
             total_coins_spent = total_coins_spent + ?, updated_at = ? \
             WHERE user_id = ? AND coin_balance >= ? RETURNING coin_balance",
        )
        .bind(amount)
        .bind(amount)
        .bind(now_ts())
        .bind(id)
        .bind(amount)
        .fetch_optional(self.pool)
        .await?;
        Ok(balance)
    }

    /// Record one request: bumps the lifetime counter and either increments
    /// or restarts the daily counter depending on whether `today` matches
    /// the stored request date. Single statement, safe under concurrency.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user doesn't exist.
    pub async fn record_request(&self, id: &UserId, today: &str) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE users SET \
             daily_requests = CASE WHEN last_request_date = ? THEN daily_requests + 1 ELSE 1 END, \
             total_requests = total_requests + 1, \
             last_request_date = ?, updated_at = ? \
             WHERE user_id = ?",
        )
        .bind(today)
        .bind(today)
        .bind(now_ts())
        .bind(id)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Get a user's level record.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn level(&self, id: &UserId) -> Result<Option<LevelRecord>, RepositoryError> {
        let record = sqlx::query_as::<_, LevelRecord>(
            "SELECT user_id, level, xp, total_xp, next_level_xp, created_at, updated_at \
             FROM user_levels WHERE user_id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(record)
    }

    /// Ensure a level row exists for the user (signup normally creates it).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn ensure_level(&self, id: &UserId) -> Result<(), RepositoryError> {
        let now = now_ts();
        sqlx::query(
            "INSERT OR IGNORE INTO user_levels (user_id, created_at, updated_at) VALUES (?, ?, ?)",
        )
        .bind(id)
        .bind(now)
        .bind(now)
        .execute(self.pool)
        .await?;
        Ok(())
    }

    /// Write back a fully settled level record (post level-up arithmetic).
    ///
    /// The write is a compare-and-swap on the values the caller observed;
    /// `false` means another grant settled in between and the caller must
    /// re-read and recompute.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn settle_level(
        &self,
        id: &UserId,
        observed: &LevelRecord,
        level: i64,
        xp: i64,
        total_xp: i64,
        next_level_xp: i64,
    ) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            "UPDATE user_levels SET level = ?, xp = ?, total_xp = ?, next_level_xp = ?, \
             updated_at = ? WHERE user_id = ? AND level = ? AND xp = ? AND total_xp = ?",
        )
        .bind(level)
        .bind(xp)
        .bind(total_xp)
        .bind(next_level_xp)
        .bind(now_ts())
        .bind(id)
        .bind(observed.level)
        .bind(observed.xp)
        .bind(observed.total_xp)
        .execute(self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Get a user's daily-claim state.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn daily_claim(&self, id: &UserId) -> Result<Option<DailyClaim>, RepositoryError> {
        let claim = sqlx::query_as::<_, DailyClaim>(
            "SELECT user_id, last_claim, streak FROM daily_claims WHERE user_id = ?",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        Ok(claim)
    }

    /// Claim the daily reward slot and credit the reward, atomically.
    ///
    /// Inside one transaction: the upsert takes the slot only when no
    /// prior claim exists or the stored `last_claim` is at or before
    /// `cutoff`, then the reward lands on the balance. Two racing claims
    /// resolve to exactly one winner, and a failed credit rolls the slot
    /// back. Returns the new balance, or `None` when the guard rejected
    /// the claim.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the user row vanished under
    /// the credit; `RepositoryError::Database` if a query fails.
    pub async fn try_claim(
        &self,
        id: &UserId,
        last_claim: i64,
        streak: i64,
        cutoff: i64,
        reward: i64,
    ) -> Result<Option<i64>, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "INSERT INTO daily_claims (user_id, last_claim, streak) VALUES (?, ?, ?) \
             ON CONFLICT(user_id) DO UPDATE SET last_claim = excluded.last_claim, \
             streak = excluded.streak WHERE daily_claims.last_claim <= ?",
        )
        .bind(id)
        .bind(last_claim)
        .bind(streak)
        .bind(cutoff)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        let new_balance = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET coin_balance = coin_balance + ?, \
             total_coins_earned = total_coins_earned + ?, updated_at = ? \
             WHERE user_id = ? RETURNING coin_balance",
        )
        .bind(reward)
        .bind(reward)
        .bind(now_ts())
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        tx.commit().await?;
        Ok(Some(new_balance))
    }
}
