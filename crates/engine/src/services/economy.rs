//! Coin ledger and daily claims.
//!
//! Debits are guarded single statements (balance check and decrement in
//! one UPDATE) and the daily claim slot is taken with a conditional
//! upsert, so neither can double-spend under concurrent callers.

use tracing::info;

use kudos_core::UserId;

use crate::db::{UserRepository, now_ts};
use crate::engine::EngineInner;
use crate::error::{EngineError, Result};
use crate::services::invalidate_user;

/// Seconds in one claim window.
const CLAIM_WINDOW_SECS: i64 = 24 * 60 * 60;

/// A successful daily claim.
#[derive(Debug, Clone, Copy)]
pub struct ClaimOutcome {
    /// Coins credited by this claim.
    pub reward: i64,
    /// Streak after the claim.
    pub streak: i64,
    /// Balance after the claim.
    pub new_balance: i64,
}

/// Ledger service.
pub struct EconomyService<'a> {
    inner: &'a EngineInner,
}

impl<'a> EconomyService<'a> {
    pub(crate) const fn new(inner: &'a EngineInner) -> Self {
        Self { inner }
    }

    fn repo(&self) -> UserRepository<'_> {
        UserRepository::new(&self.inner.pool)
    }

    /// Current balance straight from the store.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UserNotFound`] if the user doesn't exist.
    pub async fn balance(&self, user: &UserId) -> Result<i64> {
        let record = self
            .repo()
            .get_by_id(user)
            .await?
            .ok_or_else(|| EngineError::UserNotFound {
                key: user.to_string(),
            })?;
        Ok(record.coin_balance)
    }

    /// Credit coins, returning the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidAmount`] if `amount <= 0`;
    /// [`EngineError::UserNotFound`] if the user doesn't exist.
    pub async fn credit(&self, user: &UserId, amount: i64, reason: &str) -> Result<i64> {
        if amount <= 0 {
            return Err(EngineError::InvalidAmount { amount });
        }

        let new_balance =
            self.repo()
                .credit(user, amount)
                .await?
                .ok_or_else(|| EngineError::UserNotFound {
                    key: user.to_string(),
                })?;
        info!(%user, amount, reason, new_balance, "coins credited");
        self.invalidate(user).await?;
        Ok(new_balance)
    }

    /// Debit coins, returning the new balance.
    ///
    /// The balance check and the decrement are one atomic statement; a
    /// concurrent debit racing this one cannot push the balance negative.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidAmount`] if `amount <= 0`;
    /// [`EngineError::InsufficientFunds`] if the balance doesn't cover it;
    /// [`EngineError::UserNotFound`] if the user doesn't exist.
    pub async fn debit(&self, user: &UserId, amount: i64, reason: &str) -> Result<i64> {
        if amount <= 0 {
            return Err(EngineError::InvalidAmount { amount });
        }

        if let Some(new_balance) = self.repo().try_debit(user, amount).await? {
            info!(%user, amount, reason, new_balance, "coins debited");
            self.invalidate(user).await?;
            return Ok(new_balance);
        }

        // Guard rejected: either the user is missing or the balance is
        // too low. One more read tells which.
        let record = self
            .repo()
            .get_by_id(user)
            .await?
            .ok_or_else(|| EngineError::UserNotFound {
                key: user.to_string(),
            })?;
        Err(EngineError::InsufficientFunds {
            user: user.clone(),
            balance: record.coin_balance,
            required: amount,
        })
    }

    /// Claim the daily reward.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AlreadyClaimed`] inside the 24h window;
    /// [`EngineError::UserNotFound`] if the user doesn't exist.
    pub async fn claim_daily(&self, user: &UserId) -> Result<ClaimOutcome> {
        self.claim_daily_at(user, now_ts()).await
    }

    /// [`claim_daily`](Self::claim_daily) with an explicit clock, for
    /// callers that control time.
    ///
    /// The streak continues when the gap since the last claim is between
    /// 24h and 48h, and resets to 1 otherwise. The slot is taken with a
    /// conditional upsert guarded on the stored timestamp and the reward
    /// credited in the same transaction, so two racing claims resolve to
    /// exactly one winner and a claim never lands without its payout.
    ///
    /// # Errors
    ///
    /// Same as [`claim_daily`](Self::claim_daily).
    pub async fn claim_daily_at(&self, user: &UserId, now: i64) -> Result<ClaimOutcome> {
        let repo = self.repo();
        let record = repo
            .get_by_id(user)
            .await?
            .ok_or_else(|| EngineError::UserNotFound {
                key: user.to_string(),
            })?;

        let streak = match repo.daily_claim(user).await? {
            None => 1,
            Some(claim) => {
                let elapsed = now - claim.last_claim;
                if elapsed < CLAIM_WINDOW_SECS {
                    return Err(EngineError::AlreadyClaimed { user: user.clone() });
                }
                if elapsed < 2 * CLAIM_WINDOW_SECS {
                    claim.streak + 1
                } else {
                    1
                }
            }
        };

        let economy = &self.inner.config.economy;
        let bonus = (streak * economy.daily_streak_bonus).min(economy.daily_bonus_cap);
        let reward = economy.daily_base_coins + bonus;

        // Slot and reward commit together; a failed credit releases the slot.
        let new_balance = repo
            .try_claim(user, now, streak, now - CLAIM_WINDOW_SECS, reward)
            .await?
            .ok_or_else(|| EngineError::AlreadyClaimed { user: user.clone() })?;
        info!(%user, reward, streak, "daily reward claimed");
        invalidate_user(&self.inner.cache, &record).await?;

        Ok(ClaimOutcome {
            reward,
            streak,
            new_balance,
        })
    }

    async fn invalidate(&self, user: &UserId) -> Result<()> {
        if let Some(record) = self.repo().get_by_id(user).await? {
            invalidate_user(&self.inner.cache, &record).await?;
        }
        Ok(())
    }
}
