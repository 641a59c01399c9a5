//! Badge evaluation.
//!
//! `evaluate` re-scans every unearned badge against the user's current
//! metrics. The grant row is primary-key guarded, so the scan is safe to
//! re-invoke after any event and safe against concurrent evaluators.

use tracing::info;

use kudos_core::{RequirementType, UserId};

use crate::db::{
    BadgeRepository, GameRepository, ShopRepository, SocialRepository, UserRepository,
};
use crate::engine::EngineInner;
use crate::error::{EngineError, Result};
use crate::models::{Badge, UserBadge};
use crate::services::{EconomyService, ProgressionService};

/// Badge service.
pub struct BadgeService<'a> {
    inner: &'a EngineInner,
}

impl<'a> BadgeService<'a> {
    pub(crate) const fn new(inner: &'a EngineInner) -> Self {
        Self { inner }
    }

    fn repo(&self) -> BadgeRepository<'_> {
        BadgeRepository::new(&self.inner.pool)
    }

    /// All badge definitions.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Repository`] on storage failure.
    pub async fn all(&self) -> Result<Vec<Badge>> {
        Ok(self.repo().all().await?)
    }

    /// A user's earned badges, oldest grant first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Repository`] on storage failure.
    pub async fn earned(&self, user: &UserId) -> Result<Vec<UserBadge>> {
        Ok(self.repo().earned(user).await?)
    }

    /// Scan every unearned badge against the user's current metrics and
    /// grant those whose threshold is met, crediting their rewards.
    ///
    /// Returns the badges newly granted by this scan. Re-evaluation after
    /// any event is cheap and a no-op for already-granted badges.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UserNotFound`] if the user doesn't exist.
    pub async fn evaluate(&self, user: &UserId) -> Result<Vec<Badge>> {
        let users = UserRepository::new(&self.inner.pool);
        let record = users
            .get_by_id(user)
            .await?
            .ok_or_else(|| EngineError::UserNotFound {
                key: user.to_string(),
            })?;

        let candidates = self.repo().unearned(user).await?;
        if candidates.is_empty() {
            return Ok(Vec::new());
        }

        let economy = EconomyService::new(self.inner);
        let progression = ProgressionService::new(self.inner);
        let mut granted = Vec::new();

        for badge in candidates {
            let metric = match badge.requirement_type {
                RequirementType::Messages => record.total_requests,
                RequirementType::Friends => {
                    SocialRepository::new(&self.inner.pool).friend_count(user).await?
                }
                RequirementType::Games => {
                    GameRepository::new(&self.inner.pool).games_completed(user).await?
                }
                RequirementType::Streak => users
                    .daily_claim(user)
                    .await?
                    .map_or(0, |claim| claim.streak),
                RequirementType::Purchases => {
                    ShopRepository::new(&self.inner.pool).purchase_count(user).await?
                }
            };
            if metric < badge.requirement_value {
                continue;
            }

            // The PK-guarded insert decides the race; a loser just moves on.
            if !self.repo().try_grant(user, &badge.id).await? {
                continue;
            }
            info!(%user, badge = %badge.id, metric, "badge earned");

            if badge.coin_reward > 0 {
                economy.credit(user, badge.coin_reward, "badge_reward").await?;
            }
            if badge.xp_reward > 0 {
                progression.grant_xp(user, badge.xp_reward).await?;
            }
            granted.push(badge);
        }

        Ok(granted)
    }
}
