//! Account lifecycle, profile updates, message accounting, and the
//! rolling conversation memory.

use chrono::Utc;
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use kudos_core::{UserId, UserRole};

use crate::db::{RepositoryError, UserRepository};
use crate::engine::EngineInner;
use crate::error::{EngineError, Result};
use crate::models::{Badge, MemoryLogEntry, User, UserPatch};
use crate::services::{
    BadgeService, EconomyService, ProgressionService, invalidate_user, memory_cache_key,
    user_cache_key,
};

/// Messages kept in a user's rolling conversation memory.
const MEMORY_WINDOW: usize = 20;

const REFERRAL_CHARSET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
const REFERRAL_LEN: usize = 8;

/// What recording a message granted.
#[derive(Debug)]
pub struct MessageOutcome {
    /// Balance after the per-message coin grant.
    pub new_balance: i64,
    /// Whether the XP grant produced at least one level-up.
    pub leveled_up: bool,
    /// Level after the grant.
    pub level: i64,
    /// Badges newly earned by this message.
    pub new_badges: Vec<Badge>,
}

/// A user's message allowance for the current day.
#[derive(Debug, Clone, Copy)]
pub struct DailyUsage {
    /// Messages recorded today.
    pub used: i64,
    /// Daily allowance; `None` means unlimited.
    pub limit: Option<i64>,
}

impl DailyUsage {
    /// Messages left today.
    #[must_use]
    pub fn remaining(&self) -> Option<i64> {
        self.limit.map(|limit| (limit - self.used).max(0))
    }

    /// Whether the allowance is used up.
    #[must_use]
    pub fn exhausted(&self) -> bool {
        self.remaining() == Some(0)
    }
}

/// Account service.
pub struct UserService<'a> {
    inner: &'a EngineInner,
}

impl<'a> UserService<'a> {
    pub(crate) const fn new(inner: &'a EngineInner) -> Self {
        Self { inner }
    }

    fn repo(&self) -> UserRepository<'_> {
        UserRepository::new(&self.inner.pool)
    }

    /// Get a user by internal id or external handle, through the cache.
    ///
    /// A store read repopulates the cache under both identifiers with the
    /// configured user TTL.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UserNotFound`] if no user matches `key`.
    pub async fn get(&self, key: &str) -> Result<User> {
        let cache_key = user_cache_key(key);
        if let Some(user) = self.inner.cache.get::<User>(&cache_key).await? {
            return Ok(user);
        }

        let user = self
            .repo()
            .get_by_key(key)
            .await?
            .ok_or_else(|| EngineError::UserNotFound {
                key: key.to_owned(),
            })?;
        self.cache_user(&user).await?;
        Ok(user)
    }

    /// Get the user registered under an external handle, creating the
    /// account on first sight.
    ///
    /// New accounts start with the configured balance, a fresh level row,
    /// and a generated referral code. A concurrent create for the same
    /// handle resolves to the row the winner inserted.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Repository`] on storage failure.
    pub async fn create(&self, external_id: &str, display_name: &str) -> Result<User> {
        if let Some(user) = self.repo().get_by_key(external_id).await? {
            return Ok(user);
        }

        let id = UserId::new(Uuid::new_v4().to_string());
        let referral_code = generate_referral_code();
        let created = self
            .repo()
            .create(
                &id,
                external_id,
                display_name,
                &referral_code,
                self.inner.config.economy.starting_balance,
            )
            .await;

        match created {
            Ok(user) => {
                info!(user = %user.user_id, external_id, "user created");
                self.cache_user(&user).await?;
                Ok(user)
            }
            // Lost a signup race for the same handle; the winner's row is
            // the account.
            Err(RepositoryError::Conflict(_)) => {
                self.repo()
                    .get_by_key(external_id)
                    .await?
                    .ok_or_else(|| EngineError::UserNotFound {
                        key: external_id.to_owned(),
                    })
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Apply a profile patch and return the updated record.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UserNotFound`] if the user doesn't exist.
    pub async fn update_profile(&self, id: &UserId, patch: &UserPatch) -> Result<User> {
        match self.repo().apply_patch(id, patch).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => {
                return Err(EngineError::UserNotFound {
                    key: id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }

        let user = self
            .repo()
            .get_by_id(id)
            .await?
            .ok_or_else(|| EngineError::UserNotFound {
                key: id.to_string(),
            })?;
        invalidate_user(&self.inner.cache, &user).await?;
        Ok(user)
    }

    /// Set a user's role. The acting user must hold an admin role.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::PermissionDenied`] if the actor is below
    /// admin; [`EngineError::UserNotFound`] if either user doesn't exist.
    pub async fn set_role(&self, actor: &UserId, target_key: &str, role: UserRole) -> Result<User> {
        let acting = self
            .repo()
            .get_by_id(actor)
            .await?
            .ok_or_else(|| EngineError::UserNotFound {
                key: actor.to_string(),
            })?;
        if !acting.role.is_admin() {
            return Err(EngineError::PermissionDenied {
                actor: actor.clone(),
                required: UserRole::Admin,
            });
        }

        let target = self.get(target_key).await?;
        self.repo().set_role(&target.user_id, role).await?;
        info!(actor = %actor, target = %target.user_id, %role, "role changed");
        invalidate_user(&self.inner.cache, &target).await?;
        self.get(target.user_id.as_str()).await
    }

    /// Record one inbound message: bump the request counters, grant the
    /// per-message XP and coins, and re-scan badges.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UserNotFound`] if no user matches `key`.
    pub async fn record_message(&self, key: &str) -> Result<MessageOutcome> {
        let user = self.get(key).await?;
        let today = Utc::now().format("%Y-%m-%d").to_string();
        self.repo().record_request(&user.user_id, &today).await?;

        let economy = EconomyService::new(self.inner);
        let progression = ProgressionService::new(self.inner);
        let new_balance = economy
            .credit(
                &user.user_id,
                self.inner.config.economy.coins_per_message,
                "message",
            )
            .await?;
        let xp = progression
            .grant_xp(&user.user_id, self.inner.config.economy.xp_per_message)
            .await?;

        invalidate_user(&self.inner.cache, &user).await?;
        let new_badges = BadgeService::new(self.inner).evaluate(&user.user_id).await?;

        Ok(MessageOutcome {
            new_balance,
            leveled_up: xp.levels_gained > 0,
            level: xp.record.level,
            new_badges,
        })
    }

    /// Current daily message usage against the role-based allowance.
    ///
    /// Moderator and higher roles are unlimited.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UserNotFound`] if no user matches `key`.
    pub async fn daily_usage(&self, key: &str) -> Result<DailyUsage> {
        let user = self.get(key).await?;
        let today = Utc::now().format("%Y-%m-%d").to_string();
        let used = if user.last_request_date.as_deref() == Some(today.as_str()) {
            user.daily_requests
        } else {
            0
        };

        let limit = if user.role >= UserRole::Moderator {
            None
        } else if user.role >= UserRole::Premium {
            Some(self.inner.config.economy.premium_daily_limit)
        } else {
            Some(self.inner.config.economy.free_daily_limit)
        };

        Ok(DailyUsage { used, limit })
    }

    /// Append a line to the user's rolling conversation memory.
    ///
    /// The window keeps the most recent [`MEMORY_WINDOW`] lines and expires
    /// as a whole after the configured memory TTL.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UserNotFound`] if no user matches `key`.
    pub async fn remember(&self, key: &str, speaker: &str, content: &str) -> Result<()> {
        let user = self.get(key).await?;
        let cache_key = memory_cache_key(user.user_id.as_str());

        let mut log = self
            .inner
            .cache
            .get::<Vec<MemoryLogEntry>>(&cache_key)
            .await?
            .unwrap_or_default();
        log.push(MemoryLogEntry {
            speaker: speaker.to_owned(),
            content: content.to_owned(),
            at: Utc::now().timestamp(),
        });
        if log.len() > MEMORY_WINDOW {
            log.drain(..log.len() - MEMORY_WINDOW);
        }

        self.inner
            .cache
            .set(&cache_key, &log, Some(self.inner.config.cache.memory_log_ttl))
            .await?;
        Ok(())
    }

    /// Read the user's conversation memory, oldest line first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UserNotFound`] if no user matches `key`.
    pub async fn recall(&self, key: &str) -> Result<Vec<MemoryLogEntry>> {
        let user = self.get(key).await?;
        let log = self
            .inner
            .cache
            .get::<Vec<MemoryLogEntry>>(&memory_cache_key(user.user_id.as_str()))
            .await?
            .unwrap_or_default();
        Ok(log)
    }

    /// Drop the user's conversation memory.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UserNotFound`] if no user matches `key`.
    pub async fn forget(&self, key: &str) -> Result<()> {
        let user = self.get(key).await?;
        self.inner
            .cache
            .invalidate(&memory_cache_key(user.user_id.as_str()))
            .await?;
        Ok(())
    }

    async fn cache_user(&self, user: &User) -> Result<()> {
        let ttl = Some(self.inner.config.cache.user_ttl);
        self.inner
            .cache
            .set(&user_cache_key(user.user_id.as_str()), user, ttl)
            .await?;
        self.inner
            .cache
            .set(&user_cache_key(&user.external_id), user, ttl)
            .await?;
        Ok(())
    }
}

fn generate_referral_code() -> String {
    let mut rng = rand::rng();
    (0..REFERRAL_LEN)
        .map(|_| REFERRAL_CHARSET[rng.random_range(0..REFERRAL_CHARSET.len())] as char)
        .collect()
}
