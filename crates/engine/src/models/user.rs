//! User, progression, and daily-claim domain types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use kudos_core::{UserId, UserRole};

use crate::db::RepositoryError;

/// A user account with its coin ledger and cosmetic preferences.
///
/// Invariants maintained by the engine (and backstopped by CHECK
/// constraints): `coin_balance >= 0` and
/// `coin_balance == total_coins_earned - total_coins_spent`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Internal key (UUID).
    pub user_id: UserId,
    /// External handle assigned by the transport (e.g. a chat platform id).
    pub external_id: String,
    /// Display name.
    pub display_name: String,
    /// Account role.
    pub role: UserRole,
    /// Spendable coins.
    pub coin_balance: i64,
    /// Lifetime coins earned.
    pub total_coins_earned: i64,
    /// Lifetime coins spent.
    pub total_coins_spent: i64,
    /// Equipped profile theme.
    pub theme_preference: String,
    /// Equipped chat bubble style.
    pub chat_bubble_style: String,
    /// Equipped emoji pack.
    pub emoji_pack: String,
    /// Equipped voice style.
    pub voice_style: String,
    /// Requests made today (reset when `last_request_date` rolls over).
    pub daily_requests: i64,
    /// Lifetime request count; doubles as the message metric for badges.
    pub total_requests: i64,
    /// Date (YYYY-MM-DD) of the most recent request.
    pub last_request_date: Option<String>,
    /// Referral code assigned at signup.
    pub referral_code: String,
    /// Free-form JSON metadata (unlocked features, timed power-ups).
    pub metadata: String,
    /// Creation time (unix seconds).
    pub created_at: i64,
    /// Last update time (unix seconds).
    pub updated_at: i64,
}

impl User {
    /// Parse the metadata blob into its typed form.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::DataCorruption` if the stored JSON is
    /// invalid.
    pub fn parsed_metadata(&self) -> Result<UserMetadata, RepositoryError> {
        serde_json::from_str(&self.metadata)
            .map_err(|e| RepositoryError::DataCorruption(format!("invalid user metadata: {e}")))
    }
}

/// Typed view of the user metadata blob.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserMetadata {
    /// Features unlocked through the shop; insertion is idempotent.
    #[serde(default)]
    pub unlocked_features: Vec<String>,
    /// Active power-ups, keyed by name, valued by unix-second expiry.
    #[serde(default)]
    pub active_powerups: BTreeMap<String, i64>,
}

impl UserMetadata {
    /// Add a feature unlock; re-adding an unlocked feature is a no-op.
    pub fn unlock_feature(&mut self, feature: &str) {
        if !self.unlocked_features.iter().any(|f| f == feature) {
            self.unlocked_features.push(feature.to_owned());
        }
    }

    /// Grant (or refresh) a power-up expiring at `expires_at`.
    pub fn grant_powerup(&mut self, name: &str, expires_at: i64) {
        self.active_powerups.insert(name.to_owned(), expires_at);
    }

    /// Whether the named power-up is active at `now`.
    #[must_use]
    pub fn powerup_active(&self, name: &str, now: i64) -> bool {
        self.active_powerups.get(name).is_some_and(|&exp| exp > now)
    }
}

/// Explicit patch of the user fields an operation is permitted to change.
///
/// Replaces ad-hoc partial updates: each mutation enumerates exactly the
/// fields it touches, and everything else is left alone.
#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub display_name: Option<String>,
    pub theme_preference: Option<String>,
    pub chat_bubble_style: Option<String>,
    pub emoji_pack: Option<String>,
    pub voice_style: Option<String>,
    pub metadata: Option<String>,
}

impl UserPatch {
    /// Whether the patch changes anything at all.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.display_name.is_none()
            && self.theme_preference.is_none()
            && self.chat_bubble_style.is_none()
            && self.emoji_pack.is_none()
            && self.voice_style.is_none()
            && self.metadata.is_none()
    }
}

/// Per-user level and XP state (1:1 with `User`).
///
/// Invariant after any settle: `0 <= xp < next_level_xp`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LevelRecord {
    pub user_id: UserId,
    pub level: i64,
    pub xp: i64,
    pub total_xp: i64,
    pub next_level_xp: i64,
    pub created_at: i64,
    pub updated_at: i64,
}

/// One line of a user's rolling conversation memory.
///
/// Lives only in the cache layer (bounded window, TTL-expired), never in
/// an entity table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemoryLogEntry {
    /// Who spoke: `"user"` or `"assistant"`.
    pub speaker: String,
    pub content: String,
    /// Unix seconds.
    pub at: i64,
}

/// Per-user daily-claim state.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DailyClaim {
    pub user_id: UserId,
    /// Unix seconds of the most recent claim.
    pub last_claim: i64,
    /// Consecutive claim days.
    pub streak: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn feature_unlock_is_idempotent() {
        let mut meta = UserMetadata::default();
        meta.unlock_feature("fast_ai");
        meta.unlock_feature("fast_ai");
        assert_eq!(meta.unlocked_features, vec!["fast_ai"]);
    }

    #[test]
    fn powerup_grant_overwrites_and_expires() {
        let mut meta = UserMetadata::default();
        meta.grant_powerup("xp_boost", 1_000);
        meta.grant_powerup("xp_boost", 2_000);
        assert!(meta.powerup_active("xp_boost", 1_500));
        assert!(!meta.powerup_active("xp_boost", 2_000));
        assert!(!meta.powerup_active("coin_boost", 0));
    }

    #[test]
    fn metadata_round_trips_through_json() {
        let mut meta = UserMetadata::default();
        meta.unlock_feature("long_memory");
        meta.grant_powerup("coin_boost", 42);
        let json = serde_json::to_string(&meta).expect("serialize");
        let back: UserMetadata = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, meta);
    }

    #[test]
    fn empty_metadata_blob_parses() {
        let meta: UserMetadata = serde_json::from_str("{}").expect("parse");
        assert!(meta.unlocked_features.is_empty());
        assert!(meta.active_powerups.is_empty());
    }
}
