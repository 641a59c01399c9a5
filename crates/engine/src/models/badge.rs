//! Badge and achievement domain types.

use serde::{Deserialize, Serialize};

use kudos_core::{BadgeId, RequirementType, UserId};

/// A badge definition: a metric, a threshold, and its rewards.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Badge {
    pub id: BadgeId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub requirement_type: RequirementType,
    /// Threshold the metric must meet or exceed.
    pub requirement_value: i64,
    pub coin_reward: i64,
    pub xp_reward: i64,
    pub created_at: i64,
}

/// An idempotent badge grant; at most one per (user, badge) pair, ever.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserBadge {
    pub user_id: UserId,
    pub badge_id: BadgeId,
    pub earned_at: i64,
}
