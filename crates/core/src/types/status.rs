//! Status and kind enums for domain entities.

use serde::{Deserialize, Serialize};

/// Lifecycle of a game session.
///
/// Sessions only move forward: `Waiting -> Active -> Ended`. `Ended` is
/// terminal; no roster or score mutation is permitted afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    #[default]
    Waiting,
    Active,
    Ended,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Waiting => "waiting",
            Self::Active => "active",
            Self::Ended => "ended",
        };
        write!(f, "{name}")
    }
}

/// Status of a friend request, unique per ordered (from, to) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum FriendRequestStatus {
    #[default]
    Pending,
    Accepted,
    Rejected,
}

/// What a shop item does when purchased or equipped.
///
/// The four cosmetic kinds (`Theme`, `Bubble`, `Emoji`, `Voice`) map
/// directly onto user preference fields - the preference itself is the
/// equip state. `Feature` unlocks are idempotent; `Powerup` grants carry a
/// 24-hour expiry; `Utility` items only live in the inventory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    Theme,
    Bubble,
    Emoji,
    Voice,
    Feature,
    Powerup,
    Utility,
}

impl ItemType {
    /// Whether items of this type can be equipped as a cosmetic.
    #[must_use]
    pub const fn is_cosmetic(self) -> bool {
        matches!(self, Self::Theme | Self::Bubble | Self::Emoji | Self::Voice)
    }
}

/// Metric a badge requirement is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum RequirementType {
    Messages,
    Friends,
    Games,
    Streak,
    Purchases,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosmetic_types() {
        assert!(ItemType::Theme.is_cosmetic());
        assert!(ItemType::Voice.is_cosmetic());
        assert!(!ItemType::Feature.is_cosmetic());
        assert!(!ItemType::Powerup.is_cosmetic());
        assert!(!ItemType::Utility.is_cosmetic());
    }

    #[test]
    fn session_status_display() {
        assert_eq!(SessionStatus::Waiting.to_string(), "waiting");
        assert_eq!(SessionStatus::Ended.to_string(), "ended");
    }
}
