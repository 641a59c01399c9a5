//! User roles with an explicit privilege ordering.

use serde::{Deserialize, Serialize};

/// Role of a user account.
///
/// Roles are totally ordered by privilege: `User < Premium < Vip <
/// Moderator < Admin < SuperAdmin`. Gate checks compare roles directly,
/// e.g. `actor.role >= UserRole::Admin`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[cfg_attr(feature = "sqlite", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlite", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    #[default]
    User,
    Premium,
    Vip,
    Moderator,
    Admin,
    SuperAdmin,
}

impl UserRole {
    /// Whether this role carries administrative privileges.
    #[must_use]
    pub fn is_admin(self) -> bool {
        self >= Self::Admin
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Premium => "premium",
            Self::Vip => "vip",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
            Self::SuperAdmin => "super_admin",
        };
        write!(f, "{name}")
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "premium" => Ok(Self::Premium),
            "vip" => Ok(Self::Vip),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            "super_admin" => Ok(Self::SuperAdmin),
            _ => Err(format!("invalid user role: {s}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roles_are_ordered_by_privilege() {
        assert!(UserRole::User < UserRole::Premium);
        assert!(UserRole::Vip < UserRole::Moderator);
        assert!(UserRole::Admin < UserRole::SuperAdmin);
        assert!(UserRole::SuperAdmin.is_admin());
        assert!(!UserRole::Moderator.is_admin());
    }

    #[test]
    fn round_trips_through_str() {
        for role in [
            UserRole::User,
            UserRole::Premium,
            UserRole::Vip,
            UserRole::Moderator,
            UserRole::Admin,
            UserRole::SuperAdmin,
        ] {
            let parsed: UserRole = role.to_string().parse().expect("parse role");
            assert_eq!(parsed, role);
        }
    }
}
