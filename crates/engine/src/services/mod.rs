//! Domain services.
//!
//! Each service is a thin, cheaply constructed view over the shared engine
//! internals, obtained per call from [`crate::Engine`] accessors. Services
//! own the business rules and the cache discipline; raw SQL lives in the
//! repositories under [`crate::db`].

pub mod badges;
pub mod economy;
pub mod games;
pub mod progression;
pub mod shop;
pub mod social;
pub mod users;

pub use badges::BadgeService;
pub use economy::{ClaimOutcome, EconomyService};
pub use games::{AnswerOutcome, CommandOutcome, EndOutcome, GameService, PlayerReward};
pub use progression::{ProgressionService, XpOutcome};
pub use shop::{PurchaseReceipt, ShopService};
pub use social::{RequestOutcome, SocialService};
pub use users::{DailyUsage, MessageOutcome, UserService};

use crate::cache::CacheLayer;
use crate::db::RepositoryError;
use crate::models::User;

/// Cache key for a user record under one of its identifiers.
pub(crate) fn user_cache_key(key: &str) -> String {
    format!("user:{key}")
}

/// Cache key for a user's conversation memory.
pub(crate) fn memory_cache_key(user_id: &str) -> String {
    format!("memory:{user_id}")
}

/// Drop a user from the cache under both of its identifiers.
///
/// Must complete before the triggering mutation reports success.
pub(crate) async fn invalidate_user(cache: &CacheLayer, user: &User) -> Result<(), RepositoryError> {
    cache.invalidate(&user_cache_key(user.user_id.as_str())).await?;
    cache.invalidate(&user_cache_key(&user.external_id)).await?;
    Ok(())
}
