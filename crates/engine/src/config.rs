//! Engine configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `KUDOS_DATABASE_URL` - `SQLite` connection string (e.g. `sqlite://kudos.db`)
//!
//! ## Optional
//! - `KUDOS_CACHE_TTL_SECS` - store-tier TTL for cached user records (default: 300)
//! - `KUDOS_CACHE_REFRESH_SECS` - in-process refresh window (default: 60)
//! - `KUDOS_CACHE_CAPACITY` - in-process cache capacity (default: 10000)
//! - `KUDOS_DAILY_BASE_COINS` - base daily claim reward (default: 1000)
//! - `KUDOS_STARTING_BALANCE` - coin balance granted at signup (default: 1000)

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `SQLite` database connection URL.
    pub database_url: SecretString,
    /// Cache layer tuning.
    pub cache: CacheConfig,
    /// Economy constants.
    pub economy: EconomyConfig,
}

/// Cache layer tuning knobs.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Store-tier TTL applied to cached user records.
    pub user_ttl: Duration,
    /// In-process refresh window; a repopulated memory entry is trusted
    /// for at most this long before the store tier is consulted again.
    pub memory_refresh: Duration,
    /// Maximum number of entries in the in-process tier.
    pub memory_capacity: u64,
    /// TTL for conversation memory entries.
    pub memory_log_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            user_ttl: Duration::from_secs(300),
            memory_refresh: Duration::from_secs(60),
            memory_capacity: 10_000,
            memory_log_ttl: Duration::from_secs(86_400),
        }
    }
}

/// Economy constants.
#[derive(Debug, Clone)]
pub struct EconomyConfig {
    /// Coin balance granted to every new account.
    pub starting_balance: i64,
    /// Base reward for a daily claim.
    pub daily_base_coins: i64,
    /// Per-streak-day bonus added to the daily claim.
    pub daily_streak_bonus: i64,
    /// Upper bound on the streak bonus.
    pub daily_bonus_cap: i64,
    /// XP granted for every recorded message.
    pub xp_per_message: i64,
    /// Coins granted for every recorded message.
    pub coins_per_message: i64,
    /// Daily message allowance for free accounts.
    pub free_daily_limit: i64,
    /// Daily message allowance for premium and higher accounts.
    pub premium_daily_limit: i64,
}

impl Default for EconomyConfig {
    fn default() -> Self {
        Self {
            starting_balance: 1000,
            daily_base_coins: 1000,
            daily_streak_bonus: 100,
            daily_bonus_cap: 1000,
            xp_per_message: 10,
            coins_per_message: 5,
            free_daily_limit: 100,
            premium_daily_limit: 500,
        }
    }
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("KUDOS_DATABASE_URL")?;

        let cache = CacheConfig {
            user_ttl: Duration::from_secs(get_parsed_or("KUDOS_CACHE_TTL_SECS", 300)?),
            memory_refresh: Duration::from_secs(get_parsed_or("KUDOS_CACHE_REFRESH_SECS", 60)?),
            memory_capacity: get_parsed_or("KUDOS_CACHE_CAPACITY", 10_000)?,
            ..CacheConfig::default()
        };

        let economy = EconomyConfig {
            daily_base_coins: get_parsed_or("KUDOS_DAILY_BASE_COINS", 1000)?,
            starting_balance: get_parsed_or("KUDOS_STARTING_BALANCE", 1000)?,
            ..EconomyConfig::default()
        };

        Ok(Self {
            database_url,
            cache,
            economy,
        })
    }

    /// Build a config around an explicit database URL, with default tuning.
    ///
    /// Intended for tests and embedding; production binaries should prefer
    /// [`EngineConfig::from_env`].
    #[must_use]
    pub fn with_database_url(database_url: impl Into<String>) -> Self {
        Self {
            database_url: SecretString::from(database_url.into()),
            cache: CacheConfig::default(),
            economy: EconomyConfig::default(),
        }
    }
}

/// Get the database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an environment variable parsed into `T`, with a default when unset.
fn get_parsed_or<T: std::str::FromStr>(key: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_constants() {
        let economy = EconomyConfig::default();
        assert_eq!(economy.daily_base_coins, 1000);
        assert_eq!(economy.daily_bonus_cap, 1000);
        assert_eq!(economy.xp_per_message, 10);
        assert_eq!(economy.coins_per_message, 5);

        let cache = CacheConfig::default();
        assert_eq!(cache.user_ttl, Duration::from_secs(300));
        assert!(cache.memory_refresh < cache.user_ttl);
    }

    #[test]
    fn with_database_url_uses_defaults() {
        let config = EngineConfig::with_database_url("sqlite::memory:");
        assert_eq!(config.economy.starting_balance, 1000);
    }
}
