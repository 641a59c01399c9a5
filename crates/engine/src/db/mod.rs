//! Database access for the Kudos entity store.
//!
//! The store is `SQLite` behind a `sqlx` pool. Domain components never hold
//! private copies of entities across operations; every operation goes
//! through a repository here (or through the cache layer, which is itself
//! backed by the `cache` table).
//!
//! ## Tables
//!
//! - `users`, `user_levels`, `daily_claims` - identity, ledger, progression
//! - `friend_requests`, `friends`, `blocks` - social graph
//! - `shop_categories`, `shop_items`, `user_purchases`, `user_inventory` - catalog
//! - `games`, `game_sessions`, `game_players`, `quiz_questions` - game sessions
//! - `badges`, `user_badges` - achievements
//! - `cache` - store tier of the cache layer
//!
//! # Migrations
//!
//! Migrations are embedded from `crates/engine/migrations/` and run via:
//! ```bash
//! cargo run -p kudos-cli -- migrate
//! ```

use std::str::FromStr;
use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::SqlitePool;
use sqlx::migrate::Migrator;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use thiserror::Error;

pub mod badges;
pub mod games;
pub mod shop;
pub mod social;
pub mod users;

pub use badges::BadgeRepository;
pub use games::GameRepository;
pub use shop::ShopRepository;
pub use social::SocialRepository;
pub use users::UserRepository;

/// Embedded schema migrations.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors from repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Underlying database failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A stored value failed to parse (corrupt JSON, invalid enum text).
    #[error("Data corruption: {0}")]
    DataCorruption(String),

    /// The targeted row does not exist.
    #[error("Not found")]
    NotFound,

    /// A uniqueness constraint rejected the write.
    #[error("Conflict: {0}")]
    Conflict(String),
}

/// Create a `SQLite` connection pool with sensible defaults.
///
/// Enables WAL journaling and foreign keys; creates the database file if it
/// does not exist yet.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url.expose_secret())?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(5))
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await
}

/// Create a migrated in-memory pool.
///
/// A single persistent connection keeps the in-memory database alive for
/// the lifetime of the pool. Used by the test suites; also handy for
/// ephemeral embedding.
///
/// # Errors
///
/// Returns `sqlx::Error` if the pool cannot be created or migrations fail.
pub async fn memory_pool() -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .min_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await?;

    MIGRATOR.run(&pool).await?;
    Ok(pool)
}

/// Current unix timestamp in seconds.
pub(crate) fn now_ts() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Whether a `sqlx` error is a uniqueness-constraint rejection.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}
