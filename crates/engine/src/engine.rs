//! The engine handle shared across adapters.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use crate::cache::CacheLayer;
use crate::config::EngineConfig;
use crate::db::{MIGRATOR, create_pool, memory_pool};
use crate::services::{
    BadgeService, EconomyService, GameService, ProgressionService, ShopService, SocialService,
    UserService,
};

/// The engine: pool, cache layer, and configuration behind one handle.
///
/// Cheaply cloneable via `Arc`; every adapter task holds its own clone and
/// reaches domain operations through the service accessors.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<EngineInner>,
}

pub(crate) struct EngineInner {
    pub(crate) config: EngineConfig,
    pub(crate) pool: SqlitePool,
    pub(crate) cache: CacheLayer,
}

impl Engine {
    /// Connect to the database, run pending migrations, and build the
    /// cache layer.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the pool cannot be created or a migration
    /// fails.
    pub async fn connect(config: EngineConfig) -> Result<Self, sqlx::Error> {
        let pool = create_pool(&config.database_url).await?;
        MIGRATOR.run(&pool).await?;
        info!("engine connected, migrations applied");
        Ok(Self::from_pool(config, pool))
    }

    /// Build an engine over a fresh migrated in-memory database.
    ///
    /// # Errors
    ///
    /// Returns `sqlx::Error` if the pool cannot be created or a migration
    /// fails.
    pub async fn in_memory(config: EngineConfig) -> Result<Self, sqlx::Error> {
        let pool = memory_pool().await?;
        Ok(Self::from_pool(config, pool))
    }

    fn from_pool(config: EngineConfig, pool: SqlitePool) -> Self {
        let cache = CacheLayer::new(pool.clone(), &config.cache);
        Self {
            inner: Arc::new(EngineInner {
                config,
                pool,
                cache,
            }),
        }
    }

    /// Get a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    /// Get a reference to the cache layer.
    #[must_use]
    pub fn cache(&self) -> &CacheLayer {
        &self.inner.cache
    }

    /// Get a reference to the configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Account lifecycle, profile, and message accounting.
    #[must_use]
    pub fn users(&self) -> UserService<'_> {
        UserService::new(&self.inner)
    }

    /// Coin ledger and daily claims.
    #[must_use]
    pub fn economy(&self) -> EconomyService<'_> {
        EconomyService::new(&self.inner)
    }

    /// XP grants and level progression.
    #[must_use]
    pub fn progression(&self) -> ProgressionService<'_> {
        ProgressionService::new(&self.inner)
    }

    /// Catalog, purchases, and inventory.
    #[must_use]
    pub fn shop(&self) -> ShopService<'_> {
        ShopService::new(&self.inner)
    }

    /// Game sessions and quiz questions.
    #[must_use]
    pub fn games(&self) -> GameService<'_> {
        GameService::new(&self.inner)
    }

    /// Badge evaluation and grants.
    #[must_use]
    pub fn badges(&self) -> BadgeService<'_> {
        BadgeService::new(&self.inner)
    }

    /// Friend requests, friendships, and blocks.
    #[must_use]
    pub fn social(&self) -> SocialService<'_> {
        SocialService::new(&self.inner)
    }
}
