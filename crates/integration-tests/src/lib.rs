//! Integration tests for the kudos engine.
//!
//! Every suite runs against a fresh in-memory `SQLite` database with the
//! full migration set applied, so the tests exercise the real guarded SQL
//! rather than mocks. Fixtures are inserted directly through the pool to
//! keep each test independent of the CLI seed catalog.
//!
//! # Running
//!
//! ```bash
//! cargo test -p kudos-integration-tests
//! ```
//!
//! # Suites
//!
//! - `economy` - ledger guards, daily claims, XP settlement
//! - `shop` - purchases, stock, limits, inventory, equipping
//! - `games` - session lifecycle, rosters, rewards
//! - `badges` - requirement evaluation and grant idempotency
//! - `social` - friend requests, friendships, blocks

#![cfg_attr(not(test), forbid(unsafe_code))]
#![allow(clippy::missing_panics_doc, clippy::missing_errors_doc)]

use std::time::{SystemTime, UNIX_EPOCH};

use kudos_core::{BadgeId, GameId, ItemId, UserId};
use kudos_engine::{Engine, EngineConfig};

/// A fresh engine over a migrated in-memory database, plus fixture
/// helpers for the catalog tables the engine only reads.
pub struct TestContext {
    pub engine: Engine,
}

impl TestContext {
    pub async fn new() -> Self {
        let config = EngineConfig::with_database_url("sqlite::memory:");
        let engine = Engine::in_memory(config).await.expect("in-memory engine");
        Self { engine }
    }

    /// Register a user under `handle` and return their id.
    pub async fn user(&self, handle: &str) -> UserId {
        self.engine
            .users()
            .create(handle, handle)
            .await
            .expect("create user")
            .user_id
    }

    /// Force a role directly in storage, dropping the cached records the
    /// role-gated paths would otherwise read.
    pub async fn force_role(&self, handle: &str, role: &str) {
        let user = self.engine.users().get(handle).await.expect("user");
        sqlx::query("UPDATE users SET role = ? WHERE user_id = ?")
            .bind(role)
            .bind(user.user_id.as_str())
            .execute(self.engine.pool())
            .await
            .expect("set role");
        for key in [user.user_id.as_str(), handle] {
            self.engine
                .cache()
                .invalidate(&format!("user:{key}"))
                .await
                .expect("invalidate");
        }
    }

    /// Insert a game definition.
    pub async fn seed_game(
        &self,
        id: &str,
        min_players: i64,
        max_players: i64,
        coin_reward: i64,
        xp_reward: i64,
    ) -> GameId {
        sqlx::query(
            "INSERT INTO games (id, name, description, game_type, min_players, max_players, \
             coin_reward, xp_reward, created_at) VALUES (?, ?, '', ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(id)
        .bind(id)
        .bind(min_players)
        .bind(max_players)
        .bind(coin_reward)
        .bind(xp_reward)
        .bind(now_ts())
        .execute(self.engine.pool())
        .await
        .expect("seed game");
        GameId::new(id)
    }

    /// Insert a shop item (under a shared `test` category).
    pub async fn seed_item(
        &self,
        id: &str,
        price: i64,
        item_type: &str,
        stock: i64,
        purchase_limit: i64,
    ) -> ItemId {
        let now = now_ts();
        sqlx::query(
            "INSERT OR IGNORE INTO shop_categories (id, name, created_at) \
             VALUES ('test', 'Test', ?)",
        )
        .bind(now)
        .execute(self.engine.pool())
        .await
        .expect("seed category");

        sqlx::query(
            "INSERT INTO shop_items (id, category_id, name, description, price, item_type, \
             item_value, stock, purchase_limit, created_at, updated_at) \
             VALUES (?, 'test', ?, '', ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(id)
        .bind(price)
        .bind(item_type)
        .bind(id)
        .bind(stock)
        .bind(purchase_limit)
        .bind(now)
        .bind(now)
        .execute(self.engine.pool())
        .await
        .expect("seed item");
        ItemId::new(id)
    }

    /// Insert a badge definition.
    pub async fn seed_badge(
        &self,
        id: &str,
        requirement_type: &str,
        requirement_value: i64,
        coin_reward: i64,
        xp_reward: i64,
    ) -> BadgeId {
        sqlx::query(
            "INSERT INTO badges (id, name, description, requirement_type, requirement_value, \
             coin_reward, xp_reward, created_at) VALUES (?, ?, '', ?, ?, ?, ?, ?)",
        )
        .bind(id)
        .bind(id)
        .bind(requirement_type)
        .bind(requirement_value)
        .bind(coin_reward)
        .bind(xp_reward)
        .bind(now_ts())
        .execute(self.engine.pool())
        .await
        .expect("seed badge");
        BadgeId::new(id)
    }

    /// Insert a quiz question and return its row id.
    pub async fn seed_question(&self, question: &str, options: &[&str], correct: i64) -> i64 {
        let options = serde_json::to_string(options).expect("serialize options");
        let row: (i64,) = sqlx::query_as(
            "INSERT INTO quiz_questions (question, options, correct_answer, created_at) \
             VALUES (?, ?, ?, ?) RETURNING id",
        )
        .bind(question)
        .bind(options)
        .bind(correct)
        .bind(now_ts())
        .fetch_one(self.engine.pool())
        .await
        .expect("seed question");
        row.0
    }
}

/// Current unix timestamp in seconds.
#[must_use]
pub fn now_ts() -> i64 {
    let elapsed = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock before unix epoch");
    i64::try_from(elapsed.as_secs()).expect("timestamp fits in i64")
}
