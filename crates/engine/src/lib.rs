//! Kudos Engine - economy and progression core.
//!
//! Everything a gamified assistant needs to keep its economic state
//! consistent under concurrent access: the coin ledger, XP and levels, the
//! shop catalog and per-user inventory, turn-based game sessions, badge
//! evaluation, and the two-tier cache fronting the entity store.
//!
//! The engine is transport-agnostic. Chat bots and dashboards are adapters
//! that translate their own protocol into the operations exposed by the
//! services here; the engine never performs network I/O of its own.
//!
//! # Consistency model
//!
//! Every read-then-write business decision (balance check before debit,
//! stock check before decrement, purchase-limit check, roster-size check)
//! executes as a single guarded SQL statement or inside one transaction,
//! so two racing callers can never both pass a precondition that only one
//! may consume. See the service modules for the individual guards.
//!
//! # Example
//!
//! ```rust,no_run
//! use kudos_engine::{Engine, EngineConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::from_env()?;
//! let engine = Engine::connect(config).await?;
//!
//! let user = engine.users().create("tg:42", "Ada").await?;
//! engine.economy().credit(&user.user_id, 250, "welcome_bonus").await?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod cache;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod models;
pub mod services;

pub use cache::CacheLayer;
pub use config::{CacheConfig, ConfigError, EconomyConfig, EngineConfig};
pub use engine::Engine;
pub use error::{EngineError, ErrorKind, Result};
