//! Kudos Core - Shared types library.
//!
//! This crate provides common types used across all Kudos components:
//! - `engine` - Economy, progression, catalog, game, and badge services
//! - `cli` - Command-line tools for migrations and management
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no
//! transport clients. Adapters (chat bots, dashboards) and the engine share
//! these types without pulling in each other's dependencies.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, roles, and status enums
//! - [`command`] - Structured command values decoded at the adapter boundary

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod command;
pub mod types;

pub use command::GameCommand;
pub use types::*;
