//! Domain row types for the entity store.

pub mod badge;
pub mod game;
pub mod shop;
pub mod social;
pub mod user;

pub use badge::{Badge, UserBadge};
pub use game::{Game, GamePlayer, GameSession, QuizQuestion};
pub use shop::{InventoryEntry, Purchase, ShopCategory, ShopItem};
pub use social::{FriendRequest, Friendship};
pub use user::{DailyClaim, LevelRecord, MemoryLogEntry, User, UserMetadata, UserPatch};
