//! Catalog and inventory domain types.

use serde::{Deserialize, Serialize};

use kudos_core::{CategoryId, ItemId, ItemType, RowId, UserId};

/// A shop category (cosmetics, features, power-ups, utility).
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShopCategory {
    pub id: CategoryId,
    pub name: String,
    pub description: String,
    pub icon: String,
    pub display_order: i64,
    pub is_active: bool,
    pub created_at: i64,
}

/// A purchasable item.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct ShopItem {
    pub id: ItemId,
    pub category_id: CategoryId,
    pub name: String,
    pub description: String,
    /// Price in coins.
    pub price: i64,
    pub item_type: ItemType,
    /// Type-specific payload (theme name, feature key, powerup name).
    pub item_value: String,
    /// Remaining units; -1 denotes unlimited.
    pub stock: i64,
    /// Per-user lifetime purchase cap; 0 denotes unlimited.
    pub purchase_limit: i64,
    pub is_active: bool,
    pub created_at: i64,
    pub updated_at: i64,
}

impl ShopItem {
    /// Whether the item has a finite stock counter.
    #[must_use]
    pub const fn has_finite_stock(&self) -> bool {
        self.stock >= 0
    }
}

/// One row of the append-only purchase log.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Purchase {
    pub id: RowId,
    pub user_id: UserId,
    pub item_id: ItemId,
    pub quantity: i64,
    pub price_paid: i64,
    pub purchased_at: i64,
}

/// A user's holding of one item.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InventoryEntry {
    pub user_id: UserId,
    pub item_id: ItemId,
    pub quantity: i64,
    /// Equip flag for quantity-bearing utility items; cosmetics track
    /// their equip state on the user preference fields instead.
    pub is_equipped: bool,
    pub acquired_at: i64,
}
