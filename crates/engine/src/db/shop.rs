//! Catalog and inventory repository.
//!
//! The purchase transaction lives here: limit check, debit, purchase log,
//! inventory upsert, and stock decrement commit together or not at all.
//! The stock decrement is a guarded UPDATE, so two racing purchases of the
//! last unit can never both commit.

use sqlx::SqlitePool;

use kudos_core::{CategoryId, ItemId, UserId};

use super::{RepositoryError, now_ts};
use crate::models::{InventoryEntry, Purchase, ShopCategory, ShopItem};

const ITEM_COLUMNS: &str = "id, category_id, name, description, price, item_type, item_value, \
     stock, purchase_limit, is_active, created_at, updated_at";

/// How a purchase transaction resolved.
///
/// Precondition failures roll the whole transaction back; the service maps
/// them onto typed engine errors.
#[derive(Debug)]
pub enum PurchaseTxResult {
    /// Everything committed; carries the buyer's new balance.
    Completed { new_balance: i64 },
    /// The balance guard rejected the debit.
    InsufficientFunds { balance: i64 },
    /// The stock guard rejected the decrement.
    OutOfStock,
    /// The per-user purchase limit would be exceeded.
    LimitReached { prior: i64 },
}

/// Repository for catalog, purchase-log, and inventory rows.
pub struct ShopRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ShopRepository<'a> {
    /// Create a new shop repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// List active categories in display order.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn categories(&self) -> Result<Vec<ShopCategory>, RepositoryError> {
        let rows = sqlx::query_as::<_, ShopCategory>(
            "SELECT id, name, description, icon, display_order, is_active, created_at \
             FROM shop_categories WHERE is_active = 1 ORDER BY display_order",
        )
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// List active items, optionally narrowed to one category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn items(
        &self,
        category: Option<&CategoryId>,
    ) -> Result<Vec<ShopItem>, RepositoryError> {
        let rows = match category {
            Some(category) => {
                sqlx::query_as::<_, ShopItem>(&format!(
                    "SELECT {ITEM_COLUMNS} FROM shop_items \
                     WHERE category_id = ? AND is_active = 1 ORDER BY price"
                ))
                .bind(category)
                .fetch_all(self.pool)
                .await?
            }
            None => {
                sqlx::query_as::<_, ShopItem>(&format!(
                    "SELECT {ITEM_COLUMNS} FROM shop_items \
                     WHERE is_active = 1 ORDER BY category_id, price"
                ))
                .fetch_all(self.pool)
                .await?
            }
        };
        Ok(rows)
    }

    /// Get an item by id, active or not.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn item(&self, id: &ItemId) -> Result<Option<ShopItem>, RepositoryError> {
        let item =
            sqlx::query_as::<_, ShopItem>(&format!("SELECT {ITEM_COLUMNS} FROM shop_items WHERE id = ?"))
                .bind(id)
                .fetch_optional(self.pool)
                .await?;
        Ok(item)
    }

    /// Total quantity of an item the user has ever purchased.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purchased_quantity(
        &self,
        user: &UserId,
        item: &ItemId,
    ) -> Result<i64, RepositoryError> {
        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COALESCE(SUM(quantity), 0) FROM user_purchases \
             WHERE user_id = ? AND item_id = ?",
        )
        .bind(user)
        .bind(item)
        .fetch_one(self.pool)
        .await?;
        Ok(total)
    }

    /// Run the all-or-nothing purchase transaction.
    ///
    /// Inside one transaction: re-check the purchase limit, debit the
    /// buyer (guarded), append the purchase log row, upsert the inventory
    /// entry, and decrement finite stock (guarded). Any precondition
    /// failure rolls everything back, refunding the debit.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the buyer doesn't exist;
    /// `RepositoryError::Database` if a query fails.
    pub async fn execute_purchase(
        &self,
        user: &UserId,
        item: &ShopItem,
        quantity: i64,
        total_price: i64,
    ) -> Result<PurchaseTxResult, RepositoryError> {
        let now = now_ts();
        let mut tx = self.pool.begin().await?;

        if item.purchase_limit > 0 {
            let prior = sqlx::query_scalar::<_, i64>(
                "SELECT COALESCE(SUM(quantity), 0) FROM user_purchases \
                 WHERE user_id = ? AND item_id = ?",
            )
            .bind(user)
            .bind(&item.id)
            .fetch_one(&mut *tx)
            .await?;
            if prior + quantity > item.purchase_limit {
                return Ok(PurchaseTxResult::LimitReached { prior });
            }
        }

        let new_balance = sqlx::query_scalar::<_, i64>(
            "UPDATE users SET coin_balance = coin_balance - ?, \
             total_coins_spent = total_coins_spent + ?, updated_at = ? \
             WHERE user_id = ? AND coin_balance >= ? RETURNING coin_balance",
        )
        .bind(total_price)
        .bind(total_price)
        .bind(now)
        .bind(user)
        .bind(total_price)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(new_balance) = new_balance else {
            let balance =
                sqlx::query_scalar::<_, i64>("SELECT coin_balance FROM users WHERE user_id = ?")
                    .bind(user)
                    .fetch_optional(&mut *tx)
                    .await?;
            return match balance {
                Some(balance) => Ok(PurchaseTxResult::InsufficientFunds { balance }),
                None => Err(RepositoryError::NotFound),
            };
        };

        sqlx::query(
            "INSERT INTO user_purchases (user_id, item_id, quantity, price_paid, purchased_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(user)
        .bind(&item.id)
        .bind(quantity)
        .bind(total_price)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO user_inventory (user_id, item_id, quantity, acquired_at) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(user_id, item_id) DO UPDATE SET quantity = quantity + excluded.quantity",
        )
        .bind(user)
        .bind(&item.id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if item.has_finite_stock() {
            let result = sqlx::query(
                "UPDATE shop_items SET stock = stock - ?, updated_at = ? \
                 WHERE id = ? AND stock >= ?",
            )
            .bind(quantity)
            .bind(now)
            .bind(&item.id)
            .bind(quantity)
            .execute(&mut *tx)
            .await?;
            if result.rows_affected() == 0 {
                // Guard rejected: rolling back also refunds the debit.
                return Ok(PurchaseTxResult::OutOfStock);
            }
        }

        tx.commit().await?;
        Ok(PurchaseTxResult::Completed { new_balance })
    }

    /// List a user's inventory, most recently acquired first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn inventory(&self, user: &UserId) -> Result<Vec<InventoryEntry>, RepositoryError> {
        let rows = sqlx::query_as::<_, InventoryEntry>(
            "SELECT user_id, item_id, quantity, is_equipped, acquired_at \
             FROM user_inventory WHERE user_id = ? ORDER BY acquired_at DESC",
        )
        .bind(user)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }

    /// Get a single inventory entry.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn inventory_entry(
        &self,
        user: &UserId,
        item: &ItemId,
    ) -> Result<Option<InventoryEntry>, RepositoryError> {
        let entry = sqlx::query_as::<_, InventoryEntry>(
            "SELECT user_id, item_id, quantity, is_equipped, acquired_at \
             FROM user_inventory WHERE user_id = ? AND item_id = ?",
        )
        .bind(user)
        .bind(item)
        .fetch_optional(self.pool)
        .await?;
        Ok(entry)
    }

    /// Set the equip flag on a utility inventory row.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if the entry doesn't exist.
    pub async fn set_equipped(
        &self,
        user: &UserId,
        item: &ItemId,
        equipped: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            "UPDATE user_inventory SET is_equipped = ? WHERE user_id = ? AND item_id = ?",
        )
        .bind(equipped)
        .bind(user)
        .bind(item)
        .execute(self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Count a user's purchase-log rows (the `purchases` badge metric).
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn purchase_count(&self, user: &UserId) -> Result<i64, RepositoryError> {
        let count =
            sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM user_purchases WHERE user_id = ?")
                .bind(user)
                .fetch_one(self.pool)
                .await?;
        Ok(count)
    }

    /// Most recent purchases for a user.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn recent_purchases(
        &self,
        user: &UserId,
        limit: i64,
    ) -> Result<Vec<Purchase>, RepositoryError> {
        let rows = sqlx::query_as::<_, Purchase>(
            "SELECT id, user_id, item_id, quantity, price_paid, purchased_at \
             FROM user_purchases WHERE user_id = ? ORDER BY purchased_at DESC, id DESC LIMIT ?",
        )
        .bind(user)
        .bind(limit)
        .fetch_all(self.pool)
        .await?;
        Ok(rows)
    }
}
