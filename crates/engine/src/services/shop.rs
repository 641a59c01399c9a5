//! Catalog browsing, the purchase transaction, and equip state.

use tracing::info;

use kudos_core::{CategoryId, ItemId, ItemType, UserId};
use serde_json::to_string as to_json;

use crate::db::shop::PurchaseTxResult;
use crate::db::{RepositoryError, ShopRepository, UserRepository, now_ts};
use crate::engine::EngineInner;
use crate::error::{EngineError, Result};
use crate::models::{Badge, InventoryEntry, ShopCategory, ShopItem, UserPatch};
use crate::services::{BadgeService, invalidate_user};

/// Power-ups last one day from purchase.
const POWERUP_DURATION_SECS: i64 = 24 * 60 * 60;

/// A completed purchase.
#[derive(Debug)]
pub struct PurchaseReceipt {
    pub item: ShopItem,
    pub quantity: i64,
    pub total_price: i64,
    /// Balance after the debit.
    pub new_balance: i64,
    /// Badges newly earned by this purchase.
    pub new_badges: Vec<Badge>,
}

/// Catalog and inventory service.
pub struct ShopService<'a> {
    inner: &'a EngineInner,
}

impl<'a> ShopService<'a> {
    pub(crate) const fn new(inner: &'a EngineInner) -> Self {
        Self { inner }
    }

    fn repo(&self) -> ShopRepository<'_> {
        ShopRepository::new(&self.inner.pool)
    }

    fn users(&self) -> UserRepository<'_> {
        UserRepository::new(&self.inner.pool)
    }

    /// Active categories in display order.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Repository`] on storage failure.
    pub async fn categories(&self) -> Result<Vec<ShopCategory>> {
        Ok(self.repo().categories().await?)
    }

    /// Active items, optionally narrowed to a category, cheapest first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Repository`] on storage failure.
    pub async fn items(&self, category: Option<&CategoryId>) -> Result<Vec<ShopItem>> {
        Ok(self.repo().items(category).await?)
    }

    /// An active item by id.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ItemUnavailable`] if the item doesn't exist
    /// or is inactive.
    pub async fn item(&self, id: &ItemId) -> Result<ShopItem> {
        match self.repo().item(id).await? {
            Some(item) if item.is_active => Ok(item),
            _ => Err(EngineError::ItemUnavailable { item: id.clone() }),
        }
    }

    /// Buy `quantity` of an item.
    ///
    /// Validation order: quantity, item availability, stock, per-user
    /// limit, then the all-or-nothing transaction (debit, purchase log,
    /// inventory upsert, guarded stock decrement). The item's effect is
    /// applied and badges are re-scanned only after the transaction
    /// commits.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidQuantity`], [`EngineError::ItemUnavailable`],
    /// [`EngineError::OutOfStock`], [`EngineError::PurchaseLimitReached`],
    /// [`EngineError::InsufficientFunds`], or [`EngineError::UserNotFound`].
    pub async fn purchase(
        &self,
        user: &UserId,
        item_id: &ItemId,
        quantity: i64,
    ) -> Result<PurchaseReceipt> {
        if quantity < 1 {
            return Err(EngineError::InvalidQuantity { quantity });
        }

        let item = self.item(item_id).await?;
        if item.has_finite_stock() && item.stock < quantity {
            return Err(EngineError::OutOfStock {
                item: item_id.clone(),
                requested: quantity,
            });
        }
        if item.purchase_limit > 0 {
            let prior = self.repo().purchased_quantity(user, item_id).await?;
            if prior + quantity > item.purchase_limit {
                return Err(EngineError::PurchaseLimitReached {
                    item: item_id.clone(),
                    limit: item.purchase_limit,
                });
            }
        }

        let total_price = item.price * quantity;
        let outcome = self
            .repo()
            .execute_purchase(user, &item, quantity, total_price)
            .await;

        let new_balance = match outcome {
            Ok(PurchaseTxResult::Completed { new_balance }) => new_balance,
            Ok(PurchaseTxResult::InsufficientFunds { balance }) => {
                return Err(EngineError::InsufficientFunds {
                    user: user.clone(),
                    balance,
                    required: total_price,
                });
            }
            Ok(PurchaseTxResult::OutOfStock) => {
                return Err(EngineError::OutOfStock {
                    item: item_id.clone(),
                    requested: quantity,
                });
            }
            Ok(PurchaseTxResult::LimitReached { .. }) => {
                return Err(EngineError::PurchaseLimitReached {
                    item: item_id.clone(),
                    limit: item.purchase_limit,
                });
            }
            Err(RepositoryError::NotFound) => {
                return Err(EngineError::UserNotFound {
                    key: user.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        info!(%user, item = %item_id, quantity, total_price, "purchase committed");

        self.apply_item_effect(user, &item).await?;
        if let Some(record) = self.users().get_by_id(user).await? {
            invalidate_user(&self.inner.cache, &record).await?;
        }
        let new_badges = BadgeService::new(self.inner).evaluate(user).await?;

        Ok(PurchaseReceipt {
            item,
            quantity,
            total_price,
            new_balance,
            new_badges,
        })
    }

    /// A user's inventory, newest acquisition first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Repository`] on storage failure.
    pub async fn inventory(&self, user: &UserId) -> Result<Vec<InventoryEntry>> {
        Ok(self.repo().inventory(user).await?)
    }

    /// Equip an owned item.
    ///
    /// Cosmetic types overwrite the matching user preference (the
    /// preference field is the equip state); utility items flip the
    /// `is_equipped` flag on the inventory row. Other types cannot be
    /// equipped.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotOwned`] if the user holds no inventory
    /// entry; [`EngineError::NotEquippable`] for feature and power-up
    /// items.
    pub async fn equip(&self, user: &UserId, item_id: &ItemId) -> Result<()> {
        let item = self.item(item_id).await?;
        let owned = self.repo().inventory_entry(user, item_id).await?;
        if owned.is_none() {
            return Err(EngineError::NotOwned {
                item: item_id.clone(),
            });
        }

        if item.item_type == ItemType::Utility {
            self.repo().set_equipped(user, item_id, true).await?;
            return Ok(());
        }
        if !item.item_type.is_cosmetic() {
            return Err(EngineError::NotEquippable {
                item: item_id.clone(),
            });
        }

        let patch = cosmetic_patch(item.item_type, &item.item_value);
        match self.users().apply_patch(user, &patch).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound) => {
                return Err(EngineError::UserNotFound {
                    key: user.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        }
        if let Some(record) = self.users().get_by_id(user).await? {
            invalidate_user(&self.inner.cache, &record).await?;
        }
        Ok(())
    }

    /// Clear the equip flag on an owned utility item.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotOwned`] if the user holds no inventory
    /// entry; [`EngineError::NotEquippable`] for non-utility items.
    pub async fn unequip(&self, user: &UserId, item_id: &ItemId) -> Result<()> {
        let item = self.item(item_id).await?;
        if item.item_type != ItemType::Utility {
            return Err(EngineError::NotEquippable {
                item: item_id.clone(),
            });
        }
        match self.repo().set_equipped(user, item_id, false).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(EngineError::NotOwned {
                item: item_id.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Apply the type-specific effect of a purchased item.
    async fn apply_item_effect(&self, user: &UserId, item: &ShopItem) -> Result<()> {
        let patch = match item.item_type {
            ItemType::Theme
            | ItemType::Bubble
            | ItemType::Emoji
            | ItemType::Voice => cosmetic_patch(item.item_type, &item.item_value),
            ItemType::Feature => {
                let record = self.users().get_by_id(user).await?.ok_or_else(|| {
                    EngineError::UserNotFound {
                        key: user.to_string(),
                    }
                })?;
                let mut meta = record.parsed_metadata()?;
                meta.unlock_feature(&item.item_value);
                UserPatch {
                    metadata: Some(to_json(&meta).map_err(|e| {
                        RepositoryError::DataCorruption(format!("user metadata: {e}"))
                    })?),
                    ..UserPatch::default()
                }
            }
            ItemType::Powerup => {
                let record = self.users().get_by_id(user).await?.ok_or_else(|| {
                    EngineError::UserNotFound {
                        key: user.to_string(),
                    }
                })?;
                let mut meta = record.parsed_metadata()?;
                meta.grant_powerup(&item.item_value, now_ts() + POWERUP_DURATION_SECS);
                UserPatch {
                    metadata: Some(to_json(&meta).map_err(|e| {
                        RepositoryError::DataCorruption(format!("user metadata: {e}"))
                    })?),
                    ..UserPatch::default()
                }
            }
            // Utility items have no automatic effect; equipping is explicit.
            ItemType::Utility => return Ok(()),
        };

        match self.users().apply_patch(user, &patch).await {
            Ok(()) => Ok(()),
            Err(RepositoryError::NotFound) => Err(EngineError::UserNotFound {
                key: user.to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }
}

fn cosmetic_patch(item_type: ItemType, value: &str) -> UserPatch {
    let mut patch = UserPatch::default();
    match item_type {
        ItemType::Theme => patch.theme_preference = Some(value.to_owned()),
        ItemType::Bubble => patch.chat_bubble_style = Some(value.to_owned()),
        ItemType::Emoji => patch.emoji_pack = Some(value.to_owned()),
        ItemType::Voice => patch.voice_style = Some(value.to_owned()),
        _ => {}
    }
    patch
}
