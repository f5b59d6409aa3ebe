//! # Goods & Stock Registry
//!
//! The catalogue of sellable goods and their stock levels.
//!
//! Stock is a snapshot the shopkeeper sets after counting. Recording a sale
//! does not decrement it.
//!
//! ```text
//! goods                               inventory
//! ┌──────┬──────────────┬───────┐     ┌────────┬────────────┐
//! │ id   │ name         │ price │     │ itemId │ stockLevel │
//! ├──────┼──────────────┼───────┤     ├────────┼────────────┤
//! │ "1"  │ Rice (1kg)   │  50   │ ◄── │ "1"    │ 42         │
//! │ "2"  │ Sugar (1kg)  │  80   │     │        │            │  no row → 0
//! └──────┴──────────────┴───────┘     └────────┴────────────┘
//! ```

use tracing::{debug, info};
use uuid::Uuid;

use tally_core::report::{stock_report, StockReport};
use tally_core::validation::{validate_name, validate_optional_text, validate_price, validate_stock_level};
use tally_core::{CoreError, Good, GoodDraft, GoodPatch, InventoryItem, Money, ValidationError, DEFAULT_GOOD_CATEGORY};
use tally_db::Collection;

use crate::engine::{encode, LedgerEngine};
use crate::error::LedgerResult;

/// Starter catalogue for a fresh install: (id, name, price in major units, category).
const SAMPLE_GOODS: [(&str, &str, i64, &str); 8] = [
    ("1", "Rice (1kg)", 50, "Grains"),
    ("2", "Sugar (1kg)", 80, "Groceries"),
    ("3", "Cooking Oil (1L)", 120, "Cooking"),
    ("4", "Bread", 30, "Bakery"),
    ("5", "Milk (1L)", 60, "Dairy"),
    ("6", "Eggs (12pcs)", 90, "Dairy"),
    ("7", "Soap", 25, "Personal Care"),
    ("8", "Toothpaste", 45, "Personal Care"),
];

/// Empty or whitespace-only text becomes `None`.
fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

impl LedgerEngine {
    // =========================================================================
    // Goods
    // =========================================================================

    /// Adds a good to the catalogue.
    ///
    /// # Errors
    /// `Validation` for a blank name, a non-positive price, or an id that is
    /// already taken.
    pub async fn add_good(&self, draft: GoodDraft) -> LedgerResult<Good> {
        validate_name("name", &draft.name)?;
        validate_price(draft.price)?;

        let category = non_blank(draft.category).unwrap_or_else(|| DEFAULT_GOOD_CATEGORY.to_string());
        validate_name("category", &category)?;
        let barcode = non_blank(draft.barcode);
        if let Some(code) = &barcode {
            validate_optional_text("barcode", code)?;
        }

        let _guard = self.store.lock(&[Collection::Goods]).await;
        let now = self.clock.now().await;

        let mut goods: Vec<Good> = self.store.get(Collection::Goods).await?;
        let id = non_blank(draft.id).unwrap_or_else(|| Uuid::new_v4().to_string());
        if goods.iter().any(|g| g.id == id) {
            return Err(ValidationError::DuplicateId {
                collection: Collection::Goods.key().to_string(),
                id,
            }
            .into());
        }

        let good = Good {
            id,
            name: draft.name.trim().to_string(),
            price: draft.price,
            category,
            barcode,
            created_at: Some(now),
        };
        goods.push(good.clone());
        self.commit(vec![encode(Collection::Goods, &goods)?], now).await?;

        info!(good_id = %good.id, name = %good.name, price = %good.price, "Good added");
        Ok(good)
    }

    /// Changes name, price, category or barcode of an existing good.
    ///
    /// Recorded purchases keep the name and price they were sold at.
    pub async fn update_good(&self, id: &str, patch: GoodPatch) -> LedgerResult<Good> {
        if let Some(name) = &patch.name {
            validate_name("name", name)?;
        }
        if let Some(price) = patch.price {
            validate_price(price)?;
        }
        if let Some(category) = &patch.category {
            validate_name("category", category)?;
        }

        let _guard = self.store.lock(&[Collection::Goods]).await;
        let now = self.clock.now().await;

        let mut goods: Vec<Good> = self.store.get(Collection::Goods).await?;
        let good = goods
            .iter_mut()
            .find(|g| g.id == id)
            .ok_or_else(|| CoreError::GoodNotFound(id.to_string()))?;

        if let Some(name) = patch.name {
            good.name = name.trim().to_string();
        }
        if let Some(price) = patch.price {
            good.price = price;
        }
        if let Some(category) = patch.category {
            good.category = category.trim().to_string();
        }
        if let Some(barcode) = patch.barcode {
            good.barcode = non_blank(barcode);
        }
        let good = good.clone();

        self.commit(vec![encode(Collection::Goods, &goods)?], now).await?;

        info!(good_id = %good.id, "Good updated");
        Ok(good)
    }

    pub async fn get_good(&self, id: &str) -> LedgerResult<Good> {
        self.list_goods()
            .await?
            .into_iter()
            .find(|g| g.id == id)
            .ok_or_else(|| CoreError::GoodNotFound(id.to_string()).into())
    }

    /// Exact match on a trimmed barcode.
    pub async fn find_good_by_barcode(&self, barcode: &str) -> LedgerResult<Option<Good>> {
        let barcode = barcode.trim();
        if barcode.is_empty() {
            return Ok(None);
        }
        Ok(self
            .list_goods()
            .await?
            .into_iter()
            .find(|g| g.barcode.as_deref() == Some(barcode)))
    }

    /// Adds the starter catalogue to an empty registry.
    ///
    /// Returns how many goods were written; zero when any good already exists.
    pub async fn seed_sample_goods(&self) -> LedgerResult<usize> {
        let _guard = self.store.lock(&[Collection::Goods]).await;
        let now = self.clock.now().await;

        let existing: Vec<Good> = self.store.get(Collection::Goods).await?;
        if !existing.is_empty() {
            debug!(existing = existing.len(), "Catalogue already populated, skipping sample goods");
            return Ok(0);
        }

        let goods: Vec<Good> = SAMPLE_GOODS
            .iter()
            .map(|(id, name, price, category)| Good {
                id: id.to_string(),
                name: name.to_string(),
                price: Money::from_major(*price),
                category: category.to_string(),
                barcode: None,
                created_at: Some(now),
            })
            .collect();

        self.commit(vec![encode(Collection::Goods, &goods)?], now).await?;

        info!(count = goods.len(), "Sample goods seeded");
        Ok(goods.len())
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// Sets the counted stock level of a good, creating its row if needed.
    ///
    /// # Errors
    /// - `NotFound` if the good is not in the catalogue
    /// - `Validation` for a negative level
    pub async fn set_stock_level(&self, good_id: &str, stock_level: i64) -> LedgerResult<InventoryItem> {
        validate_stock_level(stock_level)?;

        let _guard = self.store.lock(&[Collection::Goods, Collection::Inventory]).await;
        let now = self.clock.now().await;

        let goods: Vec<Good> = self.store.get(Collection::Goods).await?;
        if !goods.iter().any(|g| g.id == good_id) {
            return Err(CoreError::GoodNotFound(good_id.to_string()).into());
        }

        let mut inventory: Vec<InventoryItem> = self.store.get(Collection::Inventory).await?;
        let item = InventoryItem {
            item_id: good_id.to_string(),
            stock_level,
            last_updated: now,
        };
        match inventory.iter_mut().find(|i| i.item_id == good_id) {
            Some(existing) => *existing = item.clone(),
            None => inventory.push(item.clone()),
        }

        self.commit(vec![encode(Collection::Inventory, &inventory)?], now).await?;

        info!(good_id = %good_id, stock_level, "Stock level set");
        Ok(item)
    }

    /// Catalogue joined with stock levels, filtered by name or category.
    pub async fn stock_report(&self, search: &str) -> LedgerResult<StockReport> {
        let goods = self.list_goods().await?;
        let inventory = self.list_inventory().await?;
        Ok(stock_report(&goods, &inventory, search, self.settings.low_stock_threshold))
    }
}
